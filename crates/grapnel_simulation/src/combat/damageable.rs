//! Health + shield model
//!
//! Инварианты:
//! - 0 ≤ current_health ≤ max_health, 0 ≤ current_shield ≤ max_shield
//! - shield поглощает урон раньше health
//! - health = 0 → dead (терминально до `reset_all`)
//!
//! Мутаторы возвращают отчёты; события публикует `DamageNotifier`.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Damageable state
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
pub struct Damageable {
    pub current_health: f32,
    pub max_health: f32,
    pub current_shield: f32,
    pub max_shield: f32,
    /// Сколько ещё ждать до начала регена shield
    pub shield_regen_lock_timer: f32,
    pub shield_regen_delay: f32,
    /// Units/sec
    pub shield_regen_rate: f32,
    dead: bool,
}

impl Default for Damageable {
    fn default() -> Self {
        Self::new(100.0, 50.0)
    }
}

/// Result of `apply_damage`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DamageReport {
    pub requested: f32,
    pub shield_absorbed: f32,
    pub health_lost: f32,
    pub died: bool,
}

impl DamageReport {
    /// Damage was not applied (already dead, non-positive or non-finite amount)
    pub fn is_ignored(&self) -> bool {
        self.requested <= 0.0
    }

    pub fn shield_changed(&self) -> bool {
        self.shield_absorbed > 0.0
    }

    pub fn health_changed(&self) -> bool {
        self.health_lost > 0.0
    }
}

impl Damageable {
    pub fn new(max_health: f32, max_shield: f32) -> Self {
        let max_health = sanitize(max_health);
        let max_shield = sanitize(max_shield);
        Self {
            current_health: max_health,
            max_health,
            current_shield: max_shield,
            max_shield,
            shield_regen_lock_timer: 0.0,
            shield_regen_delay: 2.0,
            shield_regen_rate: 15.0,
            dead: max_health <= 0.0,
        }
    }

    pub fn with_regen(mut self, delay: f32, rate: f32) -> Self {
        self.shield_regen_delay = sanitize(delay);
        self.shield_regen_rate = sanitize(rate);
        self
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn is_alive(&self) -> bool {
        !self.dead
    }

    /// Shield first, then health. Dead targets ignore damage.
    pub fn apply_damage(&mut self, amount: f32) -> DamageReport {
        if self.dead || !amount.is_finite() || amount <= 0.0 {
            return DamageReport::default();
        }

        let shield_absorbed = self.current_shield.min(amount);
        self.current_shield -= shield_absorbed;

        let remaining = amount - shield_absorbed;
        let health_lost = self.current_health.min(remaining);
        self.current_health -= health_lost;

        self.shield_regen_lock_timer = self.shield_regen_delay;

        let died = self.current_health <= 0.0;
        if died {
            self.current_health = 0.0;
            self.dead = true;
        }

        DamageReport {
            requested: amount,
            shield_absorbed,
            health_lost,
            died,
        }
    }

    /// Returns the amount actually healed.
    pub fn heal(&mut self, amount: f32) -> f32 {
        if self.dead || !amount.is_finite() || amount <= 0.0 {
            return 0.0;
        }
        let before = self.current_health;
        self.current_health = (self.current_health + amount).min(self.max_health);
        self.current_health - before
    }

    /// Returns the amount of shield restored.
    pub fn refill_shield(&mut self, amount: f32) -> f32 {
        if self.dead || !amount.is_finite() || amount <= 0.0 {
            return 0.0;
        }
        let before = self.current_shield;
        self.current_shield = (self.current_shield + amount).min(self.max_shield);
        self.current_shield - before
    }

    /// Full restore (optionally with new maxima); clears death.
    pub fn reset_all(&mut self, max_health: Option<f32>, max_shield: Option<f32>) {
        if let Some(max_health) = max_health {
            self.max_health = sanitize(max_health);
        }
        if let Some(max_shield) = max_shield {
            self.max_shield = sanitize(max_shield);
        }

        self.current_health = self.max_health;
        self.current_shield = self.max_shield;
        self.shield_regen_lock_timer = 0.0;
        self.dead = self.max_health <= 0.0;
    }

    /// Shield regen tick. Returns the amount regenerated.
    pub fn tick_regen(&mut self, delta_time: f32) -> f32 {
        if self.dead {
            return 0.0;
        }

        let mut remaining_time = delta_time;

        // Recharge delay countdown
        if self.shield_regen_lock_timer > 0.0 {
            let delay_time = self.shield_regen_lock_timer.min(remaining_time);
            self.shield_regen_lock_timer -= delay_time;
            remaining_time -= delay_time;
        }

        if remaining_time <= 0.0 || self.current_shield >= self.max_shield {
            return 0.0;
        }

        let before = self.current_shield;
        self.current_shield =
            (self.current_shield + self.shield_regen_rate * remaining_time).min(self.max_shield);
        self.current_shield - before
    }

    pub fn health_fraction(&self) -> f32 {
        if self.max_health > 0.0 {
            self.current_health / self.max_health
        } else {
            0.0
        }
    }

    pub fn shield_fraction(&self) -> f32 {
        if self.max_shield > 0.0 {
            self.current_shield / self.max_shield
        } else {
            0.0
        }
    }
}

fn sanitize(value: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}
