//! Combat events
//!
//! Notifications (HealthChanged, ShieldChanged, Damaged, Died) публикует
//! только `DamageNotifier`. Requests - вход для внешних систем.

use bevy::prelude::*;

/// Событие: health изменился (урон, heal, reset)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct HealthChanged {
    pub entity: Entity,
    pub current: f32,
    pub max: f32,
}

/// Событие: shield изменился (урон, refill, regen, reset)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct ShieldChanged {
    pub entity: Entity,
    pub current: f32,
    pub max: f32,
}

/// Событие: урон нанесён
///
/// `amount` - запрошенный урон (до разделения shield/health).
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct Damaged {
    pub entity: Entity,
    pub amount: f32,
    pub source: Option<Entity>,
}

/// Событие: entity умер (health → 0)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct Died {
    pub entity: Entity,
    pub killer: Option<Entity>,
}

/// Request: нанести урон
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct DamageRequest {
    pub target: Entity,
    pub amount: f32,
    pub source: Option<Entity>,
}

/// Request: heal и/или refill shield
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct HealRequest {
    pub target: Entity,
    pub health: f32,
    pub shield: f32,
}

impl HealRequest {
    pub fn health(target: Entity, amount: f32) -> Self {
        Self {
            target,
            health: amount,
            shield: 0.0,
        }
    }

    pub fn shield(target: Entity, amount: f32) -> Self {
        Self {
            target,
            health: 0.0,
            shield: amount,
        }
    }
}

/// Request: полный reset (опционально с новыми максимумами)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct ResetRequest {
    pub target: Entity,
    pub max_health: Option<f32>,
    pub max_shield: Option<f32>,
}

/// Request: knockback импульс (резолвится `KnockbackResolver` цели)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct KnockbackImpulse {
    pub target: Entity,
    pub impulse: Vec3,
    pub source: Option<Entity>,
}
