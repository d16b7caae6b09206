//! Gameplay tuning (RON)
//!
//! Все секции `#[serde(default)]`: файл может задавать только то, что
//! меняет. После загрузки всё проходит `normalized()` (перевёрнутые
//! диапазоны меняются местами, а не отвергаются).

use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::combat::{Damageable, KnockbackConfig};
use crate::grapple::GrappleConfig;
use crate::grounding::GroundProbe;
use crate::logger::{log, log_error, log_warning};
use crate::movement::LocomotionConfig;
use crate::physics::PhysicsSettings;
use crate::shooting::ShotgunConfig;

/// Ground probe section
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Reflect)]
#[serde(default)]
pub struct GroundingTuning {
    pub probe_offset: f32,
    pub radius_scale: f32,
    pub grace_window: f32,
}

impl Default for GroundingTuning {
    fn default() -> Self {
        let probe = GroundProbe::default();
        Self {
            probe_offset: probe.probe_offset,
            radius_scale: probe.radius_scale,
            grace_window: probe.grace_window,
        }
    }
}

impl GroundingTuning {
    pub fn normalized(mut self) -> Self {
        self.probe_offset = self.probe_offset.max(0.0);
        self.radius_scale = self.radius_scale.max(0.01);
        self.grace_window = self.grace_window.max(0.0);
        self
    }

    pub fn probe(&self) -> GroundProbe {
        GroundProbe {
            probe_offset: self.probe_offset,
            radius_scale: self.radius_scale,
            grace_window: self.grace_window,
            ..default()
        }
    }
}

/// Health / shield section
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Reflect)]
#[serde(default)]
pub struct VitalsTuning {
    pub max_health: f32,
    pub max_shield: f32,
    pub shield_regen_delay: f32,
    pub shield_regen_rate: f32,
}

impl Default for VitalsTuning {
    fn default() -> Self {
        let damageable = Damageable::default();
        Self {
            max_health: damageable.max_health,
            max_shield: damageable.max_shield,
            shield_regen_delay: damageable.shield_regen_delay,
            shield_regen_rate: damageable.shield_regen_rate,
        }
    }
}

impl VitalsTuning {
    pub fn damageable(&self) -> Damageable {
        Damageable::new(self.max_health, self.max_shield)
            .with_regen(self.shield_regen_delay, self.shield_regen_rate)
    }
}

/// Tuning for the whole simulation
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize, Reflect)]
#[reflect(Resource)]
#[serde(default)]
pub struct GameplayTuning {
    pub physics: PhysicsSettings,
    pub locomotion: LocomotionConfig,
    pub grounding: GroundingTuning,
    pub knockback: KnockbackConfig,
    pub grapple: GrappleConfig,
    pub shotgun: ShotgunConfig,
    pub player: VitalsTuning,
    pub enemy: VitalsTuning,
    /// Масса врагов (dynamic body)
    pub enemy_mass: f32,
}

impl Default for GameplayTuning {
    fn default() -> Self {
        Self {
            physics: PhysicsSettings::default(),
            locomotion: LocomotionConfig::default(),
            grounding: GroundingTuning::default(),
            knockback: KnockbackConfig::default(),
            grapple: GrappleConfig::default(),
            shotgun: ShotgunConfig::default(),
            player: VitalsTuning::default(),
            enemy: VitalsTuning::default(),
            enemy_mass: DEFAULT_ENEMY_MASS,
        }
    }
}

impl GameplayTuning {
    pub fn normalized(mut self) -> Self {
        self.physics.gravity = -self.physics.gravity.abs();
        self.physics.terminal_fall_speed = self.physics.terminal_fall_speed.abs();
        self.locomotion = self.locomotion.normalized();
        self.grounding = self.grounding.normalized();
        self.knockback = self.knockback.normalized();
        self.grapple = self.grapple.normalized();
        self.shotgun = self.shotgun.normalized();
        if !(self.enemy_mass.is_finite() && self.enemy_mass > 0.0) {
            self.enemy_mass = DEFAULT_ENEMY_MASS;
        }
        self
    }

    pub fn from_ron_str(source: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str::<Self>(source).map(Self::normalized)
    }

    pub fn to_ron_string(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Читает RON файл; любая ошибка → лог + defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                log_warning(&format!(
                    "⚠️ Tuning {}: {}, using defaults",
                    path.display(),
                    err
                ));
                return Self::default().normalized();
            }
        };

        match Self::from_ron_str(&source) {
            Ok(tuning) => {
                log(&format!("📄 Tuning loaded from {}", path.display()));
                tuning
            }
            Err(err) => {
                log_error(&format!(
                    "❌ Tuning {}: parse error {}, using defaults",
                    path.display(),
                    err
                ));
                Self::default().normalized()
            }
        }
    }
}

pub const DEFAULT_ENEMY_MASS: f32 = 80.0;
