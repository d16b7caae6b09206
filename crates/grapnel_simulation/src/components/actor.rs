//! Базовые компоненты акторов: Actor, Player, Enemy, Abilities

use bevy::prelude::*;

use crate::combat::{Damageable, KnockbackResolver};
use crate::components::{Body, CollisionLayers, ColliderShape};
use crate::grounding::{GroundProbe, GroundedSignal};

/// Актор (игрок, враг) - базовый компонент для живых существ
///
/// Через Required Components автоматически получает Damageable, Body,
/// коллайдер, grounded-оценку и knockback.
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
#[require(
    Damageable,
    Body,
    ColliderShape,
    CollisionLayers,
    GroundProbe,
    GroundedSignal,
    KnockbackResolver
)]
pub struct Actor {
    /// Stable ID фракции
    pub faction_id: u64,
}

/// Marker: the locally controlled character
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct Player;

/// Marker: grapple/shotgun target
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct Enemy;

/// Unlockable movement abilities
///
/// Pickup-триггеры живут снаружи ядра и только дергают `unlock_*`.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Reflect)]
#[reflect(Component)]
pub struct Abilities {
    pub dash: bool,
    pub grapple: bool,
}

impl Default for Abilities {
    fn default() -> Self {
        Self {
            dash: false,
            grapple: true,
        }
    }
}

impl Abilities {
    pub fn all() -> Self {
        Self {
            dash: true,
            grapple: true,
        }
    }

    pub fn unlock_dash(&mut self) {
        self.dash = true;
    }

    pub fn unlock_grapple(&mut self) {
        self.grapple = true;
    }
}
