//! Shooting domain - shotgun с pellet aggregation
//!
//! Содержит:
//! - ShotgunConfig / Shotgun (falloff, crit, knockback per pellet)
//! - fire_pellets → ShotReport (чистая функция, RNG инжектится)
//! - apply_batched + HitReceiver (один damage/knockback на цель)
//! - Hitbox / HitboxOf / HitboxMount (регионы с multiplier)
//! - tick_shotguns<B> (ECS glue)

pub mod hitbox;
pub mod pellets;
pub mod systems;

use std::marker::PhantomData;

use bevy::prelude::*;

use crate::physics::PhysicsBackend;
use crate::{SimulationSet, SyncSet};

pub use hitbox::{follow_hitbox_mounts, Hitbox, HitboxMount, HitboxOf};
pub use pellets::{
    apply_batched, fire_pellets, HitReceiver, HitTarget, Muzzle, PelletTrace, ShotReport, Shotgun,
    ShotgunConfig, SurfaceImpact, TargetHits,
};
pub use systems::{tick_shotguns, ShotEffects, ShotFired};

pub struct ShootingPlugin<B: PhysicsBackend>(PhantomData<B>);

impl<B: PhysicsBackend> Default for ShootingPlugin<B> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<B: PhysicsBackend> Plugin for ShootingPlugin<B> {
    fn build(&self, app: &mut App) {
        app.register_type::<Shotgun>()
            .register_type::<Hitbox>()
            .register_type::<HitboxOf>()
            .register_type::<HitboxMount>()
            .add_event::<ShotFired>()
            .add_systems(FixedUpdate, follow_hitbox_mounts.in_set(SyncSet::Mounts))
            .add_systems(FixedUpdate, tick_shotguns::<B>.in_set(SimulationSet::Weapons));
    }
}
