//! Movement domain - locomotion controller игрока
//!
//! Содержит:
//! - LocomotionConfig / LocomotionState (state machine, один тик = `tick`)
//! - RespawnPhase / RespawnAnchor (kill plane → teleport)
//! - events (Jumped, Dashed, Landed, RespawnStarted, Respawned)
//! - drive_locomotion<B> (ECS glue)

pub mod events;
pub mod locomotion;
pub mod respawn;
pub mod systems;

#[cfg(test)]
mod locomotion_tests;

use std::marker::PhantomData;

use bevy::prelude::*;

use crate::physics::PhysicsBackend;
use crate::SimulationSet;

pub use events::*;
pub use locomotion::{
    JumpKind, LocomotionConfig, LocomotionInput, LocomotionState, LookState, StepOutcome, TickContext,
};
pub use respawn::{RespawnAnchor, RespawnPhase, RESPAWN_SUSPEND_TICKS};
pub use systems::drive_locomotion;

pub struct MovementPlugin<B: PhysicsBackend>(PhantomData<B>);

impl<B: PhysicsBackend> Default for MovementPlugin<B> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<B: PhysicsBackend> Plugin for MovementPlugin<B> {
    fn build(&self, app: &mut App) {
        app.register_type::<LocomotionState>()
            .register_type::<LocomotionConfig>()
            .register_type::<RespawnAnchor>()
            .add_event::<Jumped>()
            .add_event::<Dashed>()
            .add_event::<Landed>()
            .add_event::<RespawnStarted>()
            .add_event::<Respawned>()
            .add_systems(
                FixedUpdate,
                drive_locomotion::<B>.in_set(SimulationSet::Movement),
            );
    }
}
