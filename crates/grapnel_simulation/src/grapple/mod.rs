//! Grapple domain - hook с двумя режимами pull
//!
//! Содержит:
//! - GrappleConfig / Grapple / GrapplePhase (state machine, session.rs)
//! - airborne pull (puller → anchor) и grounded pull (target → puller)
//! - events (GrappleFired, GrappleLatched, GrappleReleased)
//! - tick_grapples<B> (ECS glue)
//!
//! Цель хранится как `Entity` + liveness check по `Damageable`.

pub mod events;
pub mod session;
pub mod systems;


use std::marker::PhantomData;

use bevy::prelude::*;

use crate::physics::PhysicsBackend;
use crate::SimulationSet;

pub use events::{GrappleFired, GrappleLatched, GrappleReleased};
pub use session::{
    airborne_pull, grounded_pull, pop_velocity, AirbornePull, Grapple, GrappleConfig, GrappleExit,
    GrapplePhase, GroundedPull, HookStep, LatchedTick, PullMode,
};
pub use systems::tick_grapples;

pub struct GrapplePlugin<B: PhysicsBackend>(PhantomData<B>);

impl<B: PhysicsBackend> Default for GrapplePlugin<B> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<B: PhysicsBackend> Plugin for GrapplePlugin<B> {
    fn build(&self, app: &mut App) {
        app.register_type::<Grapple>()
            .add_event::<GrappleFired>()
            .add_event::<GrappleLatched>()
            .add_event::<GrappleReleased>()
            .add_systems(FixedUpdate, tick_grapples::<B>.in_set(SimulationSet::Grapple));
    }
}
