//! Locomotion ECS glue

use bevy::ecs::system::{StaticSystemParam, SystemParam};
use bevy::prelude::*;

use super::events::{Dashed, Jumped, Landed, RespawnStarted, Respawned};
use super::locomotion::{LocomotionConfig, LocomotionInput, LocomotionState, StepOutcome, TickContext};
use super::respawn::RespawnAnchor;
use crate::components::{Abilities, Body, CharacterMotor, ColliderShape, CollisionLayers};
use crate::grounding::GroundedSignal;
use crate::input::PlayerInput;
use crate::logger::log;
use crate::physics::PhysicsBackend;

#[derive(SystemParam)]
pub struct LocomotionEvents<'w> {
    jumped: EventWriter<'w, Jumped>,
    dashed: EventWriter<'w, Dashed>,
    landed: EventWriter<'w, Landed>,
    respawn_started: EventWriter<'w, RespawnStarted>,
    respawned: EventWriter<'w, Respawned>,
}

impl LocomotionEvents<'_> {
    fn publish(&mut self, entity: Entity, outcome: &StepOutcome, config: &LocomotionConfig, position: Vec3) {
        if let Some(kind) = outcome.jump {
            self.jumped.write(Jumped {
                entity,
                kind,
                velocity: config.jump_velocity(),
            });
        }
        if let Some(direction) = outcome.dash {
            self.dashed.write(Dashed { entity, direction });
        }
        if outcome.landed {
            self.landed.write(Landed { entity, position });
        }
        if let Some(position) = outcome.respawn_started {
            log(&format!("💀 {:?} fell below kill plane at {:?}, respawning", entity, position));
            self.respawn_started.write(RespawnStarted { entity, position });
        }
        if let Some(position) = outcome.respawned {
            log(&format!("🔄 {:?} respawned at {:?}", entity, position));
            self.respawned.write(Respawned { entity, position });
        }
    }
}

/// System: тик LocomotionState всех персонажей (SimulationSet::Movement)
///
/// Пока controls locked - velocity тела не трогаем (ей владеет grapple).
pub fn drive_locomotion<B: PhysicsBackend>(
    physics: StaticSystemParam<B::Param>,
    time: Res<Time<Fixed>>,
    mut events: LocomotionEvents,
    mut characters: Query<(
        Entity,
        &mut LocomotionState,
        &LocomotionConfig,
        Option<&PlayerInput>,
        &mut Transform,
        &ColliderShape,
        Option<&CharacterMotor>,
        Option<&Abilities>,
        Option<&RespawnAnchor>,
        &mut CollisionLayers,
        &mut Body,
        Option<&mut GroundedSignal>,
    )>,
) {
    let dt = time.delta_secs();
    if dt <= 0.0 {
        return;
    }

    B::with_queries(&physics, |queries| {
        for (
            entity,
            mut state,
            config,
            input,
            mut transform,
            shape,
            motor,
            abilities,
            anchor,
            mut collision,
            mut body,
            signal,
        ) in characters.iter_mut()
        {
            let Some(probe_shape) = shape.probe_shape() else {
                state.missing_collider.warn(|| {
                    format!("⚠️ Locomotion {:?}: collider cannot be swept, controller disabled", entity)
                });
                continue;
            };

            let input = input
                .map(|input| LocomotionInput::from(&input.frame))
                .unwrap_or_default();
            let ctx = TickContext {
                queries,
                entity,
                shape: probe_shape,
                bottom_offset: shape.bottom_offset(),
                motor: motor.copied().unwrap_or_default(),
                abilities: abilities.copied().unwrap_or_default(),
                respawn_anchor: anchor.map(|anchor| anchor.0),
                dt,
            };

            let outcome = state.tick(config, &ctx, &input, &mut transform, &mut collision);

            if outcome.respawned.is_some() || outcome.respawn_started.is_some() {
                body.stop();
                if let Some(mut signal) = signal {
                    signal.clear();
                }
            } else if !state.controls_locked {
                body.velocity = state.velocity();
            }

            events.publish(entity, &outcome, config, transform.translation);
        }
    });
}
