//! Grapple ECS glue (SimulationSet::Grapple)
//!
//! Пока сессия Latched, velocity puller'а пишет только grapple
//! (locomotion locked через `set_controls_locked`).

use bevy::ecs::system::{StaticSystemParam, SystemParam};
use bevy::prelude::*;

use super::events::{GrappleFired, GrappleLatched, GrappleReleased};
use super::session::{
    airborne_pull, anchor_to_local, anchor_to_world, grounded_pull, pop_velocity, Grapple,
    GrappleExit, GrapplePhase, GroundedPull, HookStep, LatchedTick, PullMode,
};
use crate::combat::Damageable;
use crate::components::{Abilities, Body, CharacterMotor, ColliderShape};
use crate::feedback::FeedbackSink;
use crate::grounding::GroundedSignal;
use crate::input::PlayerInput;
use crate::logger::log;
use crate::movement::LocomotionState;
use crate::physics::{PhysicsBackend, PhysicsSettings, ShapeFilter};
use crate::shooting::HitboxOf;

#[derive(SystemParam)]
pub struct GrappleEvents<'w> {
    fired: EventWriter<'w, GrappleFired>,
    latched: EventWriter<'w, GrappleLatched>,
    released: EventWriter<'w, GrappleReleased>,
    feedback: FeedbackSink<'w>,
}

/// Puller-side state needed to end a session
struct Puller<'a> {
    entity: Entity,
    grapple: &'a mut Grapple,
    locomotion: &'a mut LocomotionState,
    motor: Option<&'a mut CharacterMotor>,
}

impl Puller<'_> {
    /// Любой exit: restore step_offset, unlock locomotion, cooldown, rope cleared
    fn end(&mut self, exit: GrappleExit, events: &mut GrappleEvents) {
        let Some(exit) = self.grapple.release(exit) else {
            return;
        };

        match self.motor.as_deref_mut() {
            Some(motor) => self.grapple.restore_step_offset(&mut motor.step_offset),
            None => self.grapple.saved_step_offset = None,
        }
        self.locomotion.set_controls_locked(false);

        log(&format!("🪝 {:?} grapple released: {:?}", self.entity, exit));
        events.released.write(GrappleReleased {
            entity: self.entity,
            exit,
        });
        events.feedback.rope_cleared(self.entity);
    }
}

/// Живая damageable цель для задетого коллайдера (hitbox → owner)
fn resolve_target(
    hit: Entity,
    hitboxes: &Query<&HitboxOf>,
    targets: &Query<(&mut Transform, Option<&mut Body>, &Damageable), Without<Grapple>>,
) -> Option<Entity> {
    let owner = hitboxes.get(hit).map(|hitbox| hitbox.0).unwrap_or(hit);
    let (_, _, damageable) = targets.get(owner).ok()?;
    damageable.is_alive().then_some(owner)
}

/// System: fire / hook flight / latched pull
#[allow(clippy::too_many_arguments)]
pub fn tick_grapples<B: PhysicsBackend>(
    physics: StaticSystemParam<B::Param>,
    time: Res<Time<Fixed>>,
    settings: Res<PhysicsSettings>,
    mut events: GrappleEvents,
    mut pullers: Query<(
        Entity,
        &mut Grapple,
        &mut LocomotionState,
        &mut Transform,
        &mut Body,
        &ColliderShape,
        Option<&mut CharacterMotor>,
        Option<&PlayerInput>,
        Option<&GroundedSignal>,
        Option<&Abilities>,
    )>,
    mut targets: Query<(&mut Transform, Option<&mut Body>, &Damageable), Without<Grapple>>,
    hitboxes: Query<&HitboxOf>,
) {
    let dt = time.delta_secs();
    if dt <= 0.0 {
        return;
    }
    let now = time.elapsed_secs();

    B::with_queries(&physics, |queries| {
        for (
            entity,
            mut grapple,
            mut locomotion,
            mut transform,
            mut body,
            shape,
            mut motor,
            input,
            signal,
            abilities,
        ) in pullers.iter_mut()
        {
            grapple.tick_cooldown(dt);

            let button = input.map(|input| input.frame.grapple).unwrap_or_default();
            let grounded = signal.is_some_and(|signal| signal.is_effectively_grounded(now));
            let config = grapple.config;

            let mut puller = Puller {
                entity,
                grapple: &mut *grapple,
                locomotion: &mut *locomotion,
                motor: motor.as_deref_mut(),
            };

            match puller.grapple.phase {
                GrapplePhase::Idle => {
                    let unlocked = abilities.copied().unwrap_or_default().grapple;
                    if !button.pressed || !unlocked || puller.locomotion.is_respawning() {
                        continue;
                    }

                    let origin = transform.translation + Vec3::Y * config.launch_height;
                    let direction = puller.locomotion.look.view_rotation() * Vec3::NEG_Z;
                    if puller.grapple.fire(origin, direction) {
                        events.fired.write(GrappleFired {
                            entity,
                            origin,
                            direction,
                        });
                    }
                }

                GrapplePhase::Traveling { .. } => {
                    if !button.held {
                        puller.end(GrappleExit::Cancelled, &mut events);
                        continue;
                    }

                    let step = puller.grapple.advance_hook(queries, entity, dt, |hit| {
                        resolve_target(hit, &hitboxes, &targets)
                    });

                    match step {
                        HookStep::Hit { target, point } => {
                            let Ok((target_transform, target_body, _)) = targets.get_mut(target)
                            else {
                                puller.end(GrappleExit::TargetLost, &mut events);
                                continue;
                            };

                            let local_anchor = anchor_to_local(&target_transform, point);
                            puller.grapple.latch(target, local_anchor, grounded);
                            puller.locomotion.set_controls_locked(true);
                            if let Some(motor) = puller.motor.as_deref_mut() {
                                puller.grapple.save_step_offset(&mut motor.step_offset);
                            }

                            // Pop: цель в воздух, чтобы скользила без tunneling
                            if grounded {
                                if let Some(mut target_body) = target_body {
                                    if target_body.is_dynamic() {
                                        let pop = pop_velocity(settings.gravity, config.lift_height);
                                        target_body.velocity.y = target_body.velocity.y.max(pop);
                                    }
                                }
                            }

                            log(&format!(
                                "🪝 {:?} latched {:?} (grounded: {})",
                                entity, target, grounded
                            ));
                            events.latched.write(GrappleLatched {
                                entity,
                                target,
                                anchor: point,
                                began_grounded: grounded,
                            });
                            events.feedback.rope_attached(entity, target, point);
                        }
                        HookStep::Whiff { .. } => {
                            puller.end(GrappleExit::Whiff, &mut events);
                        }
                        HookStep::Advanced { .. } | HookStep::NotTraveling => {}
                    }
                }

                GrapplePhase::Latched { .. } => {
                    if !button.held {
                        // Отпустили во время grounded pull: цель падает сама, без горизонтали
                        if puller.grapple.active_mode() == Some(PullMode::PullTarget) {
                            if let Some(target) = puller.grapple.target() {
                                if let Ok((_, Some(mut target_body), _)) = targets.get_mut(target) {
                                    target_body.set_horizontal_velocity(Vec3::ZERO);
                                }
                            }
                        }
                        puller.end(GrappleExit::Cancelled, &mut events);
                        continue;
                    }

                    let (target, local_anchor, mode) = match puller.grapple.tick_latched(dt, grounded) {
                        LatchedTick::Pull {
                            target,
                            local_anchor,
                            mode,
                        } => (target, local_anchor, mode),
                        LatchedTick::TimedOut => {
                            puller.end(GrappleExit::TimedOut, &mut events);
                            continue;
                        }
                        LatchedTick::NotLatched => continue,
                    };

                    let Ok((mut target_transform, target_body, damageable)) = targets.get_mut(target)
                    else {
                        puller.end(GrappleExit::TargetLost, &mut events);
                        continue;
                    };
                    if damageable.is_dead() {
                        puller.end(GrappleExit::TargetLost, &mut events);
                        continue;
                    }

                    match mode {
                        PullMode::PullPuller => {
                            let anchor = anchor_to_world(&target_transform, local_anchor);
                            let pull = airborne_pull(&config, transform.translation, anchor, body.velocity, dt);
                            if pull.finished {
                                body.velocity = Vec3::ZERO;
                                puller.end(GrappleExit::Finished, &mut events);
                                continue;
                            }

                            body.velocity = pull.velocity;
                            let Some(probe) = shape.probe_shape() else {
                                transform.translation += pull.velocity * dt;
                                continue;
                            };
                            let motor = puller.motor.as_deref().copied().unwrap_or_default();
                            let filter = ShapeFilter::mask(settings.solid_mask).excluding(entity);
                            let slide = queries.move_and_slide(
                                probe,
                                transform.translation,
                                pull.velocity * dt,
                                motor.step_offset,
                                motor.skin_width,
                                &filter,
                            );
                            transform.translation = slide.position;
                            if (slide.hit_floor && body.velocity.y < 0.0)
                                || (slide.hit_ceiling && body.velocity.y > 0.0)
                            {
                                body.velocity.y = 0.0;
                            }
                        }
                        PullMode::PullTarget => {
                            body.velocity = Vec3::ZERO;

                            match grounded_pull(&config, transform.translation, target_transform.translation, dt) {
                                GroundedPull::Moving { velocity } => match target_body {
                                    Some(mut target_body) if target_body.is_dynamic() => {
                                        target_body.set_horizontal_velocity(velocity);
                                    }
                                    _ => target_transform.translation += velocity * dt,
                                },
                                GroundedPull::Arrived { rest } => {
                                    target_transform.translation = rest;
                                    if let Some(mut target_body) = target_body {
                                        target_body.stop();
                                    }
                                    puller.end(GrappleExit::Finished, &mut events);
                                }
                            }
                        }
                    }
                }
            }
        }
    });
}
