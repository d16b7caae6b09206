//! Shotgun ECS glue (SimulationSet::Weapons)

use bevy::ecs::system::{StaticSystemParam, SystemParam};
use bevy::prelude::*;

use super::hitbox::{Hitbox, HitboxOf};
use super::pellets::{apply_batched, fire_pellets, HitReceiver, HitTarget, Muzzle, Shotgun, ShotReport};
use crate::combat::{DamageRequest, Damageable, KnockbackImpulse};
use crate::feedback::{FeedbackEvent, FeedbackSink};
use crate::input::PlayerInput;
use crate::movement::LocomotionState;
use crate::physics::PhysicsBackend;
use crate::DeterministicRng;

/// Событие: выстрел произведён
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct ShotFired {
    pub shooter: Entity,
    pub origin: Vec3,
    pub direction: Vec3,
    pub targets_hit: usize,
}

/// Batched результаты выстрела → combat requests + feedback
#[derive(SystemParam)]
pub struct ShotEffects<'w> {
    damage: EventWriter<'w, DamageRequest>,
    knockback: EventWriter<'w, KnockbackImpulse>,
    fired: EventWriter<'w, ShotFired>,
    feedback: FeedbackSink<'w>,
}

impl HitReceiver for ShotEffects<'_> {
    fn apply_damage(&mut self, target: Entity, amount: f32, source: Option<Entity>) {
        self.damage.write(DamageRequest {
            target,
            amount,
            source,
        });
    }

    fn apply_knockback(&mut self, target: Entity, impulse: Vec3, source: Option<Entity>) {
        self.knockback.write(KnockbackImpulse {
            target,
            impulse,
            source,
        });
    }

    fn damage_number(&mut self, target: Entity, position: Vec3, amount: f32, crit: bool) {
        self.feedback.damage_number(target, position, amount, crit);
    }
}

impl ShotEffects<'_> {
    /// Tracers на каждый пеллет, decals на не-damageable поверхности
    fn visuals(&mut self, report: &ShotReport) {
        for pellet in &report.pellets {
            self.feedback.tracer(pellet.from, pellet.to);
        }
        for impact in &report.surfaces {
            self.feedback.emit(FeedbackEvent::Impact {
                position: impact.point,
                normal: impact.normal,
            });
            self.feedback.emit(FeedbackEvent::Decal {
                surface: impact.surface,
                position: impact.point,
                normal: impact.normal,
            });
        }
    }
}

/// Коллайдер → живая damageable цель (hitbox region → owner)
///
/// Мёртвая цель - просто поверхность: ни урона, ни damage number.
fn resolve_hit(
    collider: Entity,
    regions: &Query<(Option<&HitboxOf>, Option<&Hitbox>)>,
    damageables: &Query<&Damageable>,
) -> Option<HitTarget> {
    let (owner, hitbox) = match regions.get(collider) {
        Ok((Some(of), hitbox)) => (of.0, hitbox),
        Ok((None, hitbox)) => (collider, hitbox),
        Err(_) => (collider, None),
    };

    let alive = damageables.get(owner).is_ok_and(Damageable::is_alive);
    alive.then(|| HitTarget {
        target: owner,
        multiplier: hitbox.map_or(1.0, |hitbox| hitbox.multiplier),
        always_crit: hitbox.is_some_and(|hitbox| hitbox.always_crit),
    })
}

/// System: cooldown → fire → aggregation → batched apply
pub fn tick_shotguns<B: PhysicsBackend>(
    physics: StaticSystemParam<B::Param>,
    time: Res<Time<Fixed>>,
    mut rng: ResMut<DeterministicRng>,
    mut effects: ShotEffects,
    mut shooters: Query<(
        Entity,
        &mut Shotgun,
        &Transform,
        Option<&LocomotionState>,
        Option<&PlayerInput>,
    )>,
    regions: Query<(Option<&HitboxOf>, Option<&Hitbox>)>,
    damageables: Query<&Damageable>,
) {
    let dt = time.delta_secs();
    if dt <= 0.0 {
        return;
    }

    B::with_queries(&physics, |queries| {
        for (entity, mut shotgun, transform, locomotion, input) in shooters.iter_mut() {
            shotgun.tick_cooldown(dt);

            let trigger = input.is_some_and(|input| input.frame.fire.held);
            let respawning = locomotion.is_some_and(|locomotion| locomotion.is_respawning());
            if !trigger || respawning || !shotgun.can_fire() {
                continue;
            }

            let rotation = locomotion.map_or(transform.rotation, |locomotion| locomotion.look.view_rotation());
            let muzzle = Muzzle {
                shooter: entity,
                origin: transform.translation + Vec3::Y * shotgun.config.eye_height,
                rotation,
            };

            let report = fire_pellets(&shotgun.config, queries, muzzle, &mut rng.rng, |collider| {
                resolve_hit(collider, &regions, &damageables)
            });
            shotgun.start_cooldown();

            apply_batched(&report, &mut effects);
            effects.visuals(&report);
            effects.fired.write(ShotFired {
                shooter: entity,
                origin: muzzle.origin,
                direction: rotation * Vec3::NEG_Z,
                targets_hit: report.targets.len(),
            });
        }
    });
}
