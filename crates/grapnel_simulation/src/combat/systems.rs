//! Combat systems: damage/heal/reset requests, shield regen, knockback

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use super::damageable::{DamageReport, Damageable};
use super::events::{
    DamageRequest, Damaged, Died, HealRequest, HealthChanged, KnockbackImpulse, ResetRequest,
    ShieldChanged,
};
use super::knockback::KnockbackResolver;
use crate::components::Body;
use crate::grounding::GroundedSignal;
use crate::logger::{log, log_warning};

/// Компонент-маркер: entity мертв (health = 0)
///
/// Вешается на смерти, снимается на `ResetRequest`.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct Dead;

/// Единственный publisher damage notifications
#[derive(SystemParam)]
pub struct DamageNotifier<'w, 's> {
    commands: Commands<'w, 's>,
    health_changed: EventWriter<'w, HealthChanged>,
    shield_changed: EventWriter<'w, ShieldChanged>,
    damaged: EventWriter<'w, Damaged>,
    died: EventWriter<'w, Died>,
}

impl DamageNotifier<'_, '_> {
    pub fn damaged(
        &mut self,
        entity: Entity,
        state: &Damageable,
        report: &DamageReport,
        source: Option<Entity>,
    ) {
        if report.is_ignored() {
            return;
        }

        if report.shield_changed() {
            self.shield(entity, state);
        }
        if report.health_changed() {
            self.health(entity, state);
        }
        self.damaged.write(Damaged {
            entity,
            amount: report.requested,
            source,
        });

        if report.died {
            log(&format!("💀 {:?} died (killer: {:?})", entity, source));
            self.died.write(Died {
                entity,
                killer: source,
            });
            self.commands.entity(entity).try_insert(Dead);
        }
    }

    pub fn health(&mut self, entity: Entity, state: &Damageable) {
        self.health_changed.write(HealthChanged {
            entity,
            current: state.current_health,
            max: state.max_health,
        });
    }

    pub fn shield(&mut self, entity: Entity, state: &Damageable) {
        self.shield_changed.write(ShieldChanged {
            entity,
            current: state.current_shield,
            max: state.max_shield,
        });
    }

    pub fn revived(&mut self, entity: Entity, state: &Damageable) {
        self.health(entity, state);
        self.shield(entity, state);
        if state.is_alive() {
            self.commands.entity(entity).remove::<Dead>();
        }
    }
}

/// System: DamageRequest → Damageable::apply_damage → notifications
pub fn handle_damage_requests(
    mut requests: EventReader<DamageRequest>,
    mut targets: Query<&mut Damageable>,
    mut notifier: DamageNotifier,
) {
    for request in requests.read() {
        let Ok(mut damageable) = targets.get_mut(request.target) else {
            log_warning(&format!(
                "DamageRequest: target {:?} has no Damageable component",
                request.target
            ));
            continue;
        };

        let report = damageable.apply_damage(request.amount);
        notifier.damaged(request.target, &damageable, &report, request.source);
    }
}

/// System: HealRequest → heal / refill_shield
pub fn handle_heal_requests(
    mut requests: EventReader<HealRequest>,
    mut targets: Query<&mut Damageable>,
    mut notifier: DamageNotifier,
) {
    for request in requests.read() {
        let Ok(mut damageable) = targets.get_mut(request.target) else {
            continue;
        };

        if damageable.heal(request.health) > 0.0 {
            notifier.health(request.target, &damageable);
        }
        if damageable.refill_shield(request.shield) > 0.0 {
            notifier.shield(request.target, &damageable);
        }
    }
}

/// System: ResetRequest → reset_all (снимает Dead)
pub fn handle_reset_requests(
    mut requests: EventReader<ResetRequest>,
    mut targets: Query<&mut Damageable>,
    mut notifier: DamageNotifier,
) {
    for request in requests.read() {
        let Ok(mut damageable) = targets.get_mut(request.target) else {
            continue;
        };

        damageable.reset_all(request.max_health, request.max_shield);
        notifier.revived(request.target, &damageable);
    }
}

/// System: shield regen после delay без урона
pub fn regenerate_shields(
    time: Res<Time<Fixed>>,
    mut targets: Query<(Entity, &mut Damageable)>,
    mut notifier: DamageNotifier,
) {
    let delta = time.delta_secs();

    for (entity, mut damageable) in targets.iter_mut() {
        if damageable.tick_regen(delta) > 0.0 {
            notifier.shield(entity, &damageable);
        }
    }
}

/// System: KnockbackImpulse → KnockbackResolver::apply_impulse
pub fn apply_knockback_impulses(
    mut impulses: EventReader<KnockbackImpulse>,
    time: Res<Time<Fixed>>,
    mut targets: Query<(&mut KnockbackResolver, &mut Body, Option<&GroundedSignal>)>,
) {
    let now = time.elapsed_secs();

    for request in impulses.read() {
        let Ok((mut resolver, mut body, signal)) = targets.get_mut(request.target) else {
            continue;
        };

        let grounded = signal.is_some_and(|signal| signal.is_effectively_grounded(now));
        resolver.apply_impulse(&mut body, grounded, request.impulse);
    }
}

/// System: landing / sticky brake (SimulationSet::Movement)
pub fn settle_knockback(
    time: Res<Time<Fixed>>,
    mut targets: Query<(&mut KnockbackResolver, &mut Body, Option<&GroundedSignal>)>,
) {
    let now = time.elapsed_secs();
    let delta = time.delta_secs();
    if delta <= 0.0 {
        return;
    }

    for (mut resolver, mut body, signal) in targets.iter_mut() {
        let grounded = signal.is_some_and(|signal| signal.is_effectively_grounded(now));
        resolver.settle(&mut body, grounded, delta);
    }
}
