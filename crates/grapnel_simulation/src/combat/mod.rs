//! Combat module: health/shield sink + knockback
//!
//! ECS ответственность:
//! - Damageable: shield → health, смерть, reset, shield regen
//! - KnockbackResolver: impulse → velocity (только airborne), sticky brake
//! - Events: HealthChanged, ShieldChanged, Damaged, Died (+ requests)
//!
//! Оружие и grapple только пишут requests и читают `is_dead`.

use bevy::prelude::*;

pub mod damageable;
pub mod events;
pub mod knockback;
pub mod systems;

// Re-export основных типов
pub use damageable::{DamageReport, Damageable};
pub use events::{
    DamageRequest, Damaged, Died, HealRequest, HealthChanged, KnockbackImpulse, ResetRequest,
    ShieldChanged,
};
pub use knockback::{BrakePhase, ImpulseOutcome, KnockbackConfig, KnockbackResolver};
pub use systems::{
    apply_knockback_impulses, handle_damage_requests, handle_heal_requests, handle_reset_requests,
    regenerate_shields, settle_knockback, DamageNotifier, Dead,
};

use crate::SimulationSet;

/// Combat Plugin
///
/// Порядок выполнения (FixedUpdate):
/// 1. settle_knockback (Movement) - landing / sticky brake
/// 2. requests (Combat) - damage → heal → reset → knockback impulses
/// 3. regenerate_shields (Combat)
pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<Damageable>()
            .register_type::<KnockbackResolver>()
            .register_type::<Dead>()
            .add_event::<HealthChanged>()
            .add_event::<ShieldChanged>()
            .add_event::<Damaged>()
            .add_event::<Died>()
            .add_event::<DamageRequest>()
            .add_event::<HealRequest>()
            .add_event::<ResetRequest>()
            .add_event::<KnockbackImpulse>();

        app.add_systems(
            FixedUpdate,
            settle_knockback.in_set(SimulationSet::Movement),
        )
        .add_systems(
            FixedUpdate,
            (
                handle_damage_requests,
                handle_heal_requests,
                handle_reset_requests,
                apply_knockback_impulses,
                regenerate_shields,
            )
                .chain()
                .in_set(SimulationSet::Combat),
        );
    }
}
