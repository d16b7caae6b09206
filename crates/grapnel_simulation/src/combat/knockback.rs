//! Knockback resolver
//!
//! Импульс → Δv = impulse / mass, только для airborne dynamic тел.
//! После приземления с pending hit - sticky brake: линейное торможение
//! горизонтали до нуля (или пока тело снова не оторвётся от земли).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::Body;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Reflect)]
#[serde(default)]
pub struct KnockbackConfig {
    /// Grounded тела полностью игнорируют импульсы
    pub reject_grounded_impulses: bool,
    pub air_speed_cap: f32,
    /// Горизонталь ниже этого при приземлении обнуляется
    pub landing_snap_speed: f32,
    pub brake_duration: f32,
    /// m/s²
    pub brake_deceleration: f32,
}

impl Default for KnockbackConfig {
    fn default() -> Self {
        Self {
            reject_grounded_impulses: true,
            air_speed_cap: 12.0,
            landing_snap_speed: 0.5,
            brake_duration: 0.35,
            brake_deceleration: 30.0,
        }
    }
}

impl KnockbackConfig {
    pub fn normalized(mut self) -> Self {
        self.air_speed_cap = self.air_speed_cap.abs();
        self.landing_snap_speed = self.landing_snap_speed.abs();
        self.brake_duration = self.brake_duration.max(0.0);
        self.brake_deceleration = self.brake_deceleration.abs();
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub enum BrakePhase {
    #[default]
    Idle,
    Braking { remaining: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImpulseOutcome {
    IgnoredKinematic,
    RejectedGrounded,
    Applied { delta_velocity: Vec3 },
}

#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct KnockbackResolver {
    pub config: KnockbackConfig,
    pub airborne_hit_pending: bool,
    pub brake: BrakePhase,
}

impl KnockbackResolver {
    pub fn new(config: KnockbackConfig) -> Self {
        Self {
            config: config.normalized(),
            ..default()
        }
    }

    pub fn apply_impulse(&mut self, body: &mut Body, grounded: bool, impulse: Vec3) -> ImpulseOutcome {
        if body.kinematic {
            return ImpulseOutcome::IgnoredKinematic;
        }
        if grounded && self.config.reject_grounded_impulses {
            return ImpulseOutcome::RejectedGrounded;
        }

        let delta_velocity = impulse / body.effective_mass();
        body.velocity += delta_velocity;

        let horizontal = body.horizontal_velocity();
        body.set_horizontal_velocity(horizontal.clamp_length_max(self.config.air_speed_cap));

        self.airborne_hit_pending = true;
        self.brake = BrakePhase::Idle;

        ImpulseOutcome::Applied { delta_velocity }
    }

    /// Per-tick landing / brake update.
    pub fn settle(&mut self, body: &mut Body, grounded: bool, dt: f32) {
        if body.kinematic {
            return;
        }

        if !grounded {
            // Снова в воздухе - тормоз сразу отменяется
            self.brake = BrakePhase::Idle;
            return;
        }

        if self.airborne_hit_pending {
            self.airborne_hit_pending = false;
            if body.horizontal_velocity().length() < self.config.landing_snap_speed {
                body.set_horizontal_velocity(Vec3::ZERO);
            }
            self.brake = BrakePhase::Braking {
                remaining: self.config.brake_duration,
            };
        }

        if let BrakePhase::Braking { remaining } = self.brake {
            let horizontal = body.horizontal_velocity();
            let speed = horizontal.length();
            let slowed = (speed - self.config.brake_deceleration * dt).max(0.0);
            let scaled = horizontal.normalize_or_zero() * slowed;
            body.set_horizontal_velocity(scaled);

            let remaining = remaining - dt;
            self.brake = if remaining <= 0.0 || slowed <= 0.0 {
                BrakePhase::Idle
            } else {
                BrakePhase::Braking { remaining }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 64.0;

    #[test]
    fn test_grounded_impulse_rejected() {
        let mut resolver = KnockbackResolver::default();
        let mut body = Body {
            velocity: Vec3::new(1.0, 0.0, 2.0),
            ..Body::dynamic(10.0)
        };

        for impulse in [Vec3::X * 100.0, Vec3::new(-5.0, 50.0, 3.0), Vec3::ZERO] {
            let outcome = resolver.apply_impulse(&mut body, true, impulse);
            assert_eq!(outcome, ImpulseOutcome::RejectedGrounded);
            assert_eq!(body.velocity, Vec3::new(1.0, 0.0, 2.0));
        }
        assert!(!resolver.airborne_hit_pending);
    }

    #[test]
    fn test_kinematic_ignores_impulse() {
        let mut resolver = KnockbackResolver::default();
        let mut body = Body::kinematic();

        let outcome = resolver.apply_impulse(&mut body, false, Vec3::X * 100.0);
        assert_eq!(outcome, ImpulseOutcome::IgnoredKinematic);
        assert_eq!(body.velocity, Vec3::ZERO);
    }

    #[test]
    fn test_airborne_impulse_capped() {
        let mut resolver = KnockbackResolver::default();
        let cap = resolver.config.air_speed_cap;

        for impulse in [
            Vec3::X * 10_000.0,
            Vec3::new(300.0, 20.0, -400.0),
            Vec3::new(0.0, 0.0, 5.0),
        ] {
            let mut body = Body::dynamic(10.0);
            resolver.apply_impulse(&mut body, false, impulse);
            assert!(
                body.horizontal_velocity().length() <= cap + 1e-4,
                "horizontal speed {} above cap",
                body.horizontal_velocity().length()
            );
        }

        // Вертикаль не ограничивается capом
        let mut body = Body::dynamic(1.0);
        resolver.apply_impulse(&mut body, false, Vec3::Y * 50.0);
        assert_eq!(body.velocity.y, 50.0);
        assert!(resolver.airborne_hit_pending);
    }

    #[test]
    fn test_zero_mass_does_not_produce_nan() {
        let mut resolver = KnockbackResolver::default();
        let mut body = Body {
            mass: 0.0,
            ..default()
        };

        resolver.apply_impulse(&mut body, false, Vec3::X);
        assert!(body.velocity.is_finite());
    }

    #[test]
    fn test_landing_snaps_small_drift() {
        let mut resolver = KnockbackResolver::default();
        let mut body = Body::dynamic(10.0);
        resolver.apply_impulse(&mut body, false, Vec3::X * 3.0);
        assert!((body.velocity.x - 0.3).abs() < 1e-6);

        resolver.settle(&mut body, true, DT);
        assert_eq!(body.horizontal_velocity(), Vec3::ZERO);
        assert!(!resolver.airborne_hit_pending);
    }

    #[test]
    fn test_sticky_brake_decelerates_then_expires() {
        let mut resolver = KnockbackResolver::default();
        let mut body = Body::dynamic(1.0);
        resolver.apply_impulse(&mut body, false, Vec3::X * 8.0);

        // В воздухе тормоза нет
        resolver.settle(&mut body, false, DT);
        assert_eq!(body.velocity.x, 8.0);

        resolver.settle(&mut body, true, DT);
        assert!(matches!(resolver.brake, BrakePhase::Braking { .. }));
        let expected = 8.0 - 30.0 * DT;
        assert!((body.velocity.x - expected).abs() < 1e-4);

        // 0.35 s × 30 m/s² = 10.5 m/s > 8 → полностью гасит
        for _ in 0..30 {
            resolver.settle(&mut body, true, DT);
        }
        assert_eq!(body.velocity.x, 0.0);
        assert_eq!(resolver.brake, BrakePhase::Idle);
    }

    #[test]
    fn test_leaving_ground_cancels_brake() {
        let mut resolver = KnockbackResolver::default();
        let mut body = Body::dynamic(1.0);
        resolver.apply_impulse(&mut body, false, Vec3::X * 8.0);
        resolver.settle(&mut body, true, DT);
        let speed = body.velocity.x;

        resolver.settle(&mut body, false, DT);
        assert_eq!(resolver.brake, BrakePhase::Idle);
        assert_eq!(body.velocity.x, speed, "airborne: no more braking");
    }
}
