//! Velocity integration для тел без locomotion controller (враги, пропсы)
//!
//! Rapier/scene - только для коллизий, velocity интегрируем сами:
//! gravity → collide-and-slide → гасим вертикаль на полу/потолке → angular.

use bevy::ecs::system::StaticSystemParam;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::backend::PhysicsBackend;
use super::queries::ShapeFilter;
use crate::components::{layers, Body, CharacterMotor, ColliderShape};
use crate::movement::LocomotionState;

/// World settings for bodies without a locomotion controller
#[derive(Resource, Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Reflect)]
#[serde(default)]
pub struct PhysicsSettings {
    pub gravity: f32,
    pub terminal_fall_speed: f32,
    /// Что блокирует движение тел
    pub solid_mask: u32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: -20.0,
            terminal_fall_speed: 40.0,
            solid_mask: layers::CHARACTER_SOLID,
        }
    }
}

/// System: интеграция dynamic тел (FixedUpdate, SimulationSet::Integrate)
pub fn integrate_bodies<B: PhysicsBackend>(
    physics: StaticSystemParam<B::Param>,
    settings: Res<PhysicsSettings>,
    time: Res<Time<Fixed>>,
    mut bodies: Query<
        (
            Entity,
            &mut Body,
            &mut Transform,
            &ColliderShape,
            Option<&CharacterMotor>,
        ),
        Without<LocomotionState>,
    >,
) {
    let delta = time.delta_secs();
    if delta <= 0.0 {
        return;
    }

    B::with_queries(&physics, |queries| {
        for (entity, mut body, mut transform, shape, motor) in bodies.iter_mut() {
            if body.kinematic {
                continue;
            }

            body.velocity.y = (body.velocity.y + settings.gravity * delta)
                .max(-settings.terminal_fall_speed);

            let motion = body.velocity * delta;
            if let Some(probe) = shape.probe_shape() {
                let motor = motor.copied().unwrap_or_default();
                let filter = ShapeFilter::mask(settings.solid_mask).excluding(entity);
                let outcome = queries.move_and_slide(
                    probe,
                    transform.translation,
                    motion,
                    motor.step_offset,
                    motor.skin_width,
                    &filter,
                );
                transform.translation = outcome.position;

                if (outcome.hit_floor && body.velocity.y < 0.0)
                    || (outcome.hit_ceiling && body.velocity.y > 0.0)
                {
                    body.velocity.y = 0.0;
                }
            } else {
                transform.translation += motion;
            }

            let spin = body.angular_velocity * delta;
            if spin.length_squared() > 0.0 {
                transform.rotation = (Quat::from_scaled_axis(spin) * transform.rotation).normalize();
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::CollisionLayers;
    use crate::physics::SceneBackend;
    use crate::{create_headless_app, SimulationPlugin};

    #[test]
    fn test_dynamic_body_falls_and_rests_on_ground() {
        let mut app = create_headless_app(42);
        app.add_plugins(SimulationPlugin::<SceneBackend>::default());

        app.world_mut().spawn((
            Transform::default(),
            ColliderShape::HalfSpace,
            CollisionLayers::ground(),
        ));
        let crate_box = app
            .world_mut()
            .spawn((
                Transform::from_xyz(0.0, 3.0, 0.0),
                Body::dynamic(10.0),
                ColliderShape::Sphere { radius: 0.5 },
                CollisionLayers::new(layers::PROP),
            ))
            .id();

        for _ in 0..200 {
            app.update();
        }

        let transform = app.world().get::<Transform>(crate_box).unwrap();
        let body = app.world().get::<Body>(crate_box).unwrap();
        assert!(
            transform.translation.y >= 0.5 - 1e-3 && transform.translation.y < 0.6,
            "body should rest on ground, y = {}",
            transform.translation.y
        );
        assert!(body.velocity.y.abs() < 1.0, "residual vertical speed {}", body.velocity.y);
    }

    #[test]
    fn test_kinematic_body_not_integrated() {
        let mut app = create_headless_app(42);
        app.add_plugins(SimulationPlugin::<SceneBackend>::default());

        let entity = app
            .world_mut()
            .spawn((
                Transform::from_xyz(0.0, 3.0, 0.0),
                Body {
                    velocity: Vec3::X,
                    ..Body::kinematic()
                },
                ColliderShape::Sphere { radius: 0.5 },
            ))
            .id();

        for _ in 0..10 {
            app.update();
        }

        let transform = app.world().get::<Transform>(entity).unwrap();
        assert_eq!(transform.translation, Vec3::new(0.0, 3.0, 0.0));
    }
}
