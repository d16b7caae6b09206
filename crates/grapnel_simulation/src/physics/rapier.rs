//! Rapier3D physics backend (feature `rapier`).
//!
//! Архитектура как раньше: Rapier только для коллизий и shape queries,
//! velocity интегрируем сами. Все `ColliderShape` entity получают
//! `RigidBody::KinematicPositionBased` + `Collider`, Rapier синхронизирует
//! их позиции из Transform.

use bevy::ecs::system::SystemParamItem;
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use super::backend::PhysicsBackend;
use super::queries::{safe_direction, PhysicsQueries, ProbeShape, ShapeFilter, SurfaceHit};
use super::scene::SceneCollider;
use crate::components::{ColliderShape, CollisionLayers, Trigger};
use crate::SyncSet;

/// Половина толщины «плоскости» (Rapier half-space не умеет в shape cast)
const HALF_SPACE_THICKNESS: f32 = 0.5;
const HALF_SPACE_EXTENT: f32 = 1000.0;

pub struct RapierBackend;

/// Форма и поза коллайдеров, как их видит Rapier (GlobalTransform, не Transform:
/// gameplay-системы пишут Transform в том же тике)
type ColliderPoses<'w, 's> = Query<'w, 's, (&'static GlobalTransform, &'static ColliderShape)>;

impl PhysicsBackend for RapierBackend {
    type Param = (ReadRapierContext<'static, 'static>, ColliderPoses<'static, 'static>);

    fn plugin() -> impl Plugin {
        RapierBackendPlugin
    }

    fn with_queries<R>(
        param: &SystemParamItem<'_, '_, Self::Param>,
        f: impl FnOnce(&dyn PhysicsQueries) -> R,
    ) -> Option<R> {
        let (context, colliders) = param;
        let context = context.single().ok()?;
        Some(f(&RapierQueries {
            context: &context,
            colliders,
        }))
    }
}

pub struct RapierBackendPlugin;

impl Plugin for RapierBackendPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(RapierPhysicsPlugin::<NoUserData>::default().in_fixed_schedule())
            .add_systems(
                FixedUpdate,
                (attach_rapier_colliders, sync_collision_groups)
                    .chain()
                    .in_set(SyncSet::Backend),
            );
    }
}

struct RapierQueries<'a, 'c, 'w, 's> {
    context: &'a RapierContext<'c>,
    colliders: &'a ColliderPoses<'w, 's>,
}

fn query_filter<'a>(filter: &ShapeFilter) -> QueryFilter<'a> {
    let mut query = QueryFilter::default().groups(CollisionGroups::new(
        Group::ALL,
        Group::from_bits_truncate(filter.mask),
    ));
    if !filter.include_triggers {
        query = query.exclude_sensors();
    }
    if let Some(entity) = filter.exclude {
        query = query.exclude_collider(entity).exclude_rigid_body(entity);
    }
    query
}

fn probe_collider(shape: ProbeShape) -> Collider {
    match shape {
        ProbeShape::Sphere { radius } => Collider::ball(radius),
        ProbeShape::Capsule {
            radius,
            half_height,
        } => Collider::capsule_y(half_height, radius),
    }
}

impl PhysicsQueries for RapierQueries<'_, '_, '_, '_> {
    fn ray_cast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: &ShapeFilter,
    ) -> Option<SurfaceHit> {
        let (direction, _) = safe_direction(direction)?;
        self.context
            .cast_ray_and_get_normal(origin, direction, max_distance, true, query_filter(filter))
            .map(|(entity, hit)| SurfaceHit {
                entity,
                point: hit.point,
                normal: hit.normal,
                distance: hit.time_of_impact,
                penetration: 0.0,
            })
    }

    fn shape_cast(
        &self,
        shape: ProbeShape,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: &ShapeFilter,
    ) -> Option<SurfaceHit> {
        let (direction, _) = safe_direction(direction)?;
        let collider = probe_collider(shape);
        let options = ShapeCastOptions {
            max_time_of_impact: max_distance,
            stop_at_penetration: true,
            ..default()
        };

        self.context
            .cast_shape(
                origin,
                Quat::IDENTITY,
                direction,
                &collider,
                options,
                query_filter(filter),
            )
            .map(|(entity, hit)| {
                let normal = hit.details.map(|d| d.normal1).unwrap_or(-direction);
                let point = hit
                    .details
                    .map(|d| d.witness1)
                    .unwrap_or(origin + direction * hit.time_of_impact);
                let swept = SurfaceHit {
                    entity,
                    point,
                    normal,
                    distance: hit.time_of_impact,
                    penetration: 0.0,
                };

                // Старт внутри геометрии: глубину считаем как для overlap
                if hit.time_of_impact <= 0.0 {
                    return self.penetration_against(entity, shape, origin).unwrap_or(swept);
                }
                swept
            })
    }

    fn overlap(&self, shape: ProbeShape, center: Vec3, filter: &ShapeFilter) -> Option<SurfaceHit> {
        let collider = probe_collider(shape);
        let entity = self.context.intersection_with_shape(
            center,
            Quat::IDENTITY,
            &collider,
            query_filter(filter),
        )?;
        Some(
            self.penetration_against(entity, shape, center)
                .unwrap_or(SurfaceHit {
                    entity,
                    point: center,
                    normal: Vec3::Y,
                    distance: 0.0,
                    penetration: 0.0,
                }),
        )
    }
}

impl RapierQueries<'_, '_, '_, '_> {
    /// Глубина пересечения `shape` с коллайдером `entity`.
    ///
    /// Intersection test Rapier глубину не отдаёт: считаем её по форме и
    /// позе самого коллайдера (та же геометрия, что у Rapier collider).
    fn penetration_against(
        &self,
        entity: Entity,
        shape: ProbeShape,
        center: Vec3,
    ) -> Option<SurfaceHit> {
        let (global, collider_shape) = self.colliders.get(entity).ok()?;
        let (_, rotation, translation) = global.to_scale_rotation_translation();

        let collider = SceneCollider {
            rotation,
            ..SceneCollider::new(entity, *collider_shape, translation, 0)
        };
        collider.overlap(shape, center)
    }
}

fn rapier_collider(shape: &ColliderShape) -> Collider {
    match *shape {
        ColliderShape::Sphere { radius } => Collider::ball(radius),
        ColliderShape::Capsule {
            radius,
            half_height,
        } => Collider::capsule_y(half_height, radius),
        ColliderShape::Cuboid { half_extents } => {
            Collider::cuboid(half_extents.x, half_extents.y, half_extents.z)
        }
        // Толстая плита под плоскостью: верхняя грань совпадает с translation
        ColliderShape::HalfSpace => Collider::compound(vec![(
            Vec3::NEG_Y * HALF_SPACE_THICKNESS,
            Quat::IDENTITY,
            Collider::cuboid(HALF_SPACE_EXTENT, HALF_SPACE_THICKNESS, HALF_SPACE_EXTENT),
        )]),
    }
}

fn collision_groups(layers: &CollisionLayers) -> CollisionGroups {
    let membership = if layers.enabled {
        Group::from_bits_truncate(layers.membership)
    } else {
        Group::NONE
    };
    CollisionGroups::new(membership, Group::ALL)
}

/// System: новые ColliderShape → Rapier collider
pub fn attach_rapier_colliders(
    mut commands: Commands,
    added: Query<
        (Entity, &ColliderShape, Option<&CollisionLayers>, Has<Trigger>),
        Without<Collider>,
    >,
) {
    for (entity, shape, layers, trigger) in added.iter() {
        let layers = layers.copied().unwrap_or_default();
        let mut entity_commands = commands.entity(entity);
        entity_commands.insert((
            RigidBody::KinematicPositionBased,
            rapier_collider(shape),
            collision_groups(&layers),
        ));
        if trigger {
            entity_commands.insert(Sensor);
        }
    }
}

/// System: CollisionLayers (в т.ч. enabled) → CollisionGroups
pub fn sync_collision_groups(
    mut query: Query<(&CollisionLayers, &mut CollisionGroups), Changed<CollisionLayers>>,
) {
    for (layers, mut groups) in query.iter_mut() {
        *groups = collision_groups(layers);
    }
}
