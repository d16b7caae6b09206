//! Analytic collision scene (headless backend).
//!
//! Каждый тик пересобирается из entity с `ColliderShape` - как broadphase
//! настоящего движка, который синхронизирует позиции перед шагом.
//! Поддерживает sphere, Y-capsule, axis-aligned cuboid и half-space.
//! Capsule sweep/overlap аппроксимируется тремя сферами вдоль оси.

use bevy::prelude::*;

use super::queries::{safe_direction, PhysicsQueries, ProbeShape, ShapeFilter, SurfaceHit};
use crate::components::{ColliderShape, CollisionLayers, Trigger};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneCollider {
    pub entity: Entity,
    pub shape: ColliderShape,
    pub position: Vec3,
    pub rotation: Quat,
    pub membership: u32,
    pub trigger: bool,
}

impl SceneCollider {
    pub fn new(entity: Entity, shape: ColliderShape, position: Vec3, membership: u32) -> Self {
        Self {
            entity,
            shape,
            position,
            rotation: Quat::IDENTITY,
            membership,
            trigger: false,
        }
    }

    fn passes(&self, filter: &ShapeFilter) -> bool {
        self.membership & filter.mask != 0
            && filter.exclude != Some(self.entity)
            && (filter.include_triggers || !self.trigger)
    }

    /// Signed distance from `point` to the surface + outward normal.
    fn surface_distance(&self, point: Vec3) -> (f32, Vec3) {
        match self.shape {
            ColliderShape::Sphere { radius } => {
                let offset = point - self.position;
                let length = offset.length();
                (length - radius, direction_or_up(offset, length))
            }
            ColliderShape::Capsule {
                radius,
                half_height,
            } => {
                let closest = closest_on_segment(point, self.position, half_height);
                let offset = point - closest;
                let length = offset.length();
                (length - radius, direction_or_up(offset, length))
            }
            ColliderShape::Cuboid { half_extents } => {
                box_surface_distance(point, self.position, half_extents)
            }
            ColliderShape::HalfSpace => {
                let normal = (self.rotation * Vec3::Y).normalize_or(Vec3::Y);
                ((point - self.position).dot(normal), normal)
            }
        }
    }

    /// Deepest overlap of `shape` placed at `center` with this collider.
    pub fn overlap(&self, shape: ProbeShape, center: Vec3) -> Option<SurfaceHit> {
        let radius = shape.radius();
        let mut best: Option<SurfaceHit> = None;

        for offset in sample_offsets(shape) {
            let sample = center + offset;
            let (distance, normal) = self.surface_distance(sample);
            if distance >= radius {
                continue;
            }
            let penetration = radius - distance;
            if best.map_or(true, |current| penetration > current.penetration) {
                best = Some(SurfaceHit {
                    entity: self.entity,
                    point: sample - normal * distance,
                    normal,
                    distance: 0.0,
                    penetration,
                });
            }
        }

        best
    }

    /// Sweep a sphere of `radius` (0 = ray). Returns (distance, normal, penetration).
    fn sweep_sphere(
        &self,
        origin: Vec3,
        direction: Vec3,
        radius: f32,
        max_distance: f32,
    ) -> Option<(f32, Vec3, f32)> {
        let (start_distance, start_normal) = self.surface_distance(origin);
        if start_distance <= radius {
            // Уже пересекаемся: уходящее движение не блокируем
            if direction.dot(start_normal) >= 0.0 {
                return None;
            }
            return Some((0.0, start_normal, radius - start_distance));
        }

        let hit = match self.shape {
            ColliderShape::Sphere { radius: body } => {
                ray_sphere(origin, direction, self.position, body + radius)
            }
            ColliderShape::Capsule {
                radius: body,
                half_height,
            } => ray_capsule(origin, direction, self.position, half_height, body + radius),
            ColliderShape::Cuboid { half_extents } => ray_box(
                origin,
                direction,
                self.position,
                half_extents + Vec3::splat(radius),
            ),
            ColliderShape::HalfSpace => {
                let normal = (self.rotation * Vec3::Y).normalize_or(Vec3::Y);
                let denom = direction.dot(normal);
                if denom >= 0.0 {
                    None
                } else {
                    Some(((start_distance - radius) / -denom, normal))
                }
            }
        }?;

        let (distance, normal) = hit;
        if distance < 0.0 || distance > max_distance {
            return None;
        }
        Some((distance, normal, 0.0))
    }
}

/// Collision world resource for [`SceneBackend`](super::SceneBackend).
#[derive(Resource, Debug, Clone, Default)]
pub struct CollisionScene {
    pub colliders: Vec<SceneCollider>,
}

impl CollisionScene {
    pub fn insert(&mut self, collider: SceneCollider) {
        self.colliders.push(collider);
    }

    pub fn with(mut self, collider: SceneCollider) -> Self {
        self.insert(collider);
        self
    }

    pub fn clear(&mut self) {
        self.colliders.clear();
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    fn sweep_sphere(
        &self,
        origin: Vec3,
        direction: Vec3,
        radius: f32,
        max_distance: f32,
        filter: &ShapeFilter,
    ) -> Option<SurfaceHit> {
        let (direction, _) = safe_direction(direction)?;
        let mut best: Option<SurfaceHit> = None;

        for collider in self.colliders.iter().filter(|c| c.passes(filter)) {
            let Some((distance, normal, penetration)) =
                collider.sweep_sphere(origin, direction, radius, max_distance)
            else {
                continue;
            };

            let closer = match best {
                None => true,
                Some(current) => {
                    distance < current.distance
                        || (distance == current.distance && penetration > current.penetration)
                }
            };
            if closer {
                let center = origin + direction * distance;
                best = Some(SurfaceHit {
                    entity: collider.entity,
                    point: center - normal * radius,
                    normal,
                    distance,
                    penetration,
                });
            }
        }

        best
    }
}

impl PhysicsQueries for CollisionScene {
    fn ray_cast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: &ShapeFilter,
    ) -> Option<SurfaceHit> {
        self.sweep_sphere(origin, direction, 0.0, max_distance, filter)
    }

    fn shape_cast(
        &self,
        shape: ProbeShape,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: &ShapeFilter,
    ) -> Option<SurfaceHit> {
        let radius = shape.radius();
        let mut best: Option<SurfaceHit> = None;

        for offset in sample_offsets(shape) {
            let Some(hit) =
                self.sweep_sphere(origin + offset, direction, radius, max_distance, filter)
            else {
                continue;
            };
            let closer = best.map_or(true, |current| {
                hit.distance < current.distance
                    || (hit.distance == current.distance && hit.penetration > current.penetration)
            });
            if closer {
                best = Some(hit);
            }
        }

        best
    }

    fn overlap(&self, shape: ProbeShape, center: Vec3, filter: &ShapeFilter) -> Option<SurfaceHit> {
        let mut best: Option<SurfaceHit> = None;

        for collider in self.colliders.iter().filter(|c| c.passes(filter)) {
            let Some(hit) = collider.overlap(shape, center) else {
                continue;
            };
            if best.map_or(true, |current| hit.penetration > current.penetration) {
                best = Some(hit);
            }
        }

        best
    }
}

/// System: пересобирает CollisionScene из текущих Transform.
pub fn rebuild_collision_scene(
    mut scene: ResMut<CollisionScene>,
    colliders: Query<(
        Entity,
        &Transform,
        &ColliderShape,
        Option<&CollisionLayers>,
        Has<Trigger>,
    )>,
) {
    scene.clear();

    for (entity, transform, shape, layers, trigger) in colliders.iter() {
        let layers = layers.copied().unwrap_or_default();
        if !layers.enabled {
            continue;
        }

        scene.insert(SceneCollider {
            entity,
            shape: *shape,
            position: transform.translation,
            rotation: transform.rotation,
            membership: layers.membership,
            trigger,
        });
    }
}

// --- geometry helpers ---

fn sample_offsets(shape: ProbeShape) -> Vec<Vec3> {
    match shape {
        ProbeShape::Sphere { .. } => vec![Vec3::ZERO],
        ProbeShape::Capsule { half_height, .. } => vec![
            Vec3::NEG_Y * half_height,
            Vec3::ZERO,
            Vec3::Y * half_height,
        ],
    }
}

fn direction_or_up(offset: Vec3, length: f32) -> Vec3 {
    if length > 1e-6 {
        offset / length
    } else {
        Vec3::Y
    }
}

fn closest_on_segment(point: Vec3, center: Vec3, half_height: f32) -> Vec3 {
    let y = (point.y - center.y).clamp(-half_height, half_height);
    Vec3::new(center.x, center.y + y, center.z)
}

fn box_surface_distance(point: Vec3, center: Vec3, half_extents: Vec3) -> (f32, Vec3) {
    let local = point - center;
    let clamped = local.clamp(-half_extents, half_extents);

    if clamped != local {
        let offset = local - clamped;
        let length = offset.length();
        return (length, direction_or_up(offset, length));
    }

    // Внутри: ближайшая грань
    let gaps = half_extents - local.abs();
    let (axis, gap) = if gaps.x <= gaps.y && gaps.x <= gaps.z {
        (Vec3::X * local.x.signum(), gaps.x)
    } else if gaps.y <= gaps.z {
        (Vec3::Y * local.y.signum(), gaps.y)
    } else {
        (Vec3::Z * local.z.signum(), gaps.z)
    };
    (-gap, axis)
}

fn ray_sphere(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<(f32, Vec3)> {
    let oc = origin - center;
    let b = oc.dot(direction);
    let c = oc.length_squared() - radius * radius;
    let discriminant = b * b - c;
    if discriminant < 0.0 || b > 0.0 {
        return None;
    }

    let t = -b - discriminant.sqrt();
    let normal = direction_or_up(origin + direction * t - center, radius);
    Some((t, normal))
}

fn ray_capsule(
    origin: Vec3,
    direction: Vec3,
    center: Vec3,
    half_height: f32,
    radius: f32,
) -> Option<(f32, Vec3)> {
    let a = center - Vec3::Y * half_height;
    let axis = Vec3::Y * (2.0 * half_height);

    let oa = origin - a;
    let baba = axis.dot(axis);
    let bard = axis.dot(direction);
    let baoa = axis.dot(oa);
    let rdoa = direction.dot(oa);
    let oaoa = oa.dot(oa);

    // Цилиндрическая часть (пропускаем если луч параллелен оси)
    let k = baba - bard * bard;
    if k.abs() > 1e-6 && baba > 1e-9 {
        let b = baba * rdoa - baoa * bard;
        let c = baba * oaoa - baoa * baoa - radius * radius * baba;
        let h = b * b - k * c;
        if h >= 0.0 {
            let t = (-b - h.sqrt()) / k;
            let y = baoa + t * bard;
            if t >= 0.0 && y > 0.0 && y < baba {
                let point = origin + direction * t;
                let closest = closest_on_segment(point, center, half_height);
                return Some((t, direction_or_up(point - closest, radius)));
            }
        }
    }

    // Полусферы на концах
    let caps = [center - Vec3::Y * half_height, center + Vec3::Y * half_height];
    caps.iter()
        .filter_map(|cap| ray_sphere(origin, direction, *cap, radius))
        .filter(|(t, _)| *t >= 0.0)
        .min_by(|lhs, rhs| lhs.0.total_cmp(&rhs.0))
}

fn ray_box(origin: Vec3, direction: Vec3, center: Vec3, half_extents: Vec3) -> Option<(f32, Vec3)> {
    let min = center - half_extents;
    let max = center + half_extents;

    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    let mut enter_normal = Vec3::Y;

    for axis in 0..3 {
        let o = origin[axis];
        let d = direction[axis];
        if d.abs() < 1e-9 {
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }

        let inv = 1.0 / d;
        let mut t0 = (min[axis] - o) * inv;
        let mut t1 = (max[axis] - o) * inv;
        let mut normal_sign = -1.0;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
            normal_sign = 1.0;
        }

        if t0 > t_enter {
            t_enter = t0;
            let mut normal = Vec3::ZERO;
            normal[axis] = normal_sign;
            enter_normal = normal;
        }
        t_exit = t_exit.min(t1);
        if t_enter > t_exit {
            return None;
        }
    }

    if t_exit < 0.0 || t_enter < 0.0 {
        return None;
    }
    Some((t_enter, enter_normal))
}
