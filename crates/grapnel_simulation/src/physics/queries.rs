//! Shape-query contract consumed by the gameplay core.
//!
//! Физический движок - внешний коллаборатор. Ядро видит только этот трейт:
//! raycast, sweep (sphere/capsule), overlap и collide-and-slide поверх sweep.

use bevy::prelude::*;

use super::slide::{self, SlideOutcome};
use crate::components::layers;

/// Минимальная длина для нормализации направления
pub const DISTANCE_EPSILON: f32 = 1e-5;

/// Shape used for sweeps and overlaps.
///
/// Capsule всегда вертикальная (ось Y), `half_height` - половина сегмента.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbeShape {
    Sphere { radius: f32 },
    Capsule { radius: f32, half_height: f32 },
}

impl ProbeShape {
    pub fn radius(&self) -> f32 {
        match *self {
            ProbeShape::Sphere { radius } => radius,
            ProbeShape::Capsule { radius, .. } => radius,
        }
    }

    pub fn half_height(&self) -> f32 {
        match *self {
            ProbeShape::Sphere { .. } => 0.0,
            ProbeShape::Capsule { half_height, .. } => half_height,
        }
    }
}

/// Layer/mask filter shared by every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeFilter {
    pub mask: u32,
    pub exclude: Option<Entity>,
    pub include_triggers: bool,
}

impl Default for ShapeFilter {
    fn default() -> Self {
        Self {
            mask: layers::ALL,
            exclude: None,
            include_triggers: false,
        }
    }
}

impl ShapeFilter {
    pub fn mask(mask: u32) -> Self {
        Self {
            mask,
            ..default()
        }
    }

    pub fn excluding(mut self, entity: Entity) -> Self {
        self.exclude = Some(entity);
        self
    }

    pub fn with_triggers(mut self) -> Self {
        self.include_triggers = true;
        self
    }
}

/// Result of a ray, sweep or overlap query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub entity: Entity,
    pub point: Vec3,
    /// Нормаль поверхности, в которую попали (наружу от неё)
    pub normal: Vec3,
    /// Пройденная дистанция до контакта (0 для overlap)
    pub distance: f32,
    /// Глубина проникновения (0 если касание без пересечения)
    pub penetration: f32,
}

pub trait PhysicsQueries {
    /// Cast a ray. `direction` does not have to be normalized.
    fn ray_cast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: &ShapeFilter,
    ) -> Option<SurfaceHit>;

    /// Sweep a shape from `origin` along `direction`.
    ///
    /// Shape, который уже пересекается с геометрией на старте, возвращает
    /// hit с `distance == 0` и ненулевым `penetration`.
    fn shape_cast(
        &self,
        shape: ProbeShape,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: &ShapeFilter,
    ) -> Option<SurfaceHit>;

    /// Deepest overlap of a shape placed at `center`.
    fn overlap(&self, shape: ProbeShape, center: Vec3, filter: &ShapeFilter) -> Option<SurfaceHit>;

    fn sphere_cast(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        filter: &ShapeFilter,
    ) -> Option<SurfaceHit> {
        self.shape_cast(
            ProbeShape::Sphere { radius },
            origin,
            direction,
            max_distance,
            filter,
        )
    }

    fn overlap_sphere(&self, center: Vec3, radius: f32, filter: &ShapeFilter) -> Option<SurfaceHit> {
        self.overlap(ProbeShape::Sphere { radius }, center, filter)
    }

    /// Collide-and-slide move of `shape` by `motion` (one call per tick).
    fn move_and_slide(
        &self,
        shape: ProbeShape,
        position: Vec3,
        motion: Vec3,
        step_offset: f32,
        skin_width: f32,
        filter: &ShapeFilter,
    ) -> SlideOutcome {
        slide::move_and_slide(self, shape, position, motion, step_offset, skin_width, filter)
    }
}

/// Normalize, или `None` если вектор почти нулевой.
pub fn safe_direction(v: Vec3) -> Option<(Vec3, f32)> {
    let length = v.length();
    if length > DISTANCE_EPSILON && length.is_finite() {
        Some((v / length, length))
    } else {
        None
    }
}
