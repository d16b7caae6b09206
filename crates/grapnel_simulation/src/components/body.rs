//! Physical body components: Body, ColliderShape, CollisionLayers, CharacterMotor

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Минимальная масса для Δv = impulse / mass (без NaN/Inf)
pub const MIN_MASS: f32 = 0.001;

/// Collision layer bits (membership + query masks)
pub mod layers {
    pub const GROUND: u32 = 1 << 0;
    pub const PLAYER: u32 = 1 << 1;
    pub const ENEMY: u32 = 1 << 2;
    pub const HITBOX: u32 = 1 << 3;
    pub const PROP: u32 = 1 << 4;

    pub const ALL: u32 = u32::MAX;

    /// Что может остановить пулю/крюк
    pub const SHOT_BLOCKERS: u32 = GROUND | ENEMY | HITBOX | PROP;
    /// Что блокирует движение персонажа
    pub const CHARACTER_SOLID: u32 = GROUND | ENEMY | PROP;
}

/// Physically simulated body
///
/// Velocity пишет ровно один владелец за тик: LocomotionController,
/// GrappleStateMachine (пока controls locked) или KnockbackResolver.
/// Kinematic тела игнорируют импульсы.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Body {
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub mass: f32,
    pub kinematic: bool,
}

impl Default for Body {
    fn default() -> Self {
        Self {
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass: 70.0,
            kinematic: false,
        }
    }
}

impl Body {
    pub fn dynamic(mass: f32) -> Self {
        Self {
            mass,
            ..default()
        }
    }

    pub fn kinematic() -> Self {
        Self {
            kinematic: true,
            ..default()
        }
    }

    pub fn is_dynamic(&self) -> bool {
        !self.kinematic
    }

    pub fn effective_mass(&self) -> f32 {
        if self.mass.is_finite() {
            self.mass.max(MIN_MASS)
        } else {
            MIN_MASS
        }
    }

    pub fn horizontal_velocity(&self) -> Vec3 {
        Vec3::new(self.velocity.x, 0.0, self.velocity.z)
    }

    pub fn set_horizontal_velocity(&mut self, horizontal: Vec3) {
        self.velocity.x = horizontal.x;
        self.velocity.z = horizontal.z;
    }

    pub fn stop(&mut self) {
        self.velocity = Vec3::ZERO;
        self.angular_velocity = Vec3::ZERO;
    }
}

/// Collider shape in the body's local frame.
///
/// Capsule всегда вдоль локальной Y. Cuboid в scene backend считается
/// axis-aligned (rotation игнорируется).
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
pub enum ColliderShape {
    Sphere { radius: f32 },
    Capsule { radius: f32, half_height: f32 },
    Cuboid { half_extents: Vec3 },
    /// Бесконечная плоскость; нормаль = rotation * Y, проходит через translation
    HalfSpace,
}

impl Default for ColliderShape {
    fn default() -> Self {
        Self::Capsule {
            radius: 0.4,
            half_height: 0.5,
        }
    }
}

impl ColliderShape {
    /// Distance from the collider center down to its lowest point.
    pub fn bottom_offset(&self) -> f32 {
        match *self {
            ColliderShape::Sphere { radius } => radius,
            ColliderShape::Capsule {
                radius,
                half_height,
            } => half_height + radius,
            ColliderShape::Cuboid { half_extents } => half_extents.y,
            ColliderShape::HalfSpace => 0.0,
        }
    }

    /// Horizontal footprint radius (для ground probe)
    pub fn footprint_radius(&self) -> f32 {
        match *self {
            ColliderShape::Sphere { radius } => radius,
            ColliderShape::Capsule { radius, .. } => radius,
            ColliderShape::Cuboid { half_extents } => half_extents.x.min(half_extents.z),
            ColliderShape::HalfSpace => 0.0,
        }
    }

    /// Sweepable shape for collide-and-slide (None для плоскостей)
    pub fn probe_shape(&self) -> Option<crate::physics::ProbeShape> {
        use crate::physics::ProbeShape;
        match *self {
            ColliderShape::Sphere { radius } => Some(ProbeShape::Sphere { radius }),
            ColliderShape::Capsule {
                radius,
                half_height,
            } => Some(ProbeShape::Capsule {
                radius,
                half_height,
            }),
            ColliderShape::Cuboid { half_extents } => Some(ProbeShape::Sphere {
                radius: half_extents.min_element(),
            }),
            ColliderShape::HalfSpace => None,
        }
    }
}

/// Collision layer membership
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Reflect)]
#[reflect(Component)]
pub struct CollisionLayers {
    pub membership: u32,
    /// false = коллайдер временно выключен (respawn teleport)
    pub enabled: bool,
}

impl CollisionLayers {
    pub fn new(membership: u32) -> Self {
        Self {
            membership,
            enabled: true,
        }
    }

    pub fn ground() -> Self {
        Self::new(layers::GROUND)
    }

    pub fn player() -> Self {
        Self::new(layers::PLAYER)
    }

    pub fn enemy() -> Self {
        Self::new(layers::ENEMY)
    }

    pub fn matches(&self, mask: u32) -> bool {
        self.enabled && self.membership & mask != 0
    }
}

impl Default for CollisionLayers {
    fn default() -> Self {
        Self::new(layers::PROP)
    }
}

/// Marker: trigger volume (shape queries пропускают его по умолчанию)
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct Trigger;

/// Character collide-and-slide settings
///
/// `step_offset` сохраняется и обнуляется grapple'ом на время притяжения.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct CharacterMotor {
    pub step_offset: f32,
    pub skin_width: f32,
}

impl Default for CharacterMotor {
    fn default() -> Self {
        Self {
            step_offset: 0.3,
            skin_width: 0.02,
        }
    }
}
