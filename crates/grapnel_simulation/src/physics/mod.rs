//! Physics collaborator
//!
//! Ядро не реализует физику: оно видит `PhysicsQueries` (raycast, sweep,
//! overlap, collide-and-slide) через `PhysicsBackend`.
//! - `SceneBackend` - аналитическая сцена (headless, тесты)
//! - `RapierBackend` - bevy_rapier3d (feature `rapier`)
//!
//! Velocity всегда интегрируем сами, backend только для коллизий.

pub mod backend;
pub mod integrate;
pub mod queries;
#[cfg(feature = "rapier")]
pub mod rapier;
pub mod scene;
pub mod slide;

pub use backend::{PhysicsBackend, SceneBackend, SceneBackendPlugin};
pub use integrate::{integrate_bodies, PhysicsSettings};
pub use queries::{safe_direction, PhysicsQueries, ProbeShape, ShapeFilter, SurfaceHit, DISTANCE_EPSILON};
#[cfg(feature = "rapier")]
pub use rapier::{RapierBackend, RapierBackendPlugin};
pub use scene::{rebuild_collision_scene, CollisionScene, SceneCollider};
pub use slide::{clip_velocity, SlideOutcome, FLOOR_MIN_NORMAL_Y};
