//! ECS Components для игровых entity
//!
//! Организация по доменам:
//! - actor: Actor, Player/Enemy markers, Abilities
//! - body: Body, ColliderShape, CollisionLayers, CharacterMotor
//!
//! Остальные компоненты живут рядом со своими системами
//! (grounding, movement, combat, grapple, shooting).

pub mod actor;
pub mod body;

pub use actor::*;
pub use body::*;
