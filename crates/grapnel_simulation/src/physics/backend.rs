//! Physics backend abstraction.
//!
//! Gameplay-системы generic по `B: PhysicsBackend` и получают
//! `&dyn PhysicsQueries` на текущий тик через `with_queries`.
//! Backend недоступен (нет ресурса / контекста) → `None`, система пропускает тик.

use bevy::ecs::system::{SystemParam, SystemParamItem};
use bevy::prelude::*;

use super::queries::PhysicsQueries;
use super::scene::{rebuild_collision_scene, CollisionScene};
use crate::SyncSet;

pub trait PhysicsBackend: 'static + Send + Sync {
    /// System param giving access to the backend's collision world.
    type Param: SystemParam + 'static;

    /// Plugin that keeps the backend's collision world in sync.
    fn plugin() -> impl Plugin;

    fn with_queries<R>(
        param: &SystemParamItem<'_, '_, Self::Param>,
        f: impl FnOnce(&dyn PhysicsQueries) -> R,
    ) -> Option<R>;
}

/// Default headless backend: analytic [`CollisionScene`].
pub struct SceneBackend;

impl PhysicsBackend for SceneBackend {
    type Param = Option<Res<'static, CollisionScene>>;

    fn plugin() -> impl Plugin {
        SceneBackendPlugin
    }

    fn with_queries<R>(
        param: &SystemParamItem<'_, '_, Self::Param>,
        f: impl FnOnce(&dyn PhysicsQueries) -> R,
    ) -> Option<R> {
        let scene: &CollisionScene = param.as_deref()?;
        Some(f(scene))
    }
}

pub struct SceneBackendPlugin;

impl Plugin for SceneBackendPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CollisionScene>().add_systems(
            FixedUpdate,
            rebuild_collision_scene.in_set(SyncSet::Backend),
        );
    }
}
