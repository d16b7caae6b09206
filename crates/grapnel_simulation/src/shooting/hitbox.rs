//! Hitbox regions (head, weak spots) на отдельных коллайдерах
//!
//! Коллайдер региона несёт `Hitbox` + `HitboxOf(owner)`; урон уходит
//! owner'у с multiplier региона. `HitboxMount` держит коллайдер на
//! offset от owner'а (в Sync, до rebuild коллизий).

use bevy::prelude::*;

/// Per-region damage modifiers
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Hitbox {
    pub multiplier: f32,
    /// Любое попадание в регион - crit
    pub always_crit: bool,
}

impl Default for Hitbox {
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            always_crit: false,
        }
    }
}

impl Hitbox {
    pub fn weak_spot(multiplier: f32) -> Self {
        Self {
            multiplier,
            always_crit: true,
        }
    }
}

/// Damageable owner региона
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Reflect)]
#[reflect(Component)]
pub struct HitboxOf(pub Entity);

/// Коллайдер следует за owner'ом с локальным offset
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct HitboxMount {
    pub owner: Entity,
    pub offset: Vec3,
}

/// System: HitboxMount → Transform (SyncSet::Mounts)
///
/// Owner despawned → регион тоже despawn.
pub fn follow_hitbox_mounts(
    mut commands: Commands,
    owners: Query<&Transform, Without<HitboxMount>>,
    mut mounts: Query<(Entity, &HitboxMount, &mut Transform)>,
) {
    for (entity, mount, mut transform) in mounts.iter_mut() {
        let Ok(owner) = owners.get(mount.owner) else {
            commands.entity(entity).despawn();
            continue;
        };

        transform.translation = owner.transform_point(mount.offset);
        transform.rotation = owner.rotation;
    }
}
