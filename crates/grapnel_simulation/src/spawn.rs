//! Spawn helpers (player, enemy, ground, hitbox regions)
//!
//! Все параметры берутся из `GameplayTuning`, поэтому headless demo,
//! тесты и engine bridge собирают одинаковые entity.
//! Bundle tuple ограничен 15 элементами → группируем вложенными tuple.

use bevy::prelude::*;

use crate::combat::KnockbackResolver;
use crate::components::{layers, Abilities, Actor, Body, CharacterMotor, ColliderShape, CollisionLayers, Enemy, Player};
use crate::grapple::Grapple;
use crate::input::PlayerInput;
use crate::movement::{LocomotionState, RespawnAnchor};
use crate::shooting::{Hitbox, HitboxMount, HitboxOf, Shotgun};
use crate::tuning::GameplayTuning;

/// Капсула персонажа (center → feet = 0.9)
pub const CHARACTER_CAPSULE: ColliderShape = ColliderShape::Capsule {
    radius: 0.4,
    half_height: 0.5,
};

/// Player: locomotion + grapple + shotgun. `position` = центр капсулы.
pub fn player_bundle(tuning: &GameplayTuning, position: Vec3) -> impl Bundle {
    (
        (
            Actor::default(),
            Player,
            PlayerInput::default(),
            tuning.player.damageable(),
            Abilities::default(),
        ),
        (
            LocomotionState::new(position),
            tuning.locomotion,
            RespawnAnchor(position),
            Body::kinematic(),
            CHARACTER_CAPSULE,
            CollisionLayers::player(),
            CharacterMotor::default(),
            tuning.grounding.probe(),
        ),
        (
            Grapple::new(tuning.grapple),
            Shotgun::new(tuning.shotgun),
            KnockbackResolver::new(tuning.knockback),
        ),
        Transform::from_translation(position),
    )
}

/// Enemy: dynamic body, knockback, damageable. Без AI.
pub fn enemy_bundle(tuning: &GameplayTuning, position: Vec3) -> impl Bundle {
    (
        (Actor::default(), Enemy, tuning.enemy.damageable()),
        (
            Body::dynamic(tuning.enemy_mass),
            CHARACTER_CAPSULE,
            CollisionLayers::enemy(),
            CharacterMotor::default(),
            tuning.grounding.probe(),
            KnockbackResolver::new(tuning.knockback),
        ),
        Transform::from_translation(position),
    )
}

/// Бесконечный пол на высоте `height`
pub fn ground_bundle(height: f32) -> impl Bundle {
    (
        Transform::from_xyz(0.0, height, 0.0),
        ColliderShape::HalfSpace,
        CollisionLayers::ground(),
    )
}

/// Статичный box (стена, пропс)
pub fn wall_bundle(center: Vec3, half_extents: Vec3) -> impl Bundle {
    (
        Transform::from_translation(center),
        ColliderShape::Cuboid { half_extents },
        CollisionLayers::ground(),
    )
}

/// Weak spot над owner'ом (голова): всегда crit, свой multiplier
pub fn head_hitbox_bundle(owner: Entity, offset: Vec3, radius: f32, multiplier: f32) -> impl Bundle {
    (
        Transform::default(),
        ColliderShape::Sphere { radius },
        CollisionLayers::new(layers::HITBOX),
        Hitbox::weak_spot(multiplier),
        HitboxOf(owner),
        HitboxMount { owner, offset },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::Damageable;
    use crate::grounding::GroundedSignal;

    #[test]
    fn test_player_bundle_uses_tuning() {
        let mut tuning = GameplayTuning::default();
        tuning.player.max_health = 250.0;
        tuning.grapple.max_range = 50.0;

        let mut world = World::new();
        let player = world.spawn(player_bundle(&tuning, Vec3::new(0.0, 0.9, 0.0))).id();

        let damageable = world.get::<Damageable>(player).unwrap();
        assert_eq!(damageable.max_health, 250.0);
        assert_eq!(damageable.current_health, 250.0);
        assert_eq!(world.get::<Grapple>(player).unwrap().config.max_range, 50.0);
        assert!(world.get::<Body>(player).unwrap().kinematic);
        assert!(world.get::<GroundedSignal>(player).is_some());
        assert_eq!(world.get::<RespawnAnchor>(player).unwrap().0, Vec3::new(0.0, 0.9, 0.0));
    }

    #[test]
    fn test_enemy_bundle_is_dynamic() {
        let tuning = GameplayTuning {
            enemy_mass: 120.0,
            ..default()
        };

        let mut world = World::new();
        let enemy = world.spawn(enemy_bundle(&tuning, Vec3::new(0.0, 0.9, -10.0))).id();

        let body = world.get::<Body>(enemy).unwrap();
        assert!(body.is_dynamic());
        assert_eq!(body.mass, 120.0);
        assert!(world.get::<Enemy>(enemy).is_some());
        assert!(world.get::<Grapple>(enemy).is_none());
        assert_eq!(
            world.get::<CollisionLayers>(enemy).unwrap().membership,
            layers::ENEMY
        );
    }
}
