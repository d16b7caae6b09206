//! LocomotionState::tick - чистые тесты против аналитической сцены

use bevy::prelude::*;

use super::locomotion::*;
use super::respawn::RespawnPhase;
use crate::components::{layers, Abilities, CharacterMotor, ColliderShape, CollisionLayers};
use crate::physics::{CollisionScene, ProbeShape, SceneCollider};

const DT: f32 = 1.0 / 64.0;
const STANDING_Y: f32 = 0.92;

struct Rig {
    state: LocomotionState,
    config: LocomotionConfig,
    transform: Transform,
    collision: CollisionLayers,
    abilities: Abilities,
    anchor: Option<Vec3>,
    scene: CollisionScene,
}

impl Rig {
    fn on_ground() -> Self {
        let scene = CollisionScene::default().with(SceneCollider::new(
            Entity::from_raw(100),
            ColliderShape::HalfSpace,
            Vec3::ZERO,
            layers::GROUND,
        ));
        let position = Vec3::new(0.0, STANDING_Y, 0.0);

        Self {
            state: LocomotionState::new(position),
            config: LocomotionConfig::default(),
            transform: Transform::from_translation(position),
            collision: CollisionLayers::player(),
            abilities: Abilities::all(),
            anchor: None,
            scene,
        }
    }

    fn step(&mut self, input: LocomotionInput) -> StepOutcome {
        let ctx = TickContext {
            queries: &self.scene,
            entity: Entity::from_raw(1),
            shape: ProbeShape::Capsule {
                radius: 0.4,
                half_height: 0.5,
            },
            bottom_offset: 0.9,
            motor: CharacterMotor::default(),
            abilities: self.abilities,
            respawn_anchor: self.anchor,
            dt: DT,
        };
        self.state
            .tick(&self.config, &ctx, &input, &mut self.transform, &mut self.collision)
    }

    fn idle(&mut self, ticks: usize) {
        for _ in 0..ticks {
            self.step(LocomotionInput::default());
        }
    }

    /// Убираем пол: следующий тик уже не stable grounded
    fn remove_ground(&mut self) {
        self.scene.clear();
    }
}

fn jump() -> LocomotionInput {
    LocomotionInput {
        jump_pressed: true,
        ..default()
    }
}

#[test]
fn test_settles_stable_grounded() {
    let mut rig = Rig::on_ground();
    rig.idle(4);

    assert!(rig.state.stable_grounded);
    assert_eq!(rig.state.coyote_timer, Some(rig.config.coyote_time));
    assert!(
        rig.state.vertical_velocity <= 0.0 && rig.state.vertical_velocity >= rig.config.stick_velocity - 1.0,
        "stick velocity expected, got {}",
        rig.state.vertical_velocity
    );
    assert!((rig.transform.translation.y - STANDING_Y).abs() < 0.05);
}

#[test]
fn test_ground_jump_velocity_exact() {
    let mut rig = Rig::on_ground();
    rig.idle(4);

    let outcome = rig.step(jump());

    assert_eq!(outcome.jump, Some(JumpKind::Ground));
    let expected = (2.0 * 20.0 * 1.6f32).sqrt();
    assert_eq!(rig.state.vertical_velocity, expected);
    assert_eq!(rig.state.vertical_velocity, rig.config.jump_velocity());
    assert!(rig.transform.translation.y > STANDING_Y, "jump must lift the body");
}

#[test]
fn test_air_jump_velocity_exact_and_capped() {
    let mut rig = Rig::on_ground();
    rig.idle(4);
    rig.step(jump());
    rig.idle(10);

    let outcome = rig.step(jump());
    assert_eq!(outcome.jump, Some(JumpKind::Air));
    assert_eq!(rig.state.vertical_velocity, rig.config.jump_velocity());
    assert_eq!(rig.state.air_jumps_used, 1);

    rig.idle(10);
    let outcome = rig.step(jump());
    assert_eq!(outcome.jump, None, "max_air_jumps = 1");
    assert_eq!(rig.state.air_jumps_used, 1);
}

#[test]
fn test_air_jumps_reset_on_landing() {
    let mut rig = Rig::on_ground();
    rig.idle(4);
    rig.step(jump());
    rig.idle(5);
    assert_eq!(rig.step(jump()).jump, Some(JumpKind::Air));

    // Даём приземлиться
    rig.idle(200);
    assert!(rig.state.stable_grounded);
    assert_eq!(rig.state.air_jumps_used, 0);

    assert_eq!(rig.step(jump()).jump, Some(JumpKind::Ground));
}

#[test]
fn test_coyote_jump_allowed_at_coyote_time() {
    let mut rig = Rig::on_ground();
    rig.config.max_air_jumps = 0;
    rig.idle(4);
    rig.remove_ground();

    // coyote_time = 0.125 = 8 тиков
    rig.idle(7);
    let outcome = rig.step(jump());
    assert_eq!(outcome.jump, Some(JumpKind::Ground));
}

#[test]
fn test_coyote_jump_denied_after_coyote_time() {
    let mut rig = Rig::on_ground();
    rig.config.max_air_jumps = 0;
    rig.idle(4);
    rig.remove_ground();

    // Ровно coyote_time: окно ещё открыто, следующий тик уже за ним
    rig.idle(8);
    assert_eq!(rig.state.coyote_timer, Some(0.0));
    let outcome = rig.step(jump());
    assert_eq!(outcome.jump, None);
    assert_eq!(rig.state.coyote_timer, None);
}

#[test]
fn test_expired_coyote_falls_back_to_air_jump() {
    let mut rig = Rig::on_ground();
    rig.idle(4);
    rig.remove_ground();
    rig.idle(8);

    assert_eq!(rig.step(jump()).jump, Some(JumpKind::Air));
}

#[test]
fn test_jump_buffer_honored_on_landing() {
    let mut rig = Rig::on_ground();
    rig.config.max_air_jumps = 0;
    rig.transform.translation.y = 1.0;

    // Нажали в воздухе - прыжка нет, но нажатие запомнено
    let outcome = rig.step(jump());
    assert_eq!(outcome.jump, None);
    assert!(rig.state.jump_buffer_timer > 0.0);

    let mut granted = None;
    for _ in 0..8 {
        if let Some(kind) = rig.step(LocomotionInput::default()).jump {
            granted = Some(kind);
            break;
        }
    }
    assert_eq!(granted, Some(JumpKind::Ground), "buffered jump must fire on landing");
}

#[test]
fn test_post_jump_lock_blocks_regrounding() {
    let mut rig = Rig::on_ground();
    rig.idle(4);
    rig.step(jump());

    let outcome = rig.step(LocomotionInput::default());
    assert!(!rig.state.stable_grounded, "post-jump lock forces airborne");
    assert!(!outcome.landed);
    assert!(rig.state.vertical_velocity > 0.0);
}

#[test]
fn test_walk_and_sprint_speed() {
    let mut rig = Rig::on_ground();
    rig.idle(2);

    rig.step(LocomotionInput {
        move_axis: Vec2::new(0.0, 1.0),
        ..default()
    });
    assert!((rig.state.planar_velocity.length() - 6.0).abs() < 1e-4);
    // forward = -Z при yaw 0
    assert!(rig.state.planar_velocity.z < 0.0);

    rig.step(LocomotionInput {
        move_axis: Vec2::new(3.0, 4.0),
        sprint: true,
        ..default()
    });
    assert!(
        (rig.state.planar_velocity.length() - 10.0).abs() < 1e-4,
        "axis clamped to unit length"
    );
}

#[test]
fn test_dash_requires_ability_and_cooldown() {
    let mut rig = Rig::on_ground();
    rig.abilities = Abilities::default();
    rig.idle(2);

    let dash = LocomotionInput {
        dash_pressed: true,
        ..default()
    };
    assert_eq!(rig.step(dash).dash, None, "dash locked");

    rig.abilities.unlock_dash();
    let outcome = rig.step(dash);
    let direction = outcome.dash.expect("dash granted");
    assert!((direction - Vec3::NEG_Z).length() < 1e-5, "no input → forward");
    assert!((rig.state.dash_velocity.length() - 18.0).abs() < 1e-4);

    assert_eq!(rig.step(dash).dash, None, "cooldown");
    assert!(rig.state.dash_velocity.length() < 18.0, "damping");
}

#[test]
fn test_controls_lock_clears_state_and_freezes() {
    let mut rig = Rig::on_ground();
    rig.idle(4);
    rig.step(jump());
    rig.state.dash_velocity = Vec3::X * 5.0;

    rig.state.set_controls_locked(true);
    assert_eq!(rig.state.vertical_velocity, 0.0);
    assert_eq!(rig.state.dash_velocity, Vec3::ZERO);
    assert_eq!(rig.state.coyote_timer, None);
    assert_eq!(rig.state.jump_buffer_timer, 0.0);
    assert_eq!(rig.state.post_jump_lock_timer, 0.0);

    let before = rig.transform.translation;
    let outcome = rig.step(LocomotionInput {
        move_axis: Vec2::Y,
        jump_pressed: true,
        look_delta: Vec2::new(100.0, 0.0),
        ..default()
    });
    assert_eq!(outcome, StepOutcome::default());
    assert_eq!(rig.transform.translation, before, "locked input is not consumed");
    assert!(rig.state.look.yaw != 0.0, "look is processed while locked");

    rig.state.set_controls_locked(false);
    assert_eq!(rig.state.jump_buffer_timer, 0.0, "no stale jump after unlock");
}

#[test]
fn test_pitch_clamped() {
    let mut rig = Rig::on_ground();
    rig.step(LocomotionInput {
        look_delta: Vec2::new(0.0, -1.0e6),
        ..default()
    });
    assert!((rig.state.look.pitch - rig.config.pitch_limit).abs() < 1e-5);
}

#[test]
fn test_kill_plane_respawn_sequence() {
    let mut rig = Rig::on_ground();
    rig.idle(4);
    let safe = rig.state.last_safe_position.expect("stable ground recorded");

    rig.remove_ground();
    rig.transform.translation.y = -29.99;

    let mut started = None;
    for _ in 0..4 {
        if let Some(position) = rig.step(LocomotionInput::default()).respawn_started {
            started = Some(position);
            break;
        }
    }
    assert!(started.is_some(), "crossing the kill plane begins respawn");
    assert!(rig.state.is_respawning());
    assert!(!rig.collision.enabled, "collider disabled while suspended");

    // Первый suspended тик - стоим на месте
    let held = rig.transform.translation;
    let outcome = rig.step(jump());
    assert_eq!(outcome.jump, None);
    assert_eq!(rig.transform.translation, held);

    // Второй - teleport в last safe
    let outcome = rig.step(LocomotionInput::default());
    assert_eq!(outcome.respawned, Some(safe));
    assert_eq!(rig.transform.translation, safe);
    assert!(rig.collision.enabled);
    assert!(matches!(rig.state.respawn, RespawnPhase::Grace { .. }));
    assert_eq!(rig.state.vertical_velocity, 0.0);
    assert_eq!(rig.state.jump_buffer_timer, 0.0);
}

#[test]
fn test_respawn_prefers_explicit_anchor() {
    let mut rig = Rig::on_ground();
    rig.idle(4);
    rig.anchor = Some(Vec3::new(5.0, 2.0, 5.0));
    rig.remove_ground();
    rig.transform.translation.y = -31.0;

    rig.step(LocomotionInput::default());
    rig.step(LocomotionInput::default());
    let outcome = rig.step(LocomotionInput::default());

    assert_eq!(outcome.respawned, Some(Vec3::new(5.0, 2.0, 5.0)));
}

#[test]
fn test_respawn_falls_back_to_spawn_position() {
    let mut rig = Rig::on_ground();
    rig.remove_ground();
    rig.state = LocomotionState::new(Vec3::new(1.0, 3.0, 1.0));
    rig.transform.translation = Vec3::new(0.0, -40.0, 0.0);

    rig.step(LocomotionInput::default());
    rig.step(LocomotionInput::default());
    let outcome = rig.step(LocomotionInput::default());

    assert_eq!(outcome.respawned, Some(Vec3::new(1.0, 3.0, 1.0)));
}

#[test]
fn test_ceiling_kills_upward_velocity() {
    let mut rig = Rig::on_ground();
    rig.scene.insert(SceneCollider::new(
        Entity::from_raw(101),
        ColliderShape::Cuboid {
            half_extents: Vec3::new(10.0, 0.5, 10.0),
        },
        Vec3::new(0.0, 2.4, 0.0),
        layers::GROUND,
    ));
    rig.idle(4);
    rig.step(jump());

    let mut bonked = false;
    for _ in 0..10 {
        rig.step(LocomotionInput::default());
        if rig.state.vertical_velocity <= 0.0 {
            bonked = true;
            break;
        }
    }
    assert!(bonked, "ceiling contact must zero upward velocity");
    assert!(rig.transform.translation.y < 1.0 + 0.02);
}
