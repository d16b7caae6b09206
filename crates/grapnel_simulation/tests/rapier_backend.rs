//! Rapier backend integration test (feature `rapier`)
//!
//! Те же сценарии, что и на аналитической сцене, но коллизии через
//! bevy_rapier3d:
//! - ray / sphere sweep / overlap (глубина пересечения)
//! - grounded pull и airborne pull через SimulationPlugin<RapierBackend>

#![cfg(feature = "rapier")]

use std::time::Duration;

use bevy::ecs::system::{RunSystemOnce, StaticSystemParam};
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use grapnel_simulation::components::{Actor, Body, CollisionLayers, Enemy};
use grapnel_simulation::grapple::{GrappleExit, GrappleLatched, GrappleReleased};
use grapnel_simulation::physics::{PhysicsQueries, ShapeFilter, SurfaceHit};
use grapnel_simulation::spawn::{enemy_bundle, ground_bundle, player_bundle, CHARACTER_CAPSULE};
use grapnel_simulation::*;

/// Helper: App с Rapier; plugins до первого update (Startup создаёт контекст)
fn create_rapier_app(tuning: &GameplayTuning) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins((MinimalPlugins, TransformPlugin))
        .insert_resource(DeterministicRng::new(42))
        .insert_resource(tuning.clone())
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
            1.0 / TICK_RATE_HZ,
        )))
        .add_plugins(SimulationPlugin::<RapierBackend>::default());

    app.finish();
    app.cleanup();

    // Первый update: нулевая delta
    app.update();
    app
}

fn drain<E: Event>(app: &mut App) -> Vec<E> {
    app.world_mut().resource_mut::<Events<E>>().drain().collect()
}

fn set_grapple(app: &mut App, held: bool) {
    app.world_mut()
        .resource_mut::<ActionState>()
        .set(ButtonAction::Grapple, held);
}

fn horizontal_distance(a: Vec3, b: Vec3) -> f32 {
    Vec2::new(a.x - b.x, a.z - b.z).length()
}

/// Запросы к полу: ray сверху, sphere sweep сверху, overlap утопленной сферы
fn query_ground(
    physics: StaticSystemParam<<RapierBackend as PhysicsBackend>::Param>,
) -> Option<[Option<SurfaceHit>; 3]> {
    let filter = ShapeFilter::default();
    RapierBackend::with_queries(&physics, |queries: &dyn PhysicsQueries| {
        [
            queries.ray_cast(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y, 10.0, &filter),
            queries.sphere_cast(Vec3::new(0.0, 5.0, 0.0), 0.5, Vec3::NEG_Y, 10.0, &filter),
            queries.overlap_sphere(Vec3::new(0.0, 0.1, 0.0), 0.3, &filter),
        ]
    })
}

#[test]
fn test_rapier_queries_against_ground() {
    let tuning = GameplayTuning::default().normalized();
    let mut app = create_rapier_app(&tuning);

    let ground = app.world_mut().spawn(ground_bundle(0.0)).id();
    for _ in 0..4 {
        app.update();
    }

    let [ray, sweep, overlap] = app
        .world_mut()
        .run_system_once(query_ground)
        .expect("query system runs")
        .expect("rapier context available");

    let ray = ray.expect("ray hits the ground");
    assert_eq!(ray.entity, ground);
    assert!((ray.distance - 5.0).abs() < 1e-3, "ray distance {}", ray.distance);
    assert!(ray.normal.dot(Vec3::Y) > 0.99);

    let sweep = sweep.expect("sphere sweep hits the ground");
    assert!((sweep.distance - 4.5).abs() < 1e-2, "sweep distance {}", sweep.distance);

    let overlap = overlap.expect("sunk sphere overlaps the ground");
    assert_eq!(overlap.entity, ground);
    assert!(
        (overlap.penetration - 0.2).abs() < 1e-3,
        "overlap reports real depth, got {}",
        overlap.penetration
    );
    assert!(overlap.normal.dot(Vec3::Y) > 0.99);
}

#[test]
fn test_rapier_grounded_pull_reaches_stop_distance() {
    let tuning = GameplayTuning::default().normalized();
    let mut app = create_rapier_app(&tuning);

    app.world_mut().spawn(ground_bundle(0.0));
    let player = app
        .world_mut()
        .spawn(player_bundle(&tuning, Vec3::new(0.0, 0.9, 0.0)))
        .id();
    let enemy = app
        .world_mut()
        .spawn(enemy_bundle(&tuning, Vec3::new(0.0, 0.9, -10.0)))
        .id();

    // Коллайдеры создаются и синхронизируются за первые тики
    for _ in 0..16 {
        app.update();
    }
    assert!(app
        .world()
        .get::<GroundedSignal>(player)
        .unwrap()
        .is_grounded);

    set_grapple(&mut app, true);

    let mut latched = None;
    let mut released = None;
    for _ in 0..200 {
        app.update();
        if let Some(event) = drain::<GrappleLatched>(&mut app).pop() {
            latched = Some(event);
        }
        if let Some(event) = drain::<GrappleReleased>(&mut app).pop() {
            released = Some(event);
            break;
        }
    }

    let latched = latched.expect("hook reached the enemy");
    assert_eq!(latched.target, enemy);
    assert!(latched.began_grounded);
    assert_eq!(released.expect("pull finished").exit, GrappleExit::Finished);

    let player_position = app.world().get::<Transform>(player).unwrap().translation;
    let enemy_position = app.world().get::<Transform>(enemy).unwrap().translation;
    assert!(
        (horizontal_distance(player_position, enemy_position) - tuning.grapple.enemy_stop_distance)
            .abs()
            < 1e-2
    );
    assert!(!app.world().get::<LocomotionState>(player).unwrap().controls_locked);

    // Враг падает на пол Rapier и стоит на нём
    set_grapple(&mut app, false);
    for _ in 0..64 {
        app.update();
    }
    let enemy_position = app.world().get::<Transform>(enemy).unwrap().translation;
    assert!(
        (enemy_position.y - 0.9).abs() < 0.05,
        "enemy rests on the rapier floor, y = {}",
        enemy_position.y
    );
}

#[test]
fn test_rapier_airborne_pull_moves_player_to_anchor() {
    let tuning = GameplayTuning::default().normalized();
    let mut app = create_rapier_app(&tuning);

    let player = app
        .world_mut()
        .spawn(player_bundle(&tuning, Vec3::new(0.0, 10.0, 0.0)))
        .id();
    let post = app
        .world_mut()
        .spawn((
            Actor::default(),
            Enemy,
            Body::kinematic(),
            CHARACTER_CAPSULE,
            CollisionLayers::enemy(),
            Transform::from_xyz(0.0, 10.0, -10.0),
        ))
        .id();

    // Коллайдер поста должен попасть в Rapier до выстрела
    for _ in 0..2 {
        app.update();
    }
    set_grapple(&mut app, true);

    let mut latched = None;
    let mut released = None;
    for _ in 0..160 {
        app.update();
        if let Some(event) = drain::<GrappleLatched>(&mut app).pop() {
            latched = Some(event);
        }
        if let Some(event) = drain::<GrappleReleased>(&mut app).pop() {
            released = Some(event);
            break;
        }
    }

    let latched = latched.expect("hook reached the post");
    assert_eq!(latched.target, post);
    assert!(!latched.began_grounded);
    assert_eq!(released.expect("pull finished").exit, GrappleExit::Finished);

    let player_position = app.world().get::<Transform>(player).unwrap().translation;
    assert!(player_position.z < -6.0, "player travelled toward the post: {:?}", player_position);
    assert!(player_position.distance(latched.anchor) <= tuning.grapple.player_stop_distance + 0.05);

    let post_position = app.world().get::<Transform>(post).unwrap().translation;
    assert!(post_position.distance(Vec3::new(0.0, 10.0, -10.0)) < 1e-3);
}
