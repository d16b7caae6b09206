//! Combat integration test
//!
//! Shotgun → pellet aggregation → batched requests → Damageable / KnockbackResolver
//!
//! Проверяем:
//! - один Damaged и одно damage number на цель за выстрел (сумма пеллетов)
//! - fire interval: удержание триггера не стреляет каждый тик
//! - knockback: grounded цель игнорирует импульс, airborne - отлетает
//! - инварианты health/shield на длинной серии выстрелов
//! - мёртвая цель: ни урона, ни damage number

use bevy::prelude::*;
use grapnel_simulation::combat::{DamageRequest, Damaged, Died};
use grapnel_simulation::shooting::ShotFired;
use grapnel_simulation::spawn::{enemy_bundle, ground_bundle, head_hitbox_bundle, player_bundle};
use grapnel_simulation::*;

/// Helper: полный App с tuning
fn create_combat_app(tuning: &GameplayTuning) -> App {
    let mut app = create_headless_app(42);
    app.insert_resource(tuning.clone())
        .add_plugins(SimulationPlugin::<SceneBackend>::default());
    app
}

fn drain<E: Event>(app: &mut App) -> Vec<E> {
    app.world_mut().resource_mut::<Events<E>>().drain().collect()
}

fn set_fire(app: &mut App, held: bool) {
    app.world_mut()
        .resource_mut::<ActionState>()
        .set(ButtonAction::Fire, held);
}

fn vitals(app: &App, entity: Entity) -> f32 {
    let damageable = app.world().get::<Damageable>(entity).unwrap();
    damageable.current_health + damageable.current_shield
}

#[test]
fn test_shotgun_blast_is_one_damage_event_per_target() {
    let tuning = GameplayTuning::default().normalized();
    let mut app = create_combat_app(&tuning);

    app.world_mut().spawn(ground_bundle(0.0));
    let player = app
        .world_mut()
        .spawn(player_bundle(&tuning, Vec3::new(0.0, 0.9, 0.0)))
        .id();
    let enemy = app
        .world_mut()
        .spawn(enemy_bundle(&tuning, Vec3::new(0.0, 0.9, -3.0)))
        .id();
    app.world_mut()
        .spawn(head_hitbox_bundle(enemy, Vec3::Y * 1.1, 0.3, 2.0));

    app.update();
    let before = vitals(&app, enemy);

    set_fire(&mut app, true);
    app.update();

    let shots = drain::<ShotFired>(&mut app);
    assert_eq!(shots.len(), 1);
    assert_eq!(shots[0].shooter, player);
    assert_eq!(shots[0].targets_hit, 1, "head region and body resolve to one target");

    let damaged = drain::<Damaged>(&mut app);
    assert_eq!(damaged.len(), 1, "pellets are batched into one damage call");
    assert_eq!(damaged[0].entity, enemy);
    assert_eq!(damaged[0].source, Some(player));
    assert!(damaged[0].amount > 0.0);

    let numbers: Vec<_> = drain::<FeedbackEvent>(&mut app)
        .into_iter()
        .filter_map(|event| match event {
            FeedbackEvent::DamageNumber { target, amount, .. } => Some((target, amount)),
            _ => None,
        })
        .collect();
    assert_eq!(numbers, vec![(enemy, damaged[0].amount)]);

    let after = vitals(&app, enemy);
    assert!(
        (before - after - damaged[0].amount).abs() < 1e-3,
        "shield + health lost equals batched damage"
    );

    // Триггер зажат: следующий выстрел только после fire interval
    for _ in 0..10 {
        app.update();
    }
    assert!(drain::<ShotFired>(&mut app).is_empty());
}

#[test]
fn test_grounded_enemy_ignores_shotgun_knockback() {
    let tuning = GameplayTuning::default().normalized();
    let mut app = create_combat_app(&tuning);

    app.world_mut().spawn(ground_bundle(0.0));
    app.world_mut()
        .spawn(player_bundle(&tuning, Vec3::new(0.0, 0.9, 0.0)));
    let enemy = app
        .world_mut()
        .spawn(enemy_bundle(&tuning, Vec3::new(0.0, 0.9, -3.0)))
        .id();

    for _ in 0..4 {
        app.update();
    }

    set_fire(&mut app, true);
    app.update();

    assert_eq!(drain::<Damaged>(&mut app).len(), 1);
    let body = app.world().get::<Body>(enemy).unwrap();
    assert_eq!(body.horizontal_velocity(), Vec3::ZERO);
    assert!(!app.world().get::<KnockbackResolver>(enemy).unwrap().airborne_hit_pending);
}

#[test]
fn test_airborne_enemy_is_knocked_back() {
    let tuning = GameplayTuning {
        enemy_mass: 4.0,
        ..default()
    }
    .normalized();
    let mut app = create_combat_app(&tuning);

    // Без пола: оба в воздухе, стреляем на первом тике
    app.world_mut()
        .spawn(player_bundle(&tuning, Vec3::new(0.0, 0.9, 0.0)));
    let enemy = app
        .world_mut()
        .spawn(enemy_bundle(&tuning, Vec3::new(0.0, 0.9, -3.0)))
        .id();

    set_fire(&mut app, true);
    app.update();

    assert_eq!(drain::<Damaged>(&mut app).len(), 1);
    let body = app.world().get::<Body>(enemy).unwrap();
    assert!(
        body.velocity.z < -0.2,
        "enemy pushed away from the shooter, velocity {:?}",
        body.velocity
    );
    assert!(
        body.horizontal_velocity().length() <= tuning.knockback.air_speed_cap + 1e-4
    );
    assert!(app.world().get::<KnockbackResolver>(enemy).unwrap().airborne_hit_pending);
}

#[test]
fn test_vitals_invariants_under_fire() {
    let tuning = GameplayTuning::default().normalized();
    let mut app = create_combat_app(&tuning);

    app.world_mut().spawn(ground_bundle(0.0));
    app.world_mut()
        .spawn(player_bundle(&tuning, Vec3::new(0.0, 0.9, 0.0)));
    let enemy = app
        .world_mut()
        .spawn(enemy_bundle(&tuning, Vec3::new(0.0, 0.9, -3.0)))
        .id();

    set_fire(&mut app, true);

    let mut deaths = 0;
    for tick in 0..640 {
        app.update();
        deaths += drain::<Died>(&mut app).len();

        let damageable = app.world().get::<Damageable>(enemy).unwrap();
        assert!(
            (0.0..=damageable.max_health).contains(&damageable.current_health),
            "Tick {}: health {} out of [0, {}]",
            tick,
            damageable.current_health,
            damageable.max_health
        );
        assert!(
            (0.0..=damageable.max_shield).contains(&damageable.current_shield),
            "Tick {}: shield {} out of [0, {}]",
            tick,
            damageable.current_shield,
            damageable.max_shield
        );
    }

    assert_eq!(deaths, 1, "Died fires exactly once");
    assert!(app.world().get::<Dead>(enemy).is_some());
}

#[test]
fn test_dead_enemy_gets_no_damage_number() {
    let tuning = GameplayTuning::default().normalized();
    let mut app = create_combat_app(&tuning);

    app.world_mut().spawn(ground_bundle(0.0));
    app.world_mut()
        .spawn(player_bundle(&tuning, Vec3::new(0.0, 0.9, 0.0)));
    let enemy = app
        .world_mut()
        .spawn(enemy_bundle(&tuning, Vec3::new(0.0, 0.9, -3.0)))
        .id();

    app.world_mut().send_event(DamageRequest {
        target: enemy,
        amount: 10_000.0,
        source: None,
    });
    app.update();
    assert_eq!(drain::<Died>(&mut app).len(), 1);
    drain::<Damaged>(&mut app);
    drain::<FeedbackEvent>(&mut app);

    set_fire(&mut app, true);
    app.update();

    let shots = drain::<ShotFired>(&mut app);
    assert_eq!(shots.len(), 1);
    assert_eq!(shots[0].targets_hit, 0, "corpse is not a target");
    assert!(drain::<Damaged>(&mut app).is_empty());

    let feedback = drain::<FeedbackEvent>(&mut app);
    assert!(
        !feedback
            .iter()
            .any(|event| matches!(event, FeedbackEvent::DamageNumber { .. })),
        "no damage number over a dead target"
    );
    assert!(
        feedback
            .iter()
            .any(|event| matches!(event, FeedbackEvent::Decal { surface, .. } if *surface == enemy)),
        "pellets still leave impacts on the body"
    );
}
