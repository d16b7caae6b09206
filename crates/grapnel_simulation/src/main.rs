//! Headless симуляция Grapnel
//!
//! Арена: пол + игрок + враг с weak spot. Скриптованный input:
//! стреляем, потом тянем врага крюком. Опционально: путь к RON tuning.

use bevy::prelude::*;
use grapnel_simulation::combat::Died;
use grapnel_simulation::grapple::GrappleReleased;
use grapnel_simulation::spawn::{enemy_bundle, ground_bundle, head_hitbox_bundle, player_bundle};
use grapnel_simulation::{
    create_headless_app, log, ActionState, ButtonAction, Damageable, GameplayTuning, SceneBackend,
    SimulationPlugin,
};

const TICKS: usize = 640;

fn main() {
    let seed = 42;
    let tuning = match std::env::args().nth(1) {
        Some(path) => GameplayTuning::load_or_default(path),
        None => GameplayTuning::default().normalized(),
    };

    let mut app = create_headless_app(seed);
    log(&format!("Starting Grapnel headless simulation (seed: {})", seed));

    app.insert_resource(tuning.clone())
        .add_plugins(SimulationPlugin::<SceneBackend>::default());

    let world = app.world_mut();
    world.spawn(ground_bundle(0.0));
    let player = world.spawn(player_bundle(&tuning, Vec3::new(0.0, 0.9, 0.0))).id();
    let enemy = world.spawn(enemy_bundle(&tuning, Vec3::new(0.0, 0.9, -12.0))).id();
    world.spawn(head_hitbox_bundle(enemy, Vec3::Y * 1.1, 0.3, 2.0));

    for tick in 0..TICKS {
        script_input(app.world_mut().resource_mut::<ActionState>(), tick);
        app.update();

        for died in app.world_mut().resource_mut::<Events<Died>>().drain() {
            log(&format!("Tick {}: {:?} died (killer {:?})", tick, died.entity, died.killer));
        }
        for released in app.world_mut().resource_mut::<Events<GrappleReleased>>().drain() {
            log(&format!("Tick {}: grapple released ({:?})", tick, released.exit));
        }

        if tick % 64 == 0 {
            let world = app.world();
            let position = |entity: Entity| world.get::<Transform>(entity).map(|t| t.translation);
            let vitals = |entity: Entity| {
                world
                    .get::<Damageable>(entity)
                    .map(|d| (d.current_health, d.current_shield))
            };
            log(&format!(
                "Tick {}: player {:?} | enemy {:?} hp/shield {:?}",
                tick,
                position(player),
                position(enemy),
                vitals(enemy)
            ));
        }
    }

    log("Simulation complete!");
}

/// Секунда стрельбы, пауза, потом grapple до конца
fn script_input(mut actions: Mut<ActionState>, tick: usize) {
    actions.set(ButtonAction::Fire, (16..80).contains(&tick));
    actions.set(ButtonAction::Grapple, (160..400).contains(&tick));
}
