//! Grapnel Simulation Core
//!
//! ECS-симуляция на Bevy 0.16: third-person action core
//! (locomotion, grounded estimation, grapple, shotgun, knockback, health/shield).
//!
//! Ядро не рендерит и не владеет физикой:
//! - коллизии через `PhysicsBackend` (SceneBackend / RapierBackend)
//! - input через `InputSource` (ActionMapInput / KeyboardMouseInput)
//! - feedback (damage numbers, tracers, rope) как `FeedbackEvent`
//!
//! Один FixedUpdate тик (64 Hz), порядок фиксирован `SimulationSet`.

use std::marker::PhantomData;
use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod combat;
pub mod components;
pub mod feedback;
pub mod grapple;
pub mod grounding;
pub mod input;
pub mod logger;
pub mod movement;
pub mod physics;
pub mod shooting;
pub mod spawn;
pub mod tuning;

// Re-export базовых типов для удобства
pub use combat::{CombatPlugin, Damageable, Dead, KnockbackResolver};
pub use components::*;
pub use feedback::{FeedbackEvent, FeedbackPlugin, FeedbackSink};
pub use grapple::{Grapple, GrappleConfig, GrapplePlugin};
pub use grounding::{GroundProbe, GroundedSignal, GroundingPlugin};
pub use input::{ActionState, ButtonAction, InputBackend, InputPlugin, PlayerInput};
pub use logger::{
    init_logger, log, log_error, log_info, log_warning, set_log_level, set_logger, LogLevel, LogOnce,
    LogPrinter,
};
pub use movement::{LocomotionConfig, LocomotionState, MovementPlugin};
pub use physics::{PhysicsBackend, PhysicsSettings, SceneBackend};
#[cfg(feature = "rapier")]
pub use physics::RapierBackend;
pub use shooting::{Shotgun, ShotgunConfig, ShootingPlugin};
pub use tuning::GameplayTuning;

/// Simulation tick rate (FixedUpdate)
pub const TICK_RATE_HZ: f64 = 64.0;

/// Порядок систем внутри одного тика
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    /// InputSource → PlayerInput
    Input,
    /// Transform → collision world (hitbox mounts, scene rebuild)
    Sync,
    /// GroundedSignal
    Grounding,
    /// Locomotion + knockback settle
    Movement,
    Grapple,
    /// Shotgun → damage / knockback requests
    Weapons,
    /// Dynamic bodies без locomotion
    Integrate,
    /// Requests → Damageable / KnockbackResolver, shield regen
    Combat,
}

/// Порядок внутри `SimulationSet::Sync`, не зависит от backend'а
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncSet {
    /// Transform'ы, которые двигает сама симуляция (hitbox mounts)
    Mounts,
    /// Backend забирает Transform'ы в свой collision world
    Backend,
}

/// Главный plugin симуляции (объединяет все подсистемы)
///
/// `B` выбирает physics backend; `GameplayTuning` (если вставлен до
/// plugin'а) задаёт `PhysicsSettings`.
pub struct SimulationPlugin<B: PhysicsBackend>(PhantomData<B>);

impl<B: PhysicsBackend> Default for SimulationPlugin<B> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<B: PhysicsBackend> Plugin for SimulationPlugin<B> {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            FixedUpdate,
            (
                SimulationSet::Input,
                SimulationSet::Sync,
                SimulationSet::Grounding,
                SimulationSet::Movement,
                SimulationSet::Grapple,
                SimulationSet::Weapons,
                SimulationSet::Integrate,
                SimulationSet::Combat,
            )
                .chain(),
        )
        .configure_sets(
            FixedUpdate,
            (SyncSet::Mounts, SyncSet::Backend)
                .chain()
                .in_set(SimulationSet::Sync),
        );

        if !app.world().contains_resource::<GameplayTuning>() {
            app.insert_resource(GameplayTuning::default().normalized());
        }
        if !app.world().contains_resource::<PhysicsSettings>() {
            let physics = app.world().resource::<GameplayTuning>().physics;
            app.insert_resource(physics);
        }
        if !app.world().contains_resource::<DeterministicRng>() {
            app.insert_resource(DeterministicRng::new(42));
        }

        app
            // Fixed timestep 64Hz для simulation tick
            .insert_resource(Time::<Fixed>::from_hz(TICK_RATE_HZ))
            .register_type::<GameplayTuning>()
            .register_type::<Actor>()
            .register_type::<Player>()
            .register_type::<Enemy>()
            .register_type::<Abilities>()
            .register_type::<Body>()
            .register_type::<ColliderShape>()
            .register_type::<CollisionLayers>()
            .register_type::<CharacterMotor>()
            .add_plugins((
                InputPlugin,
                B::plugin(),
                GroundingPlugin::<B>::default(),
                MovementPlugin::<B>::default(),
                CombatPlugin,
                GrapplePlugin::<B>::default(),
                ShootingPlugin::<B>::default(),
                FeedbackPlugin,
            ))
            .add_systems(
                FixedUpdate,
                physics::integrate_bodies::<B>.in_set(SimulationSet::Integrate),
            );

        log_info(&format!(
            "🎮 SimulationPlugin: {} Hz, input backend '{}'",
            TICK_RATE_HZ,
            app.world()
                .get_resource::<InputBackend>()
                .map_or("none", InputBackend::name)
        ));
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
///
/// Время ручное: каждый `app.update()` = ровно один FixedUpdate тик.
/// Первый update с ManualDuration даёт нулевую delta, поэтому он
/// выполняется здесь же.
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(Time::<Fixed>::from_hz(TICK_RATE_HZ))
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
            1.0 / TICK_RATE_HZ,
        )));

    app.update();
    app
}

/// Snapshot мира для сравнения детерминизма
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    let mut snapshot = Vec::new();

    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();

    // Сортируем по Entity ID для детерминизма
    entities.sort_by_key(|(entity, _)| entity.index());

    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}
