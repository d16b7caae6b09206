//! Grounded state estimation
//!
//! Раз в тик (первым в цепочке) превращает shape query под коллайдером в
//! debounced сигнал `GroundedSignal`. Locomotion, knockback и grapple
//! читают его read-only.

use bevy::ecs::system::StaticSystemParam;
use bevy::prelude::*;

use crate::components::{layers, ColliderShape};
use crate::logger::LogOnce;
use crate::physics::{PhysicsBackend, PhysicsQueries, ShapeFilter, SurfaceHit};
use crate::SimulationSet;

/// Radius of the probe sphere when a fixed anchor is used
pub const DEFAULT_ANCHOR_RADIUS: f32 = 0.25;

/// Ground probe settings
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct GroundProbe {
    pub mask: u32,
    /// Насколько ниже нижней точки коллайдера достаёт probe
    pub probe_offset: f32,
    /// Радиус probe = footprint коллайдера × scale
    pub radius_scale: f32,
    /// Фиксированная точка probe (local offset), вместо коллайдера
    pub anchor: Option<Vec3>,
    pub anchor_radius: f32,
    pub grace_window: f32,
    #[reflect(ignore)]
    pub missing_collider: LogOnce,
}

impl Default for GroundProbe {
    fn default() -> Self {
        Self {
            mask: layers::GROUND,
            probe_offset: 0.08,
            radius_scale: 0.9,
            anchor: None,
            anchor_radius: DEFAULT_ANCHOR_RADIUS,
            grace_window: 0.1,
            missing_collider: LogOnce::default(),
        }
    }
}

impl GroundProbe {
    pub fn with_anchor(anchor: Vec3) -> Self {
        Self {
            anchor: Some(anchor),
            ..default()
        }
    }

    /// Probe sphere (center, radius) for a body at `position`.
    ///
    /// `None` - нет ни коллайдера, ни anchor (компонент inert).
    pub fn probe_sphere(&self, position: Vec3, shape: Option<&ColliderShape>) -> Option<(Vec3, f32)> {
        if let Some(anchor) = self.anchor {
            return Some((position + anchor, self.anchor_radius));
        }

        let shape = shape?;
        let radius = shape.footprint_radius() * self.radius_scale;
        if radius <= 0.0 {
            return None;
        }

        // Нижняя точка сферы на probe_offset ниже коллайдера
        let bottom = position.y - shape.bottom_offset();
        let center = Vec3::new(position.x, bottom + radius - self.probe_offset, position.z);
        Some((center, radius))
    }
}

/// Debounced grounded state
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct GroundedSignal {
    pub is_grounded: bool,
    /// Fixed-time секунды последнего контакта
    pub last_contact_time: Option<f32>,
    #[reflect(ignore)]
    pub last_hit: Option<SurfaceHit>,
    pub grace_window: f32,
}

impl Default for GroundedSignal {
    fn default() -> Self {
        Self {
            is_grounded: false,
            last_contact_time: None,
            last_hit: None,
            grace_window: 0.1,
        }
    }
}

impl GroundedSignal {
    /// Grounded now, or lost contact no longer than `grace_window` ago.
    pub fn is_effectively_grounded(&self, now: f32) -> bool {
        self.is_grounded
            || self
                .last_contact_time
                .is_some_and(|last| now - last <= self.grace_window)
    }

    pub fn record(&mut self, hit: Option<SurfaceHit>, now: f32) {
        self.is_grounded = hit.is_some();
        if hit.is_some() {
            self.last_contact_time = Some(now);
            self.last_hit = hit;
        }
    }

    /// Forget contact memory (teleport/respawn).
    pub fn clear(&mut self) {
        self.is_grounded = false;
        self.last_contact_time = None;
        self.last_hit = None;
    }
}

/// Shape query for one body. `None` - probe inert.
pub fn probe_ground(
    queries: &dyn PhysicsQueries,
    entity: Entity,
    position: Vec3,
    shape: Option<&ColliderShape>,
    probe: &GroundProbe,
) -> Option<Option<SurfaceHit>> {
    let (center, radius) = probe.probe_sphere(position, shape)?;
    let filter = ShapeFilter::mask(probe.mask).excluding(entity);
    Some(queries.overlap_sphere(center, radius, &filter))
}

/// System: обновляет GroundedSignal всех тел (SimulationSet::Grounding)
pub fn update_grounded_signals<B: PhysicsBackend>(
    physics: StaticSystemParam<B::Param>,
    time: Res<Time<Fixed>>,
    mut backend_missing: Local<LogOnce>,
    mut probes: Query<(
        Entity,
        &Transform,
        Option<&ColliderShape>,
        &mut GroundProbe,
        &mut GroundedSignal,
    )>,
) {
    let now = time.elapsed_secs();

    let ran = B::with_queries(&physics, |queries| {
        for (entity, transform, shape, mut probe, mut signal) in probes.iter_mut() {
            let Some(hit) = probe_ground(queries, entity, transform.translation, shape, &probe)
            else {
                probe.missing_collider.warn(|| {
                    format!(
                        "⚠️ GroundProbe {:?}: no collider and no anchor, grounded estimation disabled",
                        entity
                    )
                });
                continue;
            };

            signal.grace_window = probe.grace_window;
            signal.record(hit, now);
        }
    });

    if ran.is_none() {
        backend_missing.warn(|| "⚠️ Physics backend unavailable: grounded estimation skipped".to_string());
    }
}

pub struct GroundingPlugin<B: PhysicsBackend>(std::marker::PhantomData<B>);

impl<B: PhysicsBackend> Default for GroundingPlugin<B> {
    fn default() -> Self {
        Self(std::marker::PhantomData)
    }
}

impl<B: PhysicsBackend> Plugin for GroundingPlugin<B> {
    fn build(&self, app: &mut App) {
        app.register_type::<GroundProbe>()
            .register_type::<GroundedSignal>()
            .add_systems(
                FixedUpdate,
                update_grounded_signals::<B>.in_set(SimulationSet::Grounding),
            );
    }
}
