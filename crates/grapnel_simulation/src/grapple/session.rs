//! Grapple state machine: Idle → Traveling → Latched → Idle
//!
//! Всё, что не требует ECS, живёт здесь: переходы фаз, полёт хука,
//! cooldown и математика обоих режимов pull. Системы только склеивают
//! это с Transform/Body/LocomotionState.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::layers;
use crate::physics::{safe_direction, PhysicsQueries, ShapeFilter, DISTANCE_EPSILON};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Reflect)]
#[serde(default)]
pub struct GrappleConfig {
    /// m/s
    pub hook_speed: f32,
    pub max_range: f32,
    pub max_travel_time: f32,
    /// Радиус sphere-cast assist (второй запрос, если ray промахнулся)
    pub hook_assist_radius: f32,
    pub target_mask: u32,
    /// Высота точки запуска над pivot (центр капсулы)
    pub launch_height: f32,
    pub cooldown: f32,
    /// Высота, на которую pop подбрасывает цель при grounded latch
    pub lift_height: f32,

    // Airborne: игрок летит к якорю
    pub airborne_min_speed: f32,
    /// Прирост скорости на метр дистанции
    pub airborne_speed_gain: f32,
    pub airborne_max_speed: f32,
    pub vertical_damping: f32,
    /// Ослабленная гравитация во время swing (отрицательная)
    pub swing_gravity: f32,
    pub player_stop_distance: f32,

    // Grounded: цель тянется к игроку
    pub grounded_pull_speed: f32,
    pub enemy_stop_distance: f32,

    pub max_active_time: f32,
}

impl Default for GrappleConfig {
    fn default() -> Self {
        Self {
            hook_speed: 60.0,
            max_range: 35.0,
            max_travel_time: 0.8,
            hook_assist_radius: 0.35,
            target_mask: layers::SHOT_BLOCKERS,
            launch_height: 0.6,
            cooldown: 0.75,
            lift_height: 1.2,
            airborne_min_speed: 8.0,
            airborne_speed_gain: 1.5,
            airborne_max_speed: 26.0,
            vertical_damping: 6.0,
            swing_gravity: -4.0,
            player_stop_distance: 1.6,
            grounded_pull_speed: 14.0,
            enemy_stop_distance: 2.0,
            max_active_time: 2.5,
        }
    }
}

impl GrappleConfig {
    pub fn normalized(mut self) -> Self {
        self.hook_speed = self.hook_speed.abs().max(DISTANCE_EPSILON);
        self.max_range = self.max_range.abs();
        self.max_travel_time = self.max_travel_time.max(0.0);
        self.hook_assist_radius = self.hook_assist_radius.max(0.0);
        self.cooldown = self.cooldown.max(0.0);
        self.lift_height = self.lift_height.max(0.0);
        if self.airborne_min_speed > self.airborne_max_speed {
            std::mem::swap(&mut self.airborne_min_speed, &mut self.airborne_max_speed);
        }
        self.swing_gravity = -self.swing_gravity.abs();
        self.player_stop_distance = self.player_stop_distance.max(0.0);
        self.enemy_stop_distance = self.enemy_stop_distance.max(0.0);
        self.max_active_time = self.max_active_time.max(0.0);
        self
    }
}

/// Who moves while latched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum PullMode {
    /// Puller в воздухе: летит к якорю
    PullPuller,
    /// Puller на земле: цель тянется к нему
    PullTarget,
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum GrappleExit {
    Finished,
    Cancelled,
    TimedOut,
    /// Цель despawned / умерла - обычный finish
    TargetLost,
    /// Хук не нашёл цель (range, travel time, не-damageable поверхность)
    Whiff,
}

impl GrappleExit {
    /// Whiff сбрасывает состояние без cooldown
    pub fn applies_cooldown(self) -> bool {
        !matches!(self, GrappleExit::Whiff)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub enum GrapplePhase {
    #[default]
    Idle,
    Traveling {
        origin: Vec3,
        direction: Vec3,
        distance: f32,
        elapsed: f32,
    },
    Latched {
        target: Entity,
        /// Anchor в local space цели (следует за её rotation/translation)
        local_anchor: Vec3,
        began_grounded: bool,
        mode: PullMode,
        elapsed: f32,
    },
}

/// Result of one hook flight step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HookStep {
    NotTraveling,
    Advanced { position: Vec3 },
    Hit { target: Entity, point: Vec3 },
    Whiff { position: Vec3 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LatchedTick {
    NotLatched,
    TimedOut,
    Pull {
        target: Entity,
        local_anchor: Vec3,
        mode: PullMode,
    },
}

/// Grapple hook (на puller'е)
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
pub struct Grapple {
    pub config: GrappleConfig,
    pub phase: GrapplePhase,
    pub cooldown_remaining: f32,
    /// step_offset puller'а до latch (восстанавливается на любом exit)
    pub saved_step_offset: Option<f32>,
}

impl Grapple {
    pub fn new(config: GrappleConfig) -> Self {
        Self {
            config: config.normalized(),
            ..default()
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, GrapplePhase::Idle)
    }

    pub fn is_latched(&self) -> bool {
        matches!(self.phase, GrapplePhase::Latched { .. })
    }

    pub fn target(&self) -> Option<Entity> {
        match self.phase {
            GrapplePhase::Latched { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn tick_cooldown(&mut self, dt: f32) {
        self.cooldown_remaining = (self.cooldown_remaining - dt).max(0.0);
    }

    pub fn can_fire(&self) -> bool {
        self.is_idle() && self.cooldown_remaining <= 0.0
    }

    /// Idle → Traveling. Cooldown / не Idle / нулевое направление → no-op.
    pub fn fire(&mut self, origin: Vec3, direction: Vec3) -> bool {
        if !self.can_fire() {
            return false;
        }
        let Some((direction, _)) = safe_direction(direction) else {
            return false;
        };

        self.phase = GrapplePhase::Traveling {
            origin,
            direction,
            distance: 0.0,
            elapsed: 0.0,
        };
        true
    }

    /// Один шаг полёта: ray, затем sphere assist, по дистанции шага.
    ///
    /// `resolve` возвращает живую damageable цель для задетого коллайдера.
    pub fn advance_hook(
        &mut self,
        queries: &dyn PhysicsQueries,
        puller: Entity,
        dt: f32,
        resolve: impl Fn(Entity) -> Option<Entity>,
    ) -> HookStep {
        let GrapplePhase::Traveling {
            origin,
            direction,
            distance,
            elapsed,
        } = &mut self.phase
        else {
            return HookStep::NotTraveling;
        };

        let start = *origin + *direction * *distance;
        let step = (self.config.hook_speed * dt).min(self.config.max_range - *distance).max(0.0);
        let filter = ShapeFilter::mask(self.config.target_mask).excluding(puller);

        if step > 0.0 {
            if let Some(hit) = queries.ray_cast(start, *direction, step, &filter) {
                return match resolve(hit.entity) {
                    Some(target) => HookStep::Hit {
                        target,
                        point: hit.point,
                    },
                    None => HookStep::Whiff { position: hit.point },
                };
            }

            // Assist принимает только damageable цели
            if self.config.hook_assist_radius > 0.0 {
                let assist = queries.sphere_cast(
                    start,
                    self.config.hook_assist_radius,
                    *direction,
                    step,
                    &filter,
                );
                if let Some(hit) = assist {
                    if let Some(target) = resolve(hit.entity) {
                        return HookStep::Hit {
                            target,
                            point: hit.point,
                        };
                    }
                }
            }
        }

        *distance += step;
        *elapsed += dt;
        let position = *origin + *direction * *distance;

        if *distance >= self.config.max_range - DISTANCE_EPSILON
            || *elapsed >= self.config.max_travel_time
        {
            return HookStep::Whiff { position };
        }

        HookStep::Advanced { position }
    }

    /// Traveling → Latched
    pub fn latch(&mut self, target: Entity, local_anchor: Vec3, began_grounded: bool) {
        self.phase = GrapplePhase::Latched {
            target,
            local_anchor,
            began_grounded,
            mode: pull_mode(began_grounded),
            elapsed: 0.0,
        };
    }

    /// Latched тик: elapsed, выбор режима по grounded puller'а *сейчас*.
    pub fn tick_latched(&mut self, dt: f32, puller_grounded: bool) -> LatchedTick {
        let max_active_time = self.config.max_active_time;
        let GrapplePhase::Latched {
            target,
            local_anchor,
            mode,
            elapsed,
            ..
        } = &mut self.phase
        else {
            return LatchedTick::NotLatched;
        };

        *elapsed += dt;
        if *elapsed > max_active_time {
            return LatchedTick::TimedOut;
        }

        *mode = pull_mode(puller_grounded);
        LatchedTick::Pull {
            target: *target,
            local_anchor: *local_anchor,
            mode: *mode,
        }
    }

    /// Режим последнего latched тика (для семантики cancel)
    pub fn active_mode(&self) -> Option<PullMode> {
        match self.phase {
            GrapplePhase::Latched { mode, .. } => Some(mode),
            _ => None,
        }
    }

    /// Any active phase → Idle. Возвращает `None`, если уже Idle.
    pub fn release(&mut self, exit: GrappleExit) -> Option<GrappleExit> {
        if self.is_idle() {
            return None;
        }

        self.phase = GrapplePhase::Idle;
        if exit.applies_cooldown() {
            self.cooldown_remaining = self.config.cooldown;
        }
        Some(exit)
    }

    /// Zero step_offset на время latch (сохранить оригинал один раз)
    pub fn save_step_offset(&mut self, step_offset: &mut f32) {
        if self.saved_step_offset.is_none() {
            self.saved_step_offset = Some(*step_offset);
        }
        *step_offset = 0.0;
    }

    pub fn restore_step_offset(&mut self, step_offset: &mut f32) {
        if let Some(saved) = self.saved_step_offset.take() {
            *step_offset = saved;
        }
    }
}

pub fn pull_mode(puller_grounded: bool) -> PullMode {
    if puller_grounded {
        PullMode::PullTarget
    } else {
        PullMode::PullPuller
    }
}

/// Вертикальная скорость, поднимающая тело на `lift_height`
pub fn pop_velocity(gravity_magnitude: f32, lift_height: f32) -> f32 {
    (2.0 * gravity_magnitude.abs() * lift_height.max(0.0)).sqrt()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AirbornePull {
    pub velocity: Vec3,
    pub finished: bool,
}

/// Airborne mode: velocity puller'а к якорю.
///
/// Горизонталь = direction × speed(distance), вертикаль easing к
/// direction.y × speed плюс слабая swing gravity.
pub fn airborne_pull(
    config: &GrappleConfig,
    puller: Vec3,
    anchor: Vec3,
    velocity: Vec3,
    dt: f32,
) -> AirbornePull {
    let Some((direction, distance)) = safe_direction(anchor - puller) else {
        return AirbornePull {
            velocity: Vec3::ZERO,
            finished: true,
        };
    };
    if distance <= config.player_stop_distance {
        return AirbornePull {
            velocity: Vec3::ZERO,
            finished: true,
        };
    }

    let speed = (config.airborne_min_speed + config.airborne_speed_gain * distance)
        .min(config.airborne_max_speed);
    let horizontal = Vec3::new(direction.x, 0.0, direction.z) * speed;

    let target_vertical = direction.y * speed;
    let blend = 1.0 - (-config.vertical_damping * dt).exp();
    let vertical = velocity.y + (target_vertical - velocity.y) * blend + config.swing_gravity * dt;

    AirbornePull {
        velocity: horizontal + Vec3::Y * vertical,
        finished: false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroundedPull {
    /// Горизонтальная velocity цели на этот тик
    Moving { velocity: Vec3 },
    /// Позиция покоя ровно на stop distance по текущему bearing
    Arrived { rest: Vec3 },
}

/// Grounded mode: цель тянется к puller'у в горизонтальной плоскости.
///
/// Travel за тик не проскакивает stop distance: последний шаг снапает.
pub fn grounded_pull(config: &GrappleConfig, puller: Vec3, target: Vec3, dt: f32) -> GroundedPull {
    let offset = Vec3::new(target.x - puller.x, 0.0, target.z - puller.z);
    let stop = config.enemy_stop_distance;

    let Some((bearing, distance)) = safe_direction(offset) else {
        // Цель прямо над/под puller'ом: bearing не определён, оставляем на месте
        return GroundedPull::Arrived { rest: target };
    };

    let rest = Vec3::new(puller.x, target.y, puller.z) + bearing * stop;
    if distance <= stop + DISTANCE_EPSILON {
        return GroundedPull::Arrived { rest };
    }

    let travel = config.grounded_pull_speed * dt;
    if distance - travel <= stop {
        return GroundedPull::Arrived { rest };
    }

    GroundedPull::Moving {
        velocity: -bearing * config.grounded_pull_speed,
    }
}

/// World → local anchor (без учёта scale-shear)
pub fn anchor_to_local(target: &Transform, point: Vec3) -> Vec3 {
    let local = target.rotation.inverse() * (point - target.translation);
    local / target.scale.max(Vec3::splat(DISTANCE_EPSILON))
}

pub fn anchor_to_world(target: &Transform, local: Vec3) -> Vec3 {
    target.transform_point(local)
}
