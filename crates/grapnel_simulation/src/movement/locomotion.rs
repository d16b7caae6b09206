//! Locomotion state machine (player character controller)
//!
//! Приоритет: Respawning > ControlsLocked > обычное движение.
//! Look/camera обрабатывается всегда.
//!
//! Тик (когда не locked/respawning):
//! 1. planar input → target velocity
//! 2. foot probe + post-jump lock → stable grounded
//! 3. stable: coyote/air-jumps reset, stick velocity
//! 4. jump (coyote → air jump), jump buffer
//! 5. gravity + terminal speed
//! 6. dash + exponential damping
//! 7. один collide-and-slide move
//! 8. kill plane → respawn

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::respawn::RespawnPhase;
use crate::components::{layers, Abilities, CharacterMotor, CollisionLayers};
use crate::input::InputFrame;
use crate::logger::LogOnce;
use crate::physics::{PhysicsQueries, ProbeShape, ShapeFilter};

/// Dash скорость ниже этого порога обнуляется
const DASH_REST_SPEED: f32 = 0.01;

/// Locomotion tuning (per character)
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Reflect)]
#[reflect(Component)]
#[serde(default)]
pub struct LocomotionConfig {
    pub walk_speed: f32,
    pub sprint_speed: f32,
    /// Отрицательное значение (m/s²)
    pub gravity: f32,
    pub jump_height: f32,
    pub max_air_jumps: u32,
    pub coyote_time: f32,
    pub jump_buffer_time: f32,
    pub post_jump_lock_time: f32,
    /// Vertical speed выше этого - не stable grounded (апекс прыжка)
    pub grounded_epsilon: f32,
    pub stick_velocity: f32,
    pub terminal_fall_speed: f32,
    pub dash_force: f32,
    pub dash_damping: f32,
    pub dash_cooldown: f32,
    pub foot_probe_radius: f32,
    pub foot_probe_offset: f32,
    pub ground_mask: u32,
    pub solid_mask: u32,
    /// Радиан на единицу look delta
    pub look_sensitivity: f32,
    pub pitch_limit: f32,
    pub kill_plane_y: f32,
    pub respawn_grace: f32,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            walk_speed: 6.0,
            sprint_speed: 10.0,
            gravity: -20.0,
            jump_height: 1.6,
            max_air_jumps: 1,
            coyote_time: 0.125,
            jump_buffer_time: 0.125,
            post_jump_lock_time: 0.1,
            grounded_epsilon: 0.1,
            stick_velocity: -2.0,
            terminal_fall_speed: 40.0,
            dash_force: 18.0,
            dash_damping: 8.0,
            dash_cooldown: 0.6,
            foot_probe_radius: 0.3,
            foot_probe_offset: 0.08,
            ground_mask: layers::GROUND,
            solid_mask: layers::CHARACTER_SOLID,
            look_sensitivity: 0.003,
            pitch_limit: 85f32.to_radians(),
            kill_plane_y: -30.0,
            respawn_grace: 0.5,
        }
    }
}

impl LocomotionConfig {
    pub fn gravity_magnitude(&self) -> f32 {
        self.gravity.abs()
    }

    /// sqrt(2·|g|·h) - одинаково для coyote и air jump
    pub fn jump_velocity(&self) -> f32 {
        (2.0 * self.gravity_magnitude() * self.jump_height).sqrt()
    }

    /// Clamp designer values into a usable range.
    pub fn normalized(mut self) -> Self {
        self.gravity = -self.gravity.abs();
        self.jump_height = self.jump_height.max(0.0);
        self.walk_speed = self.walk_speed.max(0.0);
        self.sprint_speed = self.sprint_speed.max(self.walk_speed);
        self.coyote_time = self.coyote_time.max(0.0);
        self.jump_buffer_time = self.jump_buffer_time.max(0.0);
        self.post_jump_lock_time = self.post_jump_lock_time.max(0.0);
        self.stick_velocity = -self.stick_velocity.abs();
        self.terminal_fall_speed = self.terminal_fall_speed.abs();
        self.dash_damping = self.dash_damping.max(0.0);
        self.dash_cooldown = self.dash_cooldown.max(0.0);
        self.foot_probe_radius = self.foot_probe_radius.max(0.01);
        self.pitch_limit = self.pitch_limit.clamp(0.0, std::f32::consts::FRAC_PI_2);
        self.respawn_grace = self.respawn_grace.max(0.0);
        self
    }
}

/// Per-tick locomotion input (already sampled from the input backend)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LocomotionInput {
    /// x = right, y = forward
    pub move_axis: Vec2,
    pub look_delta: Vec2,
    pub sprint: bool,
    pub jump_pressed: bool,
    pub dash_pressed: bool,
}

impl From<&InputFrame> for LocomotionInput {
    fn from(frame: &InputFrame) -> Self {
        Self {
            move_axis: frame.move_axis,
            look_delta: frame.look_delta,
            sprint: frame.sprint.held,
            jump_pressed: frame.jump.pressed,
            dash_pressed: frame.dash.pressed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect, Serialize, Deserialize)]
pub enum JumpKind {
    /// Stable ground или coyote window
    Ground,
    Air,
}

/// Camera look angles
#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub struct LookState {
    pub yaw: f32,
    pub pitch: f32,
}

impl LookState {
    pub fn apply(&mut self, delta: Vec2, config: &LocomotionConfig) {
        self.yaw -= delta.x * config.look_sensitivity;
        self.pitch = (self.pitch - delta.y * config.look_sensitivity)
            .clamp(-config.pitch_limit, config.pitch_limit);
    }

    pub fn body_rotation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw)
    }

    /// Full camera rotation (yaw + pitch)
    pub fn view_rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }
}

/// What happened during one tick (events are raised by the system)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepOutcome {
    pub jump: Option<JumpKind>,
    pub dash: Option<Vec3>,
    pub landed: bool,
    pub respawn_started: Option<Vec3>,
    pub respawned: Option<Vec3>,
}

/// Everything one tick needs besides the state itself
pub struct TickContext<'a> {
    pub queries: &'a dyn PhysicsQueries,
    pub entity: Entity,
    pub shape: ProbeShape,
    pub bottom_offset: f32,
    pub motor: CharacterMotor,
    pub abilities: Abilities,
    pub respawn_anchor: Option<Vec3>,
    pub dt: f32,
}

/// Locomotion state (exclusively owned by the controller)
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct LocomotionState {
    pub vertical_velocity: f32,
    pub dash_velocity: Vec3,
    pub planar_velocity: Vec3,
    /// `None` = coyote window истёк; прыжок с земли разрешён пока `Some(t ≥ 0)`
    pub coyote_timer: Option<f32>,
    pub jump_buffer_timer: f32,
    pub post_jump_lock_timer: f32,
    pub air_jumps_used: u32,
    pub dash_cooldown: f32,
    pub controls_locked: bool,
    pub stable_grounded: bool,
    pub look: LookState,
    pub respawn: RespawnPhase,
    pub spawn_position: Vec3,
    pub last_safe_position: Option<Vec3>,
    #[reflect(ignore)]
    pub missing_collider: LogOnce,
}

impl Default for LocomotionState {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}

impl LocomotionState {
    pub fn new(spawn_position: Vec3) -> Self {
        Self {
            vertical_velocity: 0.0,
            dash_velocity: Vec3::ZERO,
            planar_velocity: Vec3::ZERO,
            coyote_timer: None,
            jump_buffer_timer: 0.0,
            post_jump_lock_timer: 0.0,
            air_jumps_used: 0,
            dash_cooldown: 0.0,
            controls_locked: false,
            stable_grounded: false,
            look: LookState::default(),
            respawn: RespawnPhase::Inactive,
            spawn_position,
            last_safe_position: None,
            missing_collider: LogOnce::default(),
        }
    }

    pub fn is_respawning(&self) -> bool {
        self.respawn.is_suspended()
    }

    /// Current world velocity produced by the controller
    pub fn velocity(&self) -> Vec3 {
        self.planar_velocity + self.dash_velocity + Vec3::Y * self.vertical_velocity
    }

    /// The only lock entry point for external systems (grapple).
    ///
    /// Lock обнуляет vertical/dash velocity и все jump-таймеры атомарно с флагом.
    pub fn set_controls_locked(&mut self, locked: bool) {
        if locked {
            self.clear_motion();
        }
        self.controls_locked = locked;
    }

    fn clear_motion(&mut self) {
        self.vertical_velocity = 0.0;
        self.dash_velocity = Vec3::ZERO;
        self.planar_velocity = Vec3::ZERO;
        self.coyote_timer = None;
        self.jump_buffer_timer = 0.0;
        self.post_jump_lock_timer = 0.0;
    }

    /// Advance one fixed tick.
    pub fn tick(
        &mut self,
        config: &LocomotionConfig,
        ctx: &TickContext,
        input: &LocomotionInput,
        transform: &mut Transform,
        collision: &mut CollisionLayers,
    ) -> StepOutcome {
        let mut outcome = StepOutcome::default();
        let dt = ctx.dt;

        // Look - всегда, даже locked/respawning
        self.look.apply(input.look_delta, config);
        transform.rotation = self.look.body_rotation();

        self.dash_cooldown = (self.dash_cooldown - dt).max(0.0);

        match self.respawn.advance() {
            Some(true) => {
                let target = ctx
                    .respawn_anchor
                    .or(self.last_safe_position)
                    .unwrap_or(self.spawn_position);
                transform.translation = target;
                collision.enabled = true;
                self.clear_motion();
                self.air_jumps_used = 0;
                self.dash_cooldown = 0.0;
                self.stable_grounded = false;
                self.respawn = RespawnPhase::Grace {
                    remaining: config.respawn_grace,
                };
                outcome.respawned = Some(target);
                return outcome;
            }
            Some(false) => return outcome,
            None => {}
        }

        if self.controls_locked {
            return outcome;
        }

        // 1. planar target velocity
        let axis = input.move_axis.clamp_length_max(1.0);
        let planar_direction = transform.rotation * Vec3::new(axis.x, 0.0, -axis.y);
        let speed = if input.sprint {
            config.sprint_speed
        } else {
            config.walk_speed
        };
        self.planar_velocity = planar_direction * speed;

        // 2. foot probe
        let position = transform.translation;
        let probe_grounded = self.foot_probe(config, ctx, position);
        let jump_locked_out = self.post_jump_lock_timer > 0.0;
        self.post_jump_lock_timer = (self.post_jump_lock_timer - dt).max(0.0);
        let stable = probe_grounded
            && !jump_locked_out
            && self.vertical_velocity <= config.grounded_epsilon;

        if stable && !self.stable_grounded {
            outcome.landed = true;
        }
        self.stable_grounded = stable;

        // 3. coyote / air jumps / stick
        if stable {
            self.coyote_timer = Some(config.coyote_time);
            self.air_jumps_used = 0;
            if self.vertical_velocity < 0.0 {
                self.vertical_velocity = config.stick_velocity;
            }
            if !self.respawn.is_suspended() {
                self.last_safe_position = Some(position);
            }
        } else {
            self.coyote_timer = self
                .coyote_timer
                .map(|timer| timer - dt)
                .filter(|timer| *timer >= 0.0);
        }

        // 4. jump
        if input.jump_pressed {
            self.jump_buffer_timer = config.jump_buffer_time;
        }
        if self.jump_buffer_timer > 0.0 {
            if self.coyote_timer.is_some() {
                self.coyote_timer = None;
                outcome.jump = Some(JumpKind::Ground);
            } else if self.air_jumps_used < config.max_air_jumps {
                self.air_jumps_used += 1;
                outcome.jump = Some(JumpKind::Air);
            }

            if outcome.jump.is_some() {
                self.vertical_velocity = config.jump_velocity();
                self.jump_buffer_timer = 0.0;
                self.post_jump_lock_timer = config.post_jump_lock_time;
                self.stable_grounded = false;
            }
        }
        self.jump_buffer_timer = (self.jump_buffer_timer - dt).max(0.0);

        // 5. gravity (тик старта прыжка отдаёт чистую sqrt(2gh))
        if outcome.jump.is_none() {
            self.vertical_velocity = (self.vertical_velocity + config.gravity * dt)
                .max(-config.terminal_fall_speed);
        }

        // 6. dash
        if input.dash_pressed && ctx.abilities.dash && self.dash_cooldown <= 0.0 {
            let direction = planar_direction
                .try_normalize()
                .unwrap_or(transform.rotation * Vec3::NEG_Z);
            self.dash_velocity = direction * config.dash_force;
            self.dash_cooldown = config.dash_cooldown;
            outcome.dash = Some(direction);
        } else {
            self.dash_velocity *= (-config.dash_damping * dt).exp();
            if self.dash_velocity.length() < DASH_REST_SPEED {
                self.dash_velocity = Vec3::ZERO;
            }
        }

        // 7. один collide-and-slide move
        let motion = (self.planar_velocity + self.dash_velocity) * dt
            + Vec3::Y * self.vertical_velocity * dt;
        let filter = ShapeFilter::mask(config.solid_mask).excluding(ctx.entity);
        let slide = ctx.queries.move_and_slide(
            ctx.shape,
            position,
            motion,
            ctx.motor.step_offset,
            ctx.motor.skin_width,
            &filter,
        );
        transform.translation = slide.position;
        if slide.hit_ceiling && self.vertical_velocity > 0.0 {
            self.vertical_velocity = 0.0;
        }

        // 8. kill plane
        self.respawn.tick_grace(dt);
        if !self.respawn.is_grace() && transform.translation.y < config.kill_plane_y {
            outcome.respawn_started = Some(transform.translation);
            self.respawn = RespawnPhase::begin();
            collision.enabled = false;
            self.clear_motion();
        }

        outcome
    }

    fn foot_probe(&self, config: &LocomotionConfig, ctx: &TickContext, position: Vec3) -> bool {
        let radius = config.foot_probe_radius;
        let bottom = position.y - ctx.bottom_offset;
        let center = Vec3::new(position.x, bottom + radius - config.foot_probe_offset, position.z);
        let filter = ShapeFilter::mask(config.ground_mask).excluding(ctx.entity);
        ctx.queries.overlap_sphere(center, radius, &filter).is_some()
    }
}
