//! Collide-and-slide для character/body движения.
//!
//! Классический slide move: sweep по motion, при контакте - срезаем
//! компоненту движения в плоскость и продолжаем остатком. Дополнительно
//! step-up на `step_offset` когда упёрлись в стену.

use bevy::prelude::*;

use super::queries::{safe_direction, PhysicsQueries, ProbeShape, ShapeFilter};

/// Maximum number of sweeps per move.
const MAX_SLIDE_ITERATIONS: usize = 4;

/// Нормаль с y >= этого порога считается полом
pub const FLOOR_MIN_NORMAL_Y: f32 = 0.7;

/// Нормаль с y <= этого порога считается потолком
pub const CEILING_MAX_NORMAL_Y: f32 = -0.7;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SlideOutcome {
    pub position: Vec3,
    pub hit_floor: bool,
    pub hit_ceiling: bool,
    pub hit_wall: bool,
    pub floor_normal: Option<Vec3>,
    pub stepped_up: bool,
}

impl SlideOutcome {
    fn record_contact(&mut self, normal: Vec3) {
        if normal.y >= FLOOR_MIN_NORMAL_Y {
            self.hit_floor = true;
            self.floor_normal = Some(normal);
        } else if normal.y <= CEILING_MAX_NORMAL_Y {
            self.hit_ceiling = true;
        } else {
            self.hit_wall = true;
        }
    }
}

/// Clip velocity against a surface normal.
///
/// `overbounce` > 1 слегка отталкивает от поверхности, чтобы не залипать.
pub fn clip_velocity(velocity: Vec3, normal: Vec3, overbounce: f32) -> Vec3 {
    let backoff = velocity.dot(normal);

    let adjusted_backoff = if backoff < 0.0 {
        backoff * overbounce
    } else {
        backoff / overbounce
    };

    velocity - normal * adjusted_backoff
}

pub fn move_and_slide<Q: PhysicsQueries + ?Sized>(
    queries: &Q,
    shape: ProbeShape,
    position: Vec3,
    motion: Vec3,
    step_offset: f32,
    skin_width: f32,
    filter: &ShapeFilter,
) -> SlideOutcome {
    let mut outcome = SlideOutcome::default();
    outcome.position = slide_pass(queries, shape, position, motion, skin_width, filter, &mut outcome);

    let horizontal = Vec3::new(motion.x, 0.0, motion.z);
    if !outcome.hit_wall || step_offset <= 0.0 || horizontal.length_squared() < 1e-8 {
        return outcome;
    }

    if let Some(stepped) = try_step_up(
        queries,
        shape,
        position,
        motion,
        step_offset,
        skin_width,
        filter,
    ) {
        let plain_progress = flat_distance(position, outcome.position);
        let stepped_progress = flat_distance(position, stepped.position);
        if stepped_progress > plain_progress + skin_width {
            return stepped;
        }
    }

    outcome
}

fn slide_pass<Q: PhysicsQueries + ?Sized>(
    queries: &Q,
    shape: ProbeShape,
    start: Vec3,
    motion: Vec3,
    skin_width: f32,
    filter: &ShapeFilter,
    outcome: &mut SlideOutcome,
) -> Vec3 {
    let mut position = start;
    let mut remaining = motion;
    let mut planes: Vec<Vec3> = Vec::with_capacity(MAX_SLIDE_ITERATIONS);

    for _ in 0..MAX_SLIDE_ITERATIONS {
        let Some((direction, distance)) = safe_direction(remaining) else {
            break;
        };

        let Some(hit) = queries.shape_cast(shape, position, direction, distance + skin_width, filter)
        else {
            position += remaining;
            break;
        };

        // Стартовали внутри геометрии - выталкиваем по нормали
        if hit.penetration > 0.0 {
            position += hit.normal * (hit.penetration + skin_width);
        }

        let travel = (hit.distance - skin_width).clamp(0.0, distance);
        position += direction * travel;
        outcome.record_contact(hit.normal);

        remaining = direction * (distance - travel);
        if remaining.dot(hit.normal) < 0.0 {
            remaining = clip_velocity(remaining, hit.normal, 1.0);
        }

        // Складка двух плоскостей: скользим вдоль их пересечения
        for previous in &planes {
            if remaining.dot(*previous) < 0.0 {
                let crease = previous.cross(hit.normal).normalize_or_zero();
                remaining = crease * remaining.dot(crease);
            }
        }
        planes.push(hit.normal);
    }

    position
}

fn try_step_up<Q: PhysicsQueries + ?Sized>(
    queries: &Q,
    shape: ProbeShape,
    start: Vec3,
    motion: Vec3,
    step_offset: f32,
    skin_width: f32,
    filter: &ShapeFilter,
) -> Option<SlideOutcome> {
    // 1. вверх на step_offset (или сколько позволяет потолок)
    let up = match queries.shape_cast(shape, start, Vec3::Y, step_offset + skin_width, filter) {
        Some(hit) => (hit.distance - skin_width).max(0.0),
        None => step_offset,
    };
    if up <= skin_width {
        return None;
    }
    let raised = start + Vec3::Y * up;

    // 2. горизонтальный slide с поднятой позиции
    let mut outcome = SlideOutcome::default();
    let horizontal = Vec3::new(motion.x, 0.0, motion.z);
    let advanced = slide_pass(queries, shape, raised, horizontal, skin_width, filter, &mut outcome);

    // 3. опускаемся обратно: ступенька валидна только если под ногами пол
    let drop = up + motion.y.min(0.0).abs() + skin_width;
    let hit = queries.shape_cast(shape, advanced, Vec3::NEG_Y, drop + skin_width, filter)?;
    if hit.normal.y < FLOOR_MIN_NORMAL_Y {
        return None;
    }

    let landed = advanced + Vec3::NEG_Y * (hit.distance - skin_width).max(0.0);
    Some(SlideOutcome {
        position: landed,
        hit_floor: true,
        hit_ceiling: outcome.hit_ceiling,
        hit_wall: outcome.hit_wall,
        floor_normal: Some(hit.normal),
        stepped_up: true,
    })
}

fn flat_distance(a: Vec3, b: Vec3) -> f32 {
    Vec2::new(b.x - a.x, b.z - a.z).length()
}
