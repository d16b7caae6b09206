//! Locomotion events
//!
//! Генерируются drive_locomotion по StepOutcome. Потребители -
//! feedback/audio/анимация снаружи ядра и тесты.

use bevy::prelude::*;

use super::locomotion::JumpKind;

/// Event: прыжок выдан (ground/coyote или air jump)
#[derive(Event, Debug, Clone, Copy)]
pub struct Jumped {
    pub entity: Entity,
    pub kind: JumpKind,
    /// Вертикальная скорость на тике прыжка
    pub velocity: f32,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct Dashed {
    pub entity: Entity,
    pub direction: Vec3,
}

/// Event: переход airborne → stable grounded
#[derive(Event, Debug, Clone, Copy)]
pub struct Landed {
    pub entity: Entity,
    pub position: Vec3,
}

/// Event: упал ниже kill plane, коллайдер выключен
#[derive(Event, Debug, Clone, Copy)]
pub struct RespawnStarted {
    pub entity: Entity,
    pub position: Vec3,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct Respawned {
    pub entity: Entity,
    pub position: Vec3,
}
