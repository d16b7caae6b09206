use bevy::prelude::*;

use super::session::GrappleExit;

/// Событие: хук выпущен
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct GrappleFired {
    pub entity: Entity,
    pub origin: Vec3,
    pub direction: Vec3,
}

/// Событие: хук зацепился за цель
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct GrappleLatched {
    pub entity: Entity,
    pub target: Entity,
    pub anchor: Vec3,
    pub began_grounded: bool,
}

/// Событие: сессия завершилась (любой exit)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct GrappleReleased {
    pub entity: Entity,
    pub exit: GrappleExit,
}
