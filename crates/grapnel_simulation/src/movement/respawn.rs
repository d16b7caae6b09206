//! Kill-plane respawn sequencing
//!
//! Вместо корутины - явная фаза, которую двигает LocomotionState::tick:
//! Suspended (коллайдер выключен, движение стоит) → teleport → Grace.

use bevy::prelude::*;

/// Сколько тиков движение стоит перед teleport
pub const RESPAWN_SUSPEND_TICKS: u32 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub enum RespawnPhase {
    #[default]
    Inactive,
    Suspended { ticks_remaining: u32 },
    /// После teleport: kill plane не срабатывает повторно
    Grace { remaining: f32 },
}

impl RespawnPhase {
    pub fn begin() -> Self {
        Self::Suspended {
            ticks_remaining: RESPAWN_SUSPEND_TICKS,
        }
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self, Self::Suspended { .. })
    }

    pub fn is_grace(&self) -> bool {
        matches!(self, Self::Grace { .. })
    }

    /// Advance the suspended phase by one tick.
    ///
    /// `None` - не suspended; `Some(false)` - ждём дальше;
    /// `Some(true)` - пора телепортировать.
    pub fn advance(&mut self) -> Option<bool> {
        match self {
            Self::Suspended { ticks_remaining } if *ticks_remaining > 1 => {
                *ticks_remaining -= 1;
                Some(false)
            }
            Self::Suspended { .. } => Some(true),
            _ => None,
        }
    }

    pub fn tick_grace(&mut self, dt: f32) {
        if let Self::Grace { remaining } = self {
            *remaining -= dt;
            if *remaining <= 0.0 {
                *self = Self::Inactive;
            }
        }
    }
}

/// Explicit respawn point (приоритетнее last safe position)
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct RespawnAnchor(pub Vec3);
