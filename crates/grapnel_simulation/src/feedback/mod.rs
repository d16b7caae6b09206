//! Feedback sink: damage numbers, tracers, decals, rope
//!
//! Fire-and-forget: core пишет события и никогда не ждёт их обработки.
//! Рендер / UI слой подписывается через `EventReader<FeedbackEvent>`.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub enum FeedbackEvent {
    /// Одно число на цель за выстрел (усреднённая точка попаданий)
    DamageNumber {
        target: Entity,
        position: Vec3,
        amount: f32,
        crit: bool,
    },
    Impact {
        position: Vec3,
        normal: Vec3,
    },
    Tracer {
        from: Vec3,
        to: Vec3,
    },
    /// Попадание в не-damageable поверхность
    Decal {
        surface: Entity,
        position: Vec3,
        normal: Vec3,
    },
    RopeAttached {
        owner: Entity,
        target: Entity,
        anchor: Vec3,
    },
    RopeCleared {
        owner: Entity,
    },
}

/// Explicitly injected feedback writer
#[derive(SystemParam)]
pub struct FeedbackSink<'w> {
    events: EventWriter<'w, FeedbackEvent>,
}

impl FeedbackSink<'_> {
    pub fn emit(&mut self, event: FeedbackEvent) {
        self.events.write(event);
    }

    pub fn damage_number(&mut self, target: Entity, position: Vec3, amount: f32, crit: bool) {
        self.emit(FeedbackEvent::DamageNumber {
            target,
            position,
            amount,
            crit,
        });
    }

    pub fn tracer(&mut self, from: Vec3, to: Vec3) {
        self.emit(FeedbackEvent::Tracer { from, to });
    }

    pub fn rope_attached(&mut self, owner: Entity, target: Entity, anchor: Vec3) {
        self.emit(FeedbackEvent::RopeAttached {
            owner,
            target,
            anchor,
        });
    }

    pub fn rope_cleared(&mut self, owner: Entity) {
        self.emit(FeedbackEvent::RopeCleared { owner });
    }
}

pub struct FeedbackPlugin;

impl Plugin for FeedbackPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<FeedbackEvent>();
    }
}
