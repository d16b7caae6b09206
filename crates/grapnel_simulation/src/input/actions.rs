//! Action-based input backend
//!
//! Хост (движок, сеть, тест) пишет именованные действия в `ActionState`;
//! backend выводит edges сам и потребляет look delta за тик.

use bevy::prelude::*;

use super::{InputFrame, InputSource};

/// Digital actions the core understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum ButtonAction {
    Sprint = 0,
    Jump = 1,
    Dash = 2,
    Fire = 3,
    Grapple = 4,
}

impl ButtonAction {
    pub const COUNT: usize = 5;
}

/// Current action values written by the host
#[derive(Resource, Debug, Clone, Default, PartialEq, Reflect)]
#[reflect(Resource)]
pub struct ActionState {
    pub move_axis: Vec2,
    /// Накопленный look delta (обнуляется при sample)
    pub look_delta: Vec2,
    held: [bool; ButtonAction::COUNT],
}

impl ActionState {
    pub fn press(&mut self, action: ButtonAction) {
        self.held[action as usize] = true;
    }

    pub fn release(&mut self, action: ButtonAction) {
        self.held[action as usize] = false;
    }

    pub fn set(&mut self, action: ButtonAction, held: bool) {
        self.held[action as usize] = held;
    }

    pub fn is_held(&self, action: ButtonAction) -> bool {
        self.held[action as usize]
    }

    pub fn add_look(&mut self, delta: Vec2) {
        self.look_delta += delta;
    }

    pub fn release_all(&mut self) {
        self.held = [false; ButtonAction::COUNT];
        self.move_axis = Vec2::ZERO;
        self.look_delta = Vec2::ZERO;
    }
}

#[derive(Debug, Default)]
pub struct ActionMapInput {
    previous: [bool; ButtonAction::COUNT],
}

impl InputSource for ActionMapInput {
    fn sample(&mut self, world: &mut World) -> InputFrame {
        let Some(mut actions) = world.get_resource_mut::<ActionState>() else {
            return InputFrame::default();
        };

        let held = actions.held;
        let mut frame = InputFrame::buttons_from(&self.previous, &held);
        frame.move_axis = actions.move_axis;
        frame.look_delta = std::mem::take(&mut actions.look_delta);

        self.previous = held;
        frame
    }

    fn name(&self) -> &'static str {
        "action_map"
    }
}
