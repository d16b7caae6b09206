//! Legacy keyboard/mouse backend
//!
//! Оси собираются из клавиш (WASD), кнопки - клавиши или кнопки мыши,
//! look - AccumulatedMouseMotion. Нужен Bevy InputPlugin; без него
//! backend inert (одно предупреждение).

use bevy::input::mouse::AccumulatedMouseMotion;
use bevy::prelude::*;

use super::{ButtonAction, InputFrame, InputSource};
use crate::logger::LogOnce;

/// Key or mouse button bound to an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Key(KeyCode),
    Mouse(MouseButton),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegacyBindings {
    pub forward: KeyCode,
    pub back: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
    pub sprint: Binding,
    pub jump: Binding,
    pub dash: Binding,
    pub fire: Binding,
    pub grapple: Binding,
    pub look_scale: f32,
}

impl Default for LegacyBindings {
    fn default() -> Self {
        Self {
            forward: KeyCode::KeyW,
            back: KeyCode::KeyS,
            left: KeyCode::KeyA,
            right: KeyCode::KeyD,
            sprint: Binding::Key(KeyCode::ShiftLeft),
            jump: Binding::Key(KeyCode::Space),
            dash: Binding::Key(KeyCode::KeyQ),
            fire: Binding::Mouse(MouseButton::Left),
            grapple: Binding::Mouse(MouseButton::Right),
            look_scale: 1.0,
        }
    }
}

impl LegacyBindings {
    fn binding(&self, action: ButtonAction) -> Binding {
        match action {
            ButtonAction::Sprint => self.sprint,
            ButtonAction::Jump => self.jump,
            ButtonAction::Dash => self.dash,
            ButtonAction::Fire => self.fire,
            ButtonAction::Grapple => self.grapple,
        }
    }
}

#[derive(Debug, Default)]
pub struct KeyboardMouseInput {
    pub bindings: LegacyBindings,
    previous: [bool; ButtonAction::COUNT],
    missing_input: LogOnce,
}

impl KeyboardMouseInput {
    pub fn new(bindings: LegacyBindings) -> Self {
        Self {
            bindings,
            ..default()
        }
    }
}

fn key_axis(keys: &ButtonInput<KeyCode>, negative: KeyCode, positive: KeyCode) -> f32 {
    let mut value = 0.0;
    if keys.pressed(positive) {
        value += 1.0;
    }
    if keys.pressed(negative) {
        value -= 1.0;
    }
    value
}

impl InputSource for KeyboardMouseInput {
    fn sample(&mut self, world: &mut World) -> InputFrame {
        let (Some(keys), Some(mouse)) = (
            world.get_resource::<ButtonInput<KeyCode>>(),
            world.get_resource::<ButtonInput<MouseButton>>(),
        ) else {
            self.missing_input.warn(|| {
                "⚠️ KeyboardMouseInput: ButtonInput resources missing (InputPlugin not added)".to_string()
            });
            return InputFrame::default();
        };

        let actions = [
            ButtonAction::Sprint,
            ButtonAction::Jump,
            ButtonAction::Dash,
            ButtonAction::Fire,
            ButtonAction::Grapple,
        ];
        let mut held = [false; ButtonAction::COUNT];
        for action in actions {
            // just_pressed: короткий тап между двумя fixed тиками не теряется
            held[action as usize] = match self.bindings.binding(action) {
                Binding::Key(key) => keys.pressed(key) || keys.just_pressed(key),
                Binding::Mouse(button) => mouse.pressed(button) || mouse.just_pressed(button),
            };
        }

        let mut frame = InputFrame::buttons_from(&self.previous, &held);
        frame.move_axis = Vec2::new(
            key_axis(keys, self.bindings.left, self.bindings.right),
            key_axis(keys, self.bindings.back, self.bindings.forward),
        );
        frame.look_delta = world
            .get_resource::<AccumulatedMouseMotion>()
            .map(|motion| motion.delta * self.bindings.look_scale)
            .unwrap_or_default();

        self.previous = held;
        frame
    }

    fn name(&self) -> &'static str {
        "keyboard_mouse"
    }
}
