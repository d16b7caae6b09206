//! Input capability
//!
//! Ядро не знает про конкретные биндинги: раз в тик `InputSource`
//! отдаёт `InputFrame` (оси + кнопки с edges), `sample_player_input`
//! кладёт его в `PlayerInput` каждого игрока.
//!
//! Реализации (выбираются при создании `InputBackend`):
//! - `KeyboardMouseInput` - legacy оси/клавиши поверх Bevy `ButtonInput`
//! - `ActionMapInput` - именованные действия в `ActionState`

pub mod actions;
pub mod legacy;

use bevy::prelude::*;

use crate::components::Player;
use crate::SimulationSet;

pub use actions::{ActionMapInput, ActionState, ButtonAction};
pub use legacy::{Binding, KeyboardMouseInput, LegacyBindings};

/// Edges of a digital button for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Reflect)]
pub struct ButtonState {
    pub pressed: bool,
    pub held: bool,
    pub released: bool,
}

impl ButtonState {
    /// Edges from the previous and current held state
    pub fn derive(previous: bool, held: bool) -> Self {
        Self {
            pressed: held && !previous,
            held,
            released: !held && previous,
        }
    }
}

/// Everything the core reads from input in one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub struct InputFrame {
    /// x = right, y = forward; длина ≤ 1 после clamp в locomotion
    pub move_axis: Vec2,
    pub look_delta: Vec2,
    pub sprint: ButtonState,
    pub jump: ButtonState,
    pub dash: ButtonState,
    pub fire: ButtonState,
    pub grapple: ButtonState,
}

impl InputFrame {
    pub fn buttons_from(previous: &[bool; ButtonAction::COUNT], held: &[bool; ButtonAction::COUNT]) -> Self {
        let edge = |action: ButtonAction| {
            let index = action as usize;
            ButtonState::derive(previous[index], held[index])
        };

        Self {
            sprint: edge(ButtonAction::Sprint),
            jump: edge(ButtonAction::Jump),
            dash: edge(ButtonAction::Dash),
            fire: edge(ButtonAction::Fire),
            grapple: edge(ButtonAction::Grapple),
            ..default()
        }
    }
}

/// Input capability: one frame per simulation tick.
pub trait InputSource: Send + Sync + 'static {
    fn sample(&mut self, world: &mut World) -> InputFrame;

    fn name(&self) -> &'static str;
}

/// Выбранный backend (один на приложение)
#[derive(Resource)]
pub struct InputBackend {
    source: Box<dyn InputSource>,
}

impl InputBackend {
    pub fn new(source: impl InputSource) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    pub fn keyboard_mouse() -> Self {
        Self::new(KeyboardMouseInput::default())
    }

    pub fn action_map() -> Self {
        Self::new(ActionMapInput::default())
    }

    pub fn name(&self) -> &'static str {
        self.source.name()
    }
}

/// Per-tick input of a controlled character
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct PlayerInput {
    pub frame: InputFrame,
}

/// Exclusive system: InputBackend → PlayerInput (SimulationSet::Input)
pub fn sample_player_input(world: &mut World) {
    if !world.contains_resource::<InputBackend>() {
        return;
    }

    world.resource_scope(|world, mut backend: Mut<InputBackend>| {
        let frame = backend.source.sample(world);

        let mut players = world.query_filtered::<&mut PlayerInput, With<Player>>();
        for mut input in players.iter_mut(world) {
            input.frame = frame;
        }
    });
}

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<PlayerInput>()
            .init_resource::<ActionState>()
            .add_systems(FixedUpdate, sample_player_input.in_set(SimulationSet::Input));

        if !app.world().contains_resource::<InputBackend>() {
            app.insert_resource(InputBackend::action_map());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_edges() {
        assert_eq!(
            ButtonState::derive(false, true),
            ButtonState {
                pressed: true,
                held: true,
                released: false
            }
        );
        assert_eq!(
            ButtonState::derive(true, true),
            ButtonState {
                pressed: false,
                held: true,
                released: false
            }
        );
        assert_eq!(
            ButtonState::derive(true, false),
            ButtonState {
                pressed: false,
                held: false,
                released: true
            }
        );
        assert_eq!(ButtonState::derive(false, false), ButtonState::default());
    }
}
