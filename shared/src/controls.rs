//! Button state fed to the simulation by whatever polls the input devices.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    Left,
    Right,
    Up,
    Down,
    Jump,
    Shoot,
}

impl Button {
    pub const ALL: [Button; 6] = [
        Button::Left,
        Button::Right,
        Button::Up,
        Button::Down,
        Button::Jump,
        Button::Shoot,
    ];

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

/// Level and edge state for every button.
///
/// The host writes the level state before a tick with [`Controls::set`]; after the tick
/// [`Controls::latch`] makes the current state the "previous" one for edge queries.
#[derive(Resource, Clone, Debug, Default)]
pub struct Controls {
    held: [bool; 6],
    previous: [bool; 6],
}

impl Controls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, button: Button, down: bool) {
        self.held[button.index()] = down;
    }

    /// Release every button.
    pub fn release_all(&mut self) {
        self.held = [false; 6];
    }

    #[inline]
    pub fn held(&self, button: Button) -> bool {
        self.held[button.index()]
    }

    /// Went down since the last latch.
    pub fn pressed_now(&self, button: Button) -> bool {
        self.held[button.index()] && !self.previous[button.index()]
    }

    /// Jump is bound to both the dedicated button and "up".
    pub fn jump_held(&self) -> bool {
        self.held(Button::Jump) || self.held(Button::Up)
    }

    pub fn latch(&mut self) {
        self.previous = self.held;
    }
}
