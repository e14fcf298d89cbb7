use std::cell::Cell;
use std::rc::Rc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::sys::geometry::Point;

bitflags! {
    #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[serde(transparent)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0000_0001;
        const CONTROL = 0b0000_0010;
        const ALT = 0b0000_0100;
        const META = 0b0000_1000;
        const SUPER = 0b0001_0000;
    }
}

impl Modifiers {
    /// Modifiers that arm grouping when `require_modifier` is set.
    pub const GROUPING: Modifiers =
        Modifiers::CONTROL.union(Modifiers::META).union(Modifiers::SUPER);

    pub fn arms_grouping(self) -> bool { self.intersects(Modifiers::GROUPING) }
}

bitflags! {
    #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[serde(transparent)]
    pub struct MouseButtons: u8 {
        const PRIMARY = 0b001;
        const MIDDLE = 0b010;
        const SECONDARY = 0b100;
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Primary,
    Middle,
    Secondary,
}

impl From<MouseButton> for MouseButtons {
    fn from(button: MouseButton) -> MouseButtons {
        match button {
            MouseButton::Primary => MouseButtons::PRIMARY,
            MouseButton::Middle => MouseButtons::MIDDLE,
            MouseButton::Secondary => MouseButtons::SECONDARY,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum MouseState {
    Up = 1,
    Down = 2,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerState {
    pub position: Point,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub buttons: MouseButtons,
}

impl PointerState {
    pub fn at(position: Point) -> PointerState {
        PointerState { position, ..Default::default() }
    }

    pub fn primary_state(&self) -> MouseState {
        if self.buttons.contains(MouseButtons::PRIMARY) {
            MouseState::Down
        } else {
            MouseState::Up
        }
    }
}

/// Current pointer position, modifier mask and button mask, read on demand.
pub trait PointerSource {
    fn pointer_state(&self) -> PointerState;
}

/// Pointer state written by whoever owns the host connection and read by
/// the manager's polling timers.
#[derive(Clone, Default, Debug)]
pub struct SharedPointer(Rc<Cell<PointerState>>);

impl SharedPointer {
    pub fn new() -> Self { Self::default() }

    pub fn set(&self, state: PointerState) { self.0.set(state); }

    pub fn move_to(&self, position: Point) {
        let mut state = self.0.get();
        state.position = position;
        self.0.set(state);
    }

    pub fn set_modifiers(&self, modifiers: Modifiers) {
        let mut state = self.0.get();
        state.modifiers = modifiers;
        self.0.set(state);
    }

    pub fn set_buttons(&self, buttons: MouseButtons) {
        let mut state = self.0.get();
        state.buttons = buttons;
        self.0.set(state);
    }
}

impl PointerSource for SharedPointer {
    fn pointer_state(&self) -> PointerState { self.0.get() }
}
