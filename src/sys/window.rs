use serde::{Deserialize, Serialize};

use crate::sys::geometry::Rect;

/// Host-assigned window identity. Stable for the lifetime of the window.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

impl WindowId {
    pub const fn new(id: u64) -> WindowId { WindowId(id) }
}

impl std::fmt::Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "w{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    #[default]
    Normal,
    Dialog,
    Utility,
    Other,
}

/// Maximization along each axis. Tiling is derived from geometry separately,
/// see [`crate::model::tiling`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MaximizeState {
    #[default]
    None,
    Horizontal,
    Vertical,
    Both,
}

impl MaximizeState {
    pub fn from_flags(horizontal: bool, vertical: bool) -> MaximizeState {
        match (horizontal, vertical) {
            (false, false) => MaximizeState::None,
            (true, false) => MaximizeState::Horizontal,
            (false, true) => MaximizeState::Vertical,
            (true, true) => MaximizeState::Both,
        }
    }

    pub fn horizontal(self) -> bool { matches!(self, MaximizeState::Horizontal | MaximizeState::Both) }

    pub fn vertical(self) -> bool { matches!(self, MaximizeState::Vertical | MaximizeState::Both) }

    pub fn is_maximized(self) -> bool { self != MaximizeState::None }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Opacity {
    #[default]
    Full,
    Transparent,
}

/// Snapshot of a window as reported by the host when it appears.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WindowInfo {
    pub title: String,
    pub frame: Rect,
    #[serde(default)]
    pub kind: WindowKind,
    #[serde(default)]
    pub is_minimized: bool,
    #[serde(default)]
    pub maximized: MaximizeState,
    #[serde(default)]
    pub is_focused: bool,
    #[serde(default = "showing")]
    pub is_showing: bool,
}

fn showing() -> bool { true }

/// The manager's mirror of a host window. Updated only from host events,
/// except `opacity`, which records what was last requested.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowState {
    pub title: String,
    pub frame: Rect,
    pub kind: WindowKind,
    pub is_minimized: bool,
    pub maximized: MaximizeState,
    pub is_focused: bool,
    pub is_showing: bool,
    pub opacity: Opacity,
}

impl WindowState {
    pub fn is_normal(&self) -> bool { self.kind == WindowKind::Normal }

    /// Normal, on screen, not minimized and not hidden behind an opaque tab.
    pub fn is_drop_candidate(&self) -> bool {
        self.is_showing && !self.is_minimized && self.opacity == Opacity::Full
    }
}

impl From<WindowInfo> for WindowState {
    fn from(info: WindowInfo) -> Self {
        WindowState {
            title: info.title,
            frame: info.frame,
            kind: info.kind,
            is_minimized: info.is_minimized,
            maximized: info.maximized,
            is_focused: info.is_focused,
            is_showing: info.is_showing,
            opacity: Opacity::Full,
        }
    }
}
