//! Commands for the host-side tab bar renderer.
//!
//! The renderer owns the actual widgets; it draws what these commands
//! describe and reports pointer gestures back as
//! [`crate::actor::tab_manager::TabBarInput`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::actor;
use crate::model::GroupId;
use crate::sys::geometry::{Point, Rect};
use crate::sys::window::WindowId;

pub mod tab_bar;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TabDisplay {
    pub window: WindowId,
    pub label: String,
    pub active: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MenuAction {
    LeaveGroup,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuItem {
    pub action: MenuAction,
    pub enabled: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Command {
    CreateBar(GroupId),
    DestroyBar(GroupId),
    SetBarVisible(GroupId, bool),
    SetBarFrame(GroupId, Rect),
    SetTabs(GroupId, Vec<TabDisplay>),
    ShowDropIndicator(Rect),
    HideDropIndicator,
    ShowDragClone {
        group: GroupId,
        window: WindowId,
        label: String,
        frame: Rect,
    },
    MoveDragClone(Point),
    DestroyDragClone,
    ShowContextMenu {
        group: GroupId,
        window: WindowId,
        position: Point,
        items: Vec<MenuItem>,
    },
    DismissContextMenu,
}

/// Tearing down a transient visual that is already gone. Never affects
/// group state; callers log it and move on.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CleanupError {
    #[error("drag clone was already destroyed")]
    CloneGone,
    #[error("context menu was already dismissed")]
    MenuGone,
}

pub type Sender = actor::Sender<Command>;
pub type Receiver = actor::Receiver<Command>;
