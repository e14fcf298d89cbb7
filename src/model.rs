//! Group state and the policies that keep grouped windows in step.

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::actor::host::{self, Request};
use crate::common::collections::HashMap;
use crate::common::config::Settings;
use crate::sys::timer::Timers;
use crate::sys::window::{Opacity, WindowId, WindowState};
use crate::ui;

pub mod group;
pub mod hover;
pub mod registry;
pub mod subscription;
pub mod tiling;

pub use group::{SyncKind, SyncState, WindowGroup};
pub use registry::{GroupRegistry, InvariantViolation};

slotmap::new_key_type! {
    pub struct GroupId;
}

/// Every one-shot timer the manager runs. A key is pending at most once;
/// rescheduling it supersedes the earlier deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    SyncSettle(GroupId, SyncKind),
    HoverPoll(GroupId),
    HoverDebounce(GroupId),
    TiledModeRelease(GroupId),
    TabStateReset(GroupId),
    MoveEnd(GroupId),
    ModifierPoll,
    GesturePoll,
}

impl TimerKind {
    pub fn group(&self) -> Option<GroupId> {
        match *self {
            TimerKind::SyncSettle(g, _)
            | TimerKind::HoverPoll(g)
            | TimerKind::HoverDebounce(g)
            | TimerKind::TiledModeRelease(g)
            | TimerKind::TabStateReset(g)
            | TimerKind::MoveEnd(g) => Some(g),
            TimerKind::ModifierPoll | TimerKind::GesturePoll => None,
        }
    }
}

/// User actions refused because of the current group state. The message
/// is shown to the user as is.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GroupError {
    #[error("Cannot close the only tab in a group")]
    SoleTab,
    #[error("Cannot leave a group with only one window")]
    SingleWindowGroup,
    #[error("Window {0} is not in a group")]
    NotGrouped(WindowId),
    #[error("No such group")]
    UnknownGroup,
}

/// Everything outside the registry that group operations read or drive.
pub struct Ctx<'a> {
    pub windows: &'a mut HashMap<WindowId, WindowState>,
    pub work_areas: &'a tiling::WorkAreas,
    pub settings: &'a Settings,
    pub timers: &'a mut Timers<TimerKind>,
    pub tiled_mode: &'a mut hover::TiledMode,
    pub host: &'a host::Sender,
    pub ui: &'a ui::Sender,
    pub now: Instant,
}

impl Ctx<'_> {
    pub fn window(&self, id: WindowId) -> Option<&WindowState> { self.windows.get(&id) }

    pub fn is_minimized(&self, id: WindowId) -> bool {
        self.windows.get(&id).is_some_and(|w| w.is_minimized)
    }

    pub fn is_tiled(&self, id: WindowId) -> bool {
        self.windows.get(&id).is_some_and(|w| {
            tiling::is_window_tiled(w, self.work_areas, self.settings.tiling.tolerance)
        })
    }

    pub fn after(&self, delay: Duration) -> Instant { self.now + delay }

    /// Requests `opacity` for `id` unless that is already what was asked for
    /// last.
    pub fn set_opacity(&mut self, id: WindowId, opacity: Opacity) {
        let Some(window) = self.windows.get_mut(&id) else { return };
        if window.opacity != opacity {
            window.opacity = opacity;
            self.host.send(Request::SetOpacity(id, opacity));
        }
    }
}
