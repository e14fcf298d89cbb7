//! Requests to the host window manager.

use serde::{Deserialize, Serialize};

use crate::actor;
use crate::sys::geometry::Rect;
use crate::sys::window::{MaximizeState, Opacity, WindowId};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Request {
    /// Move and resize. Frames outside the visible screen are allowed.
    SetFrame(WindowId, Rect),
    SetMaximized(WindowId, MaximizeState),
    SetOpacity(WindowId, Opacity),
    /// Raise and focus.
    Activate(WindowId),
    /// Show a transient notice to the user.
    Notify(String),
}

pub type Sender = actor::Sender<Request>;
pub type Receiver = actor::Receiver<Request>;
