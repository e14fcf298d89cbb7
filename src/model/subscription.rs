use strum_macros::EnumIter;

use crate::sys::window::WindowId;

/// Window notifications a group can listen to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Signal {
    Position,
    Size,
    Focus,
    Minimized,
    Maximized,
    Title,
    Destroyed,
}

/// The notifications a group member is subscribed to while it is grouped.
/// Title changes belong to the tab bar and are subscribed separately.
pub const MEMBER_SIGNALS: &[Signal] = &[
    Signal::Position,
    Signal::Size,
    Signal::Focus,
    Signal::Minimized,
    Signal::Maximized,
    Signal::Destroyed,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    pub window: WindowId,
    pub signal: Signal,
}

/// Subscription handles owned by one group. Every handle added for a
/// window is released when that window leaves or the group dissolves.
#[derive(Debug, Default)]
pub struct Subscriptions(Vec<Subscription>);

impl Subscriptions {
    pub fn subscribe(&mut self, window: WindowId, signals: &[Signal]) {
        for &signal in signals {
            if !self.contains(window, signal) {
                self.0.push(Subscription { window, signal });
            }
        }
    }

    pub fn contains(&self, window: WindowId, signal: Signal) -> bool {
        self.0.iter().any(|s| s.window == window && s.signal == signal)
    }

    /// Drops every handle for `window`, returning how many were held.
    pub fn release(&mut self, window: WindowId) -> usize {
        let before = self.0.len();
        self.0.retain(|s| s.window != window);
        before - self.0.len()
    }

    pub fn release_all(&mut self) -> usize {
        let released = self.0.len();
        self.0.clear();
        released
    }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn len(&self) -> usize { self.0.len() }
}
