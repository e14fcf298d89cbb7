//! Which window a drag would drop onto.

use crate::common::collections::{HashMap, HashSet};
use crate::sys::geometry::{Point, RectExt};
use crate::sys::window::{WindowId, WindowState};

/// Windows top to bottom. `stacking` is bottom to top as reported by the
/// host; windows it does not mention sit below it, newest first.
fn top_down<'a>(
    stacking: &'a [WindowId],
    windows: &'a HashMap<WindowId, WindowState>,
) -> impl Iterator<Item = WindowId> + 'a {
    let stacked: HashSet<WindowId> = stacking.iter().copied().collect();
    let mut rest: Vec<WindowId> =
        windows.keys().copied().filter(|w| !stacked.contains(w)).collect();
    rest.sort_unstable_by(|a, b| b.cmp(a));
    stacking.iter().rev().copied().filter(|w| windows.contains_key(w)).chain(rest)
}

/// The topmost visible window under `point`, ignoring `exclude`.
///
/// Windows are visited from the top of the stack down and the first one
/// containing the point decides. It is only a target if it is a normal
/// window; anything else covering the point hides the windows below.
pub fn window_under(
    point: Point,
    stacking: &[WindowId],
    windows: &HashMap<WindowId, WindowState>,
    exclude: &[WindowId],
) -> Option<WindowId> {
    let hit = top_down(stacking, windows).find(|w| {
        !exclude.contains(w)
            && windows.get(w).is_some_and(|s| s.is_drop_candidate() && s.frame.contains(point))
    })?;
    windows.get(&hit).filter(|s| s.is_normal()).map(|_| hit)
}

/// The window being moved by the host, and the target currently shown
/// by the drop indicator. Only one window is dragged at a time.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WindowDrag {
    dragged: Option<WindowId>,
    indicated: Option<WindowId>,
}

impl WindowDrag {
    pub fn dragged(&self) -> Option<WindowId> { self.dragged }

    pub fn indicated(&self) -> Option<WindowId> { self.indicated }

    pub fn is_dragging(&self, window: WindowId) -> bool { self.dragged == Some(window) }

    /// Refused while another window is being dragged.
    pub fn begin(&mut self, window: WindowId) -> bool {
        if self.dragged.is_some_and(|w| w != window) {
            return false;
        }
        self.dragged = Some(window);
        true
    }

    /// Records the indicated target, returning whether it changed.
    pub fn indicate(&mut self, target: Option<WindowId>) -> bool {
        std::mem::replace(&mut self.indicated, target) != target
    }

    pub fn reset(&mut self) { *self = WindowDrag::default(); }
}
