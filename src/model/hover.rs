//! Hover-to-reveal for tab bars that are hidden because their group is
//! maximized or tiled.

use crate::common::collections::HashSet;
use crate::model::GroupId;
use crate::sys::geometry::{Point, Rect, RectExt};

/// The region that reveals a hidden bar: a thin band along the top of the
/// work area, restricted to the window's horizontal extent when the window
/// is tiled. Once the bar is shown the bar itself also counts, so moving
/// onto it does not hide it again.
pub fn in_reveal_area(
    pointer: Point,
    work_area: Rect,
    window: Rect,
    tiled: bool,
    band: f64,
    bar: Option<Rect>,
) -> bool {
    if let Some(bar) = bar
        && bar.contains(pointer)
    {
        return true;
    }
    let (left, right) = if tiled {
        (window.origin.x, window.max().x)
    } else {
        (work_area.origin.x, work_area.max().x)
    };
    let top = work_area.origin.y;
    pointer.x >= left && pointer.x <= right && pointer.y >= top && pointer.y <= top + band
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverAction {
    Nothing,
    StartDebounce,
    CancelDebounce,
    Reveal,
    Hide,
}

/// Per-group hover state. Armed only while the bar is hidden by policy;
/// `forced_visible` is set while a hover has revealed it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoverReveal {
    armed: bool,
    forced_visible: bool,
}

impl HoverReveal {
    pub fn is_armed(&self) -> bool { self.armed }

    pub fn is_forced_visible(&self) -> bool { self.forced_visible }

    /// Returns true if the hover poll needs starting.
    pub fn arm(&mut self) -> bool { !std::mem::replace(&mut self.armed, true) }

    /// Returns true if the bar was force-shown and must be hidden.
    pub fn disarm(&mut self) -> bool {
        self.armed = false;
        std::mem::take(&mut self.forced_visible)
    }

    /// Feeds one pointer sample.
    ///
    /// `immediate` skips the debounce; it is set when another tiled group
    /// already has its bar revealed.
    pub fn sample(&mut self, in_area: bool, debounce_pending: bool, immediate: bool) -> HoverAction {
        if !self.armed {
            return HoverAction::Nothing;
        }
        match (in_area, self.forced_visible) {
            (true, true) => HoverAction::Nothing,
            (true, false) if immediate => self.reveal(),
            (true, false) if debounce_pending => HoverAction::Nothing,
            (true, false) => HoverAction::StartDebounce,
            (false, true) => {
                self.forced_visible = false;
                HoverAction::Hide
            }
            (false, false) if debounce_pending => HoverAction::CancelDebounce,
            (false, false) => HoverAction::Nothing,
        }
    }

    /// The debounce ran out; reveal if the pointer is still in place.
    pub fn debounce_elapsed(&mut self, in_area: bool) -> HoverAction {
        if self.armed && in_area && !self.forced_visible {
            self.reveal()
        } else {
            HoverAction::Nothing
        }
    }

    fn reveal(&mut self) -> HoverAction {
        self.forced_visible = true;
        HoverAction::Reveal
    }
}

/// Groups whose tiled bar is currently hover-revealed. While any group is
/// in here, hovering another tiled group reveals its bar without delay.
#[derive(Debug, Default)]
pub struct TiledMode {
    groups: HashSet<GroupId>,
}

impl TiledMode {
    pub fn is_active(&self) -> bool { !self.groups.is_empty() }

    pub fn contains(&self, group: GroupId) -> bool { self.groups.contains(&group) }

    pub fn enter(&mut self, group: GroupId) -> bool { self.groups.insert(group) }

    pub fn leave(&mut self, group: GroupId) -> bool { self.groups.remove(&group) }

    pub fn len(&self) -> usize { self.groups.len() }
}
