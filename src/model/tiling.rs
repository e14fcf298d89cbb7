//! Work areas and half-screen tiling detection.

use crate::sys::geometry::{IsWithin, Rect, RectExt};
use crate::sys::window::WindowState;

/// Which half of the work area a tiled window occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileSide {
    Left,
    Right,
}

/// The usable screen regions reported by the host, one per monitor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkAreas(Vec<Rect>);

impl WorkAreas {
    pub fn new(areas: Vec<Rect>) -> Self { WorkAreas(areas) }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &Rect> { self.0.iter() }

    /// The area containing the centre of `frame`, else the one it overlaps
    /// most, else the first one. With no areas known the frame itself is used.
    pub fn for_frame(&self, frame: Rect) -> Rect {
        let center = frame.mid();
        if let Some(area) = self.0.iter().find(|area| area.contains(center)) {
            return *area;
        }
        let overlapping = self
            .0
            .iter()
            .map(|area| (area, area.intersection(&frame).area()))
            .filter(|(_, overlap)| *overlap > 0.0)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(area, _)| *area);
        overlapping.or_else(|| self.0.first().copied()).unwrap_or(frame)
    }
}

/// Returns the tiled side if `frame` fills the full height and half the
/// width of `work_area`, within `tolerance` pixels on every edge.
pub fn tile_side(frame: Rect, work_area: Rect, tolerance: f64) -> Option<TileSide> {
    let half_width = work_area.size.width / 2.0;
    if !frame.size.height.is_within(tolerance, work_area.size.height)
        || !frame.size.width.is_within(tolerance, half_width)
        || !frame.origin.y.is_within(tolerance, work_area.origin.y)
    {
        return None;
    }
    if frame.origin.x.is_within(tolerance, work_area.origin.x) {
        Some(TileSide::Left)
    } else if frame.origin.x.is_within(tolerance, work_area.origin.x + half_width) {
        Some(TileSide::Right)
    } else {
        None
    }
}

/// Tiled windows are never minimized or maximized; maximization wins.
pub fn is_window_tiled(window: &WindowState, work_areas: &WorkAreas, tolerance: f64) -> bool {
    if window.is_minimized || window.maximized.is_maximized() {
        return false;
    }
    tile_side(window.frame, work_areas.for_frame(window.frame), tolerance).is_some()
}
