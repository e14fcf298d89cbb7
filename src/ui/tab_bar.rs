//! The model of one group's tab bar: tab order and labels, where the bar
//! sits, and what the pointer is doing on it.

use std::time::{Duration, Instant};

use tracing::trace;

use super::{Command, Sender, TabDisplay};
use crate::model::GroupId;
use crate::model::subscription::{Signal, Subscriptions};
use crate::sys::geometry::{Point, Rect, RectExt, Round, SameAs};
use crate::sys::window::{WindowId, WindowState};

/// Shown for windows whose title is empty.
pub const FALLBACK_LABEL: &str = "Window";

pub fn tab_label(title: &str) -> String {
    let title = title.trim();
    if title.is_empty() { FALLBACK_LABEL.to_owned() } else { title.to_owned() }
}

/// Where the bar for a group should be drawn.
///
/// Maximized windows get a bar spanning the whole work-area top. Tiled
/// windows get one at the work-area top limited to the window's width.
/// Everything else gets a bar sitting directly above the window.
pub fn bar_frame(anchor: &WindowState, work_area: Rect, tiled: bool, height: f64) -> Rect {
    let frame = anchor.frame;
    let rect = if anchor.maximized.is_maximized() {
        Rect::from_xywh(work_area.origin.x, work_area.origin.y, work_area.size.width, height)
    } else if tiled {
        Rect::from_xywh(frame.origin.x, work_area.origin.y, frame.size.width, height)
    } else {
        Rect::from_xywh(frame.origin.x, frame.origin.y - height, frame.size.width, height)
    };
    rect.round()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tab {
    pub window: WindowId,
    pub label: String,
}

/// What part of the bar is under a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarHit {
    Tab(usize),
    CloseGroup,
}

/// Per-bar pointer state. `Up` and `Click` are terminal and fall back to
/// `None` when the tab-state reset timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TabPointer {
    #[default]
    None,
    Down {
        tab: WindowId,
        origin: Point,
    },
    Drag {
        tab: WindowId,
        origin: Point,
    },
    Up {
        tab: WindowId,
    },
    Click {
        tab: WindowId,
    },
}

impl TabPointer {
    pub fn is_terminal(&self) -> bool { matches!(self, TabPointer::Up { .. } | TabPointer::Click { .. }) }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerOutcome {
    Ignored,
    Pending,
    DragStarted(WindowId),
    Dragging(WindowId),
    Clicked(WindowId),
    Dropped(WindowId),
}

#[derive(Debug)]
pub struct TabBarView {
    group: GroupId,
    tabs: Vec<Tab>,
    active: Option<WindowId>,
    visible: bool,
    frame: Rect,
    pointer: TabPointer,
    last_reorder: Option<(WindowId, Instant)>,
    titles: Subscriptions,
}

impl TabBarView {
    pub fn new(group: GroupId, ui: &Sender) -> Self {
        ui.send(Command::CreateBar(group));
        TabBarView {
            group,
            tabs: Vec::new(),
            active: None,
            visible: false,
            frame: Rect::ZERO,
            pointer: TabPointer::None,
            last_reorder: None,
            titles: Subscriptions::default(),
        }
    }

    pub fn tabs(&self) -> &[Tab] { &self.tabs }

    pub fn active(&self) -> Option<WindowId> { self.active }

    pub fn is_visible(&self) -> bool { self.visible }

    pub fn frame(&self) -> Rect { self.frame }

    pub fn pointer(&self) -> TabPointer { self.pointer }

    pub fn titles(&self) -> &Subscriptions { &self.titles }

    pub fn index_of(&self, window: WindowId) -> Option<usize> {
        self.tabs.iter().position(|t| t.window == window)
    }

    pub fn label(&self, window: WindowId) -> Option<&str> {
        self.tabs.iter().find(|t| t.window == window).map(|t| t.label.as_str())
    }

    pub fn add_tab(&mut self, window: WindowId, title: &str, ui: &Sender) {
        if self.index_of(window).is_some() {
            return;
        }
        self.tabs.push(Tab { window, label: tab_label(title) });
        self.titles.subscribe(window, &[Signal::Title]);
        self.publish(ui);
    }

    pub fn remove_tab(&mut self, window: WindowId, ui: &Sender) {
        let Some(index) = self.index_of(window) else { return };
        self.tabs.remove(index);
        self.titles.release(window);
        if self.active == Some(window) {
            self.active = None;
        }
        if matches!(self.pointer, TabPointer::Down { tab, .. } | TabPointer::Drag { tab, .. } if tab == window)
        {
            self.pointer = TabPointer::None;
        }
        self.publish(ui);
    }

    pub fn set_label(&mut self, window: WindowId, title: &str, ui: &Sender) {
        let label = tab_label(title);
        let Some(tab) = self.tabs.iter_mut().find(|t| t.window == window) else { return };
        if tab.label != label {
            tab.label = label;
            self.publish(ui);
        }
    }

    pub fn set_active(&mut self, window: Option<WindowId>, ui: &Sender) {
        if self.active != window {
            self.active = window;
            self.publish(ui);
        }
    }

    /// Moves `window`'s tab to `to`, keeping the rest in order.
    pub fn move_tab(&mut self, window: WindowId, to: usize, ui: &Sender) -> bool {
        let Some(from) = self.index_of(window) else { return false };
        let to = to.min(self.tabs.len() - 1);
        if from == to {
            return false;
        }
        let tab = self.tabs.remove(from);
        self.tabs.insert(to, tab);
        self.publish(ui);
        true
    }

    pub fn set_visible(&mut self, visible: bool, ui: &Sender) {
        if self.visible != visible {
            self.visible = visible;
            ui.send(Command::SetBarVisible(self.group, visible));
        }
    }

    pub fn set_frame(&mut self, frame: Rect, ui: &Sender) {
        if !self.frame.same_as(frame) {
            self.frame = frame;
            ui.send(Command::SetBarFrame(self.group, frame));
        }
    }

    pub fn destroy(&mut self, ui: &Sender) {
        self.titles.release_all();
        self.pointer = TabPointer::None;
        ui.send(Command::DestroyBar(self.group));
    }

    fn publish(&self, ui: &Sender) {
        let tabs = self
            .tabs
            .iter()
            .map(|t| TabDisplay {
                window: t.window,
                label: t.label.clone(),
                active: Some(t.window) == self.active,
            })
            .collect();
        ui.send(Command::SetTabs(self.group, tabs));
    }

    // Layout. Tabs split the bar evenly, leaving a square close-group
    // button at the right end.

    fn close_button_width(&self) -> f64 { self.frame.size.height.min(self.frame.size.width) }

    fn tab_strip(&self) -> Rect {
        let mut strip = self.frame;
        strip.size.width -= self.close_button_width();
        strip
    }

    pub fn close_button_rect(&self) -> Rect {
        let width = self.close_button_width();
        Rect::from_xywh(
            self.frame.max().x - width,
            self.frame.origin.y,
            width,
            self.frame.size.height,
        )
    }

    pub fn tab_rect(&self, index: usize) -> Option<Rect> {
        if index >= self.tabs.len() {
            return None;
        }
        let strip = self.tab_strip();
        let width = strip.size.width / self.tabs.len() as f64;
        let start = (strip.origin.x + index as f64 * width).round();
        let end = (strip.origin.x + (index + 1) as f64 * width).round();
        Some(Rect::from_xywh(start, strip.origin.y, end - start, strip.size.height))
    }

    pub fn hit(&self, point: Point) -> Option<BarHit> {
        if !self.frame.contains(point) {
            return None;
        }
        if self.close_button_rect().contains(point) {
            return Some(BarHit::CloseGroup);
        }
        let strip = self.tab_strip();
        if self.tabs.is_empty() || strip.size.width <= 0.0 {
            return None;
        }
        let width = strip.size.width / self.tabs.len() as f64;
        let index = ((point.x - strip.origin.x) / width).floor() as usize;
        (index < self.tabs.len()).then_some(BarHit::Tab(index))
    }

    pub fn contains(&self, point: Point) -> bool { self.frame.contains(point) }

    // Pointer state machine.

    /// A press on a tab. Accepted unless a gesture is already in progress.
    pub fn pointer_pressed(&mut self, tab: WindowId, position: Point) -> bool {
        if self.index_of(tab).is_none() {
            return false;
        }
        match self.pointer {
            TabPointer::None | TabPointer::Up { .. } | TabPointer::Click { .. } => {
                self.pointer = TabPointer::Down { tab, origin: position };
                self.last_reorder = None;
                true
            }
            TabPointer::Down { .. } | TabPointer::Drag { .. } => false,
        }
    }

    pub fn pointer_moved(&mut self, position: Point, threshold: f64) -> PointerOutcome {
        match self.pointer {
            TabPointer::Down { tab, origin } if origin.distance(position) > threshold => {
                trace!(?tab, "tab drag started");
                self.pointer = TabPointer::Drag { tab, origin };
                PointerOutcome::DragStarted(tab)
            }
            TabPointer::Down { .. } => PointerOutcome::Pending,
            TabPointer::Drag { tab, .. } => PointerOutcome::Dragging(tab),
            _ => PointerOutcome::Ignored,
        }
    }

    pub fn pointer_released(&mut self) -> PointerOutcome {
        match self.pointer {
            TabPointer::Down { tab, .. } => {
                self.pointer = TabPointer::Click { tab };
                PointerOutcome::Clicked(tab)
            }
            TabPointer::Drag { tab, .. } => {
                self.pointer = TabPointer::Up { tab };
                PointerOutcome::Dropped(tab)
            }
            _ => PointerOutcome::Ignored,
        }
    }

    /// Clears a terminal pointer state. Returns whether anything changed.
    pub fn settle_pointer(&mut self) -> bool {
        if self.pointer.is_terminal() {
            self.pointer = TabPointer::None;
            true
        } else {
            false
        }
    }

    /// The index `tab` should move to while dragged over `position`, if the
    /// pointer has crossed the midpoint of another tab.
    ///
    /// Swapping against the same target again is held off for `cooldown`;
    /// a different target may swap immediately.
    pub fn reorder_target(
        &mut self,
        tab: WindowId,
        position: Point,
        now: Instant,
        cooldown: Duration,
    ) -> Option<usize> {
        let from = self.index_of(tab)?;
        let Some(BarHit::Tab(to)) = self.hit(position) else { return None };
        if to == from {
            return None;
        }
        let mid = self.tab_rect(to)?.mid().x;
        let crossed = if to > from { position.x > mid } else { position.x < mid };
        if !crossed {
            return None;
        }
        let target = self.tabs[to].window;
        if let Some((last, at)) = self.last_reorder
            && last == target
            && now.saturating_duration_since(at) < cooldown
        {
            return None;
        }
        self.last_reorder = Some((target, now));
        Some(to)
    }
}
