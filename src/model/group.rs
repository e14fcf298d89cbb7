use std::mem;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::hover::{HoverAction, HoverReveal, in_reveal_area};
use super::subscription::{MEMBER_SIGNALS, Signal, Subscriptions};
use super::{Ctx, GroupId, TimerKind};
use crate::actor::host::Request;
use crate::sys::geometry::{Point, Rect, SameAs};
use crate::sys::window::{MaximizeState, Opacity, WindowId};
use crate::ui::tab_bar::{TabBarView, bar_frame};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncKind {
    Position,
    Maximize,
}

/// Re-entrancy guard for one kind of sync. While `Syncing`, the echoes of
/// our own requests are not propagated again. It holds what was applied so
/// the settle timer can tell whether the source moved on in the meantime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncState<T> {
    Idle,
    Syncing(T),
}

impl<T> SyncState<T> {
    pub fn is_syncing(&self) -> bool { matches!(self, SyncState::Syncing(_)) }
}

/// Windows shown as tabs of one tab bar. Only the active member is opaque;
/// the others sit transparent at the same geometry underneath it.
#[derive(Debug)]
pub struct WindowGroup {
    id: GroupId,
    windows: Vec<WindowId>,
    active: Option<WindowId>,
    tab_bar: TabBarView,
    subscriptions: Subscriptions,
    position_sync: SyncState<Rect>,
    maximize_sync: SyncState<MaximizeState>,
    hover: HoverReveal,
}

impl WindowGroup {
    pub fn new(id: GroupId, cx: &mut Ctx) -> Self {
        WindowGroup {
            id,
            windows: Vec::new(),
            active: None,
            tab_bar: TabBarView::new(id, cx.ui),
            subscriptions: Subscriptions::default(),
            position_sync: SyncState::Idle,
            maximize_sync: SyncState::Idle,
            hover: HoverReveal::default(),
        }
    }

    pub fn id(&self) -> GroupId { self.id }

    pub fn windows(&self) -> &[WindowId] { &self.windows }

    pub fn len(&self) -> usize { self.windows.len() }

    pub fn is_empty(&self) -> bool { self.windows.is_empty() }

    pub fn contains(&self, window: WindowId) -> bool { self.windows.contains(&window) }

    pub fn active(&self) -> Option<WindowId> { self.active }

    pub fn tab_bar(&self) -> &TabBarView { &self.tab_bar }

    pub fn tab_bar_mut(&mut self) -> &mut TabBarView { &mut self.tab_bar }

    pub fn subscriptions(&self) -> &Subscriptions { &self.subscriptions }

    pub fn hover(&self) -> HoverReveal { self.hover }

    pub fn is_syncing(&self, kind: SyncKind) -> bool {
        match kind {
            SyncKind::Position => self.position_sync.is_syncing(),
            SyncKind::Maximize => self.maximize_sync.is_syncing(),
        }
    }

    /// Whether this group listens to `signal` from `window`.
    pub fn is_subscribed(&self, window: WindowId, signal: Signal) -> bool {
        self.subscriptions.contains(window, signal) || self.tab_bar.titles().contains(window, signal)
    }

    /// The member the bar and the hover band are placed against: the active
    /// window, or the first member that is not minimized.
    pub fn reference_window(&self, cx: &Ctx) -> Option<WindowId> {
        self.active
            .filter(|&w| !cx.is_minimized(w))
            .or_else(|| self.windows.iter().copied().find(|&w| !cx.is_minimized(w)))
    }

    pub fn add_window(&mut self, window: WindowId, cx: &mut Ctx) {
        if self.contains(window) {
            return;
        }
        let Some(state) = cx.window(window) else {
            warn!(?window, "Cannot add unknown window to group");
            return;
        };
        let title = state.title.clone();
        let minimized = state.is_minimized;

        self.windows.push(window);
        self.subscriptions.subscribe(window, MEMBER_SIGNALS);
        self.tab_bar.add_tab(window, &title, cx.ui);

        match self.active.filter(|&a| a != window && !cx.is_minimized(a)) {
            Some(active) => {
                if !minimized {
                    self.match_geometry(window, active, cx);
                }
            }
            None => {
                if self.active.is_none() || !minimized {
                    self.active = Some(window);
                }
            }
        }
        debug!(group = ?self.id, ?window, members = self.windows.len(), "Added window to group");

        self.tab_bar.set_active(self.active, cx.ui);
        self.update_windows_visibility(cx);
        self.update_tab_bar_visibility(cx);
    }

    /// Detaches `window`, restoring its opacity. Returns false if it was not
    /// a member. Whether the group survives is up to the registry.
    pub fn remove_window(&mut self, window: WindowId, cx: &mut Ctx) -> bool {
        let Some(index) = self.windows.iter().position(|&w| w == window) else {
            return false;
        };
        cx.set_opacity(window, Opacity::Full);
        self.windows.remove(index);
        self.subscriptions.release(window);
        self.tab_bar.remove_tab(window, cx.ui);
        if self.active == Some(window) {
            self.active = self.next_active(index, cx);
        }
        debug!(group = ?self.id, ?window, members = self.windows.len(), "Removed window from group");

        if !self.windows.is_empty() {
            self.tab_bar.set_active(self.active, cx.ui);
            self.update_windows_visibility(cx);
            self.update_tab_bar_visibility(cx);
        }
        true
    }

    /// Prefers the member that now sits at `index`, then the ones after it,
    /// skipping minimized windows where possible.
    fn next_active(&self, index: usize, cx: &Ctx) -> Option<WindowId> {
        let len = self.windows.len();
        (0..len)
            .map(|i| self.windows[(index + i) % len])
            .find(|&w| !cx.is_minimized(w))
            .or_else(|| self.windows.first().copied())
    }

    /// Moves `window` to position `to` in the tab order.
    pub fn move_window(&mut self, window: WindowId, to: usize, cx: &mut Ctx) -> bool {
        let Some(from) = self.windows.iter().position(|&w| w == window) else {
            return false;
        };
        let to = to.min(self.windows.len() - 1);
        if from == to {
            return false;
        }
        let w = self.windows.remove(from);
        self.windows.insert(to, w);
        self.tab_bar.move_tab(window, to, cx.ui);
        true
    }

    pub fn set_active(&mut self, window: WindowId, cx: &mut Ctx) -> bool {
        if !self.contains(window) {
            return false;
        }
        if self.active != Some(window) {
            debug!(group = ?self.id, ?window, "Active window changed");
        }
        self.active = Some(window);
        self.tab_bar.set_active(self.active, cx.ui);
        self.update_windows_visibility(cx);
        self.sync_window_positions(cx);
        self.update_tab_bar_position(cx);
        true
    }

    /// Makes `window` the active tab and raises it.
    pub fn activate_tab(&mut self, window: WindowId, cx: &mut Ctx) -> bool {
        if !self.set_active(window, cx) {
            return false;
        }
        cx.host.send(Request::Activate(window));
        true
    }

    /// Brings `window` to the geometry of `source`, bypassing the sync
    /// guards. Used for single windows entering the group.
    fn match_geometry(&self, window: WindowId, source: WindowId, cx: &Ctx) {
        let (Some(src), Some(dst)) = (cx.window(source), cx.window(window)) else { return };
        if src.maximized != dst.maximized {
            cx.host.send(Request::SetMaximized(window, src.maximized));
        }
        if !src.maximized.is_maximized() && !dst.frame.same_as(src.frame) {
            cx.host.send(Request::SetFrame(window, src.frame));
        }
    }

    /// Copies the active window's frame to every other member that is not
    /// minimized. Returns the number of move requests issued.
    ///
    /// Members whose maximize state differs from the active window are left
    /// to the maximize sync.
    pub fn sync_window_positions(&mut self, cx: &mut Ctx) -> usize {
        if self.position_sync.is_syncing() {
            trace!(group = ?self.id, "Position sync in flight, skipping");
            return 0;
        }
        let Some(source) = self.active else { return 0 };
        let Some(src) = cx.window(source).filter(|w| !w.is_minimized) else { return 0 };
        let (frame, maximized) = (src.frame, src.maximized);

        let mut issued = 0;
        for &w in &self.windows {
            if w == source {
                continue;
            }
            let Some(state) = cx.window(w) else { continue };
            if state.is_minimized || state.maximized != maximized || state.frame.same_as(frame) {
                continue;
            }
            cx.host.send(Request::SetFrame(w, frame));
            issued += 1;
        }
        if issued > 0 {
            trace!(group = ?self.id, ?frame, issued, "Synced positions");
            self.position_sync = SyncState::Syncing(frame);
            let settle = cx.after(cx.settings.timing.position_settle());
            cx.timers.schedule(TimerKind::SyncSettle(self.id, SyncKind::Position), settle);
        }
        issued
    }

    /// Applies `changed`'s maximize state to every other member that is not
    /// minimized. Returns the number of requests issued.
    pub fn sync_window_maximization(&mut self, changed: WindowId, cx: &mut Ctx) -> usize {
        if self.maximize_sync.is_syncing() {
            trace!(group = ?self.id, "Maximize sync in flight, skipping");
            return 0;
        }
        let Some(state) = cx.window(changed).filter(|w| !w.is_minimized).map(|w| w.maximized)
        else {
            return 0;
        };

        let mut issued = 0;
        for &w in &self.windows {
            if w == changed {
                continue;
            }
            let Some(member) = cx.window(w) else { continue };
            if member.is_minimized || member.maximized == state {
                continue;
            }
            cx.host.send(Request::SetMaximized(w, state));
            issued += 1;
        }
        if issued > 0 {
            debug!(group = ?self.id, ?state, issued, "Synced maximize state");
            self.maximize_sync = SyncState::Syncing(state);
            let settle = cx.after(cx.settings.timing.maximize_settle());
            cx.timers.schedule(TimerKind::SyncSettle(self.id, SyncKind::Maximize), settle);
        }
        issued
    }

    /// Releases a sync guard. If the active window changed again while the
    /// guard was held, the change is propagated now.
    pub fn on_sync_settled(&mut self, kind: SyncKind, cx: &mut Ctx) {
        let active = self.active.and_then(|a| cx.window(a).map(|w| (a, w.frame, w.maximized)));
        match kind {
            SyncKind::Position => {
                let SyncState::Syncing(applied) = mem::replace(&mut self.position_sync, SyncState::Idle)
                else {
                    return;
                };
                if let Some((_, frame, _)) = active
                    && !frame.same_as(applied)
                {
                    self.sync_window_positions(cx);
                }
            }
            SyncKind::Maximize => {
                let SyncState::Syncing(applied) = mem::replace(&mut self.maximize_sync, SyncState::Idle)
                else {
                    return;
                };
                if let Some((window, _, state)) = active
                    && state != applied
                {
                    self.sync_window_maximization(window, cx);
                }
                self.sync_window_positions(cx);
            }
        }
    }

    /// The active member is opaque; every other member that is not
    /// minimized is made transparent.
    pub fn update_windows_visibility(&mut self, cx: &mut Ctx) {
        let active = self.active.filter(|&a| !cx.is_minimized(a));
        for &w in &self.windows {
            if cx.is_minimized(w) {
                continue;
            }
            let opacity = if Some(w) == active { Opacity::Full } else { Opacity::Transparent };
            cx.set_opacity(w, opacity);
        }
    }

    pub fn update_tab_bar_visibility(&mut self, cx: &mut Ctx) {
        let live: Vec<WindowId> =
            self.windows.iter().copied().filter(|&w| !cx.is_minimized(w)).collect();
        if live.is_empty() {
            self.disarm_hover(cx);
            self.tab_bar.set_visible(false, cx.ui);
            return;
        }

        let focused = self.windows.iter().any(|&w| cx.window(w).is_some_and(|s| s.is_focused));
        let any_tiled = live.iter().any(|&w| cx.is_tiled(w));
        let any_maximized = live
            .iter()
            .any(|&w| cx.window(w).is_some_and(|s| s.maximized.is_maximized()));

        let hover_reveal = if focused { any_maximized || any_tiled } else { any_tiled };
        let visible = if hover_reveal {
            self.arm_hover(cx);
            self.hover.is_forced_visible()
        } else {
            self.disarm_hover(cx);
            focused
        };
        self.tab_bar.set_visible(visible, cx.ui);
        self.update_tab_bar_position(cx);
    }

    pub fn update_tab_bar_position(&mut self, cx: &mut Ctx) {
        let Some(anchor) = self.reference_window(cx) else { return };
        let Some(state) = cx.window(anchor) else { return };
        let area = cx.work_areas.for_frame(state.frame);
        let frame = bar_frame(state, area, cx.is_tiled(anchor), cx.settings.tab_bar.height);
        self.tab_bar.set_frame(frame, cx.ui);
    }

    // Member events. The registry routes these only to the owning group.

    pub fn on_frame_changed(&mut self, window: WindowId, cx: &mut Ctx) {
        if self.active != Some(window) {
            return;
        }
        self.sync_window_positions(cx);
        self.update_tab_bar_position(cx);
        let at = cx.after(cx.settings.timing.move_end());
        cx.timers.schedule(TimerKind::MoveEnd(self.id), at);
    }

    pub fn on_move_end(&mut self, cx: &mut Ctx) { self.update_tab_bar_visibility(cx); }

    pub fn on_maximize_changed(&mut self, window: WindowId, cx: &mut Ctx) {
        self.sync_window_maximization(window, cx);
        self.update_tab_bar_visibility(cx);
    }

    pub fn on_focused(&mut self, window: WindowId, cx: &mut Ctx) {
        if self.contains(window) && self.active != Some(window) && !cx.is_minimized(window) {
            self.set_active(window, cx);
        }
        self.update_tab_bar_visibility(cx);
    }

    pub fn on_minimized(&mut self, window: WindowId, cx: &mut Ctx) {
        if self.active == Some(window) {
            let next = self.windows.iter().copied().find(|&w| w != window && !cx.is_minimized(w));
            if let Some(next) = next {
                self.active = Some(next);
                self.tab_bar.set_active(self.active, cx.ui);
            }
        }
        self.update_windows_visibility(cx);
        self.update_tab_bar_visibility(cx);
    }

    pub fn on_deminimized(&mut self, window: WindowId, cx: &mut Ctx) {
        match self.active.filter(|&a| a != window && !cx.is_minimized(a)) {
            Some(active) => self.match_geometry(window, active, cx),
            None => {
                self.active = Some(window);
                self.tab_bar.set_active(self.active, cx.ui);
            }
        }
        self.update_windows_visibility(cx);
        self.update_tab_bar_visibility(cx);
    }

    pub fn on_title_changed(&mut self, window: WindowId, cx: &mut Ctx) {
        let Some(title) = cx.window(window).map(|w| w.title.clone()) else { return };
        self.tab_bar.set_label(window, &title, cx.ui);
    }

    // Hover reveal.

    fn arm_hover(&mut self, cx: &mut Ctx) {
        if self.hover.arm() {
            trace!(group = ?self.id, "Hover reveal armed");
            let at = cx.after(cx.settings.timing.hover_poll());
            cx.timers.schedule(TimerKind::HoverPoll(self.id), at);
        }
    }

    fn disarm_hover(&mut self, cx: &mut Ctx) {
        let was_forced = self.hover.disarm();
        cx.timers.cancel(TimerKind::HoverPoll(self.id));
        cx.timers.cancel(TimerKind::HoverDebounce(self.id));
        if was_forced {
            self.release_tiled_mode(cx);
        }
    }

    fn pointer_in_reveal_area(&self, pointer: Point, cx: &Ctx) -> (bool, bool) {
        let Some(anchor) = self.reference_window(cx) else { return (false, false) };
        let Some(state) = cx.window(anchor) else { return (false, false) };
        let tiled = cx.is_tiled(anchor);
        let area = cx.work_areas.for_frame(state.frame);
        let bar = self.hover.is_forced_visible().then(|| self.tab_bar.frame());
        let band = cx.settings.tab_bar.hover_band;
        (in_reveal_area(pointer, area, state.frame, tiled, band, bar), tiled)
    }

    /// One tick of the hover poll.
    pub fn on_hover_poll(&mut self, pointer: Point, cx: &mut Ctx) {
        if !self.hover.is_armed() {
            return;
        }
        let at = cx.after(cx.settings.timing.hover_poll());
        cx.timers.schedule(TimerKind::HoverPoll(self.id), at);
        let (in_area, tiled) = self.pointer_in_reveal_area(pointer, cx);
        let immediate = tiled && cx.tiled_mode.is_active();
        let pending = cx.timers.is_pending(TimerKind::HoverDebounce(self.id));
        let action = self.hover.sample(in_area, pending, immediate);
        self.apply_hover(action, tiled, cx);
    }

    pub fn on_hover_debounce(&mut self, pointer: Point, cx: &mut Ctx) {
        let (in_area, tiled) = self.pointer_in_reveal_area(pointer, cx);
        let action = self.hover.debounce_elapsed(in_area);
        self.apply_hover(action, tiled, cx);
    }

    fn apply_hover(&mut self, action: HoverAction, tiled: bool, cx: &mut Ctx) {
        match action {
            HoverAction::Nothing => {}
            HoverAction::StartDebounce => {
                let at = cx.after(cx.settings.timing.hover_debounce());
                cx.timers.schedule(TimerKind::HoverDebounce(self.id), at);
            }
            HoverAction::CancelDebounce => {
                cx.timers.cancel(TimerKind::HoverDebounce(self.id));
            }
            HoverAction::Reveal => {
                debug!(group = ?self.id, tiled, "Revealing tab bar");
                cx.timers.cancel(TimerKind::HoverDebounce(self.id));
                self.update_tab_bar_position(cx);
                self.tab_bar.set_visible(true, cx.ui);
                if tiled {
                    cx.timers.cancel(TimerKind::TiledModeRelease(self.id));
                    cx.tiled_mode.enter(self.id);
                }
            }
            HoverAction::Hide => {
                debug!(group = ?self.id, "Hiding revealed tab bar");
                self.tab_bar.set_visible(false, cx.ui);
                self.release_tiled_mode(cx);
            }
        }
    }

    fn release_tiled_mode(&mut self, cx: &mut Ctx) {
        if cx.tiled_mode.contains(self.id) {
            let at = cx.after(cx.settings.timing.tiled_mode_grace());
            cx.timers.schedule(TimerKind::TiledModeRelease(self.id), at);
        }
    }

    pub fn on_tiled_mode_release(&mut self, cx: &mut Ctx) {
        if !self.hover.is_forced_visible() {
            cx.tiled_mode.leave(self.id);
        }
    }

    /// Tears the group down: timers cancelled, every member opaque again,
    /// every subscription released and the bar destroyed. Returns the
    /// members so the registry can drop their mappings.
    pub fn dissolve(mut self, cx: &mut Ctx) -> Vec<WindowId> {
        let id = self.id;
        let cancelled = cx.timers.cancel_where(|k| k.group() == Some(id));
        cx.tiled_mode.leave(id);
        for &w in &self.windows {
            cx.set_opacity(w, Opacity::Full);
        }
        self.subscriptions.release_all();
        self.tab_bar.destroy(cx.ui);
        debug!(group = ?id, members = self.windows.len(), cancelled, "Dissolved group");
        mem::take(&mut self.windows)
    }
}
