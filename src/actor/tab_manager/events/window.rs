use tracing::{debug, trace};

use crate::actor::tab_manager::TabManager;
use crate::actor::tab_manager::events::drag::DragEventHandler;
use crate::model::subscription::Signal;
use crate::model::tiling::WorkAreas;
use crate::sys::geometry::{Rect, SameAs};
use crate::sys::window::{MaximizeState, WindowId, WindowInfo, WindowState};

pub struct WindowEventHandler;

impl WindowEventHandler {
    pub fn handle_screen_parameters_changed(manager: &mut TabManager, areas: Vec<Rect>) {
        debug!(monitors = areas.len(), "Work areas changed");
        manager.work_areas = WorkAreas::new(areas);
        for id in manager.registry.group_ids() {
            manager.with_group(id, |g, cx| g.update_tab_bar_visibility(cx));
        }
    }

    pub fn handle_stacking_changed(manager: &mut TabManager, order: Vec<WindowId>) {
        manager.stacking = order;
    }

    pub fn handle_window_created(manager: &mut TabManager, id: WindowId, info: WindowInfo) {
        let mut state: WindowState = info.into();
        if let Some(existing) = manager.windows.get(&id) {
            trace!(?id, "Window reported again, keeping requested opacity");
            state.opacity = existing.opacity;
        }
        let normal = state.is_normal();
        debug!(?id, title = %state.title, kind = ?state.kind, "Window created");
        manager.windows.insert(id, state);

        if normal
            && manager.config.settings.auto_group
            && manager.registry.group_of(id).is_none()
        {
            manager.with_registry(|r, cx| r.create_group_with(&[id], cx));
        }
    }

    pub fn handle_window_destroyed(manager: &mut TabManager, id: WindowId) {
        debug!(?id, "Window destroyed");
        if manager.drag.is_dragging(id) {
            DragEventHandler::cancel(manager);
        }
        if manager.subscribed_group(id, Signal::Destroyed).is_some() {
            manager.with_registry(|r, cx| r.remove_window(id, cx));
        }
        if manager.drag.indicated() == Some(id) {
            manager.set_drop_indicator(None);
        }
        manager.windows.remove(&id);
        manager.stacking.retain(|&w| w != id);
    }

    pub fn handle_window_frame_changed(manager: &mut TabManager, id: WindowId, frame: Rect) {
        let Some(window) = manager.windows.get_mut(&id) else {
            trace!(?id, "Frame change for unknown window");
            return;
        };
        if window.frame.same_as(frame) {
            return;
        }
        window.frame = frame;

        let group = manager
            .subscribed_group(id, Signal::Position)
            .or_else(|| manager.subscribed_group(id, Signal::Size));
        if let Some(group) = group {
            manager.with_group(group, |g, cx| g.on_frame_changed(id, cx));
        }
        if manager.drag.is_dragging(id) {
            DragEventHandler::update_drop_target(manager);
        }
    }

    pub fn handle_window_focused(manager: &mut TabManager, focused: Option<WindowId>) {
        trace!(?focused, "Focus changed");
        for (&id, window) in manager.windows.iter_mut() {
            window.is_focused = Some(id) == focused;
        }
        let focused_group = focused.and_then(|w| manager.subscribed_group(w, Signal::Focus));
        for id in manager.registry.group_ids() {
            match focused {
                Some(window) if focused_group == Some(id) => {
                    manager.with_group(id, |g, cx| g.on_focused(window, cx));
                }
                _ => {
                    manager.with_group(id, |g, cx| g.update_tab_bar_visibility(cx));
                }
            }
        }
    }

    pub fn handle_window_minimized(manager: &mut TabManager, id: WindowId, minimized: bool) {
        let Some(window) = manager.windows.get_mut(&id) else { return };
        if window.is_minimized == minimized {
            return;
        }
        window.is_minimized = minimized;
        debug!(?id, minimized, "Window minimize state changed");

        let Some(group) = manager.subscribed_group(id, Signal::Minimized) else { return };
        if minimized {
            manager.with_group(group, |g, cx| g.on_minimized(id, cx));
        } else {
            manager.with_group(group, |g, cx| g.on_deminimized(id, cx));
        }
    }

    pub fn handle_window_maximize_changed(
        manager: &mut TabManager,
        id: WindowId,
        state: MaximizeState,
    ) {
        let Some(window) = manager.windows.get_mut(&id) else { return };
        if window.maximized == state {
            return;
        }
        window.maximized = state;
        debug!(?id, ?state, "Window maximize state changed");

        if let Some(group) = manager.subscribed_group(id, Signal::Maximized) {
            manager.with_group(group, |g, cx| g.on_maximize_changed(id, cx));
        }
    }

    pub fn handle_window_title_changed(manager: &mut TabManager, id: WindowId, title: String) {
        let Some(window) = manager.windows.get_mut(&id) else { return };
        window.title = title;
        if let Some(group) = manager.subscribed_group(id, Signal::Title) {
            manager.with_group(group, |g, cx| g.on_title_changed(id, cx));
        }
    }

    pub fn handle_window_showing_changed(manager: &mut TabManager, id: WindowId, showing: bool) {
        let Some(window) = manager.windows.get_mut(&id) else { return };
        window.is_showing = showing;
        trace!(?id, showing, "Window showing changed");
        if !showing && manager.drag.indicated() == Some(id) {
            DragEventHandler::update_drop_target(manager);
        }
    }
}
