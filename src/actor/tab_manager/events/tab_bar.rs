use tracing::{debug, trace, warn};

use crate::actor::host::Request;
use crate::actor::tab_manager::events::command::CommandEventHandler;
use crate::actor::tab_manager::gesture::GestureEvent;
use crate::actor::tab_manager::{
    OpenMenu, TabBarInput, TabDrag, TabManager, frame_hanging_from, window_under,
};
use crate::model::{GroupError, GroupId, TimerKind};
use crate::sys::event::{MouseButton, MouseState, PointerState};
use crate::sys::geometry::Point;
use crate::sys::window::WindowId;
use crate::ui::tab_bar::{FALLBACK_LABEL, PointerOutcome};
use crate::ui::{MenuAction, MenuItem};

/// Where a tab dragged out of its bar would land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DropHit {
    Target(WindowId),
    OwnGroup,
    Nothing,
}

pub struct TabBarEventHandler;

impl TabBarEventHandler {
    pub fn handle(manager: &mut TabManager, group: GroupId, input: TabBarInput) {
        if manager.registry.get(group).is_none() {
            debug!(?group, ?input, "Tab bar input for a group that no longer exists");
            return;
        }
        match input {
            TabBarInput::Pressed { tab, position } => Self::pressed(manager, group, tab, position),
            TabBarInput::Moved(position) => Self::moved(manager, group, position),
            TabBarInput::Released(position) => Self::released(manager, group, position),
            TabBarInput::ContextMenu { tab, position } => {
                Self::context_menu(manager, group, tab, position)
            }
            TabBarInput::MenuSelected { tab, action } => {
                Self::menu_selected(manager, tab, action)
            }
            TabBarInput::CloseTab(tab) => Self::close_tab(manager, group, tab),
            TabBarInput::CloseGroupClicked => {
                debug!(?group, "Close group clicked");
                manager.with_registry(|r, cx| r.dissolve(group, cx));
            }
        }
    }

    fn pressed(manager: &mut TabManager, group: GroupId, tab: WindowId, position: Point) {
        if manager.gestures.menu().is_some() {
            Self::dismiss_menu(manager);
        }
        let Some(g) = manager.registry.get_mut(group) else { return };
        if g.tab_bar_mut().pointer_pressed(tab, position) {
            trace!(?group, ?tab, "Tab pressed");
            manager.timers.cancel(TimerKind::TabStateReset(group));
        }
    }

    fn moved(manager: &mut TabManager, group: GroupId, position: Point) {
        let threshold = manager.config.settings.tab_bar.drag_threshold;
        let Some(g) = manager.registry.get_mut(group) else { return };
        match g.tab_bar_mut().pointer_moved(position, threshold) {
            PointerOutcome::DragStarted(tab) => {
                let bar = g.tab_bar();
                let label = bar.label(tab).unwrap_or(FALLBACK_LABEL).to_owned();
                let frame = bar.index_of(tab).and_then(|i| bar.tab_rect(i)).unwrap_or(bar.frame());
                manager.gestures.begin_tab_drag(TabDrag { group, tab }, label, frame, &manager.ui_tx);
                Self::schedule_gesture_poll(manager);
                Self::drag_moved(manager, group, tab, position);
            }
            PointerOutcome::Dragging(tab) => Self::drag_moved(manager, group, tab, position),
            _ => {}
        }
    }

    fn drag_moved(manager: &mut TabManager, group: GroupId, tab: WindowId, position: Point) {
        manager.gestures.move_clone(position, &manager.ui_tx);
        let now = manager.clock.now();
        let cooldown = manager.config.settings.tab_bar.reorder_cooldown();
        let in_bar = manager.registry.get(group).is_some_and(|g| g.tab_bar().contains(position));
        if in_bar {
            manager.set_drop_indicator(None);
            let Some(g) = manager.registry.get_mut(group) else { return };
            if let Some(to) = g.tab_bar_mut().reorder_target(tab, position, now, cooldown) {
                debug!(?group, ?tab, to, "Reordering tab");
                manager.with_group(group, |g, cx| g.move_window(tab, to, cx));
            }
        } else {
            let target = match Self::drop_hit(manager, group, tab, position) {
                DropHit::Target(target) => Some(target),
                DropHit::OwnGroup | DropHit::Nothing => None,
            };
            manager.set_drop_indicator(target);
        }
    }

    fn released(manager: &mut TabManager, group: GroupId, position: Point) {
        let Some(g) = manager.registry.get_mut(group) else { return };
        match g.tab_bar_mut().pointer_released() {
            PointerOutcome::Clicked(tab) => {
                debug!(?group, ?tab, "Tab clicked");
                manager.with_group(group, |g, cx| g.activate_tab(tab, cx));
            }
            PointerOutcome::Dropped(tab) => {
                Self::finish_tab_drag(manager);
                let in_bar = manager.registry.get(group).is_some_and(|g| g.tab_bar().contains(position));
                if !in_bar {
                    Self::drag_out(manager, group, tab, position);
                }
            }
            _ => return,
        }
        if manager.registry.get(group).is_some() {
            let at = manager.clock.now() + manager.config.settings.timing.tab_state_reset();
            manager.timers.schedule(TimerKind::TabStateReset(group), at);
        }
    }

    fn finish_tab_drag(manager: &mut TabManager) {
        if let Err(e) = manager.gestures.end_tab_drag(&manager.ui_tx) {
            debug!(%e, "Drag clone already gone");
        }
        manager.timers.cancel(TimerKind::GesturePoll);
        manager.set_drop_indicator(None);
    }

    fn drop_hit(manager: &TabManager, group: GroupId, tab: WindowId, position: Point) -> DropHit {
        match window_under(position, &manager.stacking, &manager.windows, &[tab]) {
            Some(target) if manager.registry.group_of(target) == Some(group) => DropHit::OwnGroup,
            Some(target) => DropHit::Target(target),
            None => DropHit::Nothing,
        }
    }

    /// A tab released outside its bar: onto another window it joins that
    /// window, onto empty space it becomes a window of its own again.
    fn drag_out(manager: &mut TabManager, group: GroupId, tab: WindowId, position: Point) {
        match Self::drop_hit(manager, group, tab, position) {
            DropHit::Target(target) => {
                debug!(?tab, ?target, "Tab dropped onto another window");
                manager.with_registry(|r, cx| {
                    r.remove_window(tab, cx);
                    r.group_windows(tab, target, cx)
                });
            }
            DropHit::OwnGroup => trace!(?tab, "Tab dropped onto its own group"),
            DropHit::Nothing => {
                let members = manager.registry.get(group).map_or(0, |g| g.len());
                if members < 2 {
                    return;
                }
                debug!(?tab, ?position, "Tab dropped onto empty space");
                Self::separate(manager, tab);
                if let Some(window) = manager.windows.get(&tab) {
                    let frame = frame_hanging_from(position, window.frame);
                    manager.host_tx.send(Request::SetFrame(tab, frame));
                }
            }
        }
    }

    /// Takes `window` out of its group. With auto-grouping on it gets a
    /// group of its own.
    pub fn separate(manager: &mut TabManager, window: WindowId) {
        manager.with_registry(|r, cx| {
            r.remove_window(window, cx);
            let normal = cx.window(window).is_some_and(|w| w.is_normal());
            if normal && cx.settings.auto_group {
                r.create_group_with(&[window], cx);
            }
        });
    }

    fn context_menu(manager: &mut TabManager, group: GroupId, tab: WindowId, position: Point) {
        let Some(g) = manager.registry.get(group) else { return };
        if !g.contains(tab) {
            return;
        }
        let items = vec![MenuItem { action: MenuAction::LeaveGroup, enabled: g.len() > 1 }];
        manager.gestures.open_menu(OpenMenu { group, tab }, position, items, &manager.ui_tx);
    }

    fn menu_selected(manager: &mut TabManager, tab: WindowId, action: MenuAction) {
        if manager.gestures.menu().is_some() {
            Self::dismiss_menu(manager);
        }
        match action {
            MenuAction::LeaveGroup => CommandEventHandler::leave_group(manager, tab),
        }
    }

    fn dismiss_menu(manager: &mut TabManager) {
        if let Err(e) = manager.gestures.dismiss_menu(&manager.ui_tx) {
            debug!(%e, "Context menu already gone");
        }
    }

    fn close_tab(manager: &mut TabManager, group: GroupId, tab: WindowId) {
        let Some(g) = manager.registry.get(group) else { return };
        if !g.contains(tab) {
            warn!(?group, ?tab, "Close requested for a tab the group does not hold");
            return;
        }
        if g.len() == 1 {
            manager.notify(GroupError::SoleTab);
            return;
        }
        debug!(?group, ?tab, "Closing tab");
        Self::separate(manager, tab);
    }

    /// A global button edge. Catches releases and presses the bar never sees.
    pub fn handle_mouse_button(manager: &mut TabManager, button: MouseButton, state: MouseState) {
        let position = manager.pointer.pointer_state().position;
        match manager.gestures.on_button(button, state, position) {
            GestureEvent::MenuDismissed => Self::dismiss_menu(manager),
            GestureEvent::DragReleased(drag, position) => {
                Self::released(manager, drag.group, position)
            }
            GestureEvent::DragMoved(..) | GestureEvent::None => {}
        }
    }

    /// One tick of the poll that follows a tab drag outside the bar.
    pub fn on_gesture_poll(manager: &mut TabManager, pointer: PointerState) {
        match manager.gestures.poll(pointer) {
            GestureEvent::DragMoved(drag, position) => {
                Self::schedule_gesture_poll(manager);
                Self::moved(manager, drag.group, position);
            }
            GestureEvent::DragReleased(drag, position) => {
                Self::released(manager, drag.group, position)
            }
            GestureEvent::MenuDismissed | GestureEvent::None => {}
        }
    }

    fn schedule_gesture_poll(manager: &mut TabManager) {
        let at = manager.clock.now() + manager.config.settings.timing.gesture_poll();
        manager.timers.schedule(TimerKind::GesturePoll, at);
    }
}
