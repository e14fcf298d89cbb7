use tracing::{debug, trace};

use crate::actor::tab_manager::{TabManager, window_under};
use crate::model::TimerKind;
use crate::sys::event::Modifiers;
use crate::sys::window::WindowId;

pub struct DragEventHandler;

impl DragEventHandler {
    pub fn handle_drag_begin(manager: &mut TabManager, window: WindowId) {
        if !manager.drag.begin(window) {
            debug!(?window, "Ignoring drag while another window is being dragged");
            return;
        }
        debug!(?window, "Window drag started");
        if manager.config.settings.require_modifier {
            Self::schedule_modifier_poll(manager);
        }
        Self::update_drop_target(manager);
    }

    pub fn handle_drag_end(manager: &mut TabManager, window: WindowId) {
        if !manager.drag.is_dragging(window) {
            return;
        }
        let target = Self::drop_target(manager, window);
        Self::cancel(manager);
        let Some(target) = target else {
            debug!(?window, "Window drag ended without a target");
            return;
        };
        let group = manager.with_registry(|r, cx| r.group_windows(window, target, cx));
        debug!(?window, ?target, ?group, "Window dropped onto another window");
    }

    pub fn handle_modifiers_changed(manager: &mut TabManager, modifiers: Modifiers) {
        if manager.modifiers.on_key(modifiers) && manager.drag.dragged().is_some() {
            Self::update_drop_target(manager);
        }
    }

    /// One tick of the modifier poll that runs during a drag.
    pub fn on_modifier_poll(manager: &mut TabManager, modifiers: Modifiers) {
        if manager.drag.dragged().is_none() || !manager.config.settings.require_modifier {
            return;
        }
        Self::schedule_modifier_poll(manager);
        if manager.modifiers.on_poll(modifiers) {
            trace!(?modifiers, "Modifier poll changed grouping state");
            Self::update_drop_target(manager);
        }
    }

    pub fn schedule_modifier_poll(manager: &mut TabManager) {
        let at = manager.clock.now() + manager.config.settings.timing.modifier_poll();
        manager.timers.schedule(TimerKind::ModifierPoll, at);
    }

    /// Ends the drag session without grouping anything.
    pub fn cancel(manager: &mut TabManager) {
        manager.set_drop_indicator(None);
        manager.drag.reset();
        manager.timers.cancel(TimerKind::ModifierPoll);
    }

    pub fn update_drop_target(manager: &mut TabManager) {
        let target = manager.drag.dragged().and_then(|w| Self::drop_target(manager, w));
        manager.set_drop_indicator(target);
    }

    fn grouping_armed(manager: &TabManager) -> bool {
        !manager.config.settings.require_modifier || manager.modifiers.arms_grouping()
    }

    /// The window a drop of `dragged` at the pointer would group with.
    fn drop_target(manager: &TabManager, dragged: WindowId) -> Option<WindowId> {
        if !Self::grouping_armed(manager) {
            return None;
        }
        if !manager.windows.get(&dragged).is_some_and(|w| w.is_normal()) {
            return None;
        }
        let point = manager.pointer.pointer_state().position;
        let target = window_under(point, &manager.stacking, &manager.windows, &[dragged])?;
        (!manager.registry.are_in_same_group(dragged, target)).then_some(target)
    }
}
