//! Pointer state that spans surfaces: the drag clone that follows a torn
//! tab across the screen, and the tab context menu.
//!
//! The renderer only sees the pointer while it is over a bar, so while a
//! tab is being dragged the global button state is polled to notice a
//! release that happened elsewhere.

use tracing::{debug, trace};

use crate::model::GroupId;
use crate::sys::event::{MouseButton, MouseState, PointerState};
use crate::sys::geometry::{Point, Rect};
use crate::sys::window::WindowId;
use crate::ui::{self, CleanupError, Command, MenuItem};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TabDrag {
    pub group: GroupId,
    pub tab: WindowId,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenMenu {
    pub group: GroupId,
    pub tab: WindowId,
}

/// What a global pointer observation means for the gesture in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    None,
    DragMoved(TabDrag, Point),
    DragReleased(TabDrag, Point),
    MenuDismissed,
}

#[derive(Debug, Default)]
pub struct GestureTracker {
    drag: Option<TabDrag>,
    clone_shown: bool,
    menu: Option<OpenMenu>,
}

impl GestureTracker {
    pub fn drag(&self) -> Option<TabDrag> { self.drag }

    pub fn menu(&self) -> Option<OpenMenu> { self.menu }

    pub fn begin_tab_drag(&mut self, drag: TabDrag, label: String, frame: Rect, ui: &ui::Sender) {
        debug!(?drag, "Tab drag started");
        self.drag = Some(drag);
        self.clone_shown = true;
        ui.send(Command::ShowDragClone {
            group: drag.group,
            window: drag.tab,
            label,
            frame,
        });
    }

    pub fn move_clone(&self, position: Point, ui: &ui::Sender) {
        if self.clone_shown {
            ui.send(Command::MoveDragClone(position));
        }
    }

    /// Ends the tab drag, destroying the clone.
    pub fn end_tab_drag(&mut self, ui: &ui::Sender) -> Result<Option<TabDrag>, CleanupError> {
        let drag = self.drag.take();
        if !std::mem::take(&mut self.clone_shown) {
            return Err(CleanupError::CloneGone);
        }
        ui.send(Command::DestroyDragClone);
        Ok(drag)
    }

    pub fn open_menu(
        &mut self,
        menu: OpenMenu,
        position: Point,
        items: Vec<MenuItem>,
        ui: &ui::Sender,
    ) {
        if self.menu.is_some() {
            ui.send(Command::DismissContextMenu);
        }
        self.menu = Some(menu);
        ui.send(Command::ShowContextMenu {
            group: menu.group,
            window: menu.tab,
            position,
            items,
        });
    }

    pub fn dismiss_menu(&mut self, ui: &ui::Sender) -> Result<OpenMenu, CleanupError> {
        let menu = self.menu.take().ok_or(CleanupError::MenuGone)?;
        ui.send(Command::DismissContextMenu);
        Ok(menu)
    }

    /// Forgets anything that refers to `group`.
    pub fn forget_group(&mut self, group: GroupId, ui: &ui::Sender) {
        if self.drag.is_some_and(|d| d.group == group) {
            _ = self.end_tab_drag(ui);
        }
        if self.menu.is_some_and(|m| m.group == group) {
            _ = self.dismiss_menu(ui);
        }
    }

    /// A global button edge.
    pub fn on_button(&mut self, button: MouseButton, state: MouseState, position: Point) -> GestureEvent {
        if state == MouseState::Down && self.menu.is_some() {
            return GestureEvent::MenuDismissed;
        }
        match (self.drag, button, state) {
            (Some(drag), MouseButton::Primary, MouseState::Up) => GestureEvent::DragReleased(drag, position),
            _ => GestureEvent::None,
        }
    }

    /// One tick of the gesture poll.
    pub fn poll(&mut self, pointer: PointerState) -> GestureEvent {
        let Some(drag) = self.drag else { return GestureEvent::None };
        let state = pointer.primary_state();
        trace!(?state, position = ?pointer.position, "Gesture poll");
        match state {
            MouseState::Up => GestureEvent::DragReleased(drag, pointer.position),
            MouseState::Down => GestureEvent::DragMoved(drag, pointer.position),
        }
    }
}
