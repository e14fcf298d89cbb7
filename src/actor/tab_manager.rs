//! The tab manager owns every group. It turns host events into group
//! mutations, and answers with host requests and renderer commands.
//!
//! Everything runs on one thread. Timers are deadlines checked against an
//! injected [`Clock`], so tests and trace replay drive time by hand.

use std::path::PathBuf;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace, warn};

use crate::actor;
use crate::actor::host::{self, Request};
use crate::common::collections::HashMap;
use crate::common::config::{Config, ConfigCommand};
use crate::model::hover::TiledMode;
use crate::model::subscription::Signal;
use crate::model::tiling::WorkAreas;
use crate::model::{Ctx, GroupError, GroupId, GroupRegistry, TimerKind, WindowGroup};
use crate::sys::event::{Modifiers, MouseButton, MouseState, PointerSource};
use crate::sys::geometry::{Point, Rect, RectExt};
use crate::sys::timer::{Clock, Timers};
use crate::sys::window::{MaximizeState, WindowId, WindowInfo, WindowState};
use crate::ui::tab_bar::FALLBACK_LABEL;
use crate::ui::{self, MenuAction};

mod drop_target;
mod events;
mod gesture;
mod modifiers;
mod replay;
#[cfg(test)]
mod testing;
#[cfg(test)]
mod tests;

pub use drop_target::{WindowDrag, window_under};
use events::command::CommandEventHandler;
use events::drag::DragEventHandler;
use events::tab_bar::TabBarEventHandler;
use events::window::WindowEventHandler;
pub use gesture::{GestureTracker, OpenMenu, TabDrag};
pub use modifiers::{ModifierSource, ModifierTracker};
pub use replay::{Output, Record, replay};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Event {
    /// Work areas of every monitor.
    ScreenParametersChanged(Vec<Rect>),
    /// Window stacking order, bottom to top.
    StackingChanged(Vec<WindowId>),
    WindowCreated(WindowId, WindowInfo),
    WindowDestroyed(WindowId),
    WindowFrameChanged(WindowId, Rect),
    /// `None` when focus moved to something that is not a known window.
    WindowFocused(Option<WindowId>),
    WindowMinimized(WindowId),
    WindowDeminimized(WindowId),
    WindowMaximizeChanged(WindowId, MaximizeState),
    WindowTitleChanged(WindowId, String),
    WindowShowingChanged(WindowId, bool),
    /// The host started moving a window under the pointer.
    DragBegin(WindowId),
    DragEnd(WindowId),
    ModifiersChanged(Modifiers),
    MouseButton(MouseButton, MouseState),
    TabBar(GroupId, TabBarInput),
    Command(Command),
    ConfigUpdated(Config),
}

/// Pointer gestures reported by the renderer for one group's bar.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum TabBarInput {
    Pressed { tab: WindowId, position: Point },
    Moved(Point),
    Released(Point),
    ContextMenu { tab: WindowId, position: Point },
    MenuSelected { tab: WindowId, action: MenuAction },
    CloseTab(WindowId),
    CloseGroupClicked,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    DissolveAll,
    /// Dissolve the group holding this window.
    CloseGroup(WindowId),
    LeaveGroup(WindowId),
    Config(ConfigCommand),
    DumpState,
}

pub type Sender = actor::Sender<Event>;
pub type Receiver = actor::Receiver<Event>;

pub struct TabManager {
    config: Config,
    config_path: Option<PathBuf>,
    registry: GroupRegistry,
    windows: HashMap<WindowId, WindowState>,
    stacking: Vec<WindowId>,
    work_areas: WorkAreas,
    timers: Timers<TimerKind>,
    tiled_mode: TiledMode,
    drag: WindowDrag,
    modifiers: ModifierTracker,
    gestures: GestureTracker,
    clock: Box<dyn Clock>,
    pointer: Box<dyn PointerSource>,
    host_tx: host::Sender,
    ui_tx: ui::Sender,
    record: Record,
    started: Instant,
}

impl TabManager {
    pub fn new(
        config: Config,
        host_tx: host::Sender,
        ui_tx: ui::Sender,
        clock: Box<dyn Clock>,
        pointer: Box<dyn PointerSource>,
        mut record: Record,
    ) -> Self {
        record.start(&config);
        let started = clock.now();
        TabManager {
            config,
            config_path: None,
            registry: GroupRegistry::new(),
            windows: HashMap::default(),
            stacking: Vec::new(),
            work_areas: WorkAreas::default(),
            timers: Timers::new(),
            tiled_mode: TiledMode::default(),
            drag: WindowDrag::default(),
            modifiers: ModifierTracker::default(),
            gestures: GestureTracker::default(),
            clock,
            pointer,
            host_tx,
            ui_tx,
            record,
            started,
        }
    }

    /// Where policy changes made through [`Command::Config`] are saved.
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    pub fn config(&self) -> &Config { &self.config }

    pub fn registry(&self) -> &GroupRegistry { &self.registry }

    pub fn window(&self, id: WindowId) -> Option<&WindowState> { self.windows.get(&id) }

    pub fn timers(&self) -> &Timers<TimerKind> { &self.timers }

    pub fn drag(&self) -> &WindowDrag { &self.drag }

    pub fn modifiers(&self) -> &ModifierTracker { &self.modifiers }

    pub fn gestures(&self) -> &GestureTracker { &self.gestures }

    pub fn tiled_mode(&self) -> &TiledMode { &self.tiled_mode }

    pub fn group_of(&self, window: WindowId) -> Option<&WindowGroup> {
        self.registry.group_of(window).and_then(|g| self.registry.get(g))
    }

    pub fn are_in_same_group(&self, a: WindowId, b: WindowId) -> bool {
        self.registry.are_in_same_group(a, b)
    }

    /// Feeds the windows that already exist at startup, as if each had just
    /// been created.
    pub fn adopt_existing(&mut self, windows: Vec<(WindowId, WindowInfo)>) {
        debug!(count = windows.len(), "Adopting existing windows");
        for (id, info) in windows {
            self.handle_event(Event::WindowCreated(id, info));
        }
    }

    #[instrument(name = "tab_manager::handle_event", skip(self))]
    pub fn handle_event(&mut self, event: Event) {
        let elapsed = self.clock.now().saturating_duration_since(self.started);
        self.record.on_event(elapsed, self.pointer.pointer_state(), &event);
        match event {
            Event::ScreenParametersChanged(areas) => {
                WindowEventHandler::handle_screen_parameters_changed(self, areas)
            }
            Event::StackingChanged(order) => WindowEventHandler::handle_stacking_changed(self, order),
            Event::WindowCreated(id, info) => WindowEventHandler::handle_window_created(self, id, info),
            Event::WindowDestroyed(id) => WindowEventHandler::handle_window_destroyed(self, id),
            Event::WindowFrameChanged(id, frame) => {
                WindowEventHandler::handle_window_frame_changed(self, id, frame)
            }
            Event::WindowFocused(id) => WindowEventHandler::handle_window_focused(self, id),
            Event::WindowMinimized(id) => WindowEventHandler::handle_window_minimized(self, id, true),
            Event::WindowDeminimized(id) => WindowEventHandler::handle_window_minimized(self, id, false),
            Event::WindowMaximizeChanged(id, state) => {
                WindowEventHandler::handle_window_maximize_changed(self, id, state)
            }
            Event::WindowTitleChanged(id, title) => {
                WindowEventHandler::handle_window_title_changed(self, id, title)
            }
            Event::WindowShowingChanged(id, showing) => {
                WindowEventHandler::handle_window_showing_changed(self, id, showing)
            }
            Event::DragBegin(id) => DragEventHandler::handle_drag_begin(self, id),
            Event::DragEnd(id) => DragEventHandler::handle_drag_end(self, id),
            Event::ModifiersChanged(modifiers) => {
                DragEventHandler::handle_modifiers_changed(self, modifiers)
            }
            Event::MouseButton(button, state) => {
                TabBarEventHandler::handle_mouse_button(self, button, state)
            }
            Event::TabBar(group, input) => TabBarEventHandler::handle(self, group, input),
            Event::Command(cmd) => CommandEventHandler::handle(self, cmd),
            Event::ConfigUpdated(config) => CommandEventHandler::handle_config_updated(self, config),
        }
        self.prune_gestures();
    }

    /// Runs every timer whose deadline has passed, earliest first. A timer
    /// cancelled by an earlier one in the same pass does not fire. Returns
    /// how many fired.
    pub fn fire_due_timers(&mut self) -> usize {
        let now = self.clock.now();
        let mut fired = 0;
        while let Some(timer) = self.timers.pop_due(now) {
            self.on_timer(timer);
            fired += 1;
        }
        if fired > 0 {
            self.prune_gestures();
        }
        fired
    }

    fn on_timer(&mut self, timer: TimerKind) {
        trace!(?timer, "Timer fired");
        let pointer = self.pointer.pointer_state();
        match timer {
            TimerKind::SyncSettle(group, kind) => {
                self.with_group(group, |g, cx| g.on_sync_settled(kind, cx));
            }
            TimerKind::HoverPoll(group) => {
                self.with_group(group, |g, cx| g.on_hover_poll(pointer.position, cx));
            }
            TimerKind::HoverDebounce(group) => {
                self.with_group(group, |g, cx| g.on_hover_debounce(pointer.position, cx));
            }
            TimerKind::TiledModeRelease(group) => {
                self.with_group(group, |g, cx| g.on_tiled_mode_release(cx));
            }
            TimerKind::TabStateReset(group) => {
                if let Some(g) = self.registry.get_mut(group) {
                    g.tab_bar_mut().settle_pointer();
                }
            }
            TimerKind::MoveEnd(group) => {
                self.with_group(group, |g, cx| g.on_move_end(cx));
            }
            TimerKind::ModifierPoll => DragEventHandler::on_modifier_poll(self, pointer.modifiers),
            TimerKind::GesturePoll => TabBarEventHandler::on_gesture_poll(self, pointer),
        }
    }

    /// Cancels every timer, dissolves every group (restoring opacity) and
    /// drops transient visuals.
    pub fn shutdown(&mut self) {
        debug!("Shutting down tab manager");
        DragEventHandler::cancel(self);
        if let Some(drag) = self.gestures.drag() {
            self.gestures.forget_group(drag.group, &self.ui_tx);
        }
        if let Some(menu) = self.gestures.menu() {
            self.gestures.forget_group(menu.group, &self.ui_tx);
        }
        self.with_registry(|r, cx| r.dissolve_all(cx));
        self.timers.clear();
    }

    /// Handles events until the channel closes, sleeping until the next
    /// timer deadline in between.
    pub async fn run(mut self, mut events: Receiver) {
        loop {
            let deadline = self.timers.next_deadline();
            let sleep_until =
                tokio::time::Instant::from_std(deadline.unwrap_or_else(|| self.clock.now()));
            tokio::select! {
                event = events.recv() => {
                    let Some((span, event)) = event else { break };
                    let _guard = span.enter();
                    self.handle_event(event);
                }
                _ = tokio::time::sleep_until(sleep_until), if deadline.is_some() => {
                    self.fire_due_timers();
                }
            }
        }
        self.shutdown();
    }

    /// Group tree for debugging, one node per group with its tabs in order.
    /// The active tab is marked with `*`.
    pub fn draw_tree(&self) -> String {
        let groups = self
            .registry
            .iter()
            .map(|(id, group)| {
                let tabs = group
                    .windows()
                    .iter()
                    .map(|&w| {
                        let label = group.tab_bar().label(w).unwrap_or(FALLBACK_LABEL);
                        let marker = if group.active() == Some(w) { " *" } else { "" };
                        format!("{w} {label:?}{marker}")
                    })
                    .collect();
                ascii_tree::Tree::Node(format!("{id:?}"), vec![ascii_tree::Tree::Leaf(tabs)])
            })
            .collect();
        let tree = ascii_tree::Tree::Node(format!("groups ({})", self.registry.len()), groups);
        let mut out = String::new();
        if let Err(e) = ascii_tree::write_tree(&mut out, &tree) {
            warn!(%e, "Failed to draw group tree");
        }
        out
    }

    // Helpers shared by the event handlers.

    fn split(&mut self) -> (&mut GroupRegistry, Ctx<'_>) {
        let now = self.clock.now();
        let cx = Ctx {
            windows: &mut self.windows,
            work_areas: &self.work_areas,
            settings: &self.config.settings,
            timers: &mut self.timers,
            tiled_mode: &mut self.tiled_mode,
            host: &self.host_tx,
            ui: &self.ui_tx,
            now,
        };
        (&mut self.registry, cx)
    }

    fn with_registry<R>(&mut self, f: impl FnOnce(&mut GroupRegistry, &mut Ctx) -> R) -> R {
        let (registry, mut cx) = self.split();
        f(registry, &mut cx)
    }

    fn with_group<R>(
        &mut self,
        id: GroupId,
        f: impl FnOnce(&mut WindowGroup, &mut Ctx) -> R,
    ) -> Option<R> {
        let (registry, mut cx) = self.split();
        let group = registry.get_mut(id)?;
        Some(f(group, &mut cx))
    }

    /// The group of `window`, if it listens to `signal` from it.
    fn subscribed_group(&self, window: WindowId, signal: Signal) -> Option<GroupId> {
        let id = self.registry.group_of(window)?;
        self.registry.get(id)?.is_subscribed(window, signal).then_some(id)
    }

    fn notify(&self, error: GroupError) {
        debug!(%error, "Rejected user action");
        self.host_tx.send(Request::Notify(error.to_string()));
    }

    /// Shows the drop indicator around `target`, or hides it.
    fn set_drop_indicator(&mut self, target: Option<WindowId>) {
        if !self.drag.indicate(target) {
            return;
        }
        let frame = target.and_then(|t| self.windows.get(&t)).map(|s| s.frame);
        match frame {
            Some(frame) => {
                let margin = self.config.settings.tab_bar.drop_indicator_margin;
                self.ui_tx.send(ui::Command::ShowDropIndicator(frame.expanded(margin)));
            }
            None => self.ui_tx.send(ui::Command::HideDropIndicator),
        }
    }

    /// Drops gesture state that refers to groups that no longer exist.
    fn prune_gestures(&mut self) {
        let stale = [self.gestures.drag().map(|d| d.group), self.gestures.menu().map(|m| m.group)];
        for group in stale.into_iter().flatten() {
            if self.registry.get(group).is_none() {
                debug!(?group, "Dropping gestures for dissolved group");
                self.gestures.forget_group(group, &self.ui_tx);
                self.timers.cancel(TimerKind::GesturePoll);
                if self.drag.dragged().is_none() {
                    self.set_drop_indicator(None);
                }
            }
        }
    }
}

impl std::fmt::Debug for TabManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabManager")
            .field("groups", &self.registry.len())
            .field("windows", &self.windows.len())
            .field("timers", &self.timers.len())
            .finish_non_exhaustive()
    }
}

/// `frame` moved so that its top-centre is at `point`.
fn frame_hanging_from(point: Point, frame: Rect) -> Rect {
    Rect::from_xywh(
        point.x - frame.size.width / 2.0,
        point.y,
        frame.size.width,
        frame.size.height,
    )
}
