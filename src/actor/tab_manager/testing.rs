//! A fake host for driving the manager in tests. It applies requests to its
//! own window table and answers with the events a real host would send.

use std::time::Duration;

use super::{Event, Record, TabBarInput, TabManager};
use crate::actor::{self, host};
use crate::common::collections::{BTreeMap, HashMap};
use crate::common::config::Config;
use crate::model::GroupId;
use crate::sys::event::{Modifiers, MouseButtons, SharedPointer};
use crate::sys::geometry::{Point, Rect, SameAs};
use crate::sys::timer::{Clock, ManualClock};
use crate::sys::window::{MaximizeState, Opacity, WindowId, WindowInfo, WindowKind};
use crate::ui::{self, TabDisplay};

pub const SCREEN: Rect = Rect::from_xywh(0.0, 0.0, 1920.0, 1080.0);

pub fn w(n: u64) -> WindowId { WindowId::new(n) }

pub fn window_info(title: &str, frame: Rect) -> WindowInfo {
    WindowInfo {
        title: title.to_owned(),
        frame,
        kind: WindowKind::Normal,
        is_minimized: false,
        maximized: MaximizeState::None,
        is_focused: false,
        is_showing: true,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostWindow {
    pub frame: Rect,
    pub restore: Rect,
    pub maximized: MaximizeState,
    pub opacity: Opacity,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarView {
    pub visible: bool,
    pub frame: Rect,
    pub tabs: Vec<TabDisplay>,
}

pub struct Host {
    pub clock: ManualClock,
    pub pointer: SharedPointer,
    host_rx: host::Receiver,
    ui_rx: ui::Receiver,
    pub windows: BTreeMap<WindowId, HostWindow>,
    pub stacking: Vec<WindowId>,
    pub focused: Option<WindowId>,
    pub notices: Vec<String>,
    pub bars: HashMap<GroupId, BarView>,
    pub drop_indicator: Option<Rect>,
    pub drag_clone: Option<Point>,
    pub menu: Option<Vec<ui::MenuItem>>,
    pub requests: Vec<host::Request>,
    pub commands: Vec<ui::Command>,
}

pub fn manager(config: Config) -> (TabManager, Host) { manager_with_record(config, Record::none()) }

pub fn manager_with_record(config: Config, record: Record) -> (TabManager, Host) {
    let clock = ManualClock::new();
    let pointer = SharedPointer::new();
    let (host_tx, host_rx) = actor::channel();
    let (ui_tx, ui_rx) = actor::channel();
    let mut manager = TabManager::new(
        config,
        host_tx,
        ui_tx,
        Box::new(clock.clone()),
        Box::new(pointer.clone()),
        record,
    );
    manager.handle_event(Event::ScreenParametersChanged(vec![SCREEN]));
    let host = Host {
        clock,
        pointer,
        host_rx,
        ui_rx,
        windows: BTreeMap::new(),
        stacking: Vec::new(),
        focused: None,
        notices: Vec::new(),
        bars: HashMap::default(),
        drop_indicator: None,
        drag_clone: None,
        menu: None,
        requests: Vec::new(),
        commands: Vec::new(),
    };
    (manager, host)
}

impl Host {
    /// Feeds one event and checks the registry afterwards.
    pub fn send(&mut self, tm: &mut TabManager, event: Event) {
        tm.handle_event(event);
        check(tm);
    }

    pub fn create(&mut self, tm: &mut TabManager, id: u64, title: &str, frame: Rect) {
        let id = w(id);
        self.windows.insert(id, HostWindow {
            frame,
            restore: frame,
            maximized: MaximizeState::None,
            opacity: Opacity::Full,
        });
        self.send(tm, Event::WindowCreated(id, window_info(title, frame)));
        self.raise(tm, id);
        self.pump(tm);
    }

    pub fn destroy(&mut self, tm: &mut TabManager, id: WindowId) {
        self.windows.remove(&id);
        self.stacking.retain(|&w| w != id);
        self.send(tm, Event::WindowDestroyed(id));
        self.pump(tm);
    }

    pub fn raise(&mut self, tm: &mut TabManager, id: WindowId) {
        self.stacking.retain(|&w| w != id);
        self.stacking.push(id);
        self.send(tm, Event::StackingChanged(self.stacking.clone()));
    }

    pub fn focus(&mut self, tm: &mut TabManager, id: WindowId) {
        self.focused = Some(id);
        self.raise(tm, id);
        self.send(tm, Event::WindowFocused(Some(id)));
        self.pump(tm);
    }

    /// The user moves `id` to `frame`.
    pub fn move_window(&mut self, tm: &mut TabManager, id: WindowId, frame: Rect) {
        if let Some(window) = self.windows.get_mut(&id) {
            window.frame = frame;
        }
        self.send(tm, Event::WindowFrameChanged(id, frame));
        self.pump(tm);
    }

    /// The user maximizes or restores `id`.
    pub fn maximize(&mut self, tm: &mut TabManager, id: WindowId, state: MaximizeState) {
        let events = self.apply_maximize(id, state);
        for event in events {
            self.send(tm, event);
        }
        self.pump(tm);
    }

    /// Starts dragging `id` with the pointer at `to`. The window follows
    /// with its top-centre under the pointer.
    pub fn begin_drag(&mut self, tm: &mut TabManager, id: WindowId, to: Point) {
        self.raise(tm, id);
        self.send(tm, Event::DragBegin(id));
        self.drag_to(tm, id, to);
    }

    pub fn drag_to(&mut self, tm: &mut TabManager, id: WindowId, to: Point) {
        self.pointer.move_to(to);
        let Some(window) = self.windows.get(&id) else { return };
        let size = window.frame.size;
        let frame = Rect::from_xywh(to.x - size.width / 2.0, to.y - 10.0, size.width, size.height);
        self.move_window(tm, id, frame);
    }

    pub fn end_drag(&mut self, tm: &mut TabManager, id: WindowId) {
        self.send(tm, Event::DragEnd(id));
        self.pump(tm);
    }

    pub fn set_modifiers(&mut self, tm: &mut TabManager, modifiers: Modifiers) {
        self.send(tm, Event::ModifiersChanged(modifiers));
        self.pump(tm);
    }

    pub fn bar_input(&mut self, tm: &mut TabManager, group: GroupId, input: TabBarInput) {
        match input {
            TabBarInput::Pressed { position, .. } | TabBarInput::Moved(position) => {
                self.pointer.move_to(position);
                self.pointer.set_buttons(MouseButtons::PRIMARY);
            }
            TabBarInput::Released(position) => {
                self.pointer.move_to(position);
                self.pointer.set_buttons(MouseButtons::empty());
            }
            _ => {}
        }
        self.send(tm, Event::TabBar(group, input));
        self.pump(tm);
    }

    /// Centre of the tab for `window` in its group's bar.
    pub fn tab_centre(&self, tm: &TabManager, window: WindowId) -> Point {
        let group = tm.group_of(window).expect("window is not grouped");
        let bar = group.tab_bar();
        let index = bar.index_of(window).expect("no tab for window");
        bar.tab_rect(index).expect("no rect for tab").mid()
    }

    pub fn click_tab(&mut self, tm: &mut TabManager, window: WindowId) {
        let group = tm.registry().group_of(window).expect("window is not grouped");
        let position = self.tab_centre(tm, window);
        self.bar_input(tm, group, TabBarInput::Pressed { tab: window, position });
        self.bar_input(tm, group, TabBarInput::Released(position));
    }

    /// Moves time forward, firing each timer at its own deadline and
    /// answering whatever it requests.
    pub fn advance(&mut self, tm: &mut TabManager, by: Duration) {
        let target = self.clock.now() + by;
        while let Some(deadline) = tm.timers().next_deadline()
            && deadline <= target
        {
            self.clock.set(deadline);
            tm.fire_due_timers();
            check(tm);
            self.pump(tm);
        }
        self.clock.set(target);
    }

    /// Applies every pending request and command, feeding the resulting
    /// events back until the manager goes quiet.
    pub fn pump(&mut self, tm: &mut TabManager) {
        for _ in 0..100 {
            self.drain_commands();
            let mut events = Vec::new();
            while let Ok((_, request)) = self.host_rx.try_recv() {
                self.requests.push(request.clone());
                events.extend(self.apply(request));
            }
            if events.is_empty() {
                self.drain_commands();
                return;
            }
            for event in events {
                self.send(tm, event);
            }
        }
        panic!("host and manager did not settle");
    }

    pub fn take_requests(&mut self) -> Vec<host::Request> { std::mem::take(&mut self.requests) }

    pub fn take_commands(&mut self) -> Vec<ui::Command> { std::mem::take(&mut self.commands) }

    pub fn frame(&self, id: WindowId) -> Rect { self.windows[&id].frame }

    pub fn opacity(&self, id: WindowId) -> Opacity { self.windows[&id].opacity }

    pub fn bar(&self, group: GroupId) -> &BarView { &self.bars[&group] }

    fn apply(&mut self, request: host::Request) -> Vec<Event> {
        match request {
            host::Request::SetFrame(id, frame) => {
                let Some(window) = self.windows.get_mut(&id) else { return vec![] };
                if window.frame.same_as(frame) {
                    return vec![];
                }
                window.frame = frame;
                vec![Event::WindowFrameChanged(id, frame)]
            }
            host::Request::SetMaximized(id, state) => self.apply_maximize(id, state),
            host::Request::SetOpacity(id, opacity) => {
                if let Some(window) = self.windows.get_mut(&id) {
                    window.opacity = opacity;
                }
                vec![]
            }
            host::Request::Activate(id) => {
                if !self.windows.contains_key(&id) {
                    return vec![];
                }
                self.focused = Some(id);
                self.stacking.retain(|&w| w != id);
                self.stacking.push(id);
                vec![Event::StackingChanged(self.stacking.clone()), Event::WindowFocused(Some(id))]
            }
            host::Request::Notify(text) => {
                self.notices.push(text);
                vec![]
            }
        }
    }

    fn apply_maximize(&mut self, id: WindowId, state: MaximizeState) -> Vec<Event> {
        let Some(window) = self.windows.get_mut(&id) else { return vec![] };
        if window.maximized == state {
            return vec![];
        }
        if !window.maximized.is_maximized() {
            window.restore = window.frame;
        }
        window.maximized = state;
        let frame = if state.is_maximized() { SCREEN } else { window.restore };
        let mut events = vec![Event::WindowMaximizeChanged(id, state)];
        if !window.frame.same_as(frame) {
            window.frame = frame;
            events.push(Event::WindowFrameChanged(id, frame));
        }
        events
    }

    fn drain_commands(&mut self) {
        while let Ok((_, command)) = self.ui_rx.try_recv() {
            self.commands.push(command.clone());
            match command {
                ui::Command::CreateBar(group) => {
                    self.bars.insert(group, BarView::default());
                }
                ui::Command::DestroyBar(group) => {
                    assert!(self.bars.remove(&group).is_some(), "bar destroyed twice");
                }
                ui::Command::SetBarVisible(group, visible) => self.bar_mut(group).visible = visible,
                ui::Command::SetBarFrame(group, frame) => self.bar_mut(group).frame = frame,
                ui::Command::SetTabs(group, tabs) => self.bar_mut(group).tabs = tabs,
                ui::Command::ShowDropIndicator(frame) => self.drop_indicator = Some(frame),
                ui::Command::HideDropIndicator => self.drop_indicator = None,
                ui::Command::ShowDragClone { frame, .. } => self.drag_clone = Some(frame.mid()),
                ui::Command::MoveDragClone(to) => self.drag_clone = Some(to),
                ui::Command::DestroyDragClone => {
                    assert!(self.drag_clone.take().is_some(), "drag clone destroyed twice");
                }
                ui::Command::ShowContextMenu { items, .. } => self.menu = Some(items),
                ui::Command::DismissContextMenu => self.menu = None,
            }
        }
    }

    fn bar_mut(&mut self, group: GroupId) -> &mut BarView {
        self.bars.get_mut(&group).expect("command for a bar that was never created")
    }
}

fn check(tm: &TabManager) {
    if let Err(e) = tm.registry().check_invariants() {
        panic!("registry invariant violated: {e:?}\n{}", tm.draw_tree());
    }
}
