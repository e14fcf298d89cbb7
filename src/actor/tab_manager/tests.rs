use std::time::Duration;

use pretty_assertions::assert_eq;
use test_log::test;

use super::testing::*;
use super::*;
use crate::common::config::ConfigCommand;
use crate::model::SyncKind;
use crate::sys::event::{Modifiers, MouseButtons, SharedPointer};
use crate::sys::timer::SystemClock;
use crate::sys::window::Opacity;
use crate::ui::MenuItem;

const A_FRAME: Rect = Rect::from_xywh(100.0, 100.0, 400.0, 300.0);
const B_FRAME: Rect = Rect::from_xywh(600.0, 200.0, 500.0, 400.0);
const TAB_FRAME: Rect = Rect::from_xywh(100.0, 200.0, 600.0, 400.0);
const LEFT: Rect = Rect::from_xywh(0.0, 0.0, 960.0, 1080.0);
const RIGHT: Rect = Rect::from_xywh(960.0, 0.0, 960.0, 1080.0);

fn ms(n: u64) -> Duration { Duration::from_millis(n) }

/// Groups only form on drops, and fall apart when one window is left.
fn manual_grouping() -> Config {
    let mut config = Config::default();
    config.settings.auto_group = false;
    config.settings.allow_single_window_groups = false;
    config
}

fn singles_allowed() -> Config {
    let mut config = manual_grouping();
    config.settings.allow_single_window_groups = true;
    config
}

fn members(tm: &TabManager, window: WindowId) -> Vec<WindowId> {
    tm.group_of(window).map(|g| g.windows().to_vec()).unwrap_or_default()
}

fn group_id(tm: &TabManager, window: WindowId) -> GroupId {
    tm.registry().group_of(window).expect("window is not grouped")
}

fn group_with(tm: &mut TabManager, host: &mut Host, windows: &[u64]) -> GroupId {
    let ids: Vec<WindowId> = windows.iter().map(|&n| w(n)).collect();
    let group = tm.with_registry(|r, cx| r.create_group_with(&ids, cx)).expect("group created");
    host.pump(tm);
    group
}

fn labels(host: &Host, group: GroupId) -> Vec<String> {
    host.bar(group).tabs.iter().map(|t| t.label.clone()).collect()
}

#[test]
fn it_groups_a_window_dropped_onto_another() {
    let (mut tm, mut host) = manager(manual_grouping());
    host.create(&mut tm, 1, "A", A_FRAME);
    host.create(&mut tm, 2, "B", B_FRAME);

    host.begin_drag(&mut tm, w(1), Point::new(800.0, 400.0));
    assert_eq!(host.drop_indicator, Some(Rect::from_xywh(595.0, 195.0, 510.0, 410.0)));

    host.end_drag(&mut tm, w(1));
    assert_eq!(host.drop_indicator, None);
    assert!(tm.are_in_same_group(w(1), w(2)));
    assert_eq!(members(&tm, w(1)), vec![w(2), w(1)]);
    assert_eq!(tm.group_of(w(1)).and_then(|g| g.active()), Some(w(2)));
    assert_eq!(host.frame(w(1)), B_FRAME);
    assert_eq!(host.opacity(w(1)), Opacity::Transparent);
    assert_eq!(host.opacity(w(2)), Opacity::Full);

    let group = group_id(&tm, w(1));
    assert_eq!(labels(&host, group), vec!["B", "A"]);
    assert!(!host.bar(group).visible, "no member is focused");

    host.click_tab(&mut tm, w(1));
    assert_eq!(tm.group_of(w(1)).and_then(|g| g.active()), Some(w(1)));
    assert_eq!(host.focused, Some(w(1)));
    assert_eq!(host.opacity(w(1)), Opacity::Full);
    assert_eq!(host.opacity(w(2)), Opacity::Transparent);
    assert!(host.bar(group).visible);
    assert_eq!(host.bar(group).frame, Rect::from_xywh(600.0, 160.0, 500.0, 40.0));

    let moved = Rect::from_xywh(300.0, 300.0, 500.0, 400.0);
    host.move_window(&mut tm, w(1), moved);
    assert_eq!(host.frame(w(2)), moved);
    assert_eq!(host.bar(group).frame, Rect::from_xywh(300.0, 260.0, 500.0, 40.0));

    host.bar_input(&mut tm, group, TabBarInput::CloseTab(w(2)));
    assert!(tm.registry().is_empty(), "one window left, group dissolves");
    assert!(host.bars.is_empty());
    assert_eq!(host.opacity(w(1)), Opacity::Full);
    assert_eq!(host.opacity(w(2)), Opacity::Full);
}

#[test]
fn it_keeps_single_window_groups_when_allowed() {
    let (mut tm, mut host) = manager(singles_allowed());
    host.create(&mut tm, 1, "A", A_FRAME);
    host.create(&mut tm, 2, "B", B_FRAME);
    host.begin_drag(&mut tm, w(1), Point::new(800.0, 400.0));
    host.end_drag(&mut tm, w(1));
    let group = group_id(&tm, w(1));

    host.bar_input(&mut tm, group, TabBarInput::CloseTab(w(2)));
    assert_eq!(members(&tm, w(1)), vec![w(1)]);
    assert_eq!(host.opacity(w(1)), Opacity::Full);

    host.bar_input(&mut tm, group, TabBarInput::CloseTab(w(1)));
    assert_eq!(host.notices, vec!["Cannot close the only tab in a group"]);
    assert_eq!(members(&tm, w(1)), vec![w(1)]);
}

#[test]
fn it_merges_groups_keeping_the_dragged_group_first() {
    let (mut tm, mut host) = manager(manual_grouping());
    host.create(&mut tm, 1, "one", Rect::from_xywh(100.0, 100.0, 400.0, 300.0));
    host.create(&mut tm, 2, "two", Rect::from_xywh(700.0, 100.0, 400.0, 300.0));
    host.create(&mut tm, 3, "three", Rect::from_xywh(100.0, 600.0, 400.0, 300.0));
    host.create(&mut tm, 4, "four", Rect::from_xywh(700.0, 600.0, 400.0, 300.0));

    host.begin_drag(&mut tm, w(2), Point::new(300.0, 200.0));
    host.end_drag(&mut tm, w(2));
    host.begin_drag(&mut tm, w(4), Point::new(300.0, 700.0));
    host.end_drag(&mut tm, w(4));
    assert_eq!(members(&tm, w(1)), vec![w(1), w(2)]);
    assert_eq!(members(&tm, w(3)), vec![w(3), w(4)]);
    let from = group_id(&tm, w(3));

    // The follower moves along with the active window.
    host.begin_drag(&mut tm, w(1), Point::new(300.0, 750.0));
    assert_eq!(host.frame(w(2)), host.frame(w(1)));
    assert_eq!(host.drop_indicator, Some(Rect::from_xywh(95.0, 595.0, 410.0, 310.0)));
    host.end_drag(&mut tm, w(1));

    assert_eq!(tm.registry().len(), 1);
    assert!(tm.registry().get(from).is_none());
    assert_eq!(members(&tm, w(3)), vec![w(1), w(2), w(3), w(4)]);
    for n in 2..=4 {
        assert_eq!(host.opacity(w(n)), Opacity::Transparent, "window {n}");
        assert_eq!(host.frame(w(n)), host.frame(w(1)), "window {n}");
    }
}

#[test]
fn it_dissolves_a_group_when_its_members_are_destroyed() {
    let (mut tm, mut host) = manager(manual_grouping());
    host.create(&mut tm, 1, "A", A_FRAME);
    host.create(&mut tm, 2, "B", B_FRAME);
    group_with(&mut tm, &mut host, &[2, 1]);

    host.destroy(&mut tm, w(1));
    assert!(tm.registry().is_empty());
    assert!(tm.timers().is_empty(), "timers outlived their group: {:?}", tm.timers());
    assert_eq!(host.opacity(w(2)), Opacity::Full);

    let (mut tm, mut host) = manager(singles_allowed());
    host.create(&mut tm, 1, "A", A_FRAME);
    host.create(&mut tm, 2, "B", B_FRAME);
    let group = group_with(&mut tm, &mut host, &[2, 1]);
    host.destroy(&mut tm, w(2));
    assert_eq!(tm.group_of(w(1)).map(|g| g.id()), Some(group));
    host.destroy(&mut tm, w(1));
    assert!(tm.registry().is_empty());
    assert!(host.bars.is_empty());
}

#[test]
fn it_syncs_positions_once_per_change() {
    let (mut tm, mut host) = manager(manual_grouping());
    host.create(&mut tm, 1, "A", A_FRAME);
    host.create(&mut tm, 2, "B", B_FRAME);
    let group = group_with(&mut tm, &mut host, &[2, 1]);
    host.take_requests();

    let moved = Rect::from_xywh(650.0, 250.0, 500.0, 400.0);
    host.move_window(&mut tm, w(2), moved);
    assert_eq!(host.take_requests(), vec![host::Request::SetFrame(w(1), moved)]);
    assert!(tm.registry().get(group).is_some_and(|g| g.is_syncing(SyncKind::Position)));

    host.advance(&mut tm, ms(200));
    assert!(tm.registry().get(group).is_some_and(|g| !g.is_syncing(SyncKind::Position)));
    host.move_window(&mut tm, w(2), moved);
    let issued = tm.with_group(group, |g, cx| g.sync_window_positions(cx));
    assert_eq!(issued, Some(0));
    assert_eq!(host.take_requests(), vec![]);
}

#[test]
fn it_catches_up_with_moves_made_while_a_sync_settles() {
    let (mut tm, mut host) = manager(manual_grouping());
    host.create(&mut tm, 1, "A", A_FRAME);
    host.create(&mut tm, 2, "B", B_FRAME);
    group_with(&mut tm, &mut host, &[2, 1]);

    let first = Rect::from_xywh(650.0, 250.0, 500.0, 400.0);
    let second = Rect::from_xywh(700.0, 300.0, 500.0, 400.0);
    host.move_window(&mut tm, w(2), first);
    host.move_window(&mut tm, w(2), second);
    assert_eq!(host.frame(w(1)), first, "second move is held back by the settle guard");

    host.advance(&mut tm, ms(100));
    assert_eq!(host.frame(w(1)), second);
}

#[test]
fn it_hides_the_bar_of_a_maximized_group_until_hovered() {
    let (mut tm, mut host) = manager(manual_grouping());
    host.create(&mut tm, 1, "A", A_FRAME);
    host.create(&mut tm, 2, "B", B_FRAME);
    let group = group_with(&mut tm, &mut host, &[2, 1]);
    host.focus(&mut tm, w(2));
    assert!(host.bar(group).visible);

    host.pointer.move_to(Point::new(500.0, 500.0));
    host.maximize(&mut tm, w(2), MaximizeState::Both);
    assert_eq!(host.windows[&w(1)].maximized, MaximizeState::Both);
    assert_eq!(host.frame(w(1)), SCREEN);
    assert!(!host.bar(group).visible);
    assert_eq!(host.bar(group).frame, Rect::from_xywh(0.0, 0.0, 1920.0, 40.0));

    host.advance(&mut tm, ms(100));
    assert!(!host.bar(group).visible, "pointer is away from the top edge");

    host.pointer.move_to(Point::new(500.0, 2.0));
    host.advance(&mut tm, ms(300));
    assert!(host.bar(group).visible);

    // Moving onto the revealed bar keeps it up.
    host.pointer.move_to(Point::new(500.0, 30.0));
    host.advance(&mut tm, ms(100));
    assert!(host.bar(group).visible);

    host.pointer.move_to(Point::new(500.0, 500.0));
    host.advance(&mut tm, ms(60));
    assert!(!host.bar(group).visible);

    host.maximize(&mut tm, w(2), MaximizeState::None);
    assert_eq!(host.windows[&w(1)].maximized, MaximizeState::None);
    assert_eq!(host.frame(w(1)), B_FRAME);
    assert!(host.bar(group).visible);
    assert!(!tm.timers().is_pending(TimerKind::HoverPoll(group)));
}

#[test]
fn it_reveals_neighbouring_tiled_bars_without_delay() {
    let (mut tm, mut host) = manager(manual_grouping());
    host.pointer.move_to(Point::new(500.0, 500.0));
    host.create(&mut tm, 1, "left 1", LEFT);
    host.create(&mut tm, 2, "left 2", LEFT);
    host.create(&mut tm, 3, "right 1", RIGHT);
    host.create(&mut tm, 4, "right 2", RIGHT);
    let left = group_with(&mut tm, &mut host, &[1, 2]);
    let right = group_with(&mut tm, &mut host, &[3, 4]);
    assert!(!host.bar(left).visible);
    assert!(!host.bar(right).visible);
    assert_eq!(host.bar(right).frame, Rect::from_xywh(960.0, 0.0, 960.0, 40.0));

    host.pointer.move_to(Point::new(100.0, 2.0));
    host.advance(&mut tm, ms(300));
    assert!(host.bar(left).visible);
    assert!(!host.bar(right).visible);
    assert!(tm.tiled_mode().contains(left));

    host.pointer.move_to(Point::new(1500.0, 2.0));
    host.advance(&mut tm, ms(50));
    assert!(host.bar(right).visible, "revealed without waiting for the debounce");
    assert!(!host.bar(left).visible);

    host.advance(&mut tm, ms(150));
    assert!(!tm.tiled_mode().contains(left));
    assert!(tm.tiled_mode().contains(right));
}

#[test]
fn it_requires_a_modifier_when_configured() {
    let mut config = manual_grouping();
    config.settings.require_modifier = true;
    let (mut tm, mut host) = manager(config);
    host.create(&mut tm, 1, "A", A_FRAME);
    host.create(&mut tm, 2, "B", B_FRAME);

    host.begin_drag(&mut tm, w(1), Point::new(800.0, 400.0));
    assert_eq!(host.drop_indicator, None);
    host.end_drag(&mut tm, w(1));
    assert!(tm.registry().is_empty());
    assert!(!tm.timers().is_pending(TimerKind::ModifierPoll));

    host.begin_drag(&mut tm, w(1), Point::new(800.0, 450.0));
    host.set_modifiers(&mut tm, Modifiers::CONTROL);
    assert!(host.drop_indicator.is_some());
    host.set_modifiers(&mut tm, Modifiers::empty());
    assert_eq!(host.drop_indicator, None);

    // A key press that only the pointer poll sees still counts.
    host.pointer.set_modifiers(Modifiers::SUPER);
    host.advance(&mut tm, ms(150));
    assert!(host.drop_indicator.is_some());

    host.end_drag(&mut tm, w(1));
    assert!(tm.are_in_same_group(w(1), w(2)));
    assert!(!tm.timers().is_pending(TimerKind::ModifierPoll));
}

#[test]
fn it_cancels_the_drag_when_the_dragged_window_goes_away() {
    let (mut tm, mut host) = manager(manual_grouping());
    host.create(&mut tm, 1, "A", A_FRAME);
    host.create(&mut tm, 2, "B", B_FRAME);
    host.begin_drag(&mut tm, w(1), Point::new(800.0, 400.0));
    assert!(host.drop_indicator.is_some());

    host.destroy(&mut tm, w(1));
    assert_eq!(host.drop_indicator, None);
    assert_eq!(tm.drag().dragged(), None);
    assert!(tm.registry().is_empty());
}

#[test]
fn it_reorders_tabs_by_dragging_within_the_bar() {
    let (mut tm, mut host) = manager(manual_grouping());
    for n in 1..=3 {
        host.create(&mut tm, n, &format!("tab {n}"), TAB_FRAME);
    }
    let group = group_with(&mut tm, &mut host, &[1, 2, 3]);
    assert_eq!(host.bar(group).frame, Rect::from_xywh(100.0, 160.0, 600.0, 40.0));

    let start = host.tab_centre(&tm, w(1));
    host.bar_input(&mut tm, group, TabBarInput::Pressed { tab: w(1), position: start });
    host.bar_input(&mut tm, group, TabBarInput::Moved(Point::new(400.0, 180.0)));
    assert!(host.drag_clone.is_some());
    assert_eq!(members(&tm, w(1)), vec![w(2), w(1), w(3)]);

    host.bar_input(&mut tm, group, TabBarInput::Moved(Point::new(600.0, 180.0)));
    assert_eq!(members(&tm, w(1)), vec![w(2), w(3), w(1)]);

    host.bar_input(&mut tm, group, TabBarInput::Released(Point::new(600.0, 180.0)));
    assert_eq!(host.drag_clone, None);
    assert_eq!(labels(&host, group), vec!["tab 2", "tab 3", "tab 1"]);
    assert_eq!(tm.group_of(w(1)).and_then(|g| g.active()), Some(w(1)), "a drag is not a click");

    host.advance(&mut tm, ms(200));
    let pointer = tm.registry().get(group).map(|g| g.tab_bar().pointer());
    assert_eq!(pointer, Some(crate::ui::tab_bar::TabPointer::None));
}

#[test]
fn it_moves_a_tab_dropped_onto_another_window() {
    let (mut tm, mut host) = manager(manual_grouping());
    host.create(&mut tm, 1, "one", TAB_FRAME);
    host.create(&mut tm, 2, "two", TAB_FRAME);
    let group = group_with(&mut tm, &mut host, &[1, 2]);
    host.create(&mut tm, 3, "three", Rect::from_xywh(1000.0, 300.0, 500.0, 400.0));

    let start = host.tab_centre(&tm, w(2));
    let target = Point::new(1200.0, 500.0);
    host.bar_input(&mut tm, group, TabBarInput::Pressed { tab: w(2), position: start });
    host.bar_input(&mut tm, group, TabBarInput::Moved(target));
    assert_eq!(host.drop_indicator, Some(Rect::from_xywh(995.0, 295.0, 510.0, 410.0)));

    host.bar_input(&mut tm, group, TabBarInput::Released(target));
    assert_eq!(host.drop_indicator, None);
    assert_eq!(host.drag_clone, None);
    assert!(tm.registry().get(group).is_none(), "old group was left with one window");
    assert_eq!(tm.group_of(w(1)).map(|g| g.id()), None);
    assert_eq!(members(&tm, w(3)), vec![w(3), w(2)]);
    assert_eq!(host.frame(w(2)), host.frame(w(3)));
    assert_eq!(host.opacity(w(1)), Opacity::Full);
}

#[test]
fn it_separates_a_tab_released_over_empty_space() {
    let (mut tm, mut host) = manager(manual_grouping());
    for n in 1..=3 {
        host.create(&mut tm, n, &format!("tab {n}"), TAB_FRAME);
    }
    let group = group_with(&mut tm, &mut host, &[1, 2, 3]);

    let start = host.tab_centre(&tm, w(2));
    host.bar_input(&mut tm, group, TabBarInput::Pressed { tab: w(2), position: start });
    host.bar_input(&mut tm, group, TabBarInput::Moved(Point::new(1500.0, 700.0)));
    assert_eq!(host.drop_indicator, None);

    // The release happens away from the bar; only the gesture poll sees it.
    host.pointer.set_buttons(MouseButtons::empty());
    host.advance(&mut tm, ms(30));

    assert_eq!(members(&tm, w(1)), vec![w(1), w(3)]);
    assert_eq!(tm.group_of(w(2)).map(|g| g.id()), None);
    assert_eq!(host.frame(w(2)), Rect::from_xywh(1200.0, 700.0, 600.0, 400.0));
    assert_eq!(host.opacity(w(2)), Opacity::Full);
    assert_eq!(host.drag_clone, None);
    assert!(!tm.timers().is_pending(TimerKind::GesturePoll));
}

#[test]
fn it_offers_leave_group_only_when_there_is_someone_to_leave() {
    let (mut tm, mut host) = manager(singles_allowed());
    host.create(&mut tm, 1, "one", TAB_FRAME);
    let group = group_with(&mut tm, &mut host, &[1]);
    let at = host.tab_centre(&tm, w(1));

    host.bar_input(&mut tm, group, TabBarInput::ContextMenu { tab: w(1), position: at });
    assert_eq!(
        host.menu,
        Some(vec![MenuItem { action: MenuAction::LeaveGroup, enabled: false }])
    );
    let selected = TabBarInput::MenuSelected { tab: w(1), action: MenuAction::LeaveGroup };
    host.bar_input(&mut tm, group, selected);
    assert_eq!(host.menu, None);
    assert_eq!(host.notices, vec!["Cannot leave a group with only one window"]);
    assert_eq!(members(&tm, w(1)), vec![w(1)]);

    host.create(&mut tm, 2, "two", TAB_FRAME);
    tm.with_registry(|r, cx| r.add_window(group, w(2), cx));
    host.pump(&mut tm);
    host.bar_input(&mut tm, group, TabBarInput::ContextMenu { tab: w(1), position: at });
    assert_eq!(
        host.menu,
        Some(vec![MenuItem { action: MenuAction::LeaveGroup, enabled: true }])
    );
    host.send(&mut tm, Event::MouseButton(MouseButton::Secondary, MouseState::Down));
    host.pump(&mut tm);
    assert_eq!(host.menu, None);

    host.send(&mut tm, Event::Command(Command::LeaveGroup(w(1))));
    host.pump(&mut tm);
    assert_eq!(members(&tm, w(2)), vec![w(2)]);
    assert_eq!(tm.group_of(w(1)).map(|g| g.id()), None);
}

#[test]
fn it_dissolves_the_group_from_the_close_button() {
    let (mut tm, mut host) = manager(manual_grouping());
    host.create(&mut tm, 1, "one", TAB_FRAME);
    host.create(&mut tm, 2, "two", TAB_FRAME);
    let group = group_with(&mut tm, &mut host, &[1, 2]);
    host.bar_input(&mut tm, group, TabBarInput::CloseGroupClicked);

    assert!(tm.registry().is_empty());
    assert!(host.bars.is_empty());
    assert_eq!(host.opacity(w(1)), Opacity::Full);
    assert_eq!(host.opacity(w(2)), Opacity::Full);

    // Late input for the dissolved bar is dropped.
    host.bar_input(&mut tm, group, TabBarInput::CloseTab(w(1)));
    assert!(host.notices.is_empty());
}

#[test]
fn it_hands_the_active_tab_on_when_minimized() {
    let (mut tm, mut host) = manager(manual_grouping());
    host.create(&mut tm, 1, "one", TAB_FRAME);
    host.create(&mut tm, 2, "two", TAB_FRAME);
    group_with(&mut tm, &mut host, &[1, 2]);

    host.send(&mut tm, Event::WindowMinimized(w(1)));
    host.pump(&mut tm);
    assert_eq!(tm.group_of(w(1)).and_then(|g| g.active()), Some(w(2)));
    assert_eq!(host.opacity(w(2)), Opacity::Full);

    host.send(&mut tm, Event::WindowDeminimized(w(1)));
    host.pump(&mut tm);
    assert_eq!(tm.group_of(w(1)).and_then(|g| g.active()), Some(w(2)));
    assert_eq!(host.opacity(w(1)), Opacity::Transparent);
}

#[test]
fn it_leaves_minimized_members_out_of_geometry_sync() {
    let (mut tm, mut host) = manager(manual_grouping());
    host.create(&mut tm, 1, "one", TAB_FRAME);
    host.create(&mut tm, 2, "two", TAB_FRAME);
    host.create(&mut tm, 3, "three", TAB_FRAME);
    let group = group_with(&mut tm, &mut host, &[1, 2, 3]);
    host.focus(&mut tm, w(1));
    host.send(&mut tm, Event::WindowMinimized(w(3)));
    host.pump(&mut tm);
    host.take_requests();

    let moved = Rect::from_xywh(300.0, 300.0, 600.0, 400.0);
    host.move_window(&mut tm, w(1), moved);
    host.advance(&mut tm, ms(300));
    host.maximize(&mut tm, w(1), MaximizeState::Both);
    host.advance(&mut tm, ms(300));

    let requests = host.take_requests();
    assert!(requests.contains(&Request::SetFrame(w(2), moved)), "{requests:?}");
    assert!(requests.contains(&Request::SetMaximized(w(2), MaximizeState::Both)), "{requests:?}");
    assert!(
        !requests.iter().any(|r| matches!(
            r,
            Request::SetFrame(id, _) | Request::SetMaximized(id, _) if *id == w(3)
        )),
        "{requests:?}"
    );
    assert_eq!(host.frame(w(3)), TAB_FRAME);
    assert_eq!(host.windows[&w(3)].maximized, MaximizeState::None);

    host.maximize(&mut tm, w(1), MaximizeState::None);
    host.advance(&mut tm, ms(300));
    assert!(host.bar(group).visible);

    host.send(&mut tm, Event::WindowMinimized(w(1)));
    host.pump(&mut tm);
    assert!(host.bar(group).visible, "two is still up");

    host.send(&mut tm, Event::WindowMinimized(w(2)));
    host.pump(&mut tm);
    assert!(!host.bar(group).visible);
}

#[test]
fn it_adds_a_loose_window_to_the_group_on_either_side_of_a_drop() {
    let (mut tm, mut host) = manager(manual_grouping());
    let corner = Rect::from_xywh(1200.0, 600.0, 400.0, 300.0);
    host.create(&mut tm, 1, "A", A_FRAME);
    host.create(&mut tm, 2, "B", B_FRAME);
    host.create(&mut tm, 3, "C", corner);
    group_with(&mut tm, &mut host, &[1, 2]);

    // Loose window onto a group.
    host.begin_drag(&mut tm, w(3), Point::new(300.0, 200.0));
    host.end_drag(&mut tm, w(3));
    assert_eq!(tm.registry().len(), 1);
    assert_eq!(members(&tm, w(1)), vec![w(1), w(2), w(3)]);
    assert_eq!(tm.group_of(w(3)).and_then(|g| g.active()), Some(w(1)));
    assert_eq!(host.frame(w(3)), A_FRAME);
    assert_eq!(host.opacity(w(3)), Opacity::Transparent);
    assert_eq!(host.opacity(w(1)), Opacity::Full);

    // Group onto a loose window.
    host.create(&mut tm, 4, "D", corner);
    host.begin_drag(&mut tm, w(1), Point::new(1400.0, 700.0));
    host.end_drag(&mut tm, w(1));
    assert_eq!(tm.registry().len(), 1);
    assert_eq!(members(&tm, w(1)), vec![w(1), w(2), w(3), w(4)]);
    assert_eq!(host.frame(w(4)), host.frame(w(1)));
    assert_eq!(host.opacity(w(4)), Opacity::Transparent);
}

#[test]
fn it_relabels_tabs_when_titles_change() {
    let (mut tm, mut host) = manager(manual_grouping());
    host.create(&mut tm, 1, "one", TAB_FRAME);
    host.create(&mut tm, 2, "two", TAB_FRAME);
    let group = group_with(&mut tm, &mut host, &[1, 2]);

    host.send(&mut tm, Event::WindowTitleChanged(w(1), "renamed".into()));
    host.send(&mut tm, Event::WindowTitleChanged(w(2), "  ".into()));
    host.pump(&mut tm);
    assert_eq!(labels(&host, group), vec!["renamed", "Window"]);
}

#[test]
fn it_groups_new_windows_on_their_own_with_auto_group() {
    let mut config = singles_allowed();
    config.settings.auto_group = true;
    let (mut tm, mut host) = manager(config);
    host.create(&mut tm, 1, "A", A_FRAME);
    host.create(&mut tm, 2, "B", B_FRAME);
    assert_eq!(tm.registry().len(), 2);
    assert_eq!(members(&tm, w(1)), vec![w(1)]);

    host.begin_drag(&mut tm, w(1), Point::new(800.0, 400.0));
    host.end_drag(&mut tm, w(1));
    assert_eq!(tm.registry().len(), 1);
    assert_eq!(members(&tm, w(2)), vec![w(1), w(2)]);

    let group = group_id(&tm, w(1));
    host.bar_input(&mut tm, group, TabBarInput::CloseTab(w(2)));
    assert_eq!(tm.registry().len(), 2, "closed tab gets a group of its own");
    assert_eq!(members(&tm, w(2)), vec![w(2)]);
}

#[test]
fn it_applies_commands() {
    let (mut tm, mut host) = manager(manual_grouping());
    host.create(&mut tm, 1, "one", TAB_FRAME);
    host.create(&mut tm, 2, "two", TAB_FRAME);
    host.create(&mut tm, 3, "three", A_FRAME);
    group_with(&mut tm, &mut host, &[1, 2]);

    host.send(&mut tm, Event::Command(Command::CloseGroup(w(3))));
    host.pump(&mut tm);
    assert_eq!(host.notices, vec!["Window w3 is not in a group"]);

    host.send(&mut tm, Event::Command(Command::DumpState));
    assert!(tm.draw_tree().contains("\"one\" *"));

    let set = ConfigCommand::SetRequireModifier(true);
    host.send(&mut tm, Event::Command(Command::Config(set)));
    assert!(tm.config().settings.require_modifier);

    let invalid = ConfigCommand::Set {
        key: "settings.tab_bar.height".into(),
        value: serde_json::json!(-1.0),
    };
    host.send(&mut tm, Event::Command(Command::Config(invalid)));
    assert_eq!(tm.config().settings.tab_bar.height, 40.0);

    host.send(&mut tm, Event::Command(Command::DissolveAll));
    host.pump(&mut tm);
    assert!(tm.registry().is_empty());
}

#[test]
fn it_dissolves_auto_groups_that_shrink_to_one_window() {
    let mut config = manual_grouping();
    config.settings.auto_group = true;
    let (mut tm, mut host) = manager(config);
    host.create(&mut tm, 1, "A", A_FRAME);
    host.create(&mut tm, 2, "B", B_FRAME);
    assert_eq!(tm.registry().len(), 2);
    assert_eq!(members(&tm, w(2)), vec![w(2)]);

    host.begin_drag(&mut tm, w(1), Point::new(800.0, 400.0));
    host.end_drag(&mut tm, w(1));
    assert_eq!(tm.registry().len(), 1);
    assert_eq!(members(&tm, w(1)), vec![w(1), w(2)]);
    let group = group_id(&tm, w(1));

    host.take_commands();
    host.destroy(&mut tm, w(2));
    assert!(tm.registry().is_empty());
    assert_eq!(tm.registry().group_of(w(1)), None);
    assert!(host.take_commands().contains(&ui::Command::DestroyBar(group)));
    assert_eq!(host.opacity(w(1)), Opacity::Full);
}

#[test]
fn it_drops_single_window_groups_when_the_policy_is_turned_off() {
    let (mut tm, mut host) = manager(singles_allowed());
    host.create(&mut tm, 1, "one", TAB_FRAME);
    host.create(&mut tm, 2, "two", TAB_FRAME);
    host.create(&mut tm, 3, "three", A_FRAME);
    group_with(&mut tm, &mut host, &[1, 2]);
    group_with(&mut tm, &mut host, &[3]);

    host.send(&mut tm, Event::ConfigUpdated(manual_grouping()));
    host.pump(&mut tm);
    assert_eq!(tm.registry().len(), 1);
    assert_eq!(tm.group_of(w(3)).map(|g| g.id()), None);
}

#[test]
fn it_replays_a_recorded_session() {
    let temp = tempfile::NamedTempFile::new().unwrap();
    let path = temp.path().to_owned();
    let (mut tm, mut host) = manager_with_record(manual_grouping(), Record::new_for_test(temp));
    host.create(&mut tm, 1, "A", A_FRAME);
    host.create(&mut tm, 2, "B", B_FRAME);
    host.create(&mut tm, 3, "C", Rect::from_xywh(1200.0, 600.0, 400.0, 300.0));
    host.begin_drag(&mut tm, w(1), Point::new(800.0, 400.0));
    host.advance(&mut tm, ms(30));
    host.end_drag(&mut tm, w(1));
    host.click_tab(&mut tm, w(1));
    host.move_window(&mut tm, w(1), Rect::from_xywh(500.0, 100.0, 500.0, 400.0));
    host.advance(&mut tm, ms(300));

    let mut requests = Vec::new();
    let replayed = replay(&path, |output| {
        if let Output::Host(request) = output {
            requests.push(request);
        }
    })
    .unwrap();

    assert_eq!(replayed.draw_tree(), tm.draw_tree());
    assert_eq!(requests, host.take_requests());
    assert_eq!(replayed.window(w(2)).map(|s| s.opacity), Some(Opacity::Transparent));
}

#[test(tokio::test)]
async fn it_restores_every_window_when_the_event_stream_ends() {
    let (host_tx, mut host_rx) = actor::channel();
    let (ui_tx, _ui_rx) = actor::channel();
    let pointer = SharedPointer::new();
    pointer.move_to(Point::new(200.0, 200.0));
    let mut tm = TabManager::new(
        manual_grouping(),
        host_tx,
        ui_tx,
        Box::new(SystemClock),
        Box::new(pointer),
        Record::none(),
    );
    tm.adopt_existing(vec![
        (w(1), window_info("one", A_FRAME)),
        (w(2), window_info("two", A_FRAME)),
    ]);

    let (tx, rx) = actor::channel();
    tx.send(Event::ScreenParametersChanged(vec![SCREEN]));
    tx.send(Event::StackingChanged(vec![w(1), w(2)]));
    tx.send(Event::DragBegin(w(2)));
    tx.send(Event::DragEnd(w(2)));
    drop(tx);
    tm.run(rx).await;

    let mut requests = Vec::new();
    while let Ok((_, request)) = host_rx.try_recv() {
        requests.push(request);
    }
    assert!(requests.contains(&host::Request::SetOpacity(w(2), Opacity::Transparent)));
    assert_eq!(requests.last(), Some(&host::Request::SetOpacity(w(2), Opacity::Full)));
}
