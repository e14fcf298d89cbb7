use slotmap::SlotMap;
use thiserror::Error;
use tracing::debug;

use super::group::WindowGroup;
use super::{Ctx, GroupId};
use crate::common::collections::HashMap;
use crate::sys::window::WindowId;

/// A broken registry invariant. These are bugs, never expected at runtime.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("window {window} is a member of groups {first:?} and {second:?}")]
    MultipleGroups {
        window: WindowId,
        first: GroupId,
        second: GroupId,
    },
    #[error("window {window} is in group {group:?} but maps to {mapped:?}")]
    MissingMapping {
        window: WindowId,
        group: GroupId,
        mapped: Option<GroupId>,
    },
    #[error("window {window} maps to group {group:?} which does not hold it")]
    DanglingMapping { window: WindowId, group: GroupId },
    #[error("group {0:?} has no members")]
    EmptyGroup(GroupId),
    #[error("group {group:?} has active window {window} which is not a member")]
    ForeignActive { group: GroupId, window: WindowId },
    #[error("group {0:?} tab order differs from its membership")]
    TabOrder(GroupId),
}

/// All live groups, and the window to group mapping kept as the exact
/// inverse of group membership.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: SlotMap<GroupId, WindowGroup>,
    window_groups: HashMap<WindowId, GroupId>,
}

impl GroupRegistry {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.groups.len() }

    pub fn is_empty(&self) -> bool { self.groups.is_empty() }

    pub fn get(&self, id: GroupId) -> Option<&WindowGroup> { self.groups.get(id) }

    pub fn get_mut(&mut self, id: GroupId) -> Option<&mut WindowGroup> { self.groups.get_mut(id) }

    pub fn iter(&self) -> impl Iterator<Item = (GroupId, &WindowGroup)> { self.groups.iter() }

    pub fn group_ids(&self) -> Vec<GroupId> { self.groups.keys().collect() }

    pub fn group_of(&self, window: WindowId) -> Option<GroupId> {
        self.window_groups.get(&window).copied()
    }

    pub fn group_of_mut(&mut self, window: WindowId) -> Option<&mut WindowGroup> {
        let id = self.group_of(window)?;
        self.groups.get_mut(id)
    }

    pub fn are_in_same_group(&self, a: WindowId, b: WindowId) -> bool {
        match (self.group_of(a), self.group_of(b)) {
            (Some(ga), Some(gb)) => ga == gb,
            _ => false,
        }
    }

    /// Creates an empty group. Callers fill it in the same step.
    fn create_group(&mut self, cx: &mut Ctx) -> GroupId {
        let id = self.groups.insert_with_key(|id| WindowGroup::new(id, cx));
        debug!(group = ?id, "Created group");
        id
    }

    /// Creates a group holding `windows` in order. Windows already grouped
    /// elsewhere are taken out of their group first. Returns None if none of
    /// the windows could be added.
    pub fn create_group_with(&mut self, windows: &[WindowId], cx: &mut Ctx) -> Option<GroupId> {
        for &window in windows {
            self.remove_window(window, cx);
        }
        let id = self.create_group(cx);
        let Some(group) = self.groups.get_mut(id) else { return None };
        for &window in windows {
            group.add_window(window, cx);
            if group.contains(window) {
                self.window_groups.insert(window, id);
            }
        }
        if group.is_empty() {
            self.dissolve(id, cx);
            return None;
        }
        self.debug_check();
        Some(id)
    }

    /// Adds `window` to `group`, taking it out of any other group first.
    /// Returns false if it was already a member or the group is gone.
    pub fn add_window(&mut self, group: GroupId, window: WindowId, cx: &mut Ctx) -> bool {
        if !self.groups.contains_key(group) {
            return false;
        }
        match self.group_of(window) {
            Some(current) if current == group => return false,
            Some(_) => {
                self.remove_window(window, cx);
            }
            None => {}
        }
        let Some(g) = self.groups.get_mut(group) else { return false };
        g.add_window(window, cx);
        if !g.contains(window) {
            return false;
        }
        self.window_groups.insert(window, group);
        self.debug_check();
        true
    }

    /// Takes `window` out of its group. The group is dissolved when it
    /// becomes empty, or when one window is left and single-window groups
    /// are not allowed. Returns the group the window was in.
    pub fn remove_window(&mut self, window: WindowId, cx: &mut Ctx) -> Option<GroupId> {
        let id = self.window_groups.remove(&window)?;
        let group = self.groups.get_mut(id)?;
        group.remove_window(window, cx);
        let remaining = group.len();
        if remaining == 0 || (remaining == 1 && !cx.settings.allow_single_window_groups) {
            self.dissolve(id, cx);
        }
        self.debug_check();
        Some(id)
    }

    /// Groups two windows the way a drop of `dragged` onto `target` does.
    ///
    /// Both grouped: `target`'s group is merged into `dragged`'s. One grouped:
    /// the other joins that group. Neither: a new group with `target` first.
    pub fn group_windows(
        &mut self,
        dragged: WindowId,
        target: WindowId,
        cx: &mut Ctx,
    ) -> Option<GroupId> {
        if dragged == target {
            return None;
        }
        match (self.group_of(dragged), self.group_of(target)) {
            (Some(a), Some(b)) if a == b => Some(a),
            (Some(into), Some(from)) => {
                self.merge(into, from, cx);
                Some(into)
            }
            (Some(g), None) => {
                self.add_window(g, target, cx);
                Some(g)
            }
            (None, Some(g)) => {
                self.add_window(g, dragged, cx);
                Some(g)
            }
            (None, None) => self.create_group_with(&[target, dragged], cx),
        }
    }

    /// Moves every member of `from` into `into`, appending them in their
    /// current order, then dissolves `from`.
    pub fn merge(&mut self, into: GroupId, from: GroupId, cx: &mut Ctx) -> bool {
        if into == from || !self.groups.contains_key(into) {
            return false;
        }
        let Some(source) = self.groups.get_mut(from) else { return false };
        let moving = source.windows().to_vec();
        for &window in &moving {
            source.remove_window(window, cx);
            self.window_groups.remove(&window);
        }
        if let Some(target) = self.groups.get_mut(into) {
            for &window in &moving {
                target.add_window(window, cx);
                if target.contains(window) {
                    self.window_groups.insert(window, into);
                }
            }
        }
        debug!(?into, ?from, moved = moving.len(), "Merged groups");
        self.dissolve(from, cx);
        self.debug_check();
        true
    }

    /// Dissolves `id`. Terminal: the id is never reused for another group.
    pub fn dissolve(&mut self, id: GroupId, cx: &mut Ctx) -> bool {
        let Some(group) = self.groups.remove(id) else { return false };
        for window in group.dissolve(cx) {
            if self.window_groups.get(&window) == Some(&id) {
                self.window_groups.remove(&window);
            }
        }
        self.debug_check();
        true
    }

    pub fn dissolve_all(&mut self, cx: &mut Ctx) -> usize {
        let ids = self.group_ids();
        for &id in &ids {
            self.dissolve(id, cx);
        }
        ids.len()
    }

    /// Checks that membership and the window mapping are exact inverses,
    /// that no group is empty, and that active windows and tabs mirror
    /// membership.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let mut seen: HashMap<WindowId, GroupId> = HashMap::default();
        for (id, group) in &self.groups {
            if group.is_empty() {
                return Err(InvariantViolation::EmptyGroup(id));
            }
            if let Some(active) = group.active()
                && !group.contains(active)
            {
                return Err(InvariantViolation::ForeignActive { group: id, window: active });
            }
            let tabs = group.tab_bar().tabs().iter().map(|t| t.window);
            if !tabs.eq(group.windows().iter().copied()) || group.tab_bar().active() != group.active() {
                return Err(InvariantViolation::TabOrder(id));
            }
            for &window in group.windows() {
                if let Some(first) = seen.insert(window, id) {
                    return Err(InvariantViolation::MultipleGroups { window, first, second: id });
                }
                let mapped = self.group_of(window);
                if mapped != Some(id) {
                    return Err(InvariantViolation::MissingMapping { window, group: id, mapped });
                }
            }
        }
        for (&window, &group) in &self.window_groups {
            if !seen.contains_key(&window) {
                return Err(InvariantViolation::DanglingMapping { window, group });
            }
        }
        Ok(())
    }

    fn debug_check(&self) {
        if cfg!(debug_assertions)
            && let Err(e) = self.check_invariants()
        {
            panic!("group registry invariant broken: {e}");
        }
    }
}
