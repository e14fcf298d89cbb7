use tracing::{debug, info, warn};

use crate::actor::tab_manager::events::drag::DragEventHandler;
use crate::actor::tab_manager::events::tab_bar::TabBarEventHandler;
use crate::actor::tab_manager::{Command, TabManager};
use crate::common::config::{Config, ConfigCommand};
use crate::model::{GroupError, TimerKind};
use crate::sys::window::WindowId;

pub struct CommandEventHandler;

impl CommandEventHandler {
    pub fn handle(manager: &mut TabManager, cmd: Command) {
        info!(?cmd, "Command");
        match cmd {
            Command::DissolveAll => {
                let dissolved = manager.with_registry(|r, cx| r.dissolve_all(cx));
                debug!(dissolved, "Dissolved every group");
            }
            Command::CloseGroup(window) => match manager.registry.group_of(window) {
                Some(group) => {
                    manager.with_registry(|r, cx| r.dissolve(group, cx));
                }
                None => manager.notify(GroupError::NotGrouped(window)),
            },
            Command::LeaveGroup(window) => Self::leave_group(manager, window),
            Command::Config(cmd) => Self::handle_config_command(manager, cmd),
            Command::DumpState => info!("Groups:\n{}", manager.draw_tree()),
        }
    }

    pub fn leave_group(manager: &mut TabManager, window: WindowId) {
        let Some(group) = manager.registry.group_of(window).and_then(|g| manager.registry.get(g))
        else {
            manager.notify(GroupError::NotGrouped(window));
            return;
        };
        if group.len() <= 1 {
            manager.notify(GroupError::SingleWindowGroup);
            return;
        }
        debug!(?window, "Leaving group");
        TabBarEventHandler::separate(manager, window);
    }

    fn handle_config_command(manager: &mut TabManager, cmd: ConfigCommand) {
        let mut config = manager.config.clone();
        if let Err(e) = config.apply_command(cmd) {
            warn!(%e, "Config command failed");
            return;
        }
        let issues = config.validate();
        if !issues.is_empty() {
            warn!(?issues, "Rejecting invalid config change");
            return;
        }
        Self::apply_config(manager, config);
        if let Some(path) = &manager.config_path
            && let Err(e) = manager.config.save(path)
        {
            warn!(%e, path = %path.display(), "Failed to save config");
        }
    }

    pub fn handle_config_updated(manager: &mut TabManager, config: Config) {
        let issues = config.validate();
        if !issues.is_empty() {
            warn!(?issues, "Ignoring invalid config");
            return;
        }
        Self::apply_config(manager, config);
    }

    /// Swaps in `config` and brings existing state in line with the new
    /// policy.
    fn apply_config(manager: &mut TabManager, config: Config) {
        let old = std::mem::replace(&mut manager.config, config);
        if old == manager.config {
            debug!("Config unchanged");
            return;
        }
        info!("Config updated");
        let settings = manager.config.settings.clone();

        if settings.require_modifier != old.settings.require_modifier {
            if settings.require_modifier && manager.drag.dragged().is_some() {
                DragEventHandler::schedule_modifier_poll(manager);
            } else {
                manager.timers.cancel(TimerKind::ModifierPoll);
            }
            DragEventHandler::update_drop_target(manager);
        }

        if settings.auto_group && !old.settings.auto_group {
            let mut ungrouped: Vec<WindowId> = manager
                .windows
                .iter()
                .filter(|(id, w)| w.is_normal() && manager.registry.group_of(**id).is_none())
                .map(|(&id, _)| id)
                .collect();
            ungrouped.sort_unstable();
            debug!(count = ungrouped.len(), "Grouping existing windows");
            for window in ungrouped {
                manager.with_registry(|r, cx| r.create_group_with(&[window], cx));
            }
        }

        if !settings.allow_single_window_groups && old.settings.allow_single_window_groups {
            let singles: Vec<_> = manager
                .registry
                .iter()
                .filter(|(_, g)| g.len() == 1)
                .map(|(id, _)| id)
                .collect();
            for group in singles {
                manager.with_registry(|r, cx| r.dissolve(group, cx));
            }
        }

        for group in manager.registry.group_ids() {
            manager.with_group(group, |g, cx| g.update_tab_bar_visibility(cx));
        }
    }
}
