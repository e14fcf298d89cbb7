use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ConfigCommand {
    SetRequireModifier(bool),
    SetAutoGroup(bool),
    SetAllowSingleWindowGroups(bool),

    /// Generic setter for arbitrary config paths using dot-separated keys.
    /// Example: key = "settings.tab_bar.height", value = 32
    Set {
        key: String,
        value: Value,
    },
}

pub fn config_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tabgroups")
        .join("config.toml")
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Only group on drop while Ctrl, Meta or Super is held.
    #[serde(default = "no")]
    pub require_modifier: bool,
    /// Give every new normal window its own single-tab group.
    #[serde(default = "yes")]
    pub auto_group: bool,
    /// Keep a group alive when only one window is left in it.
    #[serde(default = "yes")]
    pub allow_single_window_groups: bool,
    /// Reload the config file when it changes on disk.
    #[serde(default = "yes")]
    pub hot_reload: bool,
    #[serde(default)]
    pub tab_bar: TabBarSettings,
    #[serde(default)]
    pub timing: TimingSettings,
    #[serde(default)]
    pub tiling: TilingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            require_modifier: false,
            auto_group: true,
            allow_single_window_groups: true,
            hot_reload: true,
            tab_bar: TabBarSettings::default(),
            timing: TimingSettings::default(),
            tiling: TilingSettings::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct TabBarSettings {
    #[serde(default = "default_bar_height")]
    pub height: f64,
    /// Pointer travel (px) before a pressed tab starts dragging.
    #[serde(default = "default_drag_threshold")]
    pub drag_threshold: f64,
    /// Minimum time between two reorders against the same target tab.
    #[serde(default = "default_reorder_cooldown_ms")]
    pub reorder_cooldown_ms: u64,
    /// Height (px) of the band at the top of the work area that reveals a
    /// hidden bar.
    #[serde(default = "default_hover_band")]
    pub hover_band: f64,
    #[serde(default = "default_drop_indicator_margin")]
    pub drop_indicator_margin: f64,
}

impl Default for TabBarSettings {
    fn default() -> Self {
        TabBarSettings {
            height: default_bar_height(),
            drag_threshold: default_drag_threshold(),
            reorder_cooldown_ms: default_reorder_cooldown_ms(),
            hover_band: default_hover_band(),
            drop_indicator_margin: default_drop_indicator_margin(),
        }
    }
}

impl TabBarSettings {
    pub fn reorder_cooldown(&self) -> Duration { Duration::from_millis(self.reorder_cooldown_ms) }
}

/// Delays in milliseconds.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct TimingSettings {
    #[serde(default = "default_position_settle_ms")]
    pub position_settle_ms: u64,
    #[serde(default = "default_maximize_settle_ms")]
    pub maximize_settle_ms: u64,
    #[serde(default = "default_hover_poll_ms")]
    pub hover_poll_ms: u64,
    #[serde(default = "default_hover_debounce_ms")]
    pub hover_debounce_ms: u64,
    #[serde(default = "default_tiled_mode_grace_ms")]
    pub tiled_mode_grace_ms: u64,
    #[serde(default = "default_modifier_poll_ms")]
    pub modifier_poll_ms: u64,
    #[serde(default = "default_gesture_poll_ms")]
    pub gesture_poll_ms: u64,
    #[serde(default = "default_tab_state_reset_ms")]
    pub tab_state_reset_ms: u64,
    #[serde(default = "default_move_end_ms")]
    pub move_end_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        TimingSettings {
            position_settle_ms: default_position_settle_ms(),
            maximize_settle_ms: default_maximize_settle_ms(),
            hover_poll_ms: default_hover_poll_ms(),
            hover_debounce_ms: default_hover_debounce_ms(),
            tiled_mode_grace_ms: default_tiled_mode_grace_ms(),
            modifier_poll_ms: default_modifier_poll_ms(),
            gesture_poll_ms: default_gesture_poll_ms(),
            tab_state_reset_ms: default_tab_state_reset_ms(),
            move_end_ms: default_move_end_ms(),
        }
    }
}

impl TimingSettings {
    pub fn position_settle(&self) -> Duration { Duration::from_millis(self.position_settle_ms) }

    pub fn maximize_settle(&self) -> Duration { Duration::from_millis(self.maximize_settle_ms) }

    pub fn hover_poll(&self) -> Duration { Duration::from_millis(self.hover_poll_ms) }

    pub fn hover_debounce(&self) -> Duration { Duration::from_millis(self.hover_debounce_ms) }

    pub fn tiled_mode_grace(&self) -> Duration { Duration::from_millis(self.tiled_mode_grace_ms) }

    pub fn modifier_poll(&self) -> Duration { Duration::from_millis(self.modifier_poll_ms) }

    pub fn gesture_poll(&self) -> Duration { Duration::from_millis(self.gesture_poll_ms) }

    pub fn tab_state_reset(&self) -> Duration { Duration::from_millis(self.tab_state_reset_ms) }

    pub fn move_end(&self) -> Duration { Duration::from_millis(self.move_end_ms) }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct TilingSettings {
    /// Slack (px) allowed when matching a frame against half the work area.
    #[serde(default = "default_tiling_tolerance")]
    pub tolerance: f64,
}

impl Default for TilingSettings {
    fn default() -> Self { TilingSettings { tolerance: default_tiling_tolerance() } }
}

fn yes() -> bool { true }

fn no() -> bool { false }

fn default_bar_height() -> f64 { 40.0 }

fn default_drag_threshold() -> f64 { 5.0 }

fn default_reorder_cooldown_ms() -> u64 { 150 }

fn default_hover_band() -> f64 { 5.0 }

fn default_drop_indicator_margin() -> f64 { 5.0 }

fn default_position_settle_ms() -> u64 { 50 }

fn default_maximize_settle_ms() -> u64 { 100 }

fn default_hover_poll_ms() -> u64 { 50 }

fn default_hover_debounce_ms() -> u64 { 200 }

fn default_tiled_mode_grace_ms() -> u64 { 100 }

fn default_modifier_poll_ms() -> u64 { 100 }

fn default_gesture_poll_ms() -> u64 { 20 }

fn default_tab_state_reset_ms() -> u64 { 100 }

fn default_move_end_ms() -> u64 { 150 }

fn default_tiling_tolerance() -> f64 { 10.0 }

impl Settings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        issues.extend(self.tab_bar.validate());
        issues.extend(self.timing.validate());

        if self.tiling.tolerance < 0.0 {
            issues.push(format!(
                "tiling.tolerance must be non-negative, got {}",
                self.tiling.tolerance
            ));
        }

        issues
    }
}

impl TabBarSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.height <= 0.0 {
            issues.push(format!("tab_bar.height must be positive, got {}", self.height));
        }
        if self.drag_threshold < 0.0 {
            issues.push(format!(
                "tab_bar.drag_threshold must be non-negative, got {}",
                self.drag_threshold
            ));
        }
        if self.hover_band < 0.0 {
            issues.push(format!(
                "tab_bar.hover_band must be non-negative, got {}",
                self.hover_band
            ));
        }
        if self.drop_indicator_margin < 0.0 {
            issues.push(format!(
                "tab_bar.drop_indicator_margin must be non-negative, got {}",
                self.drop_indicator_margin
            ));
        }
        issues
    }
}

impl TimingSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        for (name, value) in [
            ("hover_poll_ms", self.hover_poll_ms),
            ("modifier_poll_ms", self.modifier_poll_ms),
            ("gesture_poll_ms", self.gesture_poll_ms),
        ] {
            if value == 0 {
                issues.push(format!("timing.{name} must be at least 1"));
            }
        }
        issues
    }
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::parse(&buf)
    }

    /// Reads `path` if it exists, otherwise falls back to the defaults.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Config> {
        if path.exists() { Self::read(path) } else { Ok(Config::default()) }
    }

    /// Save the current config to a file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let toml_string = self.to_toml()?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml_string.as_bytes())?;
        Ok(())
    }

    pub fn to_toml(&self) -> anyhow::Result<String> { Ok(toml::to_string_pretty(self)?) }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> { self.settings.validate() }

    pub fn apply_command(&mut self, cmd: ConfigCommand) -> anyhow::Result<()> {
        match cmd {
            ConfigCommand::SetRequireModifier(v) => {
                self.settings.require_modifier = v;
                info!("Updated require_modifier to: {}", v);
            }
            ConfigCommand::SetAutoGroup(v) => {
                self.settings.auto_group = v;
                info!("Updated auto_group to: {}", v);
            }
            ConfigCommand::SetAllowSingleWindowGroups(v) => {
                self.settings.allow_single_window_groups = v;
                info!("Updated allow_single_window_groups to: {}", v);
            }
            ConfigCommand::Set { key, value } => {
                let mut root = serde_json::to_value(&*self)?;
                let mut slot = &mut root;
                for part in key.split('.') {
                    let Some(next) = slot.get_mut(part) else {
                        bail!("Unknown config key: {key}");
                    };
                    slot = next;
                }
                *slot = value.clone();
                *self = serde_json::from_value(root)
                    .with_context(|| format!("Invalid value {value} for {key}"))?;
                info!("Updated {} to: {}", key, value);
            }
        }
        Ok(())
    }

    pub fn parse(buf: &str) -> anyhow::Result<Config> {
        match toml::from_str::<Config>(buf) {
            Ok(config) => Ok(config),
            Err(e) => bail!("{e}"),
        }
    }
}
