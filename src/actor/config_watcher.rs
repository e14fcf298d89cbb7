//! Reloads the config file when it changes on disk.

use std::collections::HashSet;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fs, thread};

use notify::RecursiveMode;
use notify_debouncer_mini::{
    DebounceEventResult, DebouncedEvent, DebouncedEventKind, new_debouncer,
};
use tracing::{debug, info, trace, warn};

use crate::actor::tab_manager::{self, Event};
use crate::common::config::Config;

const DEBOUNCE: Duration = Duration::from_millis(250);

pub struct ConfigWatcher {
    file: PathBuf,
    real_file: Option<PathBuf>,
    real_file_id: Option<(u64, u64)>,
    events_tx: tab_manager::Sender,
    last: Config,
}

impl ConfigWatcher {
    pub fn new(events_tx: tab_manager::Sender, config: Config, config_path: PathBuf) -> Self {
        let real_file = fs::canonicalize(&config_path).ok();
        let real_file_id = real_file
            .as_ref()
            .and_then(|p| fs::metadata(p).ok())
            .map(|m| (m.dev(), m.ino()));
        ConfigWatcher {
            file: config_path,
            real_file,
            real_file_id,
            events_tx,
            last: config,
        }
    }

    pub fn spawn(
        events_tx: tab_manager::Sender,
        config: Config,
        config_path: PathBuf,
    ) -> anyhow::Result<thread::JoinHandle<()>> {
        let watcher = ConfigWatcher::new(events_tx, config, config_path);
        let handle = thread::Builder::new().name("config-watcher".to_string()).spawn(move || {
            if let Err(e) = watcher.run() {
                warn!("config-watcher: error: {e:?}");
            }
        })?;
        Ok(handle)
    }

    fn run(mut self) -> notify::Result<()> {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<DebouncedEvent>();

        let mut debouncer = new_debouncer(DEBOUNCE, move |res: DebounceEventResult| {
            if let Ok(events) = res {
                for e in events {
                    if e.kind == DebouncedEventKind::Any {
                        _ = tx.send(e);
                    }
                }
            }
        })?;

        let mut parents: HashSet<PathBuf> = HashSet::new();
        if let Some(p) = self.file.parent() {
            parents.insert(watch_dir(p));
        }
        if let Some(real) = &self.real_file
            && let Some(p) = real.parent()
        {
            parents.insert(p.to_path_buf());
        }
        for dir in &parents {
            debouncer.watcher().watch(dir, RecursiveMode::NonRecursive)?;
            info!("watching {:?}", dir);
        }

        while let Some(event) = rx.blocking_recv() {
            if !self.is_relevant(&event.path) {
                continue;
            }
            trace!("change detected (debounced): {:?} {:?}", event.kind, event.path);
            if let Some(config) = self.on_change() {
                if self.events_tx.try_send(Event::ConfigUpdated(config)).is_err() {
                    debug!("tab manager is gone, stopping");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Reads the file after a change. Returns the config to hand to the
    /// manager, if any. A change of `hot_reload` itself is always picked
    /// up so reloading can be switched back on from the file.
    fn on_change(&mut self) -> Option<Config> {
        let config = match Config::read(&self.file) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to read config file: {e:?}");
                return None;
            }
        };
        let issues = config.validate();
        if !issues.is_empty() {
            warn!(?issues, "Ignoring invalid config file");
            return None;
        }
        if config == self.last {
            trace!("config file unchanged");
            return None;
        }
        let toggled = config.settings.hot_reload != self.last.settings.hot_reload;
        if !self.last.settings.hot_reload && !toggled {
            debug!("hot reload is off, ignoring change");
            return None;
        }
        info!("config file changed, reloading");
        self.last = config.clone();
        Some(config)
    }

    fn is_relevant(&self, path: &Path) -> bool {
        if path == self.file {
            return true;
        }

        if let Some(real) = &self.real_file {
            if path == real {
                return true;
            }

            if let Ok(ev_real) = fs::canonicalize(path)
                && ev_real == *real
            {
                return true;
            }

            if let Ok(meta) = fs::metadata(path)
                && let Some((dev, ino)) = self.real_file_id
                && meta.dev() == dev
                && meta.ino() == ino
            {
                return true;
            }
        }

        path.file_name().is_some_and(|n| Some(n) == self.file.file_name())
    }
}

fn watch_dir(parent: &Path) -> PathBuf {
    if parent.as_os_str().is_empty() { PathBuf::from(".") } else { parent.to_path_buf() }
}
