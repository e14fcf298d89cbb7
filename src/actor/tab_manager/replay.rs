//! Event traces. A trace file holds the config on its first line, then one
//! line per event with the time since startup and the pointer sample the
//! manager would have read at that moment. Replaying a trace drives a fresh
//! manager with a manual clock, so timers fire exactly as they did.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
#[cfg(test)]
use tempfile::NamedTempFile;
use tracing::warn;

use super::{Event, TabManager};
use crate::actor::{self, host};
use crate::common::config::Config;
use crate::sys::event::{PointerState, SharedPointer};
use crate::sys::timer::{Clock, ManualClock};
use crate::ui;

#[derive(Serialize, Deserialize, Debug)]
struct Entry {
    at_ms: u64,
    pointer: PointerState,
    event: Event,
}

pub struct Record {
    file: Option<File>,
    #[cfg(test)]
    temp: Option<NamedTempFile>,
}

impl Record {
    pub fn new(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = match path {
            Some(path) => Some(
                File::create(path)
                    .with_context(|| format!("creating trace file {}", path.display()))?,
            ),
            None => None,
        };
        Ok(Self {
            file,
            #[cfg(test)]
            temp: None,
        })
    }

    /// A recorder that writes nothing.
    pub fn none() -> Self {
        Self {
            file: None,
            #[cfg(test)]
            temp: None,
        }
    }

    #[cfg(test)]
    pub fn new_for_test(temp: NamedTempFile) -> Self { Self { file: None, temp: Some(temp) } }

    fn file(&mut self) -> Option<&mut File> {
        #[cfg(test)]
        return self.file.as_mut().or(self.temp.as_mut().map(|temp| temp.as_file_mut()));
        #[cfg(not(test))]
        self.file.as_mut()
    }

    pub(super) fn start(&mut self, config: &Config) {
        let Some(file) = self.file() else { return };
        let result = ron::ser::to_string(config)
            .map_err(anyhow::Error::from)
            .and_then(|line| Ok(writeln!(file, "{line}")?));
        if let Err(e) = result {
            warn!(%e, "Failed to write trace header, recording stopped");
            self.stop();
        }
    }

    pub(super) fn on_event(&mut self, elapsed: Duration, pointer: PointerState, event: &Event) {
        let Some(file) = self.file() else { return };
        let entry = EntryRef {
            at_ms: elapsed.as_millis() as u64,
            pointer,
            event,
        };
        let result = ron::ser::to_string(&entry)
            .map_err(anyhow::Error::from)
            .and_then(|line| Ok(writeln!(file, "{line}")?));
        if let Err(e) = result {
            warn!(%e, "Failed to write trace entry, recording stopped");
            self.stop();
        }
    }

    fn stop(&mut self) {
        self.file = None;
        #[cfg(test)]
        {
            self.temp = None;
        }
    }
}

/// Borrowing twin of [`Entry`] for writing.
#[derive(Serialize)]
#[serde(rename = "Entry")]
struct EntryRef<'a> {
    at_ms: u64,
    pointer: PointerState,
    event: &'a Event,
}

/// Something the manager sent while a trace was replayed.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Host(host::Request),
    Ui(ui::Command),
}

/// Replays the trace at `path` into a fresh manager and returns it.
/// Everything the manager sends is passed to `on_output`; for each step,
/// host requests come before renderer commands.
pub fn replay(path: &Path, mut on_output: impl FnMut(Output)) -> anyhow::Result<TabManager> {
    let file = BufReader::new(
        File::open(path).with_context(|| format!("opening trace file {}", path.display()))?,
    );
    let mut lines = file.lines();
    let header = lines.next().context("Empty trace file")??;
    let config: Config = ron::de::from_str(&header).context("parsing trace header")?;

    let clock = ManualClock::new();
    let pointer = SharedPointer::new();
    let start = clock.now();
    let (host_tx, mut host_rx) = actor::channel();
    let (ui_tx, mut ui_rx) = actor::channel();
    let mut manager = TabManager::new(
        config,
        host_tx,
        ui_tx,
        Box::new(clock.clone()),
        Box::new(pointer.clone()),
        Record::none(),
    );

    let mut drain = |on_output: &mut dyn FnMut(Output)| {
        while let Ok((_, request)) = host_rx.try_recv() {
            on_output(Output::Host(request));
        }
        while let Ok((_, command)) = ui_rx.try_recv() {
            on_output(Output::Ui(command));
        }
    };

    for (n, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: Entry =
            ron::de::from_str(&line).with_context(|| format!("parsing trace line {}", n + 2))?;
        let at = start + Duration::from_millis(entry.at_ms);
        while let Some(deadline) = manager.timers().next_deadline()
            && deadline <= at
        {
            clock.set(deadline);
            manager.fire_due_timers();
            drain(&mut on_output);
        }
        clock.set(at);
        pointer.set(entry.pointer);
        manager.handle_event(entry.event);
        drain(&mut on_output);
    }
    Ok(manager)
}
