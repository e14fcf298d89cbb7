use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::thread;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tab_groups::actor::config_watcher::ConfigWatcher;
use tab_groups::actor::tab_manager::{self, Event, Output, Record, TabManager};
use tab_groups::actor::{self, host};
use tab_groups::common::config::{Config, config_file};
use tab_groups::common::log;
use tab_groups::sys::event::{PointerState, SharedPointer};
use tab_groups::sys::timer::SystemClock;
use tab_groups::ui;
use tokio::select;
use tracing::{info, warn};

#[derive(Parser)]
struct Cli {
    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Check whether the config file is valid and exit.
    #[arg(long)]
    validate: bool,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,

    /// Record manager events to the specified file path. Overwrites the file
    /// if it exists.
    #[arg(long)]
    record: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Talk to a host over stdin and stdout. Each input line is a ron
    /// `Input`; each output line is a ron host request or renderer command.
    Run,
    /// Replay a recorded trace and print everything the manager sent.
    Replay { file: PathBuf },
}

/// One line from the host.
#[derive(Deserialize, Debug)]
enum Input {
    Pointer(PointerState),
    Event(Event),
}

fn main() {
    sigpipe::reset();
    let opt = Cli::parse();
    log::init_logging();

    if let Err(e) = try_main(opt) {
        eprintln!("{e:?}");
        process::exit(1);
    }
}

fn try_main(opt: Cli) -> anyhow::Result<()> {
    let config_path = opt.config.clone().unwrap_or_else(config_file);

    if opt.validate {
        let config = Config::read(&config_path)?;
        let issues = config.validate();
        if issues.is_empty() {
            println!("Config validation passed");
            return Ok(());
        }
        for issue in &issues {
            eprintln!("{issue}");
        }
        process::exit(1);
    }

    let config = Config::load_or_default(&config_path)?;
    let issues = config.validate();
    if !issues.is_empty() {
        anyhow::bail!("invalid config {}: {}", config_path.display(), issues.join("; "));
    }

    if opt.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    match opt.command {
        Some(Commands::Replay { file }) => replay(file),
        Some(Commands::Run) | None => run(config, config_path, opt.record),
    }
}

fn replay(file: PathBuf) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    let manager = tab_manager::replay(&file, |output| {
        let line = match output {
            Output::Host(request) => format!("host: {request:?}"),
            Output::Ui(command) => format!("ui:   {command:?}"),
        };
        _ = writeln!(stdout, "{line}");
    })?;
    writeln!(stdout, "{}", manager.draw_tree())?;
    Ok(())
}

fn run(config: Config, config_path: PathBuf, record: Option<PathBuf>) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("building runtime")?;

    let (events_tx, events_rx) = actor::channel();
    let (host_tx, host_rx) = actor::channel();
    let (ui_tx, ui_rx) = actor::channel();
    let (input_tx, input_rx) = tokio::sync::mpsc::unbounded_channel();
    let (reload_tx, reload_rx) = actor::channel();

    let pointer = SharedPointer::new();
    let manager = TabManager::new(
        config.clone(),
        host_tx,
        ui_tx,
        Box::new(SystemClock),
        Box::new(pointer.clone()),
        Record::new(record.as_deref())?,
    )
    .with_config_path(config_path.clone());

    ConfigWatcher::spawn(reload_tx, config, config_path)?;
    thread::Builder::new().name("stdin".to_string()).spawn(move || read_stdin(input_tx))?;

    info!("tabgroups started");
    runtime.block_on(async move {
        tokio::join!(
            manager.run(events_rx),
            forward(pointer, input_rx, reload_rx, events_tx),
            print_all(host_rx, |r: host::Request| ron::ser::to_string(&r)),
            print_all(ui_rx, |c: ui::Command| ron::ser::to_string(&c)),
        );
    });
    Ok(())
}

fn read_stdin(input_tx: tokio::sync::mpsc::UnboundedSender<Input>) {
    for (n, line) in std::io::stdin().lock().lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(%e, "Failed to read stdin");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match ron::de::from_str::<Input>(&line) {
            Ok(input) => {
                if input_tx.send(input).is_err() {
                    break;
                }
            }
            Err(e) => warn!(line = n + 1, %e, "Ignoring malformed input"),
        }
    }
}

/// Feeds host input and config reloads to the manager. Returns when stdin
/// closes, which drops the manager's only sender and shuts it down.
async fn forward(
    pointer: SharedPointer,
    mut input_rx: tokio::sync::mpsc::UnboundedReceiver<Input>,
    mut reload_rx: tab_manager::Receiver,
    events_tx: tab_manager::Sender,
) {
    loop {
        select! {
            input = input_rx.recv() => match input {
                Some(Input::Pointer(state)) => pointer.set(state),
                Some(Input::Event(event)) => events_tx.send(event),
                None => break,
            },
            Some((_, event)) = reload_rx.recv() => events_tx.send(event),
        }
    }
    info!("stdin closed, shutting down");
}

async fn print_all<T>(
    mut rx: actor::Receiver<T>,
    encode: impl Fn(T) -> Result<String, ron::Error>,
) {
    while let Some((_, item)) = rx.recv().await {
        match encode(item) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(%e, "Failed to encode output"),
        }
    }
}
