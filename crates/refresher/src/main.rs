//! Binary entrypoint for the refresher tool.
use std::{
    env, future,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
    time::Duration,
};

use clap::{Parser, Subcommand};
use logging::LogArgs;
use refresher_engine::{Agent, ChangeBroadcaster};
use refresher_popup::{Controller, is_rejected_input};
use refresher_protocol::ipc::Bus;
use settings::{JsonFileArea, MemoryArea, Settings, SettingsStore, StorageGateway};
use tokio::{
    io::{self as tokio_io, AsyncBufReadExt, BufReader},
    signal, time,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

/// Logging page effector.
mod effector;

use crate::effector::LogEffector;

#[derive(Parser, Debug)]
#[command(
    name = "refresher",
    about = "Inspect and drive the auto-refresh settings",
    version
)]
/// Command-line interface for the `refresher` binary.
struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,

    /// Path of the durable storage file (defaults to ~/.refresher/storage.json)
    #[arg(long, value_name = "PATH", global = true)]
    store: Option<PathBuf>,

    /// Do not configure the in-memory synced area as a fallback
    #[arg(long, global = true)]
    no_sync: bool,

    /// Logging controls
    #[command(flatten)]
    log: LogArgs,
}

#[derive(Subcommand, Debug)]
/// Top-level CLI subcommands.
enum Command {
    /// Load settings (migrating legacy keys if needed) and print them as JSON.
    Show {
        /// Also print the canonical record exactly as stored
        #[arg(long)]
        raw: bool,
    },
    /// Change settings the way the popup does, then print the status line.
    Set {
        /// Turn auto refresh on or off
        #[arg(long)]
        enabled: Option<bool>,
        /// Refresh interval in seconds
        #[arg(long, value_name = "SECS")]
        interval: Option<String>,
    },
    /// Run an agent and a popup controller together; stdin lines edit settings
    /// (`on`, `off`, `interval <SECS>`, `status`).
    Run {
        /// Stop after this many seconds instead of waiting for Ctrl-C
        #[arg(long = "for", value_name = "SECS")]
        duration: Option<u64>,
    },
}

/// Determine the default durable storage path (`~/.refresher/storage.json`).
fn default_store_path() -> PathBuf {
    let mut p = PathBuf::from(env::var_os("HOME").unwrap_or_default());
    p.push(".refresher");
    p.push("storage.json");
    p
}

/// Build the storage gateway: the JSON file first, then the synced stand-in.
fn gateway(path: &Path, sync: bool) -> StorageGateway {
    let gw = StorageGateway::default().with_area(Arc::new(JsonFileArea::new("local", path)));
    if sync {
        gw.with_area(Arc::new(MemoryArea::new("sync")))
    } else {
        gw
    }
}

/// Print `settings` as the canonical JSON record.
fn print_settings(settings: &Settings) {
    println!("{}", settings.to_value());
}

/// `show`: load and print.
async fn show(gw: StorageGateway, raw: bool) -> ExitCode {
    let mut store = SettingsStore::new(gw);
    match store.load().await {
        Ok(loaded) => {
            if loaded.migrated {
                eprintln!("created settings record");
            }
            print_settings(&loaded.settings);
        }
        Err(e) => {
            warn!(error = %e, "unable to load settings");
            eprintln!("storage unavailable, showing defaults");
            print_settings(&store.current());
            return ExitCode::SUCCESS;
        }
    }
    if raw {
        match store.stored_record().await {
            Ok(Some(record)) => println!("stored: {record}"),
            Ok(None) => println!("stored: <none>"),
            Err(e) => {
                error!(error = %e, "unable to read stored record");
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}

/// `set`: apply edits through a popup controller.
async fn set(gw: StorageGateway, enabled: Option<bool>, interval: Option<String>) -> ExitCode {
    let mut popup = Controller::new(
        SettingsStore::new(gw),
        ChangeBroadcaster::new(Arc::new(Bus::new())),
    );
    popup.start().await;

    let mut code = ExitCode::SUCCESS;
    if let Some(enabled) = enabled
        && popup.set_enabled(enabled).await.is_err()
    {
        code = ExitCode::FAILURE;
    }
    if let Some(text) = interval
        && let Err(e) = popup.submit_interval(&text).await
    {
        code = if is_rejected_input(&e) {
            ExitCode::from(2)
        } else {
            ExitCode::FAILURE
        };
    }
    println!("{}", popup.view().status.text());
    code
}

/// Apply one line of popup input.
async fn edit(popup: &mut Controller, line: &str) {
    let mut words = line.split_whitespace();
    let result = match (words.next(), words.next()) {
        (Some("on"), None) => popup.set_enabled(true).await.map(|_| ()),
        (Some("off"), None) => popup.set_enabled(false).await.map(|_| ()),
        (Some("interval"), Some(secs)) => popup.submit_interval(secs).await.map(|_| ()),
        (Some("status") | None, _) => Ok(()),
        _ => {
            println!("commands: on | off | interval <SECS> | status");
            return;
        }
    };
    if let Err(e) = result {
        warn!(error = %e, "edit not applied");
    }
    println!("{}", popup.view().status.text());
}

/// `run`: agent and controller side by side over an in-process bus.
async fn run(gw: StorageGateway, duration: Option<u64>) -> ExitCode {
    let bus = Bus::new();
    let mut listener = bus.subscribe();
    let mut agent = Agent::new(
        SettingsStore::new(gw.clone()),
        Arc::new(LogEffector::default()),
    );
    agent.start().await;

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let agent_task = tokio::spawn(async move {
        agent.run(&mut listener, token).await;
    });

    let mut popup = Controller::new(
        SettingsStore::new(gw),
        ChangeBroadcaster::new(Arc::new(bus)),
    );
    popup.start().await;
    println!("{}", popup.view().status.text());

    let deadline = async {
        match duration {
            Some(secs) => time::sleep(Duration::from_secs(secs)).await,
            None => future::pending().await,
        }
    };
    tokio::pin!(deadline);

    let mut lines = BufReader::new(tokio_io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => break,
            _ = &mut deadline => break,
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => edit(&mut popup, line.trim()).await,
                Ok(None) if duration.is_none() => break,
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!(error = %e, "stdin closed");
                    stdin_open = false;
                }
            },
        }
    }

    cancel.cancel();
    if let Err(e) = agent_task.await {
        error!(error = %e, "agent task failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(&cli.log);

    let path = cli.store.unwrap_or_else(default_store_path);
    let gw = gateway(&path, !cli.no_sync);

    match cli.command {
        Command::Show { raw } => show(gw, raw).await,
        Command::Set { enabled, interval } => set(gw, enabled, interval).await,
        Command::Run { duration } => run(gw, duration).await,
    }
}
