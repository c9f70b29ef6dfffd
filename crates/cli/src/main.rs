//! shutwatch - watch paths and issue a shutdown when one is accessed

use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, Parser};
use shutwatch_core::EventMask;
use shutwatch_watcher::{
    CommandExecutor, Dispatcher, EventLoop, LoopExit, NoticeOnly, ShutdownExecutor, WatchRegistry,
};
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use config::ShutdownConfig;

/// Watch files and issue a shutdown when one of them is accessed
#[derive(Parser)]
#[command(name = "shutwatch")]
#[command(author, version, about, long_about = None)]
#[command(disable_help_flag = true)]
struct Cli {
    /// Paths to watch for all event kinds
    #[arg(required = true, value_name = "PATHNAME")]
    paths: Vec<PathBuf>,

    /// Config file (default: ~/.config/shutwatch/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run the configured shutdown command instead of only printing the notice
    #[arg(long)]
    execute: bool,

    /// Skip paths that cannot be watched instead of aborting
    #[arg(long)]
    keep_going: bool,

    /// Log more to stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // `--help` is a usage request and exits with failure
    if wants_help(std::env::args_os().skip(1)) {
        eprint!("{}", Cli::command().render_help());
        return ExitCode::FAILURE;
    }

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Installed before the first trace line so an early SIGTERM is caught
    let signals = Signals::install().context("Failed to install signal handlers")?;

    let mut config = config::load(cli.config.as_deref())?;
    if cli.execute {
        config.shutdown.execute = true;
    }
    if cli.keep_going {
        config.watch.keep_going = true;
    }
    config.validate().context("Invalid configuration")?;

    let mut out = io::stdout();
    let mut registry = WatchRegistry::initialize()?;
    registry.register_all(
        &cli.paths,
        EventMask::ALL_EVENTS,
        config.registration_policy(),
        &mut out,
    )?;
    info!(watches = registry.len(), "Registration complete");

    let dispatcher =
        Dispatcher::new(out, build_executor(&config.shutdown)).with_labels(registry.labels());
    let source = registry
        .into_source()
        .context("Failed to register inotify fd with the runtime")?;
    let mut event_loop =
        EventLoop::new(source, dispatcher).with_retry_policy(config.retry_policy());

    let cancel = CancellationToken::new();
    tokio::spawn(signals.cancel_on_first(cancel.clone()));

    match event_loop.run(&cancel).await? {
        LoopExit::Cancelled => info!("Stopped"),
    }
    Ok(())
}

fn build_executor(config: &ShutdownConfig) -> Box<dyn ShutdownExecutor> {
    if config.execute {
        Box::new(CommandExecutor::new(config.program.clone(), config.args.clone()))
    } else {
        Box::new(NoticeOnly)
    }
}

fn wants_help(args: impl Iterator<Item = OsString>) -> bool {
    args.take_while(|arg| arg != "--").any(|arg| arg == "--help")
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout carries the event trace; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// SIGINT / SIGTERM listeners
struct Signals {
    interrupt: Signal,
    terminate: Signal,
}

impl Signals {
    fn install() -> io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn cancel_on_first(mut self, cancel: CancellationToken) {
        let name = tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        };
        info!(signal = name, "Stopping");
        cancel.cancel();
    }
}
