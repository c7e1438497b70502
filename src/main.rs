//! CPU-time watchdog
//!
//! Periodically looks for processes running a target executable, reads
//! their cumulative user + kernel CPU time and kills any instance whose
//! total exceeds the configured threshold.
//!
//! Observations are printed to stdout, one line per matched process plus
//! an announcement before each kill. Diagnostics go to stderr through
//! `tracing`; set `RUST_LOG=debug` for per-cycle detail.
//!
//! The watchdog runs until killed. Any provider error (enumeration,
//! query or termination) is fatal and ends the process with status 1,
//! leaving restarts to the service manager.

mod config;
mod constants;
#[cfg(windows)]
mod ffi;
mod system;
mod watchdog;

use std::io;
use std::process;

use anyhow::{Context as _, Result};
use clap::Parser;
use humantime::format_duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::{Cli, Settings};
use constants::APP_VERSION;
use system::NativeProvider;
use watchdog::{Reporter, Watchdog};

fn main() {
    let cli = Cli::parse();
    init_logging();

    // Single exit point for every fatal error
    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        eprintln!("error: {:#}", e);
        process::exit(1);
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let settings = Settings::resolve(cli).context("Failed to load configuration")?;

    info!(
        version = APP_VERSION,
        target_name = %settings.target,
        threshold = %format_duration(settings.threshold),
        interval = %format_duration(settings.interval),
        vanished = ?settings.vanished,
        dry_run = settings.dry_run,
        "Watchdog starting"
    );

    let reporter = Reporter::new(io::stdout().lock(), settings.color.enabled());
    let mut watchdog = Watchdog::new(NativeProvider::new(), settings, reporter);

    match watchdog.run().context("Watchdog stopped")? {}
}
