//! Watchdog loop - enumerate, measure, decide, kill, sleep
//!
//! Each cycle is independent: the process table is re-read from scratch,
//! every match is queried strictly in enumeration order, and no state
//! survives into the next cycle.

mod policy;
mod report;

use std::convert::Infallible;
use std::io::{self, Write};
use std::thread;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::system::{ProcessProvider, ProcessRecord, ProviderError};

pub use policy::{should_terminate, VanishedPolicy};
pub use report::Reporter;

/// Errors that stop the watchdog
#[derive(Debug, Error)]
pub enum WatchdogError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("failed to write report: {0}")]
    Report(#[from] io::Error),
}

/// What one cycle observed and did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Processes whose executable matched the target
    pub matched: usize,
    /// PIDs the cycle decided to kill (not terminated in dry-run)
    pub killed: Vec<u32>,
    /// PIDs skipped because they exited mid-cycle
    pub vanished: Vec<u32>,
}

pub struct Watchdog<P, W: Write> {
    provider: P,
    settings: Settings,
    reporter: Reporter<W>,
}

impl<P: ProcessProvider, W: Write> Watchdog<P, W> {
    pub fn new(provider: P, settings: Settings, reporter: Reporter<W>) -> Self {
        Self {
            provider,
            settings,
            reporter,
        }
    }

    /// Runs cycles forever, sleeping the configured interval between them.
    ///
    /// Only returns when a cycle fails.
    pub fn run(&mut self) -> Result<Infallible, WatchdogError> {
        loop {
            let summary = self.run_cycle()?;
            debug!(
                matched = summary.matched,
                killed = summary.killed.len(),
                vanished = summary.vanished.len(),
                "Cycle complete"
            );
            thread::sleep(self.settings.interval);
        }
    }

    /// Runs a single enumerate / query / decide / terminate pass.
    ///
    /// Decisions already carried out are kept when a later process fails.
    pub fn run_cycle(&mut self) -> Result<CycleSummary, WatchdogError> {
        let matches = self
            .provider
            .filter_by_executable_name(&self.settings.target)?;

        let mut summary = CycleSummary {
            matched: matches.len(),
            ..Default::default()
        };

        for record in &matches {
            match self.check(record) {
                Ok(true) => summary.killed.push(record.pid),
                Ok(false) => {}
                Err(WatchdogError::Provider(e)) if self.settings.vanished.tolerates(&e) => {
                    warn!(pid = record.pid, name = %record.name, "Process exited mid-cycle, skipping");
                    summary.vanished.push(record.pid);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(summary)
    }

    /// Queries one process and kills it when over budget. Returns whether
    /// a kill decision fired.
    fn check(&mut self, record: &ProcessRecord) -> Result<bool, WatchdogError> {
        let sample = self.provider.query_cpu_time(record)?;
        self.reporter
            .sample(record, &sample, self.settings.threshold)?;

        if !should_terminate(&sample, self.settings.threshold) {
            return Ok(false);
        }

        self.reporter.killing(record, self.settings.dry_run)?;
        if !self.settings.dry_run {
            self.provider.terminate(record)?;
        }
        Ok(true)
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.reporter.into_inner()
    }
}
