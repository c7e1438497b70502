//! Centralized constants for the application
//!
//! Every default and magic number used by the watchdog lives here so the
//! configuration layer and the providers agree on them.

use std::time::Duration;

// ============================================================================
// Application Info
// ============================================================================

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Application version from Cargo.toml
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Watchdog Defaults
// ============================================================================

/// Executable watched when no target is configured
pub const DEFAULT_TARGET: &str = "notepad.exe";

/// Cumulative user + system CPU time above which a match is killed
pub const DEFAULT_THRESHOLD: Duration = Duration::from_millis(500);

/// Delay between two polling cycles
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Name of the config file inside the per-user config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

// ============================================================================
// OS Clock Units
// ============================================================================

/// Width of one FILETIME tick in nanoseconds
pub const FILETIME_TICK_NANOS: u64 = 100;

/// Nanoseconds in a second, for clock-tick based platforms
pub const NANOS_PER_SEC: u64 = 1_000_000_000;

// ============================================================================
// Report Colour Bands (percent of threshold consumed)
// ============================================================================

/// Share of the threshold at or above which a sample is shown red
pub const BUDGET_CRITICAL_PERCENT: f64 = 80.0;

/// Share of the threshold at or above which a sample is shown yellow
pub const BUDGET_WARNING_PERCENT: f64 = 50.0;

/// Share of the threshold at or above which a sample is shown cyan
pub const BUDGET_MODERATE_PERCENT: f64 = 20.0;
