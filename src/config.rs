//! Configuration: command line, environment and TOML file
//!
//! Values are layered defaults < config file < environment < flags. The
//! environment layer comes from clap, which fills a flag from its variable
//! when the flag itself is absent.

use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::constants::{
    APP_NAME, CONFIG_FILE_NAME, DEFAULT_INTERVAL, DEFAULT_TARGET, DEFAULT_THRESHOLD,
};
use crate::watchdog::VanishedPolicy;

/// Command-line args for the watchdog
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Executable base name to watch, e.g. "notepad.exe"
    #[arg(short = 'n', long, env = "WATCHDOG_TARGET")]
    pub target: Option<String>,

    /// Cumulative user + system CPU time above which a match is killed.
    /// Accepts human times, e.g. "500ms" or "2m".
    #[arg(short, long, env = "WATCHDOG_THRESHOLD")]
    pub threshold: Option<humantime::Duration>,

    /// Delay between two polling cycles, e.g. "10s"
    #[arg(short, long, env = "WATCHDOG_INTERVAL")]
    pub interval: Option<humantime::Duration>,

    /// Skip processes that exit before they can be queried or killed
    /// instead of stopping the watchdog
    #[arg(
        long,
        env = "WATCHDOG_SKIP_VANISHED",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new(),
    )]
    pub skip_vanished: Option<bool>,

    /// Report kill decisions without terminating anything
    #[arg(
        long,
        env = "WATCHDOG_DRY_RUN",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new(),
    )]
    pub dry_run: Option<bool>,

    /// When to colour the report
    #[arg(long, value_enum, env = "WATCHDOG_COLOR")]
    pub color: Option<ColorChoice>,

    /// TOML config file. Defaults to config.toml in the per-user config directory.
    #[arg(short, long, env = "WATCHDOG_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    /// Auto colours only an interactive stdout without NO_COLOR set.
    pub fn enabled(self) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => {
                std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("target executable name must not be empty")]
    EmptyTarget,

    #[error("poll interval must be greater than zero")]
    ZeroInterval,
}

/// Contents of the TOML config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub target: Option<String>,
    #[serde(default, deserialize_with = "human_duration")]
    pub threshold: Option<Duration>,
    #[serde(default, deserialize_with = "human_duration")]
    pub interval: Option<Duration>,
    pub skip_vanished: Option<bool>,
    pub dry_run: Option<bool>,
    pub color: Option<ColorChoice>,
}

fn human_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(text) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    humantime::parse_duration(&text)
        .map(Some)
        .map_err(serde::de::Error::custom)
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Per-user config file location, e.g. `~/.config/cpu_watchdog/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", APP_NAME)
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }
}

/// Fully resolved watchdog settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub target: String,
    pub threshold: Duration,
    pub interval: Duration,
    pub vanished: VanishedPolicy,
    pub dry_run: bool,
    pub color: ColorChoice,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
            threshold: DEFAULT_THRESHOLD,
            interval: DEFAULT_INTERVAL,
            vanished: VanishedPolicy::Fatal,
            dry_run: false,
            color: ColorChoice::Auto,
        }
    }
}

impl Settings {
    /// Resolves settings from the command line and whichever config file applies.
    ///
    /// An explicit `--config` must exist; the per-user default is used only
    /// when present.
    pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => match FileConfig::default_path() {
                Some(path) if path.exists() => FileConfig::load(&path)?,
                _ => FileConfig::default(),
            },
        };
        Self::merge(cli, file)
    }

    pub fn merge(cli: &Cli, file: FileConfig) -> Result<Self, ConfigError> {
        let defaults = Settings::default();

        let settings = Settings {
            target: cli.target.clone().or(file.target).unwrap_or(defaults.target),
            threshold: cli
                .threshold
                .map(Into::into)
                .or(file.threshold)
                .unwrap_or(defaults.threshold),
            interval: cli
                .interval
                .map(Into::into)
                .or(file.interval)
                .unwrap_or(defaults.interval),
            vanished: cli
                .skip_vanished
                .or(file.skip_vanished)
                .map(VanishedPolicy::from_skip_flag)
                .unwrap_or(defaults.vanished),
            dry_run: cli.dry_run.or(file.dry_run).unwrap_or(defaults.dry_run),
            color: cli.color.or(file.color).unwrap_or(defaults.color),
        };

        if settings.target.is_empty() {
            return Err(ConfigError::EmptyTarget);
        }
        if settings.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(settings)
    }
}
