//! Core configuration types.
//! - Config holds runtime settings with sensible defaults.
//! - LogLevel represents verbosity with simple parsing helpers.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Warnings and errors (default)
    #[default]
    Normal,
    /// Completed operations as well
    Info,
    /// Everything, including per-link progress and retry attempts
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" | "warn" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Runtime configuration shared by every link operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Console verbosity
    pub log_level: LogLevel,
    /// Optional path to a log file
    pub log_file: Option<PathBuf>,
    /// How long to keep retrying a container that cannot be opened (seconds; <= 0 disables)
    pub open_timeout_secs: f64,
    /// Pause between open attempts (seconds; <= 0 disables retrying)
    pub open_interval_secs: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Normal,
            log_file: None,
            open_timeout_secs: 0.0,
            open_interval_secs: 0.0,
        }
    }
}

impl Config {
    /// Defaults with an explicit open-retry policy.
    pub fn with_retry(open_timeout_secs: f64, open_interval_secs: f64) -> Self {
        Self {
            open_timeout_secs,
            open_interval_secs,
            ..Default::default()
        }
    }

    /// Whether opens are retried at all.
    pub fn retry_enabled(&self) -> bool {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        ok(self.open_timeout_secs) && ok(self.open_interval_secs)
    }
}
