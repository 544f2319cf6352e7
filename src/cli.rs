//! CLI definition and parsing.
//!
//! Notes:
//! - --debug is a shorthand for --log-level debug.
//! - Global flags override values from the XML config.

use clap::{Parser, Subcommand, ValueHint};
use std::path::PathBuf;

use crate::config::types::{Config, LogLevel};

/// Inspect and safely restructure hierarchical containers.
/// CLI flags override config values (which are loaded from XML if present).
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Inspect and safely restructure hierarchical container files"
)]
pub struct Args {
    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(
        short = 'd',
        long,
        global = true,
        help = "Enable debug logging (shorthand for --log-level debug)"
    )]
    pub debug: bool,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, global = true, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<String>,

    /// Emit logs in structured JSON (includes timestamp, level, and structured fields).
    #[arg(long, global = true, help = "Emit logs in structured JSON")]
    pub json: bool,

    /// Also append logs to this file.
    #[arg(long, global = true, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub log_file: Option<PathBuf>,

    /// Keep retrying a busy container for this many seconds.
    #[arg(long, global = true, value_name = "SECS")]
    pub open_timeout: Option<f64>,

    /// Pause between open attempts, in seconds.
    #[arg(long, global = true, value_name = "SECS")]
    pub open_interval: Option<f64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List the links under a group (the root by default).
    Ls {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        name: Option<String>,
        /// Descend into sub-groups.
        #[arg(short, long)]
        recursive: bool,
        /// Print absolute link names.
        #[arg(long)]
        full_names: bool,
        /// Include each link's kind.
        #[arg(short = 'l', long)]
        long: bool,
    },
    /// Print whether a link exists.
    Exists {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        name: String,
    },
    /// Print the kind of a link: root, group or dataset.
    Kind {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        name: String,
    },
    /// Print the dimensions of a dataset.
    Dims {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        name: String,
        /// Print the maximum dimensions instead.
        #[arg(long)]
        max: bool,
    },
    /// Print the attributes of a link.
    Attrs {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        name: Option<String>,
    },
    /// Copy a link, within one container or into another.
    Cp {
        #[arg(value_hint = ValueHint::FilePath)]
        from: PathBuf,
        from_name: String,
        #[arg(value_hint = ValueHint::FilePath)]
        to: PathBuf,
        /// Destination name (defaults to the source name).
        to_name: Option<String>,
        /// Replace an existing destination link.
        #[arg(long)]
        overwrite: bool,
    },
    /// Move a link inside one container.
    Mv {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        from: String,
        to: String,
        /// Replace an existing destination link.
        #[arg(long)]
        overwrite: bool,
    },
    /// Delete a link and everything beneath it.
    Rm {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        name: String,
    },
    /// Back up a container, optionally leaving out some links.
    Backup {
        #[arg(value_hint = ValueHint::FilePath)]
        from: PathBuf,
        #[arg(value_hint = ValueHint::FilePath)]
        to: PathBuf,
        /// Link to leave out, with its subtree (repeatable).
        #[arg(short = 'x', long = "exclude", value_name = "NAME")]
        exclude: Vec<String>,
        /// Replace an existing destination file.
        #[arg(long)]
        overwrite: bool,
    },
    /// Remove a link by rebuilding the container without it, restoring on failure.
    Overwrite {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        name: String,
        /// Required when the link exists.
        #[arg(short, long)]
        force: bool,
    },
    /// Print where the config file is looked up, then exit.
    PrintConfig,
    /// Write a template config file.
    InitConfig {
        /// Location (defaults to $ADXLINK_CONFIG or the platform config dir).
        #[arg(long, value_hint = ValueHint::FilePath)]
        path: Option<PathBuf>,
    },
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
        if let Some(p) = &self.log_file {
            cfg.log_file = Some(p.clone());
        }
        if let Some(t) = self.open_timeout {
            cfg.open_timeout_secs = t;
        }
        if let Some(i) = self.open_interval {
            cfg.open_interval_secs = i;
        }
    }

    /// Commands that run before config loading and logging.
    pub fn is_config_command(&self) -> bool {
        matches!(self.command, Command::PrintConfig | Command::InitConfig { .. })
    }
}

pub fn parse() -> Args {
    Args::parse()
}
