//! Config validation.
//! Checks the log destination and normalizes the retry policy.

use anyhow::{Context, Result, bail};
use tracing::{debug, warn};

use super::paths::path_has_symlink_ancestor;
use super::types::Config;

impl Config {
    /// Reject unusable settings; clamp an unusable retry policy to "disabled".
    pub fn validate(&mut self) -> Result<()> {
        if let Some(log) = &self.log_file {
            if log.is_dir() {
                bail!("log_file '{}' is a directory", log.display());
            }
            let symlinked = path_has_symlink_ancestor(log)
                .with_context(|| format!("inspect ancestors of log_file '{}'", log.display()))?;
            if symlinked {
                bail!(
                    "Refusing to log to '{}': an ancestor directory is a symlink",
                    log.display()
                );
            }
        }

        if !self.retry_enabled() && (self.open_timeout_secs != 0.0 || self.open_interval_secs != 0.0) {
            warn!(
                timeout = self.open_timeout_secs,
                interval = self.open_interval_secs,
                "open retry needs a positive timeout and interval; retrying disabled"
            );
            self.open_timeout_secs = 0.0;
            self.open_interval_secs = 0.0;
        }

        debug!(
            log_level = %self.log_level,
            log_file = ?self.log_file,
            open_timeout_secs = self.open_timeout_secs,
            open_interval_secs = self.open_interval_secs,
            "config validated"
        );
        Ok(())
    }
}
