//! Retrying opener.
//! - Read modes pin the path to an absolute one before the first attempt, so a later
//!   working-directory change cannot redirect a retry or a long-lived handle.
//! - Non-positive (or non-finite) timeout or interval: a single attempt, failing with the
//!   underlying cause.
//! - Otherwise retry on a fixed interval; once the timeout has elapsed the failure is
//!   fatal (`LinkError::OpenTimeout`) and callers are expected to stop.

use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::{Duration, Instant};
use tracing::{debug, error, trace, warn};

use crate::config::Config;
use crate::container::{Container, OpenMode};
use crate::errors::{LinkError, Result};
use crate::shutdown;

fn positive_duration(secs: f64) -> Option<Duration> {
    if secs > 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}

fn pinned_path(path: &Path, mode: OpenMode) -> PathBuf {
    if mode.requires_existing() {
        std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
    } else {
        path.to_path_buf()
    }
}

/// Open `path` in `mode`, retrying for up to `timeout_secs` every `interval_secs`.
pub fn open_container(
    path: &Path,
    mode: OpenMode,
    timeout_secs: f64,
    interval_secs: f64,
) -> Result<Container> {
    let target = pinned_path(path, mode);

    let first = match Container::open(&target, mode) {
        Ok(c) => return Ok(c),
        Err(e) => e,
    };
    let (Some(timeout), Some(interval)) =
        (positive_duration(timeout_secs), positive_duration(interval_secs))
    else {
        return Err(first);
    };

    warn!(
        file = %target.display(),
        error = %first,
        timeout_secs,
        interval_secs,
        "container unavailable; retrying"
    );

    let start = Instant::now();
    let mut attempts: u32 = 1;
    let mut last = first;
    loop {
        shutdown::check()?;
        sleep(interval);
        attempts += 1;
        match Container::open(&target, mode) {
            Ok(c) => {
                debug!(
                    file = %target.display(),
                    attempts,
                    waited_ms = start.elapsed().as_millis() as u64,
                    "container opened after retry"
                );
                return Ok(c);
            }
            Err(e) => last = e,
        }

        let waited = start.elapsed();
        if waited > timeout {
            error!(
                file = %target.display(),
                attempts,
                waited_ms = waited.as_millis() as u64,
                error = %last,
                "giving up on container; open retries exhausted"
            );
            return Err(LinkError::OpenTimeout {
                path: target,
                waited,
                source: Box::new(last),
            });
        }
        if attempts % 10 == 0 {
            warn!(file = %target.display(), attempts, "still waiting for container");
        } else {
            trace!(file = %target.display(), attempts, error = %last, "open attempt failed");
        }
    }
}

/// `open_container` with the retry policy from `cfg`.
pub fn open_with(cfg: &Config, path: &Path, mode: OpenMode) -> Result<Container> {
    open_container(path, mode, cfg.open_timeout_secs, cfg.open_interval_secs)
}
