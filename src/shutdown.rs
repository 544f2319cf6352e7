//! Cooperative stop flag.
//!
//! The Ctrl-C handler raises it; the open-retry loop and the per-link backup loop poll it
//! between steps and unwind with `LinkError::Interrupted`. Inside a guarded overwrite that
//! unwinding restores the original container like any other failure.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::errors::{LinkError, Result};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Ask running operations to stop at their next check. Signal-safe and idempotent.
#[inline]
pub fn request() {
    SHUTDOWN.store(true, Ordering::Relaxed);
}

#[inline]
pub fn is_requested() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

/// `Err(Interrupted)` once a stop has been requested.
#[inline]
pub fn check() -> Result<()> {
    if is_requested() {
        return Err(LinkError::Interrupted);
    }
    Ok(())
}
