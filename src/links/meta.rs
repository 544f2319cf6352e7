//! Timestamp and permission carry-over for staged containers.

use filetime::{FileTime, set_file_times};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Best-effort: a backup that lands with fresh timestamps is still a valid backup.
pub(super) fn preserve_metadata(src: &Path, dest: &Path) {
    let Some(meta) = stat(src) else { return };

    let at = FileTime::from_last_access_time(&meta);
    let mt = FileTime::from_last_modification_time(&meta);
    if let Err(e) = set_file_times(dest, at, mt) {
        debug!(file = %dest.display(), error = %e, "failed to carry over timestamps");
    }
    apply_mode(&meta, dest);
}

/// Permission bits only. A rebuilt container has new content, so it keeps fresh timestamps.
pub(super) fn preserve_permissions(src: &Path, dest: &Path) {
    if let Some(meta) = stat(src) {
        apply_mode(&meta, dest);
    }
}

fn stat(src: &Path) -> Option<fs::Metadata> {
    match fs::metadata(src) {
        Ok(m) => Some(m),
        Err(e) => {
            debug!(file = %src.display(), error = %e, "cannot stat source; metadata not preserved");
            None
        }
    }
}

#[cfg(unix)]
fn apply_mode(meta: &fs::Metadata, dest: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let mode = meta.permissions().mode() & 0o777;
    if let Err(e) = fs::set_permissions(dest, fs::Permissions::from_mode(mode)) {
        debug!(file = %dest.display(), error = %e, "failed to carry over permissions");
    }
}

#[cfg(not(unix))]
fn apply_mode(meta: &fs::Metadata, dest: &Path) {
    if let Err(e) = fs::set_permissions(dest, meta.permissions()) {
        debug!(file = %dest.display(), error = %e, "failed to carry over permissions");
    }
}
