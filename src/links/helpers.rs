//! I/O error hints.
//!
//! Enriches io::Error with actionable context so container failures read well in logs:
//!   fs::rename(a, b).map_err(io_error_with_help("rename container", a))?;

use std::io;
use std::path::Path;

use crate::errors::LinkError;

/// Platform-aware hint for an I/O failure, suffixed with the OS code when there is one.
/// Empty when nothing useful can be added.
pub(crate) fn hint_for(e: &io::Error) -> String {
    let mut hint = String::new();

    if let Some(code) = e.raw_os_error() {
        #[cfg(unix)]
        {
            let text = match code {
                libc::EACCES | libc::EPERM => " (permission denied; check ownership and write permissions.)",
                libc::EXDEV => " (cross-filesystem; atomic rename not possible.)",
                libc::EBUSY => " (resource busy; ensure no other process is writing.)",
                libc::ENOENT => " (path not found; verify it exists.)",
                libc::EEXIST => " (already exists; pick a unique name or remove the target.)",
                libc::ENOSPC => " (insufficient space on device.)",
                libc::EROFS => " (read-only filesystem; cannot write here.)",
                libc::ENAMETOOLONG => " (filename or path too long; shorten path segments.)",
                libc::EMFILE => " (process file descriptor limit reached; close containers or raise limits.)",
                libc::EWOULDBLOCK => " (file is locked; another handle holds it.)",
                _ => "",
            };
            hint.push_str(text);
        }
        #[cfg(windows)]
        {
            let text = match code {
                5 => " (access denied; check permissions.)",
                17 => " (not same device; cross-filesystem rename.)",
                32 | 33 => " (sharing violation; the container is in use.)",
                2 | 3 => " (path not found; verify it exists.)",
                80 => " (already exists; pick a unique name.)",
                112 => " (insufficient disk space.)",
                19 => " (write protected / read-only media.)",
                206 => " (filename or path too long; MAX_PATH exceeded.)",
                _ => "",
            };
            hint.push_str(text);
        }
        hint.push_str(&format!(" [os code: {code}]"));
    } else {
        let text = match e.kind() {
            io::ErrorKind::PermissionDenied => " (permission denied; check ownership and write permissions.)",
            io::ErrorKind::NotFound => " (path not found; verify it exists.)",
            io::ErrorKind::AlreadyExists => " (already exists; remove or choose a unique name.)",
            io::ErrorKind::StorageFull => " (insufficient space on device.)",
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                " (busy or timed out; retry after the current write finishes.)"
            }
            _ => "",
        };
        hint.push_str(text);
    }

    hint
}

/// Adapter for `.map_err(...)`: io::Error -> LinkError::Io with op, path and hint.
pub(crate) fn io_error_with_help<'a>(
    op: &'a str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> LinkError + 'a {
    move |e: io::Error| LinkError::io(op, path, e)
}
