//! Guarded removal of one link from a container.
//!
//! The container is renamed aside, rebuilt at its original path without the link, and
//! the aside copy deleted. Any failure while rebuilding renames the aside copy back, so
//! the caller sees either the rebuilt container or the untouched original.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::container::OpenMode;
use crate::errors::{LinkError, Result};

use super::atomic::try_atomic_move;
use super::backup::backup;
use super::helpers::io_error_with_help;
use super::normalize::{is_root, normalize};
use super::open::open_with;
use super::util::unique_temp_path;

/// Puts the aside copy back on drop unless disarmed.
struct RestoreGuard<'a> {
    aside: &'a Path,
    original: &'a Path,
    armed: bool,
}

impl<'a> RestoreGuard<'a> {
    fn new(aside: &'a Path, original: &'a Path) -> Self {
        Self {
            aside,
            original,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for RestoreGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match try_atomic_move(self.aside, self.original) {
            Ok(()) => warn!(file = %self.original.display(), "rebuild failed; original container restored"),
            Err(e) => error!(
                file = %self.original.display(),
                aside = %self.aside.display(),
                error = %e,
                "rebuild failed and the original could not be restored; it remains at the aside path"
            ),
        }
    }
}

/// Remove `name` from `file` so the caller can write it afresh.
///
/// - Missing `file`: an empty container is created.
/// - Root with `must_overwrite`: the whole container is truncated.
/// - Absent `name`: nothing changes.
/// - Present `name` without `must_overwrite`: `AlreadyExists`.
/// - Otherwise the guarded rebuild described in the module docs. A symlinked `file`
///   is followed, so the link stays in place and its target is rebuilt.
pub fn overwrite(cfg: &Config, file: &Path, name: &str, must_overwrite: bool) -> Result<PathBuf> {
    if !file.exists() {
        open_with(cfg, file, OpenMode::Exclusive)?.close()?;
        info!(file = %file.display(), "created empty container; nothing to overwrite");
        return Ok(file.to_path_buf());
    }

    let name = normalize(name);
    if is_root(&name) {
        if !must_overwrite {
            return Err(LinkError::AlreadyExists {
                file: file.to_path_buf(),
                name,
            });
        }
        warn!(file = %file.display(), "truncating entire container; all links and attributes are discarded");
        open_with(cfg, file, OpenMode::Truncate)?.close()?;
        return Ok(file.to_path_buf());
    }

    let present = {
        let c = open_with(cfg, file, OpenMode::ReadOnly)?;
        let present = c.kind_of(&name).is_some();
        c.close()?;
        present
    };
    if !present {
        debug!(file = %file.display(), name = %name, "link absent; nothing to overwrite");
        return Ok(file.to_path_buf());
    }
    if !must_overwrite {
        return Err(LinkError::AlreadyExists {
            file: file.to_path_buf(),
            name,
        });
    }

    // Swap the real container, not a symlink standing in for it.
    let real = dunce::canonicalize(file).map_err(io_error_with_help("resolve container path", file))?;
    if real.as_path() != file {
        debug!(file = %file.display(), real = %real.display(), "rebuilding through resolved path");
    }
    let aside = unique_temp_path(&real, "swap");
    try_atomic_move(&real, &aside)?;
    let guard = RestoreGuard::new(&aside, &real);
    backup(cfg, &aside, &real, &[name.as_str()], false)?;
    guard.disarm();

    if let Err(e) = fs::remove_file(&aside) {
        warn!(file = %aside.display(), error = %e, "failed to remove the aside copy");
    }
    info!(file = %file.display(), name = %name, "removed link by rebuilding container");
    Ok(file.to_path_buf())
}
