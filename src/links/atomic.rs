//! Atomic file replacement.
//! - Rename with context-rich errors.
//! - On Windows, removes an existing destination first (RenameFile doesn't overwrite).
//! - On Unix, best-effort fsync of the destination directory after rename.

use std::fs;
use std::path::Path;

use crate::errors::{LinkError, Result};

use super::helpers::io_error_with_help;
use super::util::{fsync_dir, parent_dir, unique_temp_path};
use super::{io_copy, meta};

pub(crate) fn try_atomic_move(src: &Path, dst: &Path) -> Result<()> {
    #[cfg(windows)]
    {
        if dst.exists() {
            if let Err(e) = fs::remove_file(dst) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    return Err(LinkError::io("remove existing destination before rename", dst, e));
                }
            }
        }
    }

    fs::rename(src, dst)
        .map_err(|e| LinkError::io(format!("atomic rename '{}' ->", src.display()), dst, e))?;

    // A failed directory fsync must not turn a completed rename into a failure.
    #[cfg(unix)]
    {
        let _ = fsync_dir(parent_dir(dst));
    }

    Ok(())
}

/// Byte-for-byte copy of `src` into a temp sibling of `dest`, then rename into place.
/// Timestamps and permissions follow the source.
pub(crate) fn safe_copy_and_rename(src: &Path, dest: &Path) -> Result<u64> {
    let dest_dir = parent_dir(dest);
    fs::create_dir_all(dest_dir)
        .map_err(io_error_with_help("create destination directory", dest_dir))?;

    let tmp = unique_temp_path(dest, "copy");
    let bytes = match io_copy::copy_streaming(src, &tmp) {
        Ok(n) => n,
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            return Err(LinkError::io("copy to temporary file", &tmp, e));
        }
    };
    meta::preserve_metadata(src, &tmp);

    if let Err(e) = try_atomic_move(&tmp, dest) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(bytes)
}
