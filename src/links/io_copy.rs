//! Streaming file copy for whole-container backups.
//!
//! - Writes to a newly created destination (O_EXCL semantics; never clobbers).
//! - Linux tries `copy_file_range` first and falls back to 1 MiB buffered I/O.
//! - The destination is fsynced before returning; the caller syncs the directory
//!   after its final rename.
//!
//! The source is read once from start to EOF. Callers hold a shared lock on the
//! container so no writer can commit while it is being read.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

const BUF_SIZE: usize = 1024 * 1024;

/// Copy `src` -> `dst` and fsync `dst`. Returns the number of bytes written.
pub(super) fn copy_streaming(src: &Path, dst: &Path) -> io::Result<u64> {
    let src_f = File::open(src)?;
    let dst_f = OpenOptions::new().write(true).create_new(true).open(dst)?;

    #[cfg(target_os = "linux")]
    {
        if let Some(total) = copy_in_kernel(&src_f, &dst_f)? {
            dst_f.sync_all()?;
            return Ok(total);
        }
    }

    let mut reader = BufReader::with_capacity(BUF_SIZE, src_f);
    let mut writer = BufWriter::with_capacity(BUF_SIZE, dst_f);
    let bytes = io::copy(&mut reader, &mut writer)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(bytes)
}

/// `copy_file_range` loop. `Ok(None)` means unsupported here: nothing was copied and
/// the caller should stream instead.
#[cfg(target_os = "linux")]
fn copy_in_kernel(src: &File, dst: &File) -> io::Result<Option<u64>> {
    use std::os::unix::io::AsRawFd;

    const CHUNK: usize = 16 * 1024 * 1024;
    let mut total: u64 = 0;
    loop {
        // SAFETY: both descriptors are open for the duration of the call; null offsets
        // use and advance the file positions.
        let rc = unsafe {
            libc::copy_file_range(
                src.as_raw_fd(),
                std::ptr::null_mut(),
                dst.as_raw_fd(),
                std::ptr::null_mut(),
                CHUNK,
                0,
            )
        };
        if rc > 0 {
            total += rc as u64;
            continue;
        }
        if rc == 0 {
            return Ok(Some(total));
        }
        let err = io::Error::last_os_error();
        let unsupported = matches!(
            err.raw_os_error(),
            Some(libc::EXDEV | libc::ENOSYS | libc::EINVAL | libc::EPERM | libc::EOPNOTSUPP)
        );
        if total == 0 && unsupported {
            return Ok(None);
        }
        return Err(err);
    }
}
