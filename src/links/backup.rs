//! Whole-container backup, optionally leaving out some subtrees.
//!
//! With nothing excluded the file is duplicated byte for byte. Otherwise the surviving
//! links are rebuilt one by one into a fresh container. Either way the result is staged
//! in a hidden sibling of the destination and renamed into place, so the destination
//! path never shows a half-written container.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

use crate::config::Config;
use crate::container::{Container, LinkKind, OpenMode};
use crate::errors::{LinkError, Result};
use crate::platform::available_space;
use crate::shutdown;

use super::atomic::{safe_copy_and_rename, try_atomic_move};
use super::copy::copy_attributes;
use super::helpers::io_error_with_help;
use super::introspect::{LinkEntry, walk};
use super::meta::preserve_permissions;
use super::normalize::{ROOT, is_within, normalize};
use super::open::open_with;
use super::resolve::file_identity;
use super::util::{ensure_parent_groups, parent_dir, unique_temp_path};


/// Back up `from_file` into `to_file`, leaving out every link at or beneath an
/// `exclude` name. Returns the destination path.
pub fn backup<S: AsRef<str>>(
    cfg: &Config,
    from_file: &Path,
    to_file: &Path,
    exclude: &[S],
    overwrite: bool,
) -> Result<PathBuf> {
    if !from_file.exists() {
        return Err(LinkError::FileNotFound(from_file.to_path_buf()));
    }
    if file_identity(from_file) == file_identity(to_file) {
        return Err(LinkError::SameFile(from_file.to_path_buf()));
    }
    if to_file.exists() && !overwrite {
        return Err(LinkError::FileExists(to_file.to_path_buf()));
    }
    let dest_dir = parent_dir(to_file);
    fs::create_dir_all(dest_dir).map_err(io_error_with_help("create destination directory", dest_dir))?;
    ensure_room(from_file, dest_dir)?;

    let mut excluded: Vec<String> = exclude.iter().map(|x| normalize(x.as_ref())).collect();
    excluded.sort();
    excluded.dedup();

    // Hold a shared lock on the source for the whole read.
    let src = open_with(cfg, from_file, OpenMode::ReadOnly)?;

    if excluded.is_empty() {
        let bytes = safe_copy_and_rename(from_file, to_file)?;
        src.close()?;
        info!(
            from = %from_file.display(),
            to = %to_file.display(),
            bytes,
            "backed up container (byte copy)"
        );
        return Ok(to_file.to_path_buf());
    }

    let survivors: Vec<LinkEntry> = walk(&src, ROOT, true)?
        .into_iter()
        .filter(|e| !excluded.iter().any(|x| is_within(&e.full_name, x)))
        .collect();
    let keep_root_attrs = !excluded.iter().any(|x| x == ROOT);

    let tmp = unique_temp_path(to_file, "backup");
    if let Err(e) = rebuild(&src, &tmp, &survivors, keep_root_attrs) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    preserve_permissions(from_file, &tmp);
    if let Err(e) = try_atomic_move(&tmp, to_file) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    src.close()?;

    info!(
        from = %from_file.display(),
        to = %to_file.display(),
        links = survivors.len(),
        excluded = ?excluded,
        "backed up container"
    );
    Ok(to_file.to_path_buf())
}

/// Materialize `survivors` (in pre-order) into a new container at `tmp`.
fn rebuild(src: &Container, tmp: &Path, survivors: &[LinkEntry], keep_root_attrs: bool) -> Result<()> {
    let dst = Container::open(tmp, OpenMode::Exclusive)?;
    for (i, entry) in survivors.iter().enumerate() {
        shutdown::check()?;
        #[cfg(test)]
        if failpoint::hit(i) {
            return Err(LinkError::io(
                "rebuild container",
                tmp,
                io::Error::other("injected failure"),
            ));
        }

        ensure_parent_groups(&dst, &entry.full_name)?;
        match entry.kind {
            LinkKind::Group => dst.create_group(&entry.full_name)?,
            LinkKind::Dataset => dst.write_raw(&entry.full_name, &src.read_raw(&entry.full_name)?)?,
            LinkKind::Root => {}
        }
        let attrs = copy_attributes(src, &entry.full_name, &dst, &entry.full_name)?;
        trace!(index = i, name = %entry.full_name, kind = %entry.kind, attrs, "rebuilt link");
    }
    if keep_root_attrs {
        copy_attributes(src, ROOT, &dst, ROOT)?;
    }
    dst.close()?;
    debug!(file = %tmp.display(), links = survivors.len(), "staged rebuilt container");
    Ok(())
}

/// The source size bounds what either path writes.
fn ensure_room(from_file: &Path, dest_dir: &Path) -> Result<()> {
    let need = fs::metadata(from_file)
        .map_err(io_error_with_help("stat source container", from_file))?
        .len();
    let have = available_space(dest_dir).map_err(io_error_with_help("check free space", dest_dir))?;
    if need > have {
        return Err(LinkError::io(
            "check free space",
            dest_dir,
            io::Error::new(
                io::ErrorKind::StorageFull,
                format!("need {need} bytes, have {have} bytes"),
            ),
        ));
    }
    Ok(())
}
