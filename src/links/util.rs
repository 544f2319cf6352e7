use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use crate::container::{Container, LinkKind};
use crate::errors::{LinkError, Result};
use crate::platform::tmp_sibling_name;

use super::normalize::{ROOT, parent_of};

/// Hidden sibling of `target` for staging a replacement file.
pub(super) fn unique_temp_path(target: &Path, tag: &str) -> PathBuf {
    tmp_sibling_name(target, tag)
}

/// Directory holding `path`; "." for a bare file name.
pub(super) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

#[cfg(unix)]
pub(super) fn fsync_dir(dir: &Path) -> io::Result<()> {
    let f = File::open(dir)?;
    f.sync_all()
}

#[cfg(windows)]
pub(super) fn fsync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

/// Create every missing group between the root and the parent of `name`.
/// A dataset in the way is `NotAGroup`.
pub(super) fn ensure_parent_groups(container: &Container, name: &str) -> Result<()> {
    let parent = parent_of(name);
    if parent == ROOT {
        return Ok(());
    }
    let mut prefix = String::new();
    for seg in parent.split('/').filter(|s| !s.is_empty()) {
        prefix.push('/');
        prefix.push_str(seg);
        match container.kind_of(&prefix) {
            None => container.create_group(&prefix)?,
            Some(LinkKind::Group) | Some(LinkKind::Root) => {}
            Some(LinkKind::Dataset) => {
                return Err(LinkError::NotAGroup {
                    file: container.path().to_path_buf(),
                    name: prefix,
                });
            }
        }
    }
    Ok(())
}

/// Clear the way for a new link at `name`: refuse when occupied and `overwrite` is off,
/// otherwise delete the occupant. Returns whether something was deleted.
pub(super) fn clear_destination(container: &Container, name: &str, overwrite: bool) -> Result<bool> {
    match container.kind_of(name) {
        None => Ok(false),
        Some(_) if !overwrite => Err(LinkError::AlreadyExists {
            file: container.path().to_path_buf(),
            name: name.to_string(),
        }),
        Some(_) => {
            container.delete_link(name)?;
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::OpenMode;
    use tempfile::tempdir;

    #[test]
    fn parents_are_created_once() {
        let td = tempdir().unwrap();
        let c = Container::open(td.path().join("p.adx"), OpenMode::Append).unwrap();
        ensure_parent_groups(&c, "/a/b/c/leaf").unwrap();
        assert_eq!(c.kind_of("/a/b/c"), Some(LinkKind::Group));
        assert_eq!(c.kind_of("/a/b/c/leaf"), None);
        ensure_parent_groups(&c, "/a/b/other").unwrap();

        c.write_array("/X", &[1u8], &[1]).unwrap();
        assert!(matches!(
            ensure_parent_groups(&c, "/X/y/z"),
            Err(LinkError::NotAGroup { ref name, .. }) if name == "/X"
        ));
    }

    #[test]
    fn destination_clearing_respects_overwrite() {
        let td = tempdir().unwrap();
        let c = Container::open(td.path().join("d.adx"), OpenMode::Append).unwrap();
        c.create_group("obs").unwrap();
        assert!(!clear_destination(&c, "/var", false).unwrap());
        assert!(matches!(
            clear_destination(&c, "/obs", false),
            Err(LinkError::AlreadyExists { .. })
        ));
        assert!(clear_destination(&c, "/obs", true).unwrap());
        assert_eq!(c.kind_of("/obs"), None);
    }

    #[test]
    fn parent_dir_of_bare_name() {
        assert_eq!(parent_dir(Path::new("a.adx")), Path::new("."));
        assert_eq!(parent_dir(Path::new("/data/a.adx")), Path::new("/data"));
    }
}
