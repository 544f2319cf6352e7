//! Link copy within one container or across two.
//!
//! - Same container: the subtree is duplicated group by group with an explicit worklist,
//!   every copied link receiving its source's attributes.
//! - Different containers: the store's object copy moves structure and content, then the
//!   copied link's own attributes are written explicitly.
//!
//! Missing parent groups of the destination are created. An occupied destination is an
//! error unless `overwrite` is set, in which case it is deleted first.

use tracing::{debug, info};

use crate::config::Config;
use crate::container::{Container, LinkKind, OpenMode};
use crate::errors::{LinkError, Result};

use super::normalize::{is_within, join_names};
use super::open::open_with;
use super::resolve::{ContainerRef, Reference, absolute_in, open_reference};
use super::util::{clear_destination, ensure_parent_groups};

/// Copy every attribute of `src_name` onto `dst_name`. Returns how many were written.
pub fn copy_attributes(src: &Container, src_name: &str, dst: &Container, dst_name: &str) -> Result<usize> {
    let attrs = src.read_attributes(src_name)?;
    for (key, value) in &attrs {
        dst.write_attribute(dst_name, key, value.clone())?;
    }
    Ok(attrs.len())
}

/// Copy the link `from_name` under `from` to `to_name` under `to`.
pub fn copy_link<'a, 'b>(
    cfg: &Config,
    from: impl Into<Reference<'a>>,
    from_name: &str,
    to: impl Into<Reference<'b>>,
    to_name: &str,
    overwrite: bool,
) -> Result<()> {
    let from = from.into();
    let to = to.into();
    let src_name = absolute_in(from.scope(), from_name)?;
    let dst_name = absolute_in(to.scope(), to_name)?;

    if from.file_identity() == to.file_identity() {
        // One container: reuse whichever handle the caller already holds, since a
        // second open of the same file would meet its lock.
        let container = match (to.handle(), from.handle()) {
            (Some(c), _) | (None, Some(c)) => ContainerRef::Borrowed(c),
            (None, None) => ContainerRef::Owned(open_with(cfg, &to.file_identity(), OpenMode::ReadWrite)?),
        };
        copy_within(&container, &src_name, &dst_name, overwrite)?;
        return container.close();
    }

    let src = open_reference(cfg, from, OpenMode::ReadOnly)?;
    let dst = open_reference(cfg, to, OpenMode::Append)?;
    copy_across(src.container(), &src_name, dst.container(), &dst_name, overwrite)?;
    dst.close()?;
    src.close()
}

fn copy_within(container: &Container, src_name: &str, dst_name: &str, overwrite: bool) -> Result<()> {
    let kind = container.link_kind(src_name)?;
    if kind == LinkKind::Root || is_within(dst_name, src_name) {
        return Err(LinkError::Malformed {
            file: container.path().to_path_buf(),
            name: dst_name.to_string(),
            reason: format!("cannot copy '{src_name}' into itself"),
        });
    }
    if overwrite && is_within(src_name, dst_name) {
        return Err(LinkError::Malformed {
            file: container.path().to_path_buf(),
            name: dst_name.to_string(),
            reason: format!("replacing it would delete the source '{src_name}'"),
        });
    }
    if clear_destination(container, dst_name, overwrite)? {
        debug!(file = %container.path().display(), name = dst_name, "replaced existing destination");
    }
    ensure_parent_groups(container, dst_name)?;

    let mut work = vec![(src_name.to_string(), dst_name.to_string())];
    let mut copied = 0usize;
    while let Some((src, dst)) = work.pop() {
        match container.link_kind(&src)? {
            LinkKind::Dataset => container.copy_object(&src, container, &dst)?,
            LinkKind::Group | LinkKind::Root => {
                container.create_group(&dst)?;
                for (child, _) in container.child_kinds(&src)?.into_iter().rev() {
                    work.push((join_names(&src, &child), join_names(&dst, &child)));
                }
            }
        }
        copy_attributes(container, &src, container, &dst)?;
        copied += 1;
    }

    info!(
        file = %container.path().display(),
        from = src_name,
        to = dst_name,
        links = copied,
        "copied link"
    );
    Ok(())
}

fn copy_across(
    src: &Container,
    src_name: &str,
    dst: &Container,
    dst_name: &str,
    overwrite: bool,
) -> Result<()> {
    if src.link_kind(src_name)? == LinkKind::Root {
        return Err(LinkError::Malformed {
            file: src.path().to_path_buf(),
            name: src_name.to_string(),
            reason: "the root cannot be copied as a link; back up the container instead".into(),
        });
    }
    if clear_destination(dst, dst_name, overwrite)? {
        debug!(file = %dst.path().display(), name = dst_name, "replaced existing destination");
    }
    ensure_parent_groups(dst, dst_name)?;
    src.copy_object(src_name, dst, dst_name)?;
    copy_attributes(src, src_name, dst, dst_name)?;

    info!(
        from_file = %src.path().display(),
        from = src_name,
        to_file = %dst.path().display(),
        to = dst_name,
        "copied link"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::AttrValue;
    use tempfile::tempdir;

    fn cfg() -> Config {
        Config::default()
    }

    #[test]
    fn same_file_copy_carries_every_attribute() {
        let td = tempdir().unwrap();
        let c = Container::open(td.path().join("s.adx"), OpenMode::Append).unwrap();
        c.create_group("obsm").unwrap();
        c.write_attribute("obsm", "encoding-type", "dict").unwrap();
        c.write_array("obsm/pca", &[1.0f32, 2.0], &[1, 2]).unwrap();
        c.write_attribute("obsm/pca", "unit", "pc").unwrap();

        copy_link(&cfg(), &c, "obsm", &c, "backup/obsm", false).unwrap();
        assert_eq!(c.kind_of("/backup"), Some(LinkKind::Group));
        assert_eq!(
            c.read_attributes("/backup/obsm").unwrap().get("encoding-type"),
            Some(&AttrValue::from("dict"))
        );
        assert_eq!(c.read_attributes("/backup/obsm/pca").unwrap().len(), 1);
        assert_eq!(c.read_array::<f32>("/backup/obsm/pca").unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn occupied_destination_needs_overwrite() {
        let td = tempdir().unwrap();
        let c = Container::open(td.path().join("o.adx"), OpenMode::Append).unwrap();
        c.write_array("a", &[1i64], &[1]).unwrap();
        c.write_array("b", &[2i64], &[1]).unwrap();
        assert!(matches!(
            copy_link(&cfg(), &c, "a", &c, "b", false),
            Err(LinkError::AlreadyExists { .. })
        ));
        copy_link(&cfg(), &c, "a", &c, "b", true).unwrap();
        assert_eq!(c.read_array::<i64>("b").unwrap(), vec![1]);
    }

    #[test]
    fn refuses_to_copy_into_itself() {
        let td = tempdir().unwrap();
        let c = Container::open(td.path().join("i.adx"), OpenMode::Append).unwrap();
        c.create_group("g").unwrap();
        assert!(matches!(
            copy_link(&cfg(), &c, "g", &c, "g/inner", false),
            Err(LinkError::Malformed { .. })
        ));
        assert!(matches!(
            copy_link(&cfg(), &c, "/", &c, "everything", false),
            Err(LinkError::Malformed { .. })
        ));
    }

    #[test]
    fn sub_scope_names_are_relative() {
        let td = tempdir().unwrap();
        let c = Container::open(td.path().join("g.adx"), OpenMode::Append).unwrap();
        c.create_group("obsm").unwrap();
        c.write_array("obsm/pca", &[3u8], &[1]).unwrap();
        let g = c.group("obsm").unwrap();
        copy_link(&cfg(), &g, "pca", &g, "pca_copy", false).unwrap();
        assert_eq!(c.kind_of("/obsm/pca_copy"), Some(LinkKind::Dataset));
    }
}
