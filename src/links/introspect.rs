//! Read-only questions about links: existence, kind, dimensions, listing.
//! Path references are opened read-only and closed before returning.

use tracing::debug;

use crate::config::Config;
use crate::container::{Attributes, Container, LinkKind, OpenMode};
use crate::errors::{LinkError, Result};

use super::normalize::{ROOT, is_root};
use super::resolve::{Reference, open_reference, resolve};

/// Whether `name` is reachable from `reference`.
///
/// Unreachable containers and names answer `false`. `"."` is never a link. An empty
/// name is the root under a file-scope reference and absent under a sub-scope one;
/// an explicit root under a sub-scope reference is an error. Retry exhaustion while
/// opening stays fatal.
///
/// A path reference opens its own handle, so a container write-locked by another
/// handle (in this process or not) is unreachable and answers `false`, while a query
/// through the lock holder's own handle still sees the link. Use a handle reference,
/// or `open_with` to get `LinkError::Locked`, when the two must be told apart.
pub fn exists<'a>(cfg: &Config, reference: impl Into<Reference<'a>>, name: &str) -> Result<bool> {
    let reference = reference.into();
    if name == "." {
        return Ok(false);
    }
    if let Some(scope) = reference.scope() {
        if name.is_empty() {
            return Ok(false);
        }
        if is_root(name) {
            return Err(LinkError::RootFromSubScope {
                scope: scope.to_string(),
            });
        }
    }

    let opened = match open_reference(cfg, reference, OpenMode::ReadOnly) {
        Ok(o) => o,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            debug!(error = %e, "container unreachable; treating link as absent");
            return Ok(false);
        }
    };
    let found = opened
        .absolute(name)
        .ok()
        .and_then(|abs| opened.container().kind_of(&abs))
        .is_some();
    if let Err(e) = opened.close() {
        debug!(error = %e, "close after existence check failed");
    }
    Ok(found)
}

/// Kind of the link at `name`.
pub fn classify<'a>(cfg: &Config, reference: impl Into<Reference<'a>>, name: &str) -> Result<LinkKind> {
    let resolved = resolve(cfg, reference, name, OpenMode::ReadOnly)?;
    let kind = resolved.kind();
    resolved.close()?;
    Ok(kind)
}

/// True for groups, the root included.
pub fn is_group<'a>(cfg: &Config, reference: impl Into<Reference<'a>>, name: &str) -> Result<bool> {
    Ok(matches!(
        classify(cfg, reference, name)?,
        LinkKind::Group | LinkKind::Root
    ))
}

pub fn is_dataset<'a>(cfg: &Config, reference: impl Into<Reference<'a>>, name: &str) -> Result<bool> {
    Ok(classify(cfg, reference, name)? == LinkKind::Dataset)
}

/// With no name, a sub-scope reference means its own group and a file-scope one the root.
fn target_name(reference: &Reference<'_>, name: Option<&str>) -> String {
    match (name, reference) {
        (Some(n), _) => n.to_string(),
        (None, Reference::Group(g)) => g.path().to_string(),
        (None, _) => ROOT.to_string(),
    }
}

/// Current shape of a dataset.
pub fn dims<'a>(cfg: &Config, reference: impl Into<Reference<'a>>, name: Option<&str>) -> Result<Vec<u64>> {
    let reference = reference.into();
    let resolved = resolve(cfg, reference, &target_name(&reference, name), OpenMode::ReadOnly)?;
    let shape = resolved.container().shape(resolved.name())?;
    resolved.close()?;
    Ok(shape)
}

/// Maximum shape of a dataset; `None` marks an unlimited dimension.
pub fn max_dims<'a>(
    cfg: &Config,
    reference: impl Into<Reference<'a>>,
    name: Option<&str>,
) -> Result<Vec<Option<u64>>> {
    let reference = reference.into();
    let resolved = resolve(cfg, reference, &target_name(&reference, name), OpenMode::ReadOnly)?;
    let shape = resolved.container().max_shape(resolved.name())?;
    resolved.close()?;
    Ok(shape)
}

/// The link's own attributes (never its parent's).
pub fn read_attributes<'a>(
    cfg: &Config,
    reference: impl Into<Reference<'a>>,
    name: Option<&str>,
) -> Result<Attributes> {
    let reference = reference.into();
    let resolved = resolve(cfg, reference, &target_name(&reference, name), OpenMode::ReadOnly)?;
    let attrs = resolved.container().read_attributes(resolved.name())?;
    resolved.close()?;
    Ok(attrs)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Descend into sub-groups.
    pub recursive: bool,
    /// Report absolute names instead of names relative to the listed group.
    pub full_names: bool,
}

/// One link found while listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEntry {
    /// Name relative to the listed group.
    pub name: String,
    /// Absolute name inside the container.
    pub full_name: String,
    pub kind: LinkKind,
}

/// Children of the group at `base` in pre-order (parents before children, siblings in
/// lexical order). Datasets cannot be listed.
pub(crate) fn walk(container: &Container, base: &str, recursive: bool) -> Result<Vec<LinkEntry>> {
    if container.link_kind(base)? == LinkKind::Dataset {
        return Err(LinkError::NotAGroup {
            file: container.path().to_path_buf(),
            name: base.to_string(),
        });
    }
    let prefix_len = if base == ROOT { 1 } else { base.len() + 1 };
    let entry = |parent: &str, child: String, kind: LinkKind| {
        let full_name = if parent == ROOT {
            format!("/{child}")
        } else {
            format!("{parent}/{child}")
        };
        LinkEntry {
            name: full_name[prefix_len..].to_string(),
            full_name,
            kind,
        }
    };

    let mut stack: Vec<LinkEntry> = container
        .child_kinds(base)?
        .into_iter()
        .rev()
        .map(|(child, kind)| entry(base, child, kind))
        .collect();
    let mut out = Vec::new();
    while let Some(e) = stack.pop() {
        if recursive && e.kind == LinkKind::Group {
            for (child, kind) in container.child_kinds(&e.full_name)?.into_iter().rev() {
                stack.push(entry(&e.full_name, child, kind));
            }
        }
        out.push(e);
    }
    Ok(out)
}

/// Links under the group at `name` (the reference's own location when `None`).
pub fn list_detailed<'a>(
    cfg: &Config,
    reference: impl Into<Reference<'a>>,
    name: Option<&str>,
    recursive: bool,
) -> Result<Vec<LinkEntry>> {
    let reference = reference.into();
    let resolved = resolve(cfg, reference, &target_name(&reference, name), OpenMode::ReadOnly)?;
    let entries = walk(resolved.container(), resolved.name(), recursive)?;
    resolved.close()?;
    Ok(entries)
}

/// Names of the links under a group, per `opts`.
pub fn list<'a>(
    cfg: &Config,
    reference: impl Into<Reference<'a>>,
    name: Option<&str>,
    opts: ListOptions,
) -> Result<Vec<String>> {
    Ok(list_detailed(cfg, reference, name, opts.recursive)?
        .into_iter()
        .map(|e| if opts.full_names { e.full_name } else { e.name })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn walk_is_preorder_and_lexical() {
        let td = tempdir().unwrap();
        let c = Container::open(td.path().join("w.adx"), OpenMode::Append).unwrap();
        c.create_group("b").unwrap();
        c.create_group("b/y").unwrap();
        c.write_array("b/x", &[1u8], &[1]).unwrap();
        c.write_array("b/y/z", &[1u8], &[1]).unwrap();
        c.write_array("a", &[1u8], &[1]).unwrap();

        let names: Vec<_> = walk(&c, "/", true).unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, ["a", "b", "b/x", "b/y", "b/y/z"]);

        let under_b = walk(&c, "/b", true).unwrap();
        assert_eq!(under_b[0].name, "x");
        assert_eq!(under_b[0].full_name, "/b/x");
        assert_eq!(under_b[2].name, "y/z");

        let flat: Vec<_> = walk(&c, "/", false).unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(flat, ["a", "b"]);

        assert!(matches!(walk(&c, "/a", false), Err(LinkError::NotAGroup { .. })));
    }
}
