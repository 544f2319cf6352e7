//! Handle resolution across the three ways a caller can point into a container.
//!
//! - `Reference::Path`: a container file; opened here with the requested mode (and the
//!   configured retry policy), owned by the result and closed with it.
//! - `Reference::File`: an open file-scope handle; names are absolute, "/" is the root.
//! - `Reference::Group`: an open sub-scope handle; names are relative to the group,
//!   the group's own absolute path addresses the group itself, "/" is rejected.
//!
//! Handles passed in by the caller are borrowed and never closed here.

use std::ops::Deref;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::container::{Container, Group, LinkKind, OpenMode};
use crate::errors::{LinkError, Result};

use super::normalize::{ROOT, join_names, normalize};
use super::open::open_with;

#[derive(Debug, Clone, Copy)]
pub enum Reference<'a> {
    Path(&'a Path),
    File(&'a Container),
    Group(&'a Group<'a>),
}

impl<'a> From<&'a Path> for Reference<'a> {
    fn from(p: &'a Path) -> Self {
        Reference::Path(p)
    }
}

impl<'a> From<&'a PathBuf> for Reference<'a> {
    fn from(p: &'a PathBuf) -> Self {
        Reference::Path(p.as_path())
    }
}

impl<'a> From<&'a str> for Reference<'a> {
    fn from(p: &'a str) -> Self {
        Reference::Path(Path::new(p))
    }
}

impl<'a> From<&'a Container> for Reference<'a> {
    fn from(c: &'a Container) -> Self {
        Reference::File(c)
    }
}

impl<'a, 'c: 'a> From<&'a Group<'c>> for Reference<'a> {
    fn from(g: &'a Group<'c>) -> Self {
        Reference::Group(g)
    }
}

impl Reference<'_> {
    /// Canonical filesystem identity of the referenced container.
    pub fn file_identity(&self) -> PathBuf {
        match self {
            Reference::Path(p) => file_identity(p),
            Reference::File(c) => c.path().to_path_buf(),
            Reference::Group(g) => g.container().path().to_path_buf(),
        }
    }

    /// Absolute path of the bound group for sub-scope references.
    pub fn scope(&self) -> Option<&str> {
        match self {
            Reference::Group(g) => Some(g.path()),
            Reference::Path(_) | Reference::File(_) => None,
        }
    }

    /// The already-open container behind a handle reference.
    pub fn handle(&self) -> Option<&Container> {
        match self {
            Reference::Path(_) => None,
            Reference::File(c) => Some(c),
            Reference::Group(g) => Some(g.container()),
        }
    }
}

/// Canonical identity for a file path that may not exist yet: the canonical path when it
/// exists, else the canonical parent joined with the file name, else the absolute path.
pub fn file_identity(path: &Path) -> PathBuf {
    if let Ok(p) = dunce::canonicalize(path) {
        return p;
    }
    if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        if let Ok(dir) = dunce::canonicalize(parent) {
            return dir.join(name);
        }
    }
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Apply the scope rules to `name`.
pub fn absolute_in(scope: Option<&str>, name: &str) -> Result<String> {
    let name = normalize(name);
    match scope {
        None => Ok(name),
        Some(scope) if name == ROOT => Err(LinkError::RootFromSubScope {
            scope: scope.to_string(),
        }),
        Some(scope) if name == scope => Ok(name),
        Some(scope) => Ok(join_names(scope, &name)),
    }
}

/// A container that is either opened here (and closed with us) or borrowed from the caller.
#[derive(Debug)]
pub enum ContainerRef<'a> {
    Owned(Container),
    Borrowed(&'a Container),
}

impl Deref for ContainerRef<'_> {
    type Target = Container;
    fn deref(&self) -> &Container {
        match self {
            ContainerRef::Owned(c) => c,
            ContainerRef::Borrowed(c) => c,
        }
    }
}

impl ContainerRef<'_> {
    /// Close an owned container; a borrowed one is left to its owner.
    pub fn close(self) -> Result<()> {
        match self {
            ContainerRef::Owned(c) => c.close(),
            ContainerRef::Borrowed(_) => Ok(()),
        }
    }
}

/// An open container plus the scope names are resolved against.
#[derive(Debug)]
pub struct Opened<'a> {
    container: ContainerRef<'a>,
    scope: Option<String>,
}

impl<'a> Opened<'a> {
    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn absolute(&self, name: &str) -> Result<String> {
        absolute_in(self.scope(), name)
    }

    pub fn close(self) -> Result<()> {
        self.container.close()
    }
}

/// Open whatever `reference` points at. Path references are opened in `mode`.
pub fn open_reference<'a>(cfg: &Config, reference: Reference<'a>, mode: OpenMode) -> Result<Opened<'a>> {
    Ok(match reference {
        Reference::Path(p) => Opened {
            container: ContainerRef::Owned(open_with(cfg, p, mode)?),
            scope: None,
        },
        Reference::File(c) => Opened {
            container: ContainerRef::Borrowed(c),
            scope: None,
        },
        Reference::Group(g) => Opened {
            container: ContainerRef::Borrowed(g.container()),
            scope: Some(g.path().to_string()),
        },
    })
}

/// An existing location inside an open container.
#[derive(Debug)]
pub struct Resolved<'a> {
    opened: Opened<'a>,
    name: String,
    kind: LinkKind,
}

impl<'a> Resolved<'a> {
    pub fn container(&self) -> &Container {
        self.opened.container()
    }

    /// Absolute link name of the target.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> LinkKind {
        self.kind
    }

    /// Sub-scope handle on the target, when it is a (non-root) group.
    pub fn group(&self) -> Result<Group<'_>> {
        self.container().group(&self.name)
    }

    pub fn close(self) -> Result<()> {
        self.opened.close()
    }
}

/// Resolve `name` against `reference` to an existing location.
pub fn resolve<'a>(
    cfg: &Config,
    reference: impl Into<Reference<'a>>,
    name: &str,
    mode: OpenMode,
) -> Result<Resolved<'a>> {
    let reference = reference.into();
    // Reject before opening anything.
    let name = absolute_in(reference.scope(), name)?;
    let opened = open_reference(cfg, reference, mode)?;
    let kind = opened.container().link_kind(&name)?;
    Ok(Resolved { opened, name, kind })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_rules() {
        assert_eq!(absolute_in(None, "obsm//pca").unwrap(), "/obsm/pca");
        assert_eq!(absolute_in(None, "/").unwrap(), "/");
        assert_eq!(absolute_in(Some("/obsm"), "pca").unwrap(), "/obsm/pca");
        assert_eq!(absolute_in(Some("/obsm"), "/obsm").unwrap(), "/obsm");
        assert_eq!(absolute_in(Some("/obsm"), "/pca").unwrap(), "/obsm/pca");
        assert!(matches!(
            absolute_in(Some("/obsm"), "/"),
            Err(LinkError::RootFromSubScope { .. })
        ));
        assert!(matches!(
            absolute_in(Some("/obsm"), "//"),
            Err(LinkError::RootFromSubScope { .. })
        ));
    }

    #[test]
    fn identity_of_missing_file_uses_canonical_parent() {
        let td = tempfile::tempdir().unwrap();
        let missing = td.path().join("later.adx");
        let id = file_identity(&missing);
        assert_eq!(id, dunce::canonicalize(td.path()).unwrap().join("later.adx"));
    }
}
