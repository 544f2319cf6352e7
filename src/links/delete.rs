//! Link deletion.

use tracing::{info, warn};

use crate::config::Config;
use crate::container::OpenMode;
use crate::errors::{LinkError, Result};

use super::normalize::is_root;
use super::resolve::{Reference, open_reference};

/// Delete the link at `name` with its subtree. `Ok(false)` when there was nothing to
/// delete. The root cannot be deleted; truncate the container instead.
pub fn delete_link<'a>(cfg: &Config, reference: impl Into<Reference<'a>>, name: &str) -> Result<bool> {
    let opened = open_reference(cfg, reference.into(), OpenMode::ReadWrite)?;
    let abs = opened.absolute(name)?;
    let container = opened.container();
    if is_root(&abs) {
        return Err(LinkError::Malformed {
            file: container.path().to_path_buf(),
            name: abs,
            reason: "the root cannot be deleted".into(),
        });
    }
    if container.kind_of(&abs).is_none() {
        warn!(file = %container.path().display(), name = %abs, "no such link; nothing to delete");
        opened.close()?;
        return Ok(false);
    }
    container.delete_link(&abs)?;
    info!(file = %container.path().display(), name = %abs, "deleted link");
    opened.close()?;
    Ok(true)
}
