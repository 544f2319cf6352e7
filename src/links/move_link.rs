//! In-container link move: one relink, content and attributes untouched.

use tracing::{info, warn};

use crate::config::Config;
use crate::container::OpenMode;
use crate::errors::{LinkError, Result};

use super::normalize::is_within;
use super::resolve::{Reference, open_reference};
use super::util::ensure_parent_groups;

/// Move `from_name` to `to_name` inside one container.
///
/// Returns `Ok(false)` without changing anything when source and destination are the
/// same link, or when the destination is occupied and `overwrite` is off. A missing
/// source is an error. Missing destination parent groups are created.
pub fn move_link<'a>(
    cfg: &Config,
    file: impl Into<Reference<'a>>,
    from_name: &str,
    to_name: &str,
    overwrite: bool,
) -> Result<bool> {
    let opened = open_reference(cfg, file.into(), OpenMode::ReadWrite)?;
    let from = opened.absolute(from_name)?;
    let to = opened.absolute(to_name)?;
    let container = opened.container();

    if from == to {
        warn!(file = %container.path().display(), name = %from, "source and destination are the same link; nothing to move");
        opened.close()?;
        return Ok(false);
    }
    container.link_kind(&from)?;
    if is_within(&to, &from) {
        return Err(LinkError::Malformed {
            file: container.path().to_path_buf(),
            name: to,
            reason: format!("cannot move '{from}' into its own subtree"),
        });
    }

    if container.kind_of(&to).is_some() {
        if !overwrite {
            warn!(
                file = %container.path().display(),
                from = %from,
                to = %to,
                "destination exists; pass overwrite to replace it"
            );
            opened.close()?;
            return Ok(false);
        }
        if is_within(&from, &to) {
            return Err(LinkError::Malformed {
                file: container.path().to_path_buf(),
                name: to,
                reason: format!("replacing it would delete the source '{from}'"),
            });
        }
        container.delete_link(&to)?;
        info!(file = %container.path().display(), name = %to, "deleted existing destination before move");
    }

    ensure_parent_groups(container, &to)?;
    container.rename_link(&from, &to)?;
    info!(file = %container.path().display(), from = %from, to = %to, "moved link");
    opened.close()?;
    Ok(true)
}
