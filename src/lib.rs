//! Core library for `adxlink`.
//!
//! Link management and safe mutation for hierarchical container files: inspect links,
//! copy them within or across containers, move and delete them, back a container up
//! while leaving some links out, and remove a link through a guarded rebuild.
//!
//! The container store lives in [`container`]; the link operations in [`links`].

pub mod cli;
pub mod config;
pub mod container;
pub mod errors;
pub mod links;
pub mod output;
pub mod platform;
pub mod shutdown;

pub use config::{Config, LogLevel, default_config_path, default_log_path, path_has_symlink_ancestor};
pub use container::{
    AttrValue, Attributes, Container, DataType, Element, Group, LinkKind, OpenMode, RawData,
};
pub use errors::{LinkError, Result};
pub use links::{
    ContainerRef, LinkEntry, ListOptions, Opened, Reference, Resolved, backup, classify,
    copy_attributes, copy_link, delete_link, dims, exists, is_dataset, is_group, list,
    list_detailed, max_dims, move_link, normalize, open_container, open_reference, open_with,
    overwrite, read_attributes, resolve,
};

/// Convenience imports for callers driving link operations.
pub mod prelude {
    pub use crate::config::{Config, LogLevel};
    pub use crate::container::{Container, Group, LinkKind, OpenMode};
    pub use crate::errors::{LinkError, Result as LinkResult};
    pub use crate::links::{
        ListOptions, Reference, backup, classify, copy_link, delete_link, exists, list,
        move_link, overwrite,
    };
    pub use crate::shutdown::request as request_shutdown;
}
