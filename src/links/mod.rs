//! Link operations on containers.
//!
//! Every public operation takes a `Config` (for the open-retry policy) and one or more
//! `Reference`s: a container path, an open `Container`, or a `Group` sub-scope handle.
//! Path references are opened and closed inside the call; handles are borrowed.

mod atomic;
mod backup;
mod copy;
mod delete;
pub(crate) mod helpers;
mod introspect;
mod io_copy;
mod meta;
mod move_link;
pub mod normalize;
mod open;
mod overwrite;
pub mod resolve;
mod util;

pub use backup::backup;
pub use copy::{copy_attributes, copy_link};
pub use delete::delete_link;
pub use introspect::{
    LinkEntry, ListOptions, classify, dims, exists, is_dataset, is_group, list, list_detailed,
    max_dims, read_attributes,
};
pub use move_link::move_link;
pub use normalize::normalize;
pub use open::{open_container, open_with};
pub use overwrite::overwrite;
pub use resolve::{ContainerRef, Opened, Reference, Resolved, open_reference, resolve};
