//! Platform-specific helpers.
//! This module hides OS differences (Unix/Windows) behind a uniform API so
//! the rest of the codebase can remain platform-agnostic.

pub mod temp;
#[cfg(unix)]
mod unix;
#[cfg(not(unix))]
mod windows;

pub use temp::tmp_sibling_name;

#[cfg(unix)]
pub use unix::{available_space, open_log_file_secure_append, write_config_secure_new_0600};

#[cfg(not(unix))]
pub use windows::{available_space, open_log_file_secure_append, write_config_secure_new_0600};
