//! Typed error definitions for adxlink.
//! Every failure names the offending link and container so logs and tests can match on it.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("missing object '{name}' in {}", .file.display())]
    Missing { file: PathBuf, name: String },

    #[error("object '{name}' already exists in {}", .file.display())]
    AlreadyExists { file: PathBuf, name: String },

    #[error("cannot address a container root relative to a sub-scope handle (scope '{scope}')")]
    RootFromSubScope { scope: String },

    #[error("'{name}' in {} is not a group", .file.display())]
    NotAGroup { file: PathBuf, name: String },

    #[error("'{name}' in {} is not a dataset", .file.display())]
    NotADataset { file: PathBuf, name: String },

    #[error("malformed reference '{name}' in {}: {reason}", .file.display())]
    Malformed {
        file: PathBuf,
        name: String,
        reason: String,
    },

    #[error("container {} is open read-only", .0.display())]
    ReadOnly(PathBuf),

    #[error("container file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("container file already exists: {}", .0.display())]
    FileExists(PathBuf),

    #[error("source and destination are the same file: {}", .0.display())]
    SameFile(PathBuf),

    #[error("container {} is locked by another process", .0.display())]
    Locked(PathBuf),

    #[error("not a valid container {}: {reason}", .file.display())]
    Corrupt { file: PathBuf, reason: String },

    #[error("data for '{name}' does not match its declared layout: {reason}")]
    DataMismatch { name: String, reason: String },

    #[error("gave up opening {} after {:.1}s: {source}", .path.display(), .waited.as_secs_f64())]
    OpenTimeout {
        path: PathBuf,
        waited: Duration,
        #[source]
        source: Box<LinkError>,
    },

    #[error("operation interrupted by user")]
    Interrupted,

    #[error("{op} '{}': {source}{hint}", .path.display())]
    Io {
        op: String,
        path: PathBuf,
        hint: String,
        #[source]
        source: io::Error,
    },
}

impl LinkError {
    /// Stable numeric code for structured logs and the CLI exit status.
    pub fn code(&self) -> i32 {
        match self {
            LinkError::Missing { .. } => 10,
            LinkError::AlreadyExists { .. } => 11,
            LinkError::RootFromSubScope { .. } => 12,
            LinkError::NotAGroup { .. } => 13,
            LinkError::NotADataset { .. } => 14,
            LinkError::Malformed { .. } => 15,
            LinkError::ReadOnly(_) => 20,
            LinkError::FileNotFound(_) => 21,
            LinkError::FileExists(_) => 22,
            LinkError::SameFile(_) => 23,
            LinkError::Locked(_) => 24,
            LinkError::Corrupt { .. } => 25,
            LinkError::DataMismatch { .. } => 26,
            LinkError::OpenTimeout { .. } => 70,
            LinkError::Interrupted => 130,
            LinkError::Io { .. } => 74,
        }
    }

    /// Retry exhaustion at open time: the process should not carry on.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LinkError::OpenTimeout { .. })
    }

    pub(crate) fn io(op: impl Into<String>, path: impl Into<PathBuf>, source: io::Error) -> Self {
        LinkError::Io {
            op: op.into(),
            path: path.into(),
            hint: crate::links::helpers::hint_for(&source),
            source,
        }
    }
}

pub type Result<T, E = LinkError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_path_and_file() {
        let e = LinkError::Missing {
            file: PathBuf::from("/data/pbmc.adx"),
            name: "/obsm/umap".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("/obsm/umap"));
        assert!(msg.contains("/data/pbmc.adx"));
        assert_eq!(e.code(), 10);
        assert!(!e.is_fatal());
    }

    #[test]
    fn only_open_timeout_is_fatal() {
        let e = LinkError::OpenTimeout {
            path: PathBuf::from("x.adx"),
            waited: Duration::from_secs(3),
            source: Box::new(LinkError::Locked(PathBuf::from("x.adx"))),
        };
        assert!(e.is_fatal());
        assert!(e.to_string().contains("locked"));
        assert!(!LinkError::Interrupted.is_fatal());
    }
}
