use std::path::PathBuf;

use compact_str::CompactString;
use thiserror::Error;

/// Failures while building the scan tree. All of them abort the scan.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("cannot list {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read entry in {path}: {source}")]
    Entry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("scan task failed: {0}")]
    Join(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("manifest error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unknown collection {0}")]
    UnknownCollection(u64),

    #[error("cannot attach {path}: {reason}")]
    AttachmentFailed { path: PathBuf, reason: String },

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("cannot create collection {name:?}: {source}")]
    CollectionCreate {
        name: CompactString,
        #[source]
        source: StoreError,
    },

    #[error("target library is read-only")]
    ReadOnlyLibrary,

    #[error("files in the target library cannot be edited")]
    ReadOnlyFiles,

    #[error("extension selection failed: {0}")]
    Selection(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T, E = ImportError> = std::result::Result<T, E>;
