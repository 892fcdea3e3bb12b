use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures of the analysis store.
///
/// `Read` and `Parse` are read-path failures; `list()` masks them.
/// `Serialize` and `Write` are write-path failures and always reach the caller.
/// `Bootstrap` only comes out of opening the store or a read; a mutating call
/// that cannot create the document reports `Write` instead.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to prepare storage at {path}: {source}")]
    Bootstrap { path: PathBuf, source: io::Error },

    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("corrupt analyses document {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to serialize analyses: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("invalid analysis: {0}")]
    InvalidRecord(String),
}

impl StoreError {
    pub fn is_read_failure(&self) -> bool {
        matches!(self, StoreError::Read { .. } | StoreError::Parse { .. })
    }

    pub fn is_write_failure(&self) -> bool {
        matches!(self, StoreError::Serialize(_) | StoreError::Write { .. })
    }

    /// Reclassifies a failed document bootstrap as a write failure, for calls
    /// whose purpose was to persist something.
    pub(crate) fn into_write_failure(self) -> Self {
        match self {
            StoreError::Bootstrap { path, source } => StoreError::Write { path, source },
            other => other,
        }
    }
}
