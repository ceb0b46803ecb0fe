//! Storage error types.

use pallet_core::ResourceKind;
use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{kind} not found: {name}")]
    NotFound { kind: ResourceKind, name: String },

    /// A conditional write found content other than what the writer had read.
    #[error("precondition failed for {0}: content changed since it was read")]
    PreconditionFailed(String),

    /// Stored content could not be decoded while deriving metadata or values.
    #[error("corrupt content in {resource}: {detail}")]
    CorruptContent { resource: String, detail: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl StorageError {
    pub(crate) fn not_found(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
