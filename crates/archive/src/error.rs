//! Archive error types.

use thiserror::Error;

/// Archive encode/decode errors.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The bytes are not a valid package archive.
    #[error("corrupt archive: {0}")]
    Corrupt(String),

    #[error("failed to encode archive: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for archive operations.
pub type ArchiveResult<T> = std::result::Result<T, ArchiveError>;

/// Values document could not be converted.
#[derive(Debug, Error)]
#[error("cannot convert values from {from}: {reason}")]
pub struct ConversionError {
    /// Format the document was expected to be in.
    pub from: &'static str,
    pub reason: String,
}
