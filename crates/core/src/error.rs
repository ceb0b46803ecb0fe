//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid {kind} name: {reason}")]
    InvalidAddress { kind: &'static str, reason: String },

    #[error("{0} not found")]
    NotFound(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
