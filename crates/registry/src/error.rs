//! Registry error types.

use pallet_archive::ArchiveError;
use pallet_core::ResourceKind;
use pallet_storage::StorageError;
use thiserror::Error;

/// Errors returned by registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{kind} not found: {name}")]
    NotFound { kind: ResourceKind, name: String },

    /// Malformed request addressing.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// A well-formed parameter whose value is rejected, e.g. an identity change.
    #[error("invalid value for {field}: expected {expected:?}, got {actual:?}")]
    ParamValue {
        field: String,
        expected: String,
        actual: String,
    },

    /// A parameter that could not be parsed as the expected type.
    #[error("invalid type for {param}: expected {expected}, got {actual}")]
    ParamType {
        param: String,
        expected: String,
        actual: String,
    },

    /// Stored content is not a valid archive for the addressed version.
    #[error("{resource} does not hold a valid {expected}: {detail}")]
    InternalType {
        resource: String,
        expected: String,
        detail: String,
    },

    /// The content changed between read and write.
    #[error("conflict: {resource} was modified concurrently")]
    Conflict { resource: String },

    #[error("{operation} cancelled")]
    Cancelled { operation: &'static str },

    #[error("{operation} exceeded its deadline")]
    DeadlineExceeded { operation: &'static str },

    #[error("storage error: {0}")]
    Storage(StorageError),

    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),
}

impl RegistryError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::InvalidAddress(_) => "invalid_address",
            Self::ParamValue { .. } => "param_value_error",
            Self::ParamType { .. } => "param_type_error",
            Self::InternalType { .. } => "internal_type_error",
            Self::Conflict { .. } => "conflict",
            Self::Cancelled { .. } => "cancelled",
            Self::DeadlineExceeded { .. } => "deadline_exceeded",
            Self::Storage(_) => "storage_error",
            Self::Archive(_) => "archive_error",
        }
    }

    pub(crate) fn param_type(
        param: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ParamType {
            param: param.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl From<StorageError> for RegistryError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { kind, name } => Self::NotFound { kind, name },
            StorageError::CorruptContent { resource, detail } => Self::InternalType {
                resource,
                expected: "package archive".to_string(),
                detail,
            },
            StorageError::PreconditionFailed(resource) => Self::Conflict { resource },
            other => Self::Storage(other),
        }
    }
}

impl From<pallet_core::Error> for RegistryError {
    fn from(err: pallet_core::Error) -> Self {
        match err {
            pallet_core::Error::InvalidAddress { .. } => Self::InvalidAddress(err.to_string()),
            pallet_core::Error::NotFound(what) => Self::NotFound {
                kind: ResourceKind::Metadata,
                name: what,
            },
        }
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_map_to_taxonomy() {
        let err: RegistryError = StorageError::NotFound {
            kind: ResourceKind::Version,
            name: "s1/p1/1.0.0".to_string(),
        }
        .into();
        assert_eq!(err.code(), "not_found");
        assert_eq!(err.to_string(), "version not found: s1/p1/1.0.0");

        let err: RegistryError = StorageError::CorruptContent {
            resource: "s1/p1/1.0.0".to_string(),
            detail: "bad gzip header".to_string(),
        }
        .into();
        assert_eq!(err.code(), "internal_type_error");
        assert!(err.to_string().contains("s1/p1/1.0.0"));

        let err: RegistryError = StorageError::PreconditionFailed("s1/p1/1.0.0".to_string()).into();
        assert_eq!(err.code(), "conflict");

        let err: RegistryError = StorageError::InvalidKey("../x".to_string()).into();
        assert_eq!(err.code(), "storage_error");
    }

    #[test]
    fn test_core_errors_map_to_taxonomy() {
        let err: RegistryError = pallet_core::SpaceName::new("").unwrap_err().into();
        assert_eq!(err.code(), "invalid_address");

        let err: RegistryError = pallet_core::Error::NotFound("metadata".to_string()).into();
        assert!(matches!(
            err,
            RegistryError::NotFound {
                kind: ResourceKind::Metadata,
                ..
            }
        ));
    }

    #[test]
    fn test_param_value_message_names_field() {
        let err = RegistryError::ParamValue {
            field: "name".to_string(),
            expected: "nginx".to_string(),
            actual: "apache".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid value for name: expected \"nginx\", got \"apache\""
        );
    }
}
