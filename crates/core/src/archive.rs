//! In-memory representation of a decoded package archive.

use crate::metadata::Metadata;
use bytes::Bytes;

/// Configuration values of a package, kept as raw structured text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Values {
    pub raw: String,
}

impl Values {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

/// A payload file carried by an archive, path relative to the package root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveFile {
    pub path: String,
    pub data: Bytes,
}

/// A decoded archive: mutable metadata and values plus an immutable payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedArchive {
    pub metadata: Metadata,
    pub values: Values,
    files: Vec<ArchiveFile>,
}

impl DecodedArchive {
    pub fn new(metadata: Metadata, values: Values, files: Vec<ArchiveFile>) -> Self {
        Self {
            metadata,
            values,
            files,
        }
    }

    /// Payload files in archive order.
    pub fn files(&self) -> &[ArchiveFile] {
        &self.files
    }
}
