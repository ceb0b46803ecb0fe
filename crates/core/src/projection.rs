//! Metadata projection for listing and mutation responses.

use crate::archive::DecodedArchive;
use crate::metadata::Metadata;

/// Derive the externally visible metadata summary of a decoded archive.
pub fn project(archive: &DecodedArchive) -> Metadata {
    archive.metadata.clone()
}
