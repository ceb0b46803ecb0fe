//! Storage trait definitions.
//!
//! Handles are live views: every call goes to the backend, so a handle
//! obtained before a concurrent change observes that change.

use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use pallet_archive::ArchiveCodec;
use pallet_core::{ContentHash, Metadata, PackageName, SpaceName, VersionNumber, project};
use std::sync::Arc;

/// Entry point of a storage backend.
#[async_trait]
pub trait RegistryStore: Send + Sync + 'static {
    /// Look up a space.
    async fn space(&self, name: &SpaceName) -> StorageResult<Arc<dyn Space>>;

    /// Look up a package within a space.
    async fn package(
        &self,
        space: &SpaceName,
        name: &PackageName,
    ) -> StorageResult<Arc<dyn Package>>;

    /// Get the name of this storage backend (e.g., "filesystem"), for logging.
    fn backend_name(&self) -> &'static str;

    /// Verify storage backend connectivity.
    ///
    /// The default implementation returns Ok(()), suitable for backends that
    /// don't require connectivity verification.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// A namespace of packages.
#[async_trait]
pub trait Space: Send + Sync {
    fn name(&self) -> &SpaceName;

    /// Package names in backend order.
    async fn list(&self) -> StorageResult<Vec<String>>;

    /// Look up a package in this space.
    async fn package(&self, name: &PackageName) -> StorageResult<Arc<dyn Package>>;

    /// Metadata of every version of every package in this space, packages in
    /// [`Space::list`] order and versions in [`Package::list`] order.
    async fn version_metadata(&self) -> StorageResult<Vec<Metadata>>;
}

/// A named, versioned package.
#[async_trait]
pub trait Package: Send + Sync {
    fn space(&self) -> &SpaceName;

    fn name(&self) -> &PackageName;

    /// Version identifiers in ascending backend order.
    async fn list(&self) -> StorageResult<Vec<String>>;

    /// Look up a version of this package.
    async fn version(&self, number: &VersionNumber) -> StorageResult<Arc<dyn Version>>;

    /// Metadata of every version, in [`Package::list`] order.
    async fn version_metadata(&self) -> StorageResult<Vec<Metadata>>;
}

/// One version of a package, owning exactly one archive blob.
#[async_trait]
pub trait Version: Send + Sync {
    fn space(&self) -> &SpaceName;

    fn package(&self) -> &PackageName;

    fn number(&self) -> &VersionNumber;

    /// Current archive bytes.
    async fn get_content(&self) -> StorageResult<Bytes>;

    /// Replace the archive bytes atomically.
    ///
    /// With a `precondition`, the write only happens if the hash of the
    /// currently stored bytes equals it; otherwise
    /// [`StorageError::PreconditionFailed`] is returned and nothing is written.
    async fn put_content(
        &self,
        data: Bytes,
        precondition: Option<ContentHash>,
    ) -> StorageResult<()>;

    /// Metadata derived from the stored archive.
    async fn metadata(&self) -> StorageResult<Metadata>;

    /// Raw configuration values of the stored archive.
    async fn values(&self) -> StorageResult<Bytes>;
}

/// `<space>/<package>/<version>`, used in errors and logs.
pub fn version_path(space: &SpaceName, package: &PackageName, version: &str) -> String {
    format!("{space}/{package}/{version}")
}

/// Decode stored bytes and project their metadata.
pub(crate) fn derive_metadata(
    codec: &dyn ArchiveCodec,
    resource: &str,
    data: &[u8],
) -> StorageResult<Metadata> {
    let archive = codec
        .decode(data)
        .map_err(|e| StorageError::CorruptContent {
            resource: resource.to_string(),
            detail: e.to_string(),
        })?;
    Ok(project(&archive))
}

/// Decode stored bytes and extract their raw values.
pub(crate) fn derive_values(
    codec: &dyn ArchiveCodec,
    resource: &str,
    data: &[u8],
) -> StorageResult<Bytes> {
    let archive = codec
        .decode(data)
        .map_err(|e| StorageError::CorruptContent {
            resource: resource.to_string(),
            detail: e.to_string(),
        })?;
    Ok(Bytes::from(archive.values.raw))
}
