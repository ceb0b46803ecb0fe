//! Storage abstraction and backends for pallet.
//!
//! This crate provides:
//! - Live handles for spaces, packages and versions
//! - Whole-blob reads and atomic, optionally preconditioned, writes of version content
//! - Metadata and values derived from stored archives
//! - Backends: local filesystem and in-memory

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::{filesystem::FilesystemBackend, memory::MemoryBackend};
pub use error::{StorageError, StorageResult};
pub use traits::{Package, RegistryStore, Space, Version};

use bytes::Bytes;
use pallet_archive::ArchiveCodec;
use pallet_core::config::StorageConfig;
use pallet_core::{PackageName, SpaceName, VersionNumber};
use std::sync::Arc;

/// A backend built from configuration.
///
/// Keeps the concrete type so callers can reach the provisioning helpers,
/// which are not part of [`RegistryStore`].
#[derive(Clone)]
pub enum ConfiguredBackend {
    Filesystem(FilesystemBackend),
    Memory(MemoryBackend),
}

impl ConfiguredBackend {
    /// The backend as a registry store.
    pub fn store(&self) -> Arc<dyn RegistryStore> {
        match self {
            Self::Filesystem(backend) => Arc::new(backend.clone()),
            Self::Memory(backend) => Arc::new(backend.clone()),
        }
    }

    /// Create a space. Returns `false` if it already existed.
    pub async fn create_space(&self, name: &SpaceName) -> StorageResult<bool> {
        match self {
            Self::Filesystem(backend) => backend.create_space(name).await,
            Self::Memory(backend) => Ok(backend.create_space(name).await),
        }
    }

    /// Store a version in an existing space.
    pub async fn put_version(
        &self,
        space: &SpaceName,
        package: &PackageName,
        version: &VersionNumber,
        data: Bytes,
    ) -> StorageResult<()> {
        match self {
            Self::Filesystem(backend) => backend.put_version(space, package, version, data).await,
            Self::Memory(backend) => backend.put_version(space, package, version, data).await,
        }
    }
}

/// Create a storage backend from configuration.
pub async fn from_config(
    config: &StorageConfig,
    codec: Arc<dyn ArchiveCodec>,
) -> StorageResult<ConfiguredBackend> {
    config.validate().map_err(StorageError::Config)?;

    match config {
        StorageConfig::Filesystem { path } => {
            let backend = FilesystemBackend::new(path, codec).await?;
            Ok(ConfiguredBackend::Filesystem(backend))
        }
        StorageConfig::Memory => Ok(ConfiguredBackend::Memory(MemoryBackend::new(codec))),
    }
}
