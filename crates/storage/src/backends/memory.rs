//! In-memory storage backend.
//!
//! Packages are listed by name; versions are listed in the order they were
//! first stored, which makes this backend's "ascending" order creation order.

use crate::error::{StorageError, StorageResult};
use crate::traits::{
    Package, RegistryStore, Space, Version, derive_metadata, derive_values, version_path,
};
use async_trait::async_trait;
use bytes::Bytes;
use pallet_archive::ArchiveCodec;
use pallet_core::{ContentHash, Metadata, PackageName, ResourceKind, SpaceName, VersionNumber};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::instrument;

type Versions = Vec<(VersionNumber, Bytes)>;
type Packages = BTreeMap<PackageName, Versions>;

struct Inner {
    spaces: RwLock<BTreeMap<SpaceName, Packages>>,
    codec: Arc<dyn ArchiveCodec>,
}

/// Process-local registry store.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new(codec: Arc<dyn ArchiveCodec>) -> Self {
        Self {
            inner: Arc::new(Inner {
                spaces: RwLock::new(BTreeMap::new()),
                codec,
            }),
        }
    }

    /// Create a space. Returns `false` if it already existed.
    pub async fn create_space(&self, name: &SpaceName) -> bool {
        let mut spaces = self.inner.spaces.write().await;
        if spaces.contains_key(name) {
            return false;
        }
        spaces.insert(name.clone(), Packages::new());
        true
    }

    /// Store a version, creating its package on first use.
    ///
    /// Storing an existing version replaces its content without changing its
    /// position in the listing.
    #[instrument(skip(self, data), fields(backend = "memory", size = data.len()))]
    pub async fn put_version(
        &self,
        space: &SpaceName,
        package: &PackageName,
        version: &VersionNumber,
        data: Bytes,
    ) -> StorageResult<()> {
        let mut spaces = self.inner.spaces.write().await;
        let packages = spaces
            .get_mut(space)
            .ok_or_else(|| StorageError::not_found(ResourceKind::Space, space.as_str()))?;
        let versions = packages.entry(package.clone()).or_default();
        match versions.iter_mut().find(|(number, _)| number == version) {
            Some((_, content)) => *content = data,
            None => versions.push((version.clone(), data)),
        }
        Ok(())
    }
}

#[async_trait]
impl RegistryStore for MemoryBackend {
    async fn space(&self, name: &SpaceName) -> StorageResult<Arc<dyn Space>> {
        if !self.inner.spaces.read().await.contains_key(name) {
            return Err(StorageError::not_found(ResourceKind::Space, name.as_str()));
        }
        Ok(Arc::new(MemorySpace {
            inner: self.inner.clone(),
            name: name.clone(),
        }))
    }

    async fn package(
        &self,
        space: &SpaceName,
        name: &PackageName,
    ) -> StorageResult<Arc<dyn Package>> {
        self.space(space).await?.package(name).await
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

struct MemorySpace {
    inner: Arc<Inner>,
    name: SpaceName,
}

#[async_trait]
impl Space for MemorySpace {
    fn name(&self) -> &SpaceName {
        &self.name
    }

    async fn list(&self) -> StorageResult<Vec<String>> {
        let spaces = self.inner.spaces.read().await;
        let packages = spaces
            .get(&self.name)
            .ok_or_else(|| StorageError::not_found(ResourceKind::Space, self.name.as_str()))?;
        Ok(packages.keys().map(|name| name.to_string()).collect())
    }

    async fn package(&self, name: &PackageName) -> StorageResult<Arc<dyn Package>> {
        let spaces = self.inner.spaces.read().await;
        let packages = spaces
            .get(&self.name)
            .ok_or_else(|| StorageError::not_found(ResourceKind::Space, self.name.as_str()))?;
        if !packages.contains_key(name) {
            return Err(StorageError::not_found(
                ResourceKind::Package,
                format!("{}/{name}", self.name),
            ));
        }
        Ok(Arc::new(MemoryPackage {
            inner: self.inner.clone(),
            space: self.name.clone(),
            name: name.clone(),
        }))
    }

    #[instrument(skip(self), fields(backend = "memory", space = %self.name))]
    async fn version_metadata(&self) -> StorageResult<Vec<Metadata>> {
        // Snapshot under the lock, decode outside it.
        let snapshot: Vec<(String, Bytes)> = {
            let spaces = self.inner.spaces.read().await;
            let packages = spaces.get(&self.name).ok_or_else(|| {
                StorageError::not_found(ResourceKind::Space, self.name.as_str())
            })?;
            packages
                .iter()
                .flat_map(|(package, versions)| {
                    versions.iter().map(move |(number, data)| {
                        (
                            version_path(&self.name, package, number.as_str()),
                            data.clone(),
                        )
                    })
                })
                .collect()
        };
        snapshot
            .iter()
            .map(|(resource, data)| derive_metadata(self.inner.codec.as_ref(), resource, data))
            .collect()
    }
}

struct MemoryPackage {
    inner: Arc<Inner>,
    space: SpaceName,
    name: PackageName,
}

impl MemoryPackage {
    async fn versions(&self) -> StorageResult<Versions> {
        let spaces = self.inner.spaces.read().await;
        spaces
            .get(&self.space)
            .and_then(|packages| packages.get(&self.name))
            .cloned()
            .ok_or_else(|| {
                let resource = format!("{}/{}", self.space, self.name);
                StorageError::not_found(ResourceKind::Package, resource)
            })
    }
}

#[async_trait]
impl Package for MemoryPackage {
    fn space(&self) -> &SpaceName {
        &self.space
    }

    fn name(&self) -> &PackageName {
        &self.name
    }

    async fn list(&self) -> StorageResult<Vec<String>> {
        Ok(self
            .versions()
            .await?
            .into_iter()
            .map(|(number, _)| number.to_string())
            .collect())
    }

    async fn version(&self, number: &VersionNumber) -> StorageResult<Arc<dyn Version>> {
        if !self.versions().await?.iter().any(|(n, _)| n == number) {
            return Err(StorageError::not_found(
                ResourceKind::Version,
                version_path(&self.space, &self.name, number.as_str()),
            ));
        }
        Ok(Arc::new(MemoryVersion {
            inner: self.inner.clone(),
            space: self.space.clone(),
            package: self.name.clone(),
            number: number.clone(),
        }))
    }

    #[instrument(skip(self), fields(backend = "memory", space = %self.space, package = %self.name))]
    async fn version_metadata(&self) -> StorageResult<Vec<Metadata>> {
        self.versions()
            .await?
            .iter()
            .map(|(number, data)| {
                let resource = version_path(&self.space, &self.name, number.as_str());
                derive_metadata(self.inner.codec.as_ref(), &resource, data)
            })
            .collect()
    }
}

struct MemoryVersion {
    inner: Arc<Inner>,
    space: SpaceName,
    package: PackageName,
    number: VersionNumber,
}

impl MemoryVersion {
    fn resource(&self) -> String {
        version_path(&self.space, &self.package, self.number.as_str())
    }
}

#[async_trait]
impl Version for MemoryVersion {
    fn space(&self) -> &SpaceName {
        &self.space
    }

    fn package(&self) -> &PackageName {
        &self.package
    }

    fn number(&self) -> &VersionNumber {
        &self.number
    }

    async fn get_content(&self) -> StorageResult<Bytes> {
        let spaces = self.inner.spaces.read().await;
        spaces
            .get(&self.space)
            .and_then(|packages| packages.get(&self.package))
            .and_then(|versions| versions.iter().find(|(n, _)| *n == self.number))
            .map(|(_, data)| data.clone())
            .ok_or_else(|| StorageError::not_found(ResourceKind::Content, self.resource()))
    }

    #[instrument(
        skip(self, data),
        fields(backend = "memory", version = %self.resource(), size = data.len())
    )]
    async fn put_content(
        &self,
        data: Bytes,
        precondition: Option<ContentHash>,
    ) -> StorageResult<()> {
        let mut spaces = self.inner.spaces.write().await;
        let content = spaces
            .get_mut(&self.space)
            .and_then(|packages| packages.get_mut(&self.package))
            .and_then(|versions| versions.iter_mut().find(|(n, _)| *n == self.number))
            .map(|(_, data)| data)
            .ok_or_else(|| StorageError::not_found(ResourceKind::Content, self.resource()))?;

        if let Some(expected) = precondition
            && ContentHash::compute(content) != expected
        {
            return Err(StorageError::PreconditionFailed(self.resource()));
        }
        *content = data;
        Ok(())
    }

    async fn metadata(&self) -> StorageResult<Metadata> {
        let data = self.get_content().await?;
        derive_metadata(self.inner.codec.as_ref(), &self.resource(), &data)
    }

    async fn values(&self) -> StorageResult<Bytes> {
        let data = self.get_content().await?;
        derive_values(self.inner.codec.as_ref(), &self.resource(), &data)
    }
}
