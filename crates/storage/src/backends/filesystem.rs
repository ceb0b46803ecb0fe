//! Local filesystem storage backend.
//!
//! Layout: `<root>/<space>/<package>/<version>.pkg`. Names are listed in
//! lexicographic order, so "ascending" for this backend means byte order of
//! the identifiers, not semantic-version order.

use crate::error::{StorageError, StorageResult};
use crate::traits::{
    Package, RegistryStore, Space, Version, derive_metadata, derive_values, version_path,
};
use async_trait::async_trait;
use bytes::Bytes;
use pallet_archive::ArchiveCodec;
use pallet_core::{ContentHash, Metadata, PackageName, ResourceKind, SpaceName, VersionNumber};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::instrument;
use uuid::Uuid;

/// File extension of stored archives.
const CONTENT_EXT: &str = ".pkg";

struct Inner {
    root: PathBuf,
    codec: Arc<dyn ArchiveCodec>,
    /// Serializes conditional writes so check-then-rename is atomic in-process.
    write_lock: Mutex<()>,
}

/// Local filesystem registry store.
#[derive(Clone)]
pub struct FilesystemBackend {
    inner: Arc<Inner>,
}

impl FilesystemBackend {
    /// Create a new filesystem backend.
    pub async fn new(root: impl AsRef<Path>, codec: Arc<dyn ArchiveCodec>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self {
            inner: Arc::new(Inner {
                root,
                codec,
                write_lock: Mutex::new(()),
            }),
        })
    }

    /// Root directory of this backend.
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Create a space. Returns `false` if it already existed.
    #[instrument(skip(self), fields(backend = "filesystem"))]
    pub async fn create_space(&self, name: &SpaceName) -> StorageResult<bool> {
        let path = self
            .inner
            .checked_path(PathBuf::from(name.as_str()))
            .await?;
        if is_dir(&path).await? {
            return Ok(false);
        }
        fs::create_dir_all(&path).await?;
        Ok(true)
    }

    /// Store a version, creating its package on first use.
    #[instrument(skip(self, data), fields(backend = "filesystem", size = data.len()))]
    pub async fn put_version(
        &self,
        space: &SpaceName,
        package: &PackageName,
        version: &VersionNumber,
        data: Bytes,
    ) -> StorageResult<()> {
        let space_dir = self
            .inner
            .checked_path(PathBuf::from(space.as_str()))
            .await?;
        if !is_dir(&space_dir).await? {
            return Err(StorageError::not_found(ResourceKind::Space, space.as_str()));
        }
        let path = self
            .inner
            .checked_path(content_path(space, package, version))
            .await?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let _guard = self.inner.write_lock.lock().await;
        write_atomic(&path, &data).await
    }
}

fn content_path(space: &SpaceName, package: &PackageName, version: &VersionNumber) -> PathBuf {
    Path::new(space.as_str())
        .join(package.as_str())
        .join(format!("{version}{CONTENT_EXT}"))
}

async fn is_dir(path: &Path) -> StorageResult<bool> {
    match fs::symlink_metadata(path).await {
        Ok(meta) => Ok(meta.is_dir()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StorageError::Io(e)),
    }
}

async fn is_file(path: &Path) -> StorageResult<bool> {
    match fs::symlink_metadata(path).await {
        Ok(meta) => Ok(meta.is_file()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StorageError::Io(e)),
    }
}

/// Write to a temp file with a unique name, fsync, then rename for atomicity.
async fn write_atomic(path: &Path, data: &[u8]) -> StorageResult<()> {
    let temp_name = format!(".tmp.{}", Uuid::new_v4());
    let temp_path = path.with_file_name(
        path.file_name()
            .map(|n| format!("{}{}", n.to_string_lossy(), temp_name))
            .unwrap_or_else(|| temp_name.clone()),
    );
    {
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
    }
    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e.into());
    }
    Ok(())
}

impl Inner {
    /// Resolve a root-relative path, rejecting anything that escapes the root.
    ///
    /// Runs on the blocking pool since it canonicalizes paths.
    async fn checked_path(&self, relative: PathBuf) -> StorageResult<PathBuf> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || checked_path_sync(&root, &relative))
            .await
            .map_err(|e| {
                StorageError::Io(std::io::Error::other(format!("spawn_blocking failed: {e}")))
            })?
    }

    /// Sorted names of the entries in `dir` accepted by `select`.
    async fn list_names(
        &self,
        dir: &Path,
        select: impl Fn(&std::fs::FileType, &str) -> Option<String>,
    ) -> StorageResult<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            // file_type() does not follow symlinks, so links are never listed.
            let file_type = entry.file_type().await?;
            let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if let Some(name) = select(&file_type, &file_name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    async fn package_names(&self, space: &SpaceName) -> StorageResult<Vec<String>> {
        let dir = self.checked_path(PathBuf::from(space.as_str())).await?;
        if !is_dir(&dir).await? {
            return Err(StorageError::not_found(ResourceKind::Space, space.as_str()));
        }
        self.list_names(&dir, |file_type, name| {
            if !file_type.is_dir() {
                return None;
            }
            match PackageName::new(name) {
                Ok(_) => Some(name.to_string()),
                Err(e) => {
                    tracing::warn!(
                        space = %space,
                        entry = %name,
                        error = %e,
                        "Skipping invalid package directory"
                    );
                    None
                }
            }
        })
        .await
    }

    async fn version_numbers(
        &self,
        space: &SpaceName,
        package: &PackageName,
    ) -> StorageResult<Vec<String>> {
        let dir = self
            .checked_path(Path::new(space.as_str()).join(package.as_str()))
            .await?;
        if !is_dir(&dir).await? {
            return Err(StorageError::not_found(
                ResourceKind::Package,
                format!("{space}/{package}"),
            ));
        }
        self.list_names(&dir, |file_type, name| {
            if !file_type.is_file() {
                return None;
            }
            let number = name.strip_suffix(CONTENT_EXT)?;
            VersionNumber::new(number).ok()?;
            Some(number.to_string())
        })
        .await
    }

    async fn read_content(
        &self,
        space: &SpaceName,
        package: &PackageName,
        number: &VersionNumber,
    ) -> StorageResult<Bytes> {
        let path = self
            .checked_path(content_path(space, package, number))
            .await?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::not_found(
                ResourceKind::Content,
                version_path(space, package, number.as_str()),
            )),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

/// Synchronous path validation with symlink traversal protection.
fn checked_path_sync(root: &Path, relative: &Path) -> StorageResult<PathBuf> {
    for component in relative.components() {
        if !matches!(component, std::path::Component::Normal(_)) {
            return Err(StorageError::InvalidKey(format!(
                "contains unsafe path component: {}",
                relative.display()
            )));
        }
    }

    let path = root.join(relative);
    let root_canonical = root.canonicalize().map_err(|e| {
        StorageError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to canonicalize root: {e}"),
        ))
    })?;

    // Check the path itself if it exists, otherwise its nearest existing
    // ancestor, so that symlinks inside the root cannot point outside it.
    let mut candidate = path.as_path();
    loop {
        match std::fs::symlink_metadata(candidate) {
            Ok(_) => {
                let canonical = candidate.canonicalize().map_err(|_| {
                    StorageError::InvalidKey(format!(
                        "symlink target missing or invalid: {}",
                        relative.display()
                    ))
                })?;
                if !canonical.starts_with(&root_canonical) {
                    return Err(StorageError::InvalidKey(format!(
                        "resolved path escapes storage root: {}",
                        relative.display()
                    )));
                }
                return Ok(path);
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(StorageError::Io(std::io::Error::new(
                    err.kind(),
                    format!("failed to stat path: {err}"),
                )));
            }
        }
        match candidate.parent() {
            Some(parent) => candidate = parent,
            None => return Ok(path),
        }
    }
}

#[async_trait]
impl RegistryStore for FilesystemBackend {
    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn space(&self, name: &SpaceName) -> StorageResult<Arc<dyn Space>> {
        let dir = self
            .inner
            .checked_path(PathBuf::from(name.as_str()))
            .await?;
        if !is_dir(&dir).await? {
            return Err(StorageError::not_found(ResourceKind::Space, name.as_str()));
        }
        Ok(Arc::new(FsSpace {
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
        "filesystem"
    }

    async fn health_check(&self) -> StorageResult<()> {
        if !is_dir(&self.inner.root).await? {
            return Err(StorageError::Config(format!(
                "storage root is not a directory: {}",
                self.inner.root.display()
            )));
        }
        Ok(())
    }
}

struct FsSpace {
    inner: Arc<Inner>,
    name: SpaceName,
}

#[async_trait]
impl Space for FsSpace {
    fn name(&self) -> &SpaceName {
        &self.name
    }

    #[instrument(skip(self), fields(backend = "filesystem", space = %self.name))]
    async fn list(&self) -> StorageResult<Vec<String>> {
        self.inner.package_names(&self.name).await
    }

    async fn package(&self, name: &PackageName) -> StorageResult<Arc<dyn Package>> {
        let dir = self
            .inner
            .checked_path(Path::new(self.name.as_str()).join(name.as_str()))
            .await?;
        if !is_dir(&dir).await? {
            return Err(StorageError::not_found(
                ResourceKind::Package,
                format!("{}/{name}", self.name),
            ));
        }
        Ok(Arc::new(FsPackage {
            inner: self.inner.clone(),
            space: self.name.clone(),
            name: name.clone(),
        }))
    }

    #[instrument(skip(self), fields(backend = "filesystem", space = %self.name))]
    async fn version_metadata(&self) -> StorageResult<Vec<Metadata>> {
        let mut metadata = Vec::new();
        for package in self.inner.package_names(&self.name).await? {
            let package =
                PackageName::new(package).map_err(|e| StorageError::InvalidKey(e.to_string()))?;
            let handle = FsPackage {
                inner: self.inner.clone(),
                space: self.name.clone(),
                name: package,
            };
            metadata.extend(handle.version_metadata().await?);
        }
        Ok(metadata)
    }
}

struct FsPackage {
    inner: Arc<Inner>,
    space: SpaceName,
    name: PackageName,
}

#[async_trait]
impl Package for FsPackage {
    fn space(&self) -> &SpaceName {
        &self.space
    }

    fn name(&self) -> &PackageName {
        &self.name
    }

    #[instrument(
        skip(self),
        fields(backend = "filesystem", space = %self.space, package = %self.name)
    )]
    async fn list(&self) -> StorageResult<Vec<String>> {
        self.inner.version_numbers(&self.space, &self.name).await
    }

    async fn version(&self, number: &VersionNumber) -> StorageResult<Arc<dyn Version>> {
        let path = self
            .inner
            .checked_path(content_path(&self.space, &self.name, number))
            .await?;
        if !is_file(&path).await? {
            return Err(StorageError::not_found(
                ResourceKind::Version,
                version_path(&self.space, &self.name, number.as_str()),
            ));
        }
        Ok(Arc::new(FsVersion {
            inner: self.inner.clone(),
            space: self.space.clone(),
            package: self.name.clone(),
            number: number.clone(),
        }))
    }

    #[instrument(
        skip(self),
        fields(backend = "filesystem", space = %self.space, package = %self.name)
    )]
    async fn version_metadata(&self) -> StorageResult<Vec<Metadata>> {
        let mut metadata = Vec::new();
        for number in self.inner.version_numbers(&self.space, &self.name).await? {
            let number =
                VersionNumber::new(number).map_err(|e| StorageError::InvalidKey(e.to_string()))?;
            let data = self
                .inner
                .read_content(&self.space, &self.name, &number)
                .await?;
            let resource = version_path(&self.space, &self.name, number.as_str());
            metadata.push(derive_metadata(
                self.inner.codec.as_ref(),
                &resource,
                &data,
            )?);
        }
        Ok(metadata)
    }
}

struct FsVersion {
    inner: Arc<Inner>,
    space: SpaceName,
    package: PackageName,
    number: VersionNumber,
}

impl FsVersion {
    fn resource(&self) -> String {
        version_path(&self.space, &self.package, self.number.as_str())
    }
}

#[async_trait]
impl Version for FsVersion {
    fn space(&self) -> &SpaceName {
        &self.space
    }

    fn package(&self) -> &PackageName {
        &self.package
    }

    fn number(&self) -> &VersionNumber {
        &self.number
    }

    #[instrument(skip(self), fields(backend = "filesystem", version = %self.resource()))]
    async fn get_content(&self) -> StorageResult<Bytes> {
        self.inner
            .read_content(&self.space, &self.package, &self.number)
            .await
    }

    #[instrument(
        skip(self, data),
        fields(backend = "filesystem", version = %self.resource(), size = data.len())
    )]
    async fn put_content(
        &self,
        data: Bytes,
        precondition: Option<ContentHash>,
    ) -> StorageResult<()> {
        let path = self
            .inner
            .checked_path(content_path(&self.space, &self.package, &self.number))
            .await?;

        let _guard = self.inner.write_lock.lock().await;
        // The version must still exist; content is replaced, never created here.
        let current = self
            .inner
            .read_content(&self.space, &self.package, &self.number)
            .await?;
        if let Some(expected) = precondition
            && ContentHash::compute(&current) != expected
        {
            return Err(StorageError::PreconditionFailed(self.resource()));
        }
        write_atomic(&path, &data).await
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
