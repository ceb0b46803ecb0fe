use bytes::Bytes;
use pallet_archive::{ArchiveCodec, JsonToTomlConverter, TarGzCodec};
use pallet_core::config::RegistryConfig;
use pallet_core::{
    ArchiveFile, DecodedArchive, Metadata, PackageName, SpaceName, Values, VersionNumber,
};
use pallet_registry::{Registry, RegistryResult};
use pallet_storage::{FilesystemBackend, MemoryBackend, RegistryStore};
use std::sync::Arc;
use tempfile::TempDir;

/// Encode an archive whose embedded identity is `name`/`version`.
#[allow(dead_code)]
pub fn archive_bytes(name: &str, version: &str) -> Bytes {
    archive_with_values(name, version, "replicas = 1\n")
}

#[allow(dead_code)]
pub fn archive_with_values(name: &str, version: &str, values: &str) -> Bytes {
    let mut metadata = Metadata::new(name, version);
    metadata.description = Some(format!("{name} {version}"));
    metadata.keywords = vec!["test".to_string()];
    TarGzCodec::new()
        .encode(&DecodedArchive::new(
            metadata,
            Values::new(values),
            vec![ArchiveFile {
                path: "templates/deployment.toml".to_string(),
                data: Bytes::from_static(b"kind = \"Deployment\"\n"),
            }],
        ))
        .unwrap()
}

/// A registry plus the temp dir backing it, if any.
#[allow(dead_code)]
pub struct TestRegistry {
    pub registry: Registry,
    pub memory: Option<MemoryBackend>,
    pub filesystem: Option<FilesystemBackend>,
    _dir: Option<TempDir>,
}

#[allow(dead_code)]
impl TestRegistry {
    /// Store raw bytes as a version, bypassing the codec.
    pub async fn put(&self, space: &str, package: &str, version: &str, data: Bytes) {
        let space = SpaceName::new(space).unwrap();
        let package = PackageName::new(package).unwrap();
        let version = VersionNumber::new(version).unwrap();
        if let Some(memory) = &self.memory {
            memory.create_space(&space).await;
            memory
                .put_version(&space, &package, &version, data)
                .await
                .unwrap();
        } else if let Some(filesystem) = &self.filesystem {
            filesystem.create_space(&space).await.unwrap();
            filesystem
                .put_version(&space, &package, &version, data)
                .await
                .unwrap();
        }
    }

    pub async fn put_archive(&self, space: &str, package: &str, version: &str) {
        self.put(space, package, version, archive_bytes(package, version))
            .await;
    }
}

/// Space `s1` with package `p1` at versions 1.0.0 and 2.0.0.
#[allow(dead_code)]
pub async fn memory_registry() -> TestRegistry {
    registry_with_config(RegistryConfig::default()).await
}

#[allow(dead_code)]
pub async fn registry_with_config(config: RegistryConfig) -> TestRegistry {
    let codec: Arc<dyn ArchiveCodec> = Arc::new(TarGzCodec::new());
    let memory = MemoryBackend::new(codec.clone());
    let store: Arc<dyn RegistryStore> = Arc::new(memory.clone());
    let fixture = TestRegistry {
        registry: Registry::new(store, codec, Arc::new(JsonToTomlConverter::new()), config),
        memory: Some(memory),
        filesystem: None,
        _dir: None,
    };
    fixture.put_archive("s1", "p1", "1.0.0").await;
    fixture.put_archive("s1", "p1", "2.0.0").await;
    fixture
}

/// Same layout as [`memory_registry`], on disk.
#[allow(dead_code)]
pub async fn filesystem_registry(config: RegistryConfig) -> TestRegistry {
    let codec: Arc<dyn ArchiveCodec> = Arc::new(TarGzCodec::new());
    let dir = TempDir::new().unwrap();
    let filesystem = FilesystemBackend::new(dir.path(), codec.clone())
        .await
        .unwrap();
    let store: Arc<dyn RegistryStore> = Arc::new(filesystem.clone());
    let fixture = TestRegistry {
        registry: Registry::new(store, codec, Arc::new(JsonToTomlConverter::new()), config),
        memory: None,
        filesystem: Some(filesystem),
        _dir: Some(dir),
    };
    fixture.put_archive("s1", "p1", "1.0.0").await;
    fixture.put_archive("s1", "p1", "2.0.0").await;
    fixture
}

/// Current stored bytes of a version.
#[allow(dead_code)]
pub async fn stored_content(
    registry: &Registry,
    space: &str,
    package: &str,
    version: &str,
) -> RegistryResult<Bytes> {
    let space = SpaceName::new(space).unwrap();
    let package = PackageName::new(package).unwrap();
    let version = registry
        .store()
        .package(&space, &package)
        .await?
        .version(&VersionNumber::new(version).unwrap())
        .await?;
    Ok(version.get_content().await?)
}
