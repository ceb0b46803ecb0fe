use bytes::Bytes;
use pallet_archive::{ArchiveCodec, TarGzCodec};
use pallet_core::{
    ArchiveFile, DecodedArchive, Metadata, PackageName, SpaceName, Values, VersionNumber,
};
use pallet_storage::{FilesystemBackend, MemoryBackend, RegistryStore};
use std::sync::Arc;
use tempfile::TempDir;

/// Encode a minimal archive for `name`/`version`.
#[allow(dead_code)]
pub fn archive_bytes(name: &str, version: &str, values: &str) -> Bytes {
    let mut metadata = Metadata::new(name, version);
    metadata.description = Some(format!("{name} package"));
    TarGzCodec::new()
        .encode(&DecodedArchive::new(
            metadata,
            Values::new(values),
            vec![ArchiveFile {
                path: "payload/README".to_string(),
                data: Bytes::from(format!("{name} {version}")),
            }],
        ))
        .unwrap()
}

#[allow(dead_code)]
pub fn space_name(s: &str) -> SpaceName {
    SpaceName::new(s).unwrap()
}

#[allow(dead_code)]
pub fn package_name(p: &str) -> PackageName {
    PackageName::new(p).unwrap()
}

#[allow(dead_code)]
pub fn version_number(v: &str) -> VersionNumber {
    VersionNumber::new(v).unwrap()
}

/// A backend together with the temp dir it lives in, if any.
#[allow(dead_code)]
pub struct Fixture {
    pub store: Arc<dyn RegistryStore>,
    _dir: Option<TempDir>,
}

/// Space `s1` holds `alpha` (1.0.0, 1.1.0) and `beta` (0.1.0); space `empty` has no packages.
#[allow(dead_code)]
pub async fn populated_backends() -> Vec<Fixture> {
    let codec: Arc<dyn ArchiveCodec> = Arc::new(TarGzCodec::new());
    let layout = [("alpha", "1.0.0"), ("alpha", "1.1.0"), ("beta", "0.1.0")];
    let s1 = space_name("s1");
    let empty = space_name("empty");

    let memory = MemoryBackend::new(codec.clone());
    memory.create_space(&s1).await;
    memory.create_space(&empty).await;
    for (package, version) in layout {
        memory
            .put_version(
                &s1,
                &package_name(package),
                &version_number(version),
                archive_bytes(package, version, "replicas = 1\n"),
            )
            .await
            .unwrap();
    }

    let dir = TempDir::new().unwrap();
    let filesystem = FilesystemBackend::new(dir.path(), codec).await.unwrap();
    filesystem.create_space(&s1).await.unwrap();
    filesystem.create_space(&empty).await.unwrap();
    for (package, version) in layout {
        filesystem
            .put_version(
                &s1,
                &package_name(package),
                &version_number(version),
                archive_bytes(package, version, "replicas = 1\n"),
            )
            .await
            .unwrap();
    }

    vec![
        Fixture {
            store: Arc::new(memory),
            _dir: None,
        },
        Fixture {
            store: Arc::new(filesystem),
            _dir: Some(dir),
        },
    ]
}
