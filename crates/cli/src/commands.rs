//! Command implementations on top of the registry engine.

use anyhow::{Context, Result};
use bytes::Bytes;
use pallet_archive::{ArchiveCodec, JsonToTomlConverter, TarGzCodec, ValuesConverter};
use pallet_core::config::AppConfig;
use pallet_core::{Metadata, PackageName, SpaceName, VersionNumber};
use pallet_registry::{OpContext, Registry, RegistryError, RequestContext};
use pallet_storage::ConfiguredBackend;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

/// Attach the stable error code to a registry error.
pub fn report(err: RegistryError) -> anyhow::Error {
    anyhow::anyhow!("{err} [{}]", err.code())
}

/// Read a payload from a file, or from stdin when `input` is `-`.
pub async fn read_input(input: &str) -> Result<Bytes> {
    if input == "-" {
        let mut buf = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut buf)
            .await
            .context("failed to read stdin")?;
        return Ok(Bytes::from(buf));
    }
    let data = tokio::fs::read(input)
        .await
        .with_context(|| format!("failed to read {input}"))?;
    Ok(Bytes::from(data))
}

/// Configured backend plus the registry engine over it.
pub struct App {
    backend: ConfiguredBackend,
    registry: Registry,
    codec: Arc<dyn ArchiveCodec>,
    converter: Arc<dyn ValuesConverter>,
}

impl App {
    pub async fn from_config(config: AppConfig) -> Result<Self> {
        let codec: Arc<dyn ArchiveCodec> = Arc::new(TarGzCodec::new());
        let converter: Arc<dyn ValuesConverter> = Arc::new(JsonToTomlConverter::new());
        let backend = pallet_storage::from_config(&config.storage, codec.clone())
            .await
            .context("failed to initialize storage")?;
        let store = backend.store();
        store
            .health_check()
            .await
            .context("storage health check failed")?;
        tracing::debug!(backend = store.backend_name(), "Storage initialized");

        let registry = Registry::new(store, codec.clone(), converter.clone(), config.registry);
        Ok(Self {
            backend,
            registry,
            codec,
            converter,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Store an archive file as the version it declares, creating the space
    /// if needed. The bytes are stored as read.
    pub async fn push(&self, space: &str, archive: &Path) -> Result<Metadata> {
        let space = SpaceName::new(space).context("invalid space name")?;
        let data = tokio::fs::read(archive)
            .await
            .with_context(|| format!("failed to read archive {}", archive.display()))?;
        let decoded = self
            .codec
            .decode(&data)
            .with_context(|| format!("{} is not a valid package archive", archive.display()))?;
        let package = PackageName::new(decoded.metadata.name.as_str())
            .context("archive declares an invalid package name")?;
        let version = VersionNumber::new(decoded.metadata.version.as_str())
            .context("archive declares an invalid version")?;

        if self.backend.create_space(&space).await? {
            tracing::info!(%space, "Created space");
        }
        self.backend
            .put_version(&space, &package, &version, Bytes::from(data))
            .await
            .context("failed to store archive")?;
        tracing::info!(%space, %package, %version, "Pushed package version");
        Ok(pallet_core::project(&decoded))
    }

    /// Fetch values, optionally rendered back into the input format.
    pub async fn values(
        &self,
        ctx: &OpContext,
        req: &RequestContext,
        render: bool,
    ) -> Result<Bytes> {
        let raw = self.registry.fetch_values(ctx, req).await.map_err(report)?;
        if !render {
            return Ok(raw);
        }
        let text = std::str::from_utf8(&raw).context("stored values are not UTF-8")?;
        let rendered = self
            .converter
            .render(text)
            .context("failed to render stored values")?;
        Ok(Bytes::from(rendered))
    }
}
