//! Operations exposed to callers.
//!
//! Each operation takes an [`OpContext`] and the raw [`RequestContext`],
//! resolves the addressed resources and returns either a [`Page`], a single
//! [`Metadata`], raw values bytes, or a [`RegistryError`].

use crate::context::OpContext;
use crate::error::{RegistryError, RegistryResult};
use crate::request::RequestContext;
use crate::resolver::ResourceResolver;
use crate::transaction::{ArchiveMutationTransaction, ReplaceMetadata, ReplaceValues};
use bytes::Bytes;
use pallet_archive::{ArchiveCodec, ValuesConverter};
use pallet_core::config::RegistryConfig;
use pallet_core::{Metadata, PackageName, Page, ResourceKind, VersionNumber, latest};
use pallet_storage::{Package, RegistryStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// The registry engine: a store, the archive codec and the values converter.
#[derive(Clone)]
pub struct Registry {
    store: Arc<dyn RegistryStore>,
    codec: Arc<dyn ArchiveCodec>,
    converter: Arc<dyn ValuesConverter>,
    config: RegistryConfig,
}

impl Registry {
    pub fn new(
        store: Arc<dyn RegistryStore>,
        codec: Arc<dyn ArchiveCodec>,
        converter: Arc<dyn ValuesConverter>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            store,
            codec,
            converter,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn RegistryStore> {
        &self.store
    }

    pub fn codec(&self) -> &Arc<dyn ArchiveCodec> {
        &self.codec
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// A context observing `cancel`, with the configured operation timeout.
    pub fn op_context_with(&self, cancel: CancellationToken) -> OpContext {
        OpContext::with_cancellation(cancel).with_configured_timeout(&self.config)
    }

    fn resolver<'a>(&'a self, ctx: &'a OpContext) -> ResourceResolver<'a> {
        ResourceResolver::new(self.store.as_ref(), ctx)
    }

    fn transaction<'a>(&'a self, ctx: &'a OpContext) -> ArchiveMutationTransaction<'a> {
        ArchiveMutationTransaction::new(self.codec.as_ref(), ctx)
            .optimistic_concurrency(self.config.optimistic_concurrency)
    }

    /// Metadata of every version in a space.
    #[instrument(skip_all, fields(space = ?req.space))]
    pub async fn list_metadata_in_space(
        &self,
        ctx: &OpContext,
        req: &RequestContext,
    ) -> RegistryResult<Page<Metadata>> {
        let paging = req.paging()?;
        let space = self.resolver(ctx).space(req).await?;
        let metadata = ctx
            .guard("space_version_metadata", space.version_metadata())
            .await?;
        Ok(Page::from_listing(metadata, paging))
    }

    /// Metadata of the latest version of every package in a space.
    ///
    /// A package without versions fails the whole listing with `NotFound`.
    #[instrument(skip_all, fields(space = ?req.space))]
    pub async fn list_latest_metadata_in_space(
        &self,
        ctx: &OpContext,
        req: &RequestContext,
    ) -> RegistryResult<Page<Metadata>> {
        let paging = req.paging()?;
        let space = self.resolver(ctx).space(req).await?;
        let names = ctx.guard("list_packages", space.list()).await?;

        let mut metadata = Vec::with_capacity(names.len());
        for name in names {
            let name = PackageName::new(name)?;
            let package = ctx.guard("get_package", space.package(&name)).await?;
            metadata.push(self.latest_metadata(ctx, package.as_ref()).await?);
        }
        Ok(Page::from_listing(metadata, paging))
    }

    /// Metadata of every version of a package.
    #[instrument(skip_all, fields(space = ?req.space, package = ?req.package))]
    pub async fn list_metadata_in_package(
        &self,
        ctx: &OpContext,
        req: &RequestContext,
    ) -> RegistryResult<Page<Metadata>> {
        let paging = req.paging()?;
        let package = self.resolver(ctx).package(req).await?;
        let metadata = ctx
            .guard("package_version_metadata", package.version_metadata())
            .await?;
        Ok(Page::from_listing(metadata, paging))
    }

    /// Metadata of the latest version of a package.
    #[instrument(skip_all, fields(space = ?req.space, package = ?req.package))]
    pub async fn get_latest_metadata_in_package(
        &self,
        ctx: &OpContext,
        req: &RequestContext,
    ) -> RegistryResult<Metadata> {
        let package = self.resolver(ctx).package(req).await?;
        self.latest_metadata(ctx, package.as_ref()).await
    }

    #[instrument(
        skip_all,
        fields(space = ?req.space, package = ?req.package, version = ?req.version)
    )]
    pub async fn fetch_metadata(
        &self,
        ctx: &OpContext,
        req: &RequestContext,
    ) -> RegistryResult<Metadata> {
        let version = self.resolver(ctx).version(req).await?;
        ctx.guard("version_metadata", version.metadata()).await
    }

    /// Replace the descriptive metadata of a version, returning the stored projection.
    #[instrument(
        skip_all,
        fields(space = ?req.space, package = ?req.package, version = ?req.version)
    )]
    pub async fn update_metadata(
        &self,
        ctx: &OpContext,
        req: &RequestContext,
    ) -> RegistryResult<Metadata> {
        let version = self.resolver(ctx).version(req).await?;
        let mutation = ReplaceMetadata::new(req.metadata_body()?);
        self.transaction(ctx).run(version.as_ref(), &mutation).await
    }

    /// Raw values of a version.
    #[instrument(
        skip_all,
        fields(space = ?req.space, package = ?req.package, version = ?req.version)
    )]
    pub async fn fetch_values(
        &self,
        ctx: &OpContext,
        req: &RequestContext,
    ) -> RegistryResult<Bytes> {
        let version = self.resolver(ctx).version(req).await?;
        ctx.guard("version_values", version.values()).await
    }

    /// Replace the values of a version with a converted document, returning
    /// the new raw values.
    #[instrument(
        skip_all,
        fields(space = ?req.space, package = ?req.package, version = ?req.version)
    )]
    pub async fn update_values(
        &self,
        ctx: &OpContext,
        req: &RequestContext,
    ) -> RegistryResult<Bytes> {
        let version = self.resolver(ctx).version(req).await?;
        let mutation = ReplaceValues::from_document(self.converter.as_ref(), req.values_body()?)?;
        self.transaction(ctx).run(version.as_ref(), &mutation).await
    }

    async fn latest_metadata(
        &self,
        ctx: &OpContext,
        package: &dyn Package,
    ) -> RegistryResult<Metadata> {
        let numbers = ctx.guard("list_versions", package.list()).await?;
        let number = latest(&numbers, self.config.version_ordering)
            .map_err(|_| RegistryError::NotFound {
                kind: ResourceKind::Metadata,
                name: format!("{}/{}", package.space(), package.name()),
            })?;
        let number = VersionNumber::new(number)?;
        let version = ctx.guard("get_version", package.version(&number)).await?;
        ctx.guard("version_metadata", version.metadata()).await
    }
}
