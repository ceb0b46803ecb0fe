//! Resolution of request addressing into live storage handles.

use crate::context::OpContext;
use crate::error::RegistryResult;
use crate::request::RequestContext;
use pallet_storage::{Package, RegistryStore, Space, Version};
use std::sync::Arc;

/// Resolves space, then package, then version, stopping at the first level
/// that is malformed or missing.
pub struct ResourceResolver<'a> {
    store: &'a dyn RegistryStore,
    ctx: &'a OpContext,
}

impl<'a> ResourceResolver<'a> {
    pub fn new(store: &'a dyn RegistryStore, ctx: &'a OpContext) -> Self {
        Self { store, ctx }
    }

    pub async fn space(&self, req: &RequestContext) -> RegistryResult<Arc<dyn Space>> {
        let name = req.space_name()?;
        self.ctx.guard("get_space", self.store.space(&name)).await
    }

    pub async fn package(&self, req: &RequestContext) -> RegistryResult<Arc<dyn Package>> {
        let space = self.space(req).await?;
        let name = req.package_name()?;
        self.ctx.guard("get_package", space.package(&name)).await
    }

    pub async fn version(&self, req: &RequestContext) -> RegistryResult<Arc<dyn Version>> {
        let package = self.package(req).await?;
        let number = req.version_number()?;
        self.ctx.guard("get_version", package.version(&number)).await
    }
}
