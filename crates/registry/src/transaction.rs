//! Read-decode-validate-mutate-encode-write cycles over stored archives.
//!
//! A transaction never writes unless every earlier step succeeded, and the
//! archive identity (name, version) must equal the addressed version both
//! before and after the mutation.

use crate::context::OpContext;
use crate::error::{RegistryError, RegistryResult};
use bytes::Bytes;
use pallet_archive::{ArchiveCodec, ValuesConverter};
use pallet_core::{ContentHash, DecodedArchive, IdentityCheck, Metadata, Values, project};
use pallet_storage::Version;
use pallet_storage::traits::version_path;
use tracing::{debug, info, warn};

const ARCHIVE_KIND: &str = "package archive";

/// A change applied in place to a decoded archive.
pub trait Mutation: Send + Sync {
    type Output;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Validate against the current archive and apply. On error the archive
    /// must be left as it was.
    fn apply(&self, archive: &mut DecodedArchive) -> RegistryResult<()>;

    /// Result reported to the caller once the new content is persisted.
    fn output(&self, archive: &DecodedArchive) -> Self::Output;
}

/// Replace every descriptive metadata field; the identity must not change.
#[derive(Clone, Debug)]
pub struct ReplaceMetadata {
    candidate: Metadata,
}

impl ReplaceMetadata {
    pub fn new(candidate: Metadata) -> Self {
        Self { candidate }
    }
}

impl Mutation for ReplaceMetadata {
    type Output = Metadata;

    fn name(&self) -> &'static str {
        "replace_metadata"
    }

    fn apply(&self, archive: &mut DecodedArchive) -> RegistryResult<()> {
        if let IdentityCheck::Mismatch {
            field,
            expected,
            actual,
        } = archive.metadata.check_identity(&self.candidate)
        {
            debug!(%field, %expected, %actual, "Rejecting metadata that changes archive identity");
            return Err(RegistryError::ParamValue {
                field: field.to_string(),
                expected,
                actual,
            });
        }
        archive.metadata = self.candidate.clone();
        Ok(())
    }

    fn output(&self, archive: &DecodedArchive) -> Metadata {
        project(archive)
    }
}

/// Replace the raw configuration values.
#[derive(Clone, Debug)]
pub struct ReplaceValues {
    raw: String,
}

impl ReplaceValues {
    /// Convert a caller-supplied document into archive values.
    pub fn from_document(converter: &dyn ValuesConverter, document: &[u8]) -> RegistryResult<Self> {
        let raw = converter.convert(document).map_err(|e| {
            debug!(error = %e, "Rejecting values document");
            RegistryError::param_type("values", converter.source_format(), e.reason)
        })?;
        Ok(Self { raw })
    }

    /// Values already in the archive's raw format.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }
}

impl Mutation for ReplaceValues {
    type Output = Bytes;

    fn name(&self) -> &'static str {
        "replace_values"
    }

    fn apply(&self, archive: &mut DecodedArchive) -> RegistryResult<()> {
        archive.values = Values::new(self.raw.clone());
        Ok(())
    }

    fn output(&self, _archive: &DecodedArchive) -> Bytes {
        Bytes::from(self.raw.clone())
    }
}

/// Runs mutations against the content of one version.
pub struct ArchiveMutationTransaction<'a> {
    codec: &'a dyn ArchiveCodec,
    ctx: &'a OpContext,
    optimistic_concurrency: bool,
}

impl<'a> ArchiveMutationTransaction<'a> {
    pub fn new(codec: &'a dyn ArchiveCodec, ctx: &'a OpContext) -> Self {
        Self {
            codec,
            ctx,
            optimistic_concurrency: true,
        }
    }

    /// When enabled (the default), the write only lands if the stored content
    /// is still the content that was read.
    pub fn optimistic_concurrency(mut self, enabled: bool) -> Self {
        self.optimistic_concurrency = enabled;
        self
    }

    pub async fn run<M: Mutation>(
        &self,
        version: &dyn Version,
        mutation: &M,
    ) -> RegistryResult<M::Output> {
        let resource = version_path(
            version.space(),
            version.package(),
            version.number().as_str(),
        );

        let current = self
            .ctx
            .guard("get_content", version.get_content())
            .await
            .inspect_err(|e| warn!(%resource, error = %e, "Failed to read version content"))?;

        let mut archive = self.codec.decode(&current).map_err(|e| {
            warn!(
                %resource,
                format = self.codec.format_name(),
                error = %e,
                "Stored content is not a valid archive"
            );
            RegistryError::InternalType {
                resource: resource.clone(),
                expected: ARCHIVE_KIND.to_string(),
                detail: e.to_string(),
            }
        })?;
        verify_identity(&archive, version, &resource)?;

        mutation.apply(&mut archive)?;
        if let IdentityCheck::Mismatch {
            field,
            expected,
            actual,
        } = identity_of(&archive, version)
        {
            return Err(RegistryError::ParamValue {
                field: field.to_string(),
                expected,
                actual,
            });
        }

        let encoded = self.codec.encode(&archive)?;
        let precondition = self
            .optimistic_concurrency
            .then(|| ContentHash::compute(&current));
        self.ctx
            .guard("put_content", version.put_content(encoded, precondition))
            .await
            .inspect_err(|e| {
                warn!(%resource, ?precondition, error = %e, "Failed to write version content");
            })?;

        info!(%resource, mutation = mutation.name(), "Committed archive mutation");
        Ok(mutation.output(&archive))
    }
}

/// Identity of the addressed version compared against the archive's.
fn identity_of(archive: &DecodedArchive, version: &dyn Version) -> IdentityCheck {
    Metadata::new(version.package().as_str(), version.number().as_str())
        .check_identity(&archive.metadata)
}

fn verify_identity(
    archive: &DecodedArchive,
    version: &dyn Version,
    resource: &str,
) -> RegistryResult<()> {
    match identity_of(archive, version) {
        IdentityCheck::Match => Ok(()),
        IdentityCheck::Mismatch {
            field,
            expected,
            actual,
        } => {
            warn!(
                %resource,
                %field,
                %expected,
                %actual,
                "Stored archive identity does not match its version"
            );
            Err(RegistryError::InternalType {
                resource: resource.to_string(),
                expected: ARCHIVE_KIND.to_string(),
                detail: format!("embedded {field} is {actual:?}, expected {expected:?}"),
            })
        }
    }
}
