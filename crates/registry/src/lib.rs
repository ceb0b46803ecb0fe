//! Resolution and mutation engine of the pallet package registry.
//!
//! This crate provides:
//! - Request extraction: addressing, paging and payloads from raw transport values
//! - Space → package → version resolution through a [`pallet_storage::RegistryStore`]
//! - Read-decode-validate-mutate-encode-write transactions over stored archives
//! - The caller-facing operations in [`Registry`]
//! - Cancellation and deadlines for every storage call

pub mod context;
pub mod error;
pub mod handlers;
pub mod request;
pub mod resolver;
pub mod transaction;

pub use context::OpContext;
pub use error::{RegistryError, RegistryResult};
pub use handlers::Registry;
pub use request::RequestContext;
pub use resolver::ResourceResolver;
pub use transaction::{ArchiveMutationTransaction, Mutation, ReplaceMetadata, ReplaceValues};
