//! Core domain types and shared logic for the pallet package registry.
//!
//! This crate defines the data model used across all other crates:
//! - Space / package / version addressing
//! - Package metadata and the decoded archive representation
//! - Pagination windows over ordered listings
//! - "Latest version" selection
//! - Content hashes used as optimistic-concurrency tokens
//! - Configuration types

pub mod address;
pub mod archive;
pub mod config;
pub mod error;
pub mod hash;
pub mod metadata;
pub mod paging;
pub mod projection;
pub mod version;

pub use address::{PackageName, ResourceKind, SpaceName, VersionNumber};
pub use archive::{ArchiveFile, DecodedArchive, Values};
pub use error::{Error, Result};
pub use hash::ContentHash;
pub use metadata::{IdentityCheck, IdentityField, Maintainer, Metadata};
pub use paging::{Page, Paging, compute_window};
pub use projection::project;
pub use version::{VersionOrdering, latest};
