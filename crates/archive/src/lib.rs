//! Archive codec and values conversion for pallet.
//!
//! Packages are stored as opaque archives. This crate turns them into a
//! [`pallet_core::DecodedArchive`] and back, and converts caller-supplied
//! configuration values into the archive's internal values format.

pub mod codec;
pub mod convert;
pub mod error;

pub use codec::{ArchiveCodec, TarGzCodec};
pub use convert::{JsonToTomlConverter, ValuesConverter};
pub use error::{ArchiveError, ArchiveResult, ConversionError};
