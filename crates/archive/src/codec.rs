//! Archive codec: opaque package bytes <-> [`DecodedArchive`].
//!
//! The on-disk format is a gzip'd tar whose entries all live under one
//! top-level directory named after the package:
//!
//! ```text
//! <name>/Package.toml   metadata (required)
//! <name>/values.toml    configuration values (optional)
//! <name>/...            payload
//! ```

use crate::error::{ArchiveError, ArchiveResult};
use bytes::Bytes;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use pallet_core::{ArchiveFile, DecodedArchive, Metadata, Values};
use std::io::Read;

/// Metadata entry name inside the package directory.
pub const METADATA_FILE: &str = "Package.toml";

/// Values entry name inside the package directory.
pub const VALUES_FILE: &str = "values.toml";

/// Bidirectional transform between stored bytes and a decoded archive.
///
/// Implementations must satisfy `decode(encode(x)) == x` for every archive
/// they produced through `decode`.
pub trait ArchiveCodec: Send + Sync + 'static {
    /// Decode stored bytes. Any malformation is reported as [`ArchiveError::Corrupt`].
    fn decode(&self, data: &[u8]) -> ArchiveResult<DecodedArchive>;

    /// Encode a decoded archive back into bytes.
    fn encode(&self, archive: &DecodedArchive) -> ArchiveResult<Bytes>;

    /// Short name of the format, used in logs.
    fn format_name(&self) -> &'static str;
}

/// gzip'd tar codec.
#[derive(Clone, Copy, Debug, Default)]
pub struct TarGzCodec;

impl TarGzCodec {
    pub fn new() -> Self {
        Self
    }
}

fn corrupt(e: impl std::fmt::Display) -> ArchiveError {
    ArchiveError::Corrupt(e.to_string())
}

/// Split an entry path into (package directory, relative path).
///
/// Rejects absolute paths, `.`/`..` components and entries that sit directly
/// at the archive root.
fn split_entry_path(path: &str) -> ArchiveResult<(&str, String)> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.starts_with('/') {
        return Err(corrupt(format!("absolute entry path: {path}")));
    }
    let mut parts = trimmed.split('/').filter(|p| !p.is_empty());
    let root = parts
        .next()
        .ok_or_else(|| corrupt(format!("empty entry path: {path:?}")))?;
    let rest: Vec<&str> = parts.collect();
    if rest.is_empty() {
        return Err(corrupt(format!("entry outside package directory: {path}")));
    }
    if root == "." || root == ".." || rest.iter().any(|p| *p == "." || *p == "..") {
        return Err(corrupt(format!("unsafe entry path: {path}")));
    }
    Ok((root, rest.join("/")))
}

impl ArchiveCodec for TarGzCodec {
    fn decode(&self, data: &[u8]) -> ArchiveResult<DecodedArchive> {
        let mut archive = tar::Archive::new(GzDecoder::new(data));
        let mut root: Option<String> = None;
        let mut metadata: Option<Metadata> = None;
        let mut values: Option<Values> = None;
        let mut files = Vec::new();

        for entry in archive.entries().map_err(corrupt)? {
            let mut entry = entry.map_err(corrupt)?;
            let entry_type = entry.header().entry_type();
            if entry_type.is_dir() {
                continue;
            }
            if !entry_type.is_file() {
                return Err(corrupt(format!("unsupported entry type: {entry_type:?}")));
            }

            let path = {
                let raw_path = entry.path_bytes();
                std::str::from_utf8(&raw_path)
                    .map_err(|_| corrupt("entry path is not valid UTF-8"))?
                    .to_string()
            };
            let (dir, relative) = split_entry_path(&path)?;
            match &root {
                Some(existing) if existing != dir => {
                    return Err(corrupt(format!(
                        "entries span multiple package directories: {existing}, {dir}"
                    )));
                }
                Some(_) => {}
                None => root = Some(dir.to_string()),
            }

            let mut buf = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
            entry.read_to_end(&mut buf).map_err(corrupt)?;

            match relative.as_str() {
                METADATA_FILE => {
                    if metadata.is_some() {
                        return Err(corrupt(format!("duplicate {METADATA_FILE}")));
                    }
                    let text = String::from_utf8(buf)
                        .map_err(|_| corrupt(format!("{METADATA_FILE} is not valid UTF-8")))?;
                    let parsed: Metadata = toml::from_str(&text)
                        .map_err(|e| corrupt(format!("invalid {METADATA_FILE}: {e}")))?;
                    metadata = Some(parsed);
                }
                VALUES_FILE => {
                    if values.is_some() {
                        return Err(corrupt(format!("duplicate {VALUES_FILE}")));
                    }
                    let text = String::from_utf8(buf)
                        .map_err(|_| corrupt(format!("{VALUES_FILE} is not valid UTF-8")))?;
                    values = Some(Values::new(text));
                }
                _ => files.push(ArchiveFile {
                    path: relative,
                    data: Bytes::from(buf),
                }),
            }
        }

        let metadata = metadata.ok_or_else(|| corrupt(format!("missing {METADATA_FILE}")))?;
        if metadata.name.is_empty() || metadata.version.is_empty() {
            return Err(corrupt("metadata must carry a name and a version"));
        }

        tracing::trace!(
            name = %metadata.name,
            version = %metadata.version,
            files = files.len(),
            "Decoded archive"
        );
        Ok(DecodedArchive::new(metadata, values.unwrap_or_default(), files))
    }

    fn encode(&self, archive: &DecodedArchive) -> ArchiveResult<Bytes> {
        let root = archive.metadata.name.as_str();
        if root.is_empty() || root.contains('/') || root == "." || root == ".." {
            return Err(ArchiveError::Encode(format!("invalid package name: {root:?}")));
        }

        let metadata = toml::to_string(&archive.metadata)
            .map_err(|e| ArchiveError::Encode(format!("metadata: {e}")))?;

        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        append_file(&mut builder, root, METADATA_FILE, metadata.as_bytes())?;
        if !archive.values.is_empty() {
            append_file(
                &mut builder,
                root,
                VALUES_FILE,
                archive.values.raw.as_bytes(),
            )?;
        }
        for file in archive.files() {
            if file.path == METADATA_FILE || file.path == VALUES_FILE {
                return Err(ArchiveError::Encode(format!(
                    "payload file uses reserved name: {}",
                    file.path
                )));
            }
            append_file(&mut builder, root, &file.path, &file.data)?;
        }

        let encoder = builder.into_inner()?;
        let data = encoder.finish()?;
        tracing::trace!(name = %root, size = data.len(), "Encoded archive");
        Ok(Bytes::from(data))
    }

    fn format_name(&self) -> &'static str {
        "tar+gzip"
    }
}

/// Append a regular file with fixed mode and mtime so encoding is deterministic.
fn append_file<W: std::io::Write>(
    builder: &mut tar::Builder<W>,
    root: &str,
    relative: &str,
    data: &[u8],
) -> ArchiveResult<()> {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    builder.append_data(&mut header, format!("{root}/{relative}"), data)?;
    Ok(())
}
