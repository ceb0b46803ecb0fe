//! Extraction of addressing, paging and payloads from a request.

use crate::error::{RegistryError, RegistryResult};
use bytes::Bytes;
use pallet_core::{Metadata, PackageName, Paging, SpaceName, VersionNumber};

/// Raw values supplied by the transport for one request.
///
/// Nothing is validated on construction; each accessor parses its field and
/// reports a typed error.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    pub space: Option<String>,
    pub package: Option<String>,
    pub version: Option<String>,
    pub start: Option<String>,
    pub limit: Option<String>,
    pub body: Option<Bytes>,
}

impl RequestContext {
    /// Request addressing a space.
    pub fn new(space: impl Into<String>) -> Self {
        Self {
            space: Some(space.into()),
            ..Default::default()
        }
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set raw `start`/`limit` query values.
    pub fn with_paging(mut self, start: Option<String>, limit: Option<String>) -> Self {
        self.start = start;
        self.limit = limit;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn space_name(&self) -> RegistryResult<SpaceName> {
        Ok(SpaceName::new(required("space", &self.space)?)?)
    }

    pub fn package_name(&self) -> RegistryResult<PackageName> {
        Ok(PackageName::new(required("package", &self.package)?)?)
    }

    pub fn version_number(&self) -> RegistryResult<VersionNumber> {
        Ok(VersionNumber::new(required("version", &self.version)?)?)
    }

    /// Parse `start` and `limit`. Absent or blank values mean "unspecified".
    pub fn paging(&self) -> RegistryResult<Paging> {
        Ok(Paging::new(
            parse_int("start", &self.start)?,
            parse_int("limit", &self.limit)?,
        ))
    }

    /// Decode the body as a JSON metadata record.
    pub fn metadata_body(&self) -> RegistryResult<Metadata> {
        let body = self.body("metadata")?;
        serde_json::from_slice(body)
            .map_err(|e| RegistryError::param_type("metadata", "json", e.to_string()))
    }

    /// The body as an unconverted values document.
    pub fn values_body(&self) -> RegistryResult<&[u8]> {
        self.body("values")
    }

    fn body(&self, param: &'static str) -> RegistryResult<&[u8]> {
        match &self.body {
            Some(body) if !body.is_empty() => Ok(&body[..]),
            _ => Err(RegistryError::param_type(param, "request body", "empty")),
        }
    }
}

fn required<'a>(field: &str, value: &'a Option<String>) -> RegistryResult<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| RegistryError::InvalidAddress(format!("missing {field} name")))
}

fn parse_int(param: &'static str, raw: &Option<String>) -> RegistryResult<Option<i64>> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<i64>()
            .map(Some)
            .map_err(|_| RegistryError::param_type(param, "integer", value)),
    }
}
