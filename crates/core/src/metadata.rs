//! Package metadata embedded in every archive.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A package maintainer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maintainer {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Descriptive metadata of one package version.
///
/// `name` and `version` are the identity of the archive; every other field is
/// descriptive and replaced wholesale on update.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    // Arrays of tables must come after plain values when serialized as TOML.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maintainers: Vec<Maintainer>,
}

impl Metadata {
    /// Create metadata carrying only an identity.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    /// Compare the identity of `candidate` against this metadata.
    ///
    /// `self` is the authoritative side: mismatches report its values as
    /// `expected`. Name is checked before version.
    pub fn check_identity(&self, candidate: &Metadata) -> IdentityCheck {
        self.check_identity_parts(&candidate.name, &candidate.version)
    }

    /// Compare this metadata's identity against a bare name/version pair.
    pub fn check_identity_parts(&self, name: &str, version: &str) -> IdentityCheck {
        if self.name != name {
            return IdentityCheck::Mismatch {
                field: IdentityField::Name,
                expected: self.name.clone(),
                actual: name.to_string(),
            };
        }
        if self.version != version {
            return IdentityCheck::Mismatch {
                field: IdentityField::Version,
                expected: self.version.clone(),
                actual: version.to_string(),
            };
        }
        IdentityCheck::Match
    }
}

/// Identity fields of an archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentityField {
    Name,
    Version,
}

impl IdentityField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Version => "version",
        }
    }
}

impl fmt::Display for IdentityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an identity comparison.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdentityCheck {
    Match,
    Mismatch {
        field: IdentityField,
        expected: String,
        actual: String,
    },
}

impl IdentityCheck {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }
}
