//! Space, package and version identifiers.
//!
//! Names arrive from the transport layer as raw strings. They double as
//! storage keys, so every component is validated before it reaches a backend.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of addressable resource, used in error messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Space,
    Package,
    Version,
    Content,
    Metadata,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Space => "space",
            Self::Package => "package",
            Self::Version => "version",
            Self::Content => "content",
            Self::Metadata => "metadata",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maximum length of a single address component.
pub const MAX_NAME_LEN: usize = 253;

fn validate_component(kind: &'static str, value: &str, allow_plus: bool) -> crate::Result<()> {
    let invalid = |reason: String| crate::Error::InvalidAddress { kind, reason };

    if value.is_empty() {
        return Err(invalid("name cannot be empty".to_string()));
    }
    if value.len() > MAX_NAME_LEN {
        return Err(invalid(format!(
            "name must be at most {MAX_NAME_LEN} chars, got {}",
            value.len()
        )));
    }
    if value.starts_with('.') {
        return Err(invalid(format!("name cannot start with '.': {value}")));
    }
    for c in value.chars() {
        let ok = matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.')
            || (allow_plus && c == '+');
        if !ok {
            return Err(invalid(format!("invalid character in name: {c:?}")));
        }
    }
    Ok(())
}

macro_rules! address_component {
    ($(#[$doc:meta])* $ty:ident, $kind:literal, $allow_plus:expr) => {
        $(#[$doc])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $ty(String);

        impl $ty {
            /// Create from a string, validating format.
            pub fn new(value: impl Into<String>) -> crate::Result<Self> {
                let value = value.into();
                validate_component($kind, &value, $allow_plus)?;
                Ok(Self(value))
            }

            /// Get the name as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $ty {
            type Error = crate::Error;

            fn try_from(value: String) -> crate::Result<Self> {
                Self::new(value)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> String {
                value.0
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($ty), "({})"), self.0)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

address_component!(
    /// Name of a space, the top-level namespace grouping packages.
    SpaceName,
    "space",
    false
);

address_component!(
    /// Name of a package within a space.
    PackageName,
    "package",
    false
);

address_component!(
    /// A version identifier, unique within its package.
    VersionNumber,
    "version",
    true
);
