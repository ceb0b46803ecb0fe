//! Selection of the "latest" version of a package.

use serde::{Deserialize, Serialize};

/// Policy used to pick the latest version from a backend listing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionOrdering {
    /// Trust the backend: identifiers are listed in ascending order, the last wins.
    #[default]
    Backend,
    /// Compare identifiers as semantic versions. Identifiers that do not parse
    /// rank below every valid version and keep backend order among themselves.
    Semver,
}

/// Pick the latest identifier of a package under `ordering`.
///
/// Fails with [`crate::Error::NotFound`] when the package has no versions.
pub fn latest<S: AsRef<str>>(versions: &[S], ordering: VersionOrdering) -> crate::Result<&str> {
    let picked = match ordering {
        VersionOrdering::Backend => versions.last(),
        // max_by_key keeps the last of equal keys, so backend order breaks ties.
        VersionOrdering::Semver => versions
            .iter()
            .max_by_key(|v| semver::Version::parse(v.as_ref()).ok()),
    };
    picked
        .map(|v| v.as_ref())
        .ok_or_else(|| crate::Error::NotFound("metadata".to_string()))
}
