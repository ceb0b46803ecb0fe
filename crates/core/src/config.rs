//! Configuration types shared across crates.

use crate::version::VersionOrdering;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
}

impl AppConfig {
    /// Validate all sections.
    pub fn validate(&self) -> Result<(), String> {
        self.storage.validate()?;
        self.registry.validate()
    }
}

/// Storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory for storage.
        path: PathBuf,
    },
    /// Process-local storage, lost on exit.
    Memory,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/packages"),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            StorageConfig::Filesystem { path } if path.as_os_str().is_empty() => {
                Err("filesystem storage requires a non-empty 'path'".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// Behaviour of the resolution and mutation engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// How the latest version of a package is chosen.
    #[serde(default)]
    pub version_ordering: VersionOrdering,
    /// Reject a write when the stored content changed since it was read
    /// (default: true). Disabling restores last-writer-wins.
    #[serde(default = "default_optimistic_concurrency")]
    pub optimistic_concurrency: bool,
    /// Deadline applied to each operation, in seconds (default: none).
    #[serde(default)]
    pub operation_timeout_secs: Option<u64>,
}

fn default_optimistic_concurrency() -> bool {
    true
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            version_ordering: VersionOrdering::default(),
            optimistic_concurrency: default_optimistic_concurrency(),
            operation_timeout_secs: None,
        }
    }
}

impl RegistryConfig {
    /// Get the operation timeout as a Duration.
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_secs.map(Duration::from_secs)
    }

    /// Validate registry configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.operation_timeout_secs == Some(0) {
            return Err("operation_timeout_secs must be greater than zero".to_string());
        }
        Ok(())
    }
}
