//! Configuration loading for palletctl.

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use pallet_core::config::AppConfig;
use std::path::Path;

/// Environment variable prefix; nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "PALLET_";

/// Load configuration from an optional TOML file overlaid with `PALLET_*`
/// environment variables. Without either, defaults apply.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::new();

    match path {
        Some(path) if path.exists() => {
            tracing::debug!(config_path = %path.display(), "Loading configuration from file");
            figment = figment.merge(Toml::file(path));
        }
        Some(path) => {
            anyhow::bail!("config file not found: {}", path.display());
        }
        None => tracing::debug!("No config file given, using defaults and environment"),
    }

    let config: AppConfig = figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .context("failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use pallet_core::VersionOrdering;
    use pallet_core::config::StorageConfig;

    #[test]
    fn file_and_env_are_merged() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "pallet.toml",
                r#"
                [storage]
                type = "filesystem"
                path = "/srv/pallet"

                [registry]
                version_ordering = "semver"
                "#,
            )?;
            jail.set_env("PALLET_REGISTRY__OPERATION_TIMEOUT_SECS", "15");

            let config = load_config(Some(Path::new("pallet.toml"))).map_err(|e| e.to_string())?;
            assert!(matches!(
                config.storage,
                StorageConfig::Filesystem { ref path } if path == Path::new("/srv/pallet")
            ));
            assert_eq!(config.registry.version_ordering, VersionOrdering::Semver);
            assert_eq!(config.registry.operation_timeout_secs, Some(15));
            Ok(())
        });
    }

    #[test]
    fn env_alone_selects_memory_backend() {
        Jail::expect_with(|jail| {
            jail.set_env("PALLET_STORAGE__TYPE", "memory");
            let config = load_config(None).map_err(|e| e.to_string())?;
            assert!(matches!(config.storage, StorageConfig::Memory));
            Ok(())
        });
    }

    #[test]
    fn missing_file_is_an_error() {
        Jail::expect_with(|_| {
            assert!(load_config(Some(Path::new("nope.toml"))).is_err());
            Ok(())
        });
    }

    #[test]
    fn invalid_values_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("PALLET_REGISTRY__OPERATION_TIMEOUT_SECS", "0");
            assert!(load_config(None).is_err());
            Ok(())
        });
    }
}
