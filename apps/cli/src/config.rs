//! Layered configuration for the `passio` binary.

use config::{Config, Environment, File};
use passio_logger::LogSettings;
use passio_vault::VaultConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Base name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_NAME: &str = "passio";

/// Prefix of environment overrides, e.g. `PASSIO__VAULT__ITERATIONS=2000`.
pub const ENV_PREFIX: &str = "PASSIO";

/// Everything the binary reads at startup.
///
/// ```toml
/// [vault]
/// iterations = 1000
///
/// [storage]
/// root = "/var/lib/passio"
///
/// [logging]
/// level = "info"
/// directory = "logs"
/// json = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PassioConfig {
    pub vault: VaultConfig,
    pub storage: StorageConfig,
    pub logging: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the `records` namespace.
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { root: PathBuf::from("passio-data") }
    }
}

/// Loads the configuration.
///
/// With `path`, that file must exist. Without it, `passio.toml` (or any format the `config`
/// crate recognizes under the `passio` base name) is read from the working directory when
/// present. `PASSIO__*` environment variables override both, `__` separating nested keys.
///
/// # Errors
/// Fails when an explicit file is missing, a source is malformed, or a value has the wrong
/// type.
pub fn load_config(path: Option<&Path>) -> Result<PassioConfig, config::ConfigError> {
    let file = path.map_or_else(
        || File::with_name(DEFAULT_CONFIG_NAME).required(false),
        |path| File::from(path).required(true),
    );

    Config::builder()
        .add_source(file)
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true))
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn file_values_fill_partial_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("passio.toml");
        let toml = "[vault]\niterations = 2000\n[storage]\nroot = \"/srv/passio\"\n[logging]\njson = true\n";
        fs::write(&path, toml).unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.vault, VaultConfig { iterations: 2000, ..VaultConfig::default() });
        assert_eq!(config.storage.root, PathBuf::from("/srv/passio"));
        assert!(config.logging.json);
        assert!(config.logging.console);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn malformed_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("passio.toml");
        fs::write(&path, "[vault]\niterations = \"many\"\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }
}
