//! Engine configuration.
//!
//! Configuration is resolved in three layers: built-in defaults, an optional
//! JSON file named by `KEYSHOP_CONFIG`, then individual `KEYSHOP_*`
//! environment variables.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Environment variable naming an optional JSON config file.
pub const CONFIG_FILE_ENV: &str = "KEYSHOP_CONFIG";

/// Which storage backend to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// In-process storage; state is lost on shutdown.
    Memory,
    /// Durable `RocksDB` storage under `data_dir`.
    #[default]
    Rocksdb,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "rocksdb" => Ok(Self::Rocksdb),
            other => Err(ConfigError::InvalidValue {
                name: "backend",
                value: other.to_string(),
            }),
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid JSON for this structure.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// File that was parsed.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// A setting has an unusable value.
    #[error("invalid value for {name}: {value}")]
    InvalidValue {
        /// Setting name.
        name: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopConfig {
    /// Path to the `RocksDB` data directory (default: "data/keyshop").
    pub data_dir: PathBuf,

    /// Storage backend (default: rocksdb).
    pub backend: StorageBackend,

    /// Fsync every write (default: true).
    pub sync_writes: bool,

    /// Largest quantity accepted by one purchase (default: 10).
    pub max_quantity_per_purchase: u32,

    /// History page size when the caller gives none (default: 10).
    pub default_history_limit: usize,

    /// Upper bound on a history page (default: 100).
    pub max_history_limit: usize,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/keyshop"),
            backend: StorageBackend::default(),
            sync_writes: true,
            max_quantity_per_purchase: 10,
            default_history_limit: 10,
            max_history_limit: 100,
        }
    }
}

impl ShopConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An in-memory configuration, mainly for tests.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default().with_backend(StorageBackend::Memory)
    }

    /// Set the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Set the storage backend.
    #[must_use]
    pub fn with_backend(mut self, backend: StorageBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Set whether writes are fsynced.
    #[must_use]
    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    /// Set the per-purchase quantity cap.
    #[must_use]
    pub fn with_max_quantity_per_purchase(mut self, max: u32) -> Self {
        self.max_quantity_per_purchase = max;
        self
    }

    /// Set the history page bounds.
    #[must_use]
    pub fn with_history_limits(mut self, default: usize, max: usize) -> Self {
        self.default_history_limit = default;
        self.max_history_limit = max;
        self
    }

    /// Load configuration from `KEYSHOP_CONFIG` (if set) and `KEYSHOP_*` variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or if any
    /// setting is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_FILE_ENV) {
            Ok(path) => {
                tracing::info!(path = %path, "Loading keyshop config file");
                Self::from_file(path)?
            }
            Err(_) => {
                tracing::debug!("No config file set, using defaults");
                Self::default()
            }
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `KEYSHOP_*` overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` for a variable that does not parse.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("KEYSHOP_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(backend) = lookup("KEYSHOP_BACKEND") {
            self.backend = backend.parse()?;
        }
        if let Some(sync) = lookup("KEYSHOP_SYNC_WRITES") {
            self.sync_writes = parse_var("sync_writes", &sync)?;
        }
        if let Some(max) = lookup("KEYSHOP_MAX_QUANTITY") {
            self.max_quantity_per_purchase = parse_var("max_quantity_per_purchase", &max)?;
        }
        if let Some(limit) = lookup("KEYSHOP_HISTORY_LIMIT") {
            self.default_history_limit = parse_var("default_history_limit", &limit)?;
        }
        if let Some(limit) = lookup("KEYSHOP_MAX_HISTORY_LIMIT") {
            self.max_history_limit = parse_var("max_history_limit", &limit)?;
        }
        Ok(())
    }

    /// Check that the settings are usable together.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` naming the first bad setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_quantity_per_purchase == 0 {
            return Err(ConfigError::InvalidValue {
                name: "max_quantity_per_purchase",
                value: "0".into(),
            });
        }
        if self.max_history_limit == 0 {
            return Err(ConfigError::InvalidValue {
                name: "max_history_limit",
                value: "0".into(),
            });
        }
        if self.default_history_limit == 0 || self.default_history_limit > self.max_history_limit
        {
            return Err(ConfigError::InvalidValue {
                name: "default_history_limit",
                value: self.default_history_limit.to_string(),
            });
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let config = ShopConfig::default();
        assert_eq!(config.max_quantity_per_purchase, 10);
        assert_eq!(config.backend, StorageBackend::Rocksdb);
        config.validate().unwrap();
    }

    #[test]
    fn overrides_apply() {
        let vars: HashMap<&str, &str> = [
            ("KEYSHOP_BACKEND", "memory"),
            ("KEYSHOP_MAX_QUANTITY", "25"),
            ("KEYSHOP_SYNC_WRITES", "false"),
            ("KEYSHOP_DATA_DIR", "/var/lib/keyshop"),
        ]
        .into_iter()
        .collect();

        let mut config = ShopConfig::default();
        config
            .apply_overrides(|name| vars.get(name).map(|v| (*v).to_string()))
            .unwrap();

        assert_eq!(config.backend, StorageBackend::Memory);
        assert_eq!(config.max_quantity_per_purchase, 25);
        assert!(!config.sync_writes);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/keyshop"));
    }

    #[test]
    fn bad_override_is_reported() {
        let mut config = ShopConfig::default();
        let err = config
            .apply_overrides(|name| (name == "KEYSHOP_MAX_QUANTITY").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                name: "max_quantity_per_purchase",
                ..
            }
        ));
    }

    #[test]
    fn validate_rejects_inconsistent_limits() {
        let config = ShopConfig::default().with_history_limits(200, 100);
        assert!(config.validate().is_err());
        let config = ShopConfig::default().with_max_quantity_per_purchase(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_file_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("keyshop.json");
        std::fs::write(&path, r#"{ "backend": "memory", "max_history_limit": 50 }"#).unwrap();

        let config = ShopConfig::from_file(&path).unwrap();
        assert_eq!(config.backend, StorageBackend::Memory);
        assert_eq!(config.max_history_limit, 50);
        assert_eq!(config.max_quantity_per_purchase, 10);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ShopConfig::from_file("/nonexistent/keyshop.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
