//! Application configuration.
//!
//! Aggregates configuration from all modules into a single Config struct
//! that can be loaded from YAML files or environment variables.

mod cache;
mod server;
mod storage;

pub use cache::{CacheConfig, CacheType};
pub use server::ServerConfig;
pub use storage::{DynamoConfig, MongodbConfig, StorageConfig, StorageType};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "FOLIO_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "FOLIO";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "FOLIO_LOG";
/// Environment variable overriding the default backend directive.
pub const DATABASE_PROVIDER_ENV_VAR: &str = "DATABASE_PROVIDER";

use serde::Deserialize;

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Response cache configuration.
    pub cache: CacheConfig,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `config.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    /// 5. `DATABASE_PROVIDER`, for the default backend only
    pub fn load(path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: Config = config.try_deserialize()?;

        if let Ok(provider) = std::env::var(DATABASE_PROVIDER_ENV_VAR) {
            if !provider.trim().is_empty() {
                config.storage.default_backend = provider.parse()?;
            }
        }

        Ok(config)
    }

    /// Create config for testing: in-memory stores and cache.
    pub fn for_test() -> Self {
        Self {
            storage: StorageConfig::in_memory(),
            ..Self::default()
        }
    }
}
