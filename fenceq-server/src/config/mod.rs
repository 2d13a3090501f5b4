//! Configuration module for fenceq-server.
//!
//! Handles loading configuration from the TOML file and environment
//! variables.

pub mod file;

use crate::config::file::{FileConfig, StorageBackend};
use fenceq_core::config::CoordinatorConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Storage settings, fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub max_connections: u32,
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub storage: StorageSettings,
    pub coordinator: CoordinatorConfig,
    pub worker_count: usize,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
        }
    }

    /// Read, parse and validate the configuration file.
    ///
    /// A missing file is not an error; every setting then takes its default.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = match std::fs::read_to_string(&self.config_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    path = %self.config_path.display(),
                    "Config file not found, using defaults"
                );
                String::new()
            }
            Err(e) => return Err(e.into()),
        };
        Self::parse(&config_content)
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn parse(content: &str) -> Result<LoadedConfig, ConfigError> {
        let file_config: FileConfig = toml::from_str(content)?;
        Self::validate(&file_config)?;
        Ok(Self::build_loaded_config(file_config))
    }

    fn validate(config: &FileConfig) -> Result<(), ConfigError> {
        if config.coordinator.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "coordinator.poll_interval_ms must be positive".to_string(),
            ));
        }
        if config.coordinator.max_queue_size == 0 {
            return Err(ConfigError::ValidationError(
                "coordinator.max_queue_size must be positive".to_string(),
            ));
        }
        if config.workers.count == 0 {
            return Err(ConfigError::ValidationError(
                "workers.count must be positive".to_string(),
            ));
        }
        if config.storage.backend == StorageBackend::Postgres && config.storage.max_connections == 0
        {
            return Err(ConfigError::ValidationError(
                "storage.max_connections must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn build_loaded_config(file_config: FileConfig) -> LoadedConfig {
        LoadedConfig {
            storage: StorageSettings {
                backend: file_config.storage.backend,
                max_connections: file_config.storage.max_connections,
            },
            coordinator: CoordinatorConfig {
                poll_interval: Duration::from_millis(file_config.coordinator.poll_interval_ms),
                max_queue_size: file_config.coordinator.max_queue_size,
                redispatch_processing_on_start: file_config
                    .coordinator
                    .redispatch_processing_on_start,
            },
            worker_count: file_config.workers.count,
        }
    }
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_builds_coordinator_config() {
        let loaded = ConfigLoader::parse(
            "[coordinator]\npoll_interval_ms = 50\nmax_queue_size = 7\n\n[workers]\ncount = 3\n",
        )
        .unwrap();
        assert_eq!(loaded.coordinator.poll_interval, Duration::from_millis(50));
        assert_eq!(loaded.coordinator.max_queue_size, 7);
        assert!(loaded.coordinator.redispatch_processing_on_start);
        assert_eq!(loaded.worker_count, 3);
        assert_eq!(loaded.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn test_zero_values_are_rejected() {
        for content in [
            "[coordinator]\npoll_interval_ms = 0\n",
            "[coordinator]\nmax_queue_size = 0\n",
            "[workers]\ncount = 0\n",
            "[storage]\nbackend = \"postgres\"\nmax_connections = 0\n",
        ] {
            assert!(matches!(
                ConfigLoader::parse(content),
                Err(ConfigError::ValidationError(_))
            ));
        }
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let loader = ConfigLoader::new("./does-not-exist/fenceq.toml");
        let loaded = loader.load().unwrap();
        assert_eq!(loaded.coordinator, CoordinatorConfig::default());
        assert_eq!(loaded.worker_count, 4);
    }
}
