//! TOML file configuration structures.
//!
//! These structs directly map to the `fenceq.toml` file format. Every
//! section and field may be left out.

use serde::{Deserialize, Serialize};

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub storage: StorageConfig,
    pub coordinator: CoordinatorConfig,
    pub workers: WorkersConfig,
}

/// Where events are stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process storage; nothing survives a restart.
    #[default]
    Memory,
    /// Postgres, reached through `DATABASE_URL`.
    Postgres,
}

/// Storage configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Size of the Postgres connection pool.
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            max_connections: 10,
        }
    }
}

/// Coordinator configuration section. Reloaded on SIGHUP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Milliseconds between polls of storage for new events.
    pub poll_interval_ms: u64,
    /// Upper bound on events held by the queue.
    pub max_queue_size: usize,
    /// Send events left processing by a previous run to the workers again.
    pub redispatch_processing_on_start: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            max_queue_size: 10_000,
            redispatch_processing_on_start: true,
        }
    }
}

/// Worker pool configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    /// Number of index workers.
    pub count: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self { count: 4 }
    }
}
