//! Runtime settings of the coordinator.
//!
//! Loading and validating the configuration file is the server's job; this
//! module holds the validated values and a store that lets them change
//! while the coordinator runs.

mod config_store;

pub use config_store::{ConfigStore, ConfigWatcher};

use std::time::Duration;

/// Tunables of the [`Coordinator`](crate::processors::Coordinator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// How often new events are pulled from storage.
    pub poll_interval: Duration,
    /// The coordinator stops admitting events once the queue holds this many.
    pub max_queue_size: usize,
    /// Hand events that were processing before a restart to workers again.
    pub redispatch_processing_on_start: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            max_queue_size: 10_000,
            redispatch_processing_on_start: true,
        }
    }
}
