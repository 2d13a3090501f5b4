//! Durable storage of events.
//!
//! The queue itself never touches storage. The coordinator records every
//! state change here so a restarted process can rebuild its queue from the
//! events that were ready or processing.

mod memory;
mod postgres;

pub use memory::MemoryEventStorage;
pub use postgres::PgEventStorage;

use async_trait::async_trait;
use fenceq_sdk::ValidationError;
use fenceq_sdk::event::{ChildEvent, Event, EventId, ProcessingState, StoredChildEvent, StoredEvent};
use thiserror::Error;

/// Errors that can occur while reading or writing stored events.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored record could not be turned back into a value type
    #[error("invalid stored record: {0}")]
    Invalid(#[from] ValidationError),
}

/// Persistence collaborator of the indexing pipeline.
#[async_trait]
pub trait EventStorage: Send + Sync {
    /// Record a new event, assigning its id. The stored event is `UNPROCESSED`.
    async fn store(&self, event: Event) -> Result<StoredEvent, StorageError>;

    async fn get(&self, id: &EventId) -> Result<Option<StoredEvent>, StorageError>;

    /// Events in any of `states`, ordered by timestamp then id, at most `limit`.
    async fn get_by_states(
        &self,
        states: &[ProcessingState],
        limit: usize,
    ) -> Result<Vec<StoredEvent>, StorageError>;

    /// Move an event from `expected` to `new`.
    ///
    /// Returns `false` if the event is missing or not in `expected`.
    async fn set_state(
        &self,
        id: &EventId,
        expected: ProcessingState,
        new: ProcessingState,
        updater: Option<&str>,
    ) -> Result<bool, StorageError>;

    /// Record the terminal outcome of a child event.
    async fn store_child(
        &self,
        child: ChildEvent,
        state: ProcessingState,
        message: Option<String>,
    ) -> Result<StoredChildEvent, StorageError>;
}

/// New time-ordered event id.
pub(crate) fn new_event_id() -> Result<EventId, ValidationError> {
    EventId::new(uuid::Uuid::now_v7().to_string())
}
