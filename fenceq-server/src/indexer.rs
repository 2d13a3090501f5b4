//! Indexer used by the server binary.

use async_trait::async_trait;
use fenceq_core::processors::{IndexError, Indexer};
use fenceq_sdk::event::StoredEvent;

/// Indexer that records each event in the log and succeeds.
///
/// Stands in for a real extractor until one is wired in.
pub struct LoggingIndexer;

#[async_trait]
impl Indexer for LoggingIndexer {
    async fn index(&self, event: &StoredEvent) -> Result<(), IndexError> {
        let inner = event.event();
        tracing::info!(
            event_id = %event.id(),
            event_type = %inner.event_type(),
            storage_code = inner.storage_code(),
            access_group = ?inner.access_group(),
            object_id = ?inner.object_id(),
            version = ?inner.version(),
            "Indexed event"
        );
        Ok(())
    }
}
