//! IndexWorker processor.
//!
//! The IndexWorker is responsible for:
//! - Taking one `WorkItem` at a time off the shared work channel
//! - Running the `Indexer` for it
//! - Recording failures as terminal child events
//! - Always answering with a `Completion`, so a failed event never leaves
//!   its scope fenced

use crate::events::{Completion, CompletionSender, SharedWorkReceiver, WorkItem};
use crate::storage::EventStorage;
use async_trait::async_trait;
use fenceq_sdk::event::{ChildEvent, ProcessingState, StoredEvent};
use kanau::processor::Processor;
use std::convert::Infallible;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Why an event could not be indexed.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The object exists but is not something the index holds.
    #[error("object is not indexable: {0}")]
    Unindexable(String),

    /// Indexing was attempted and failed.
    #[error("indexing failed: {0}")]
    Failed(String),
}

/// Extraction and index writing for a single event.
#[async_trait]
pub trait Indexer: Send + Sync {
    async fn index(&self, event: &StoredEvent) -> Result<(), IndexError>;
}

/// IndexWorker runs the indexer for events checked out by the coordinator.
pub struct IndexWorker {
    worker_id: usize,
    indexer: Arc<dyn Indexer>,
    storage: Arc<dyn EventStorage>,
    completion_tx: CompletionSender,
}

impl IndexWorker {
    /// Create a new IndexWorker.
    ///
    /// # Arguments
    ///
    /// * `worker_id` - Number used in logs
    /// * `indexer` - Does the indexing work
    /// * `storage` - Where failure records are written
    /// * `completion_tx` - Sender for completions back to the coordinator
    pub fn new(
        worker_id: usize,
        indexer: Arc<dyn Indexer>,
        storage: Arc<dyn EventStorage>,
        completion_tx: CompletionSender,
    ) -> Self {
        Self {
            worker_id,
            indexer,
            storage,
            completion_tx,
        }
    }

    /// Run the IndexWorker until shutdown or until the work channel closes.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>, work_rx: SharedWorkReceiver) {
        info!(worker_id = self.worker_id, "IndexWorker started");

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!(worker_id = self.worker_id, "IndexWorker received shutdown signal");
                        break;
                    }
                }

                item = async { work_rx.lock().await.recv().await } => {
                    let Some(item) = item else {
                        info!(worker_id = self.worker_id, "Work channel closed");
                        break;
                    };
                    let Ok(completion) = self.process(item).await;
                    if self.completion_tx.send(completion).await.is_err() {
                        warn!(worker_id = self.worker_id, "Completion channel closed");
                        break;
                    }
                }
            }
        }

        info!(worker_id = self.worker_id, "IndexWorker shutdown complete");
    }

    async fn record_failure(&self, event: &StoredEvent, state: ProcessingState, message: String) {
        let child = ChildEvent::new(event.event().clone(), event.id().clone());
        if let Err(e) = self.storage.store_child(child, state, Some(message)).await {
            error!(event_id = %event.id(), error = %e, "Failed to record failed child event");
        }
    }
}

impl Processor<WorkItem> for IndexWorker {
    type Output = Completion;
    type Error = Infallible;

    async fn process(&self, item: WorkItem) -> Result<Completion, Infallible> {
        let event = item.event;
        debug!(worker_id = self.worker_id, event_id = %event.id(), "Indexing event");

        let outcome = match self.indexer.index(&event).await {
            Ok(()) => ProcessingState::Indexed,
            Err(e) => {
                let state = match e {
                    IndexError::Unindexable(_) => ProcessingState::Unindexed,
                    IndexError::Failed(_) => ProcessingState::Failed,
                };
                warn!(
                    worker_id = self.worker_id,
                    event_id = %event.id(),
                    error = %e,
                    "Event was not indexed"
                );
                self.record_failure(&event, state, e.to_string()).await;
                state
            }
        };

        Ok(Completion { event, outcome })
    }
}
