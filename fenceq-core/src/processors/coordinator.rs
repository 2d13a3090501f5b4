//! Coordinator processor.
//!
//! The Coordinator is responsible for:
//! - Rebuilding the event queue from storage on startup
//! - Pulling unprocessed events from storage into the queue on every tick
//! - Recording `READY` and `PROCESSING` in storage as events move through
//!   the queue
//! - Sending each checked-out event to the workers
//! - Recording completions and releasing the events they unblock
//!
//! The queue is owned by the coordinator task alone, so no lock guards it.

use crate::config::{ConfigWatcher, CoordinatorConfig};
use crate::events::{Completion, CompletionReceiver, WorkItem, WorkSender};
use crate::queue::{EventQueue, QueueError};
use crate::storage::{EventStorage, StorageError};
use fenceq_sdk::event::{ProcessingState, StoredEvent};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Name recorded as the updater of state changes made by the coordinator.
const UPDATER: &str = "coordinator";

/// Errors that can occur while coordinating.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Storage error
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Queue rejected an operation
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// Every worker has gone away
    #[error("work channel closed")]
    WorkersGone,
}

/// Coordinator decides when stored events are handed to workers.
pub struct Coordinator {
    storage: Arc<dyn EventStorage>,
    queue: EventQueue,
    work_tx: WorkSender,
    config: CoordinatorConfig,
}

impl Coordinator {
    /// Rebuild the queue from the events storage lists as ready or
    /// processing.
    ///
    /// If `redispatch_processing_on_start` is set, events that were
    /// processing are sent to the workers again, since whoever was
    /// processing them is gone.
    pub async fn start(
        storage: Arc<dyn EventStorage>,
        work_tx: WorkSender,
        config: CoordinatorConfig,
    ) -> Result<Self, CoordinatorError> {
        let in_flight = storage
            .get_by_states(
                &[ProcessingState::Ready, ProcessingState::Processing],
                usize::MAX,
            )
            .await?;
        let queue = EventQueue::from_events(in_flight)?;
        info!(
            ready = queue.ready_for_processing().len(),
            processing = queue.processing().len(),
            "Coordinator rebuilt event queue"
        );

        let coordinator = Self {
            storage,
            queue,
            work_tx,
            config,
        };
        if coordinator.config.redispatch_processing_on_start {
            for event in coordinator.queue.processing() {
                warn!(event_id = %event.id(), "Redispatching event left processing");
                coordinator.send(event)?;
            }
        }
        Ok(coordinator)
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// Run the Coordinator until shutdown is signaled or the workers go away.
    pub async fn run(
        mut self,
        mut shutdown_rx: watch::Receiver<bool>,
        mut completion_rx: CompletionReceiver,
        mut config_watcher: ConfigWatcher<CoordinatorConfig>,
    ) {
        info!("Coordinator started");
        let mut ticker = Self::ticker(&self.config);

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Coordinator received shutdown signal");
                        break;
                    }
                }

                Ok(()) = config_watcher.changed() => {
                    self.config = config_watcher.current();
                    ticker = Self::ticker(&self.config);
                    info!(
                        poll_interval_ms = self.config.poll_interval.as_millis(),
                        max_queue_size = self.config.max_queue_size,
                        "Coordinator reloaded config"
                    );
                }

                Some(completion) = completion_rx.recv() => {
                    match self.complete(completion).await {
                        Ok(_) => {}
                        Err(CoordinatorError::WorkersGone) => break,
                        Err(e) => error!(error = %e, "Failed to record completion"),
                    }
                }

                _ = ticker.tick() => {
                    match self.poll().await {
                        Ok(_) => {}
                        Err(CoordinatorError::WorkersGone) => break,
                        Err(e) => error!(error = %e, "Failed to poll for events"),
                    }
                }
            }
        }

        info!(size = self.queue.size(), "Coordinator shutdown complete");
    }

    /// Admit unprocessed events from storage and dispatch whatever may run.
    ///
    /// Returns the number of events sent to workers.
    pub async fn poll(&mut self) -> Result<usize, CoordinatorError> {
        let room = self
            .config
            .max_queue_size
            .saturating_sub(self.queue.size());
        if room > 0 {
            // The oldest unprocessed events may already be queued, so look
            // past them.
            let candidates = self
                .storage
                .get_by_states(&[ProcessingState::Unprocessed], self.config.max_queue_size)
                .await?;
            let mut admitted = 0;
            for event in candidates {
                if admitted == room {
                    break;
                }
                if self.queue.contains(event.id()) {
                    continue;
                }
                let id = event.id().clone();
                match self.queue.load(event) {
                    Ok(()) => admitted += 1,
                    Err(e) => warn!(event_id = %id, error = %e, "Skipping event"),
                }
            }
            if admitted > 0 {
                debug!(admitted, "Admitted events from storage");
            }
        }

        let promoted = self.queue.move_to_ready();
        self.mark(&promoted, &[ProcessingState::Unprocessed], ProcessingState::Ready).await;
        self.check_out().await
    }

    /// Record a worker's completion and dispatch the events it unblocked.
    ///
    /// The queue releases the event even if storage cannot be updated, so a
    /// storage outage never leaves a scope fenced.
    ///
    /// Returns the number of events sent to workers.
    pub async fn complete(&mut self, completion: Completion) -> Result<usize, CoordinatorError> {
        let Completion { event, outcome } = completion;
        // Earlier writes for this event may have failed, so storage can
        // still hold any of the in-queue states.
        self.mark(
            std::slice::from_ref(&event),
            &[
                ProcessingState::Processing,
                ProcessingState::Ready,
                ProcessingState::Unprocessed,
            ],
            outcome,
        )
        .await;

        let released = self.queue.set_processing_complete(&event)?;
        info!(
            event_id = %event.id(),
            %outcome,
            released = released.len(),
            "Event completed"
        );
        self.mark(&released, &[ProcessingState::Unprocessed], ProcessingState::Ready).await;
        self.check_out().await
    }

    /// Check out every ready event and send it to the workers.
    ///
    /// Events are sent even when storage cannot record them as processing;
    /// the queue has already moved them.
    async fn check_out(&mut self) -> Result<usize, CoordinatorError> {
        let batch = self.queue.move_ready_to_processing();
        self.mark(
            &batch,
            &[ProcessingState::Ready, ProcessingState::Unprocessed],
            ProcessingState::Processing,
        )
        .await;
        let count = batch.len();
        for event in batch {
            self.send(event)?;
        }
        Ok(count)
    }

    /// Record `to` in storage for each event, accepting any state in `from`.
    ///
    /// Failures are logged per event and never interrupt the batch.
    async fn mark(&self, events: &[StoredEvent], from: &[ProcessingState], to: ProcessingState) {
        'events: for event in events {
            for &expected in from {
                match self
                    .storage
                    .set_state(event.id(), expected, to, Some(UPDATER))
                    .await
                {
                    Ok(true) => continue 'events,
                    Ok(false) => {}
                    Err(e) => {
                        error!(
                            event_id = %event.id(),
                            %to,
                            error = %e,
                            "Failed to record event state"
                        );
                        continue 'events;
                    }
                }
            }
            warn!(event_id = %event.id(), %to, "Stored event state did not match");
        }
    }

    fn send(&self, event: StoredEvent) -> Result<(), CoordinatorError> {
        debug!(event_id = %event.id(), "Dispatching event");
        self.work_tx
            .send(WorkItem { event })
            .map_err(|_| CoordinatorError::WorkersGone)
    }

    fn ticker(config: &CoordinatorConfig) -> tokio::time::Interval {
        // `interval` panics on a zero period.
        let period = config.poll_interval.max(std::time::Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }
}
