use fenceq_sdk::event::{ProcessingState, StoredEvent};

/// An event checked out for exactly one worker.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub event: StoredEvent,
}

/// A worker's report that it is done with an event.
#[derive(Debug, Clone)]
pub struct Completion {
    /// The event as it was handed to the worker.
    pub event: StoredEvent,
    /// Terminal state to record for the event.
    pub outcome: ProcessingState,
}
