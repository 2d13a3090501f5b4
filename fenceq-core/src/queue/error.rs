use fenceq_sdk::ValidationError;
use fenceq_sdk::event::{EventId, ProcessingState};
use thiserror::Error;

/// Errors returned by queue operations.
///
/// A queue operation that returns an error has not modified the queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Malformed input.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The event is not in a state this entry point accepts.
    #[error("event {id} is {state}, expected {expected}")]
    InvalidState {
        id: EventId,
        state: ProcessingState,
        expected: &'static str,
    },

    /// No matching event is currently processing.
    #[error("no processing event matches {id}")]
    NoSuchEvent { id: EventId },

    /// The event id is already held by the queue.
    #[error("event {id} is already queued")]
    DuplicateEvent { id: EventId },

    /// The event was routed to a queue for a different scope.
    #[error("event {id} does not belong to {scope}")]
    WrongScope { id: EventId, scope: String },
}
