use crate::event::{EventType, ProcessingState};

/// Errors raised when a value type is built from malformed input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required string argument was empty or whitespace only.
    #[error("{0} cannot be blank")]
    Blank(&'static str),

    /// A field required by the event type was not supplied.
    #[error("{field} is required for {event_type} events")]
    Missing {
        field: &'static str,
        event_type: EventType,
    },

    /// A field was supplied that the event type does not allow.
    #[error("{field} is not allowed for {event_type} events")]
    NotAllowed {
        field: &'static str,
        event_type: EventType,
    },

    /// A child event was given a non-terminal processing state.
    #[error("child events must be in a terminal state, got {0}")]
    NonTerminalChildState(ProcessingState),

    /// A string did not name a known enum variant.
    #[error("unknown {kind}: {value}")]
    Unknown { kind: &'static str, value: String },
}
