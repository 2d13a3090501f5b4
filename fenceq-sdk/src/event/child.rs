use super::id::EventId;
use super::record::Event;
use super::state::ProcessingState;
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A single leaf action fanned out from a parent stored event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildEvent {
    event: Event,
    /// Id of the parent; the parent itself is not owned.
    parent_id: EventId,
}

impl ChildEvent {
    pub fn new(event: Event, parent_id: EventId) -> Self {
        Self { event, parent_id }
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn parent_id(&self) -> &EventId {
        &self.parent_id
    }
}

/// A durably recorded [`ChildEvent`]. Only terminal states are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawStoredChildEvent")]
pub struct StoredChildEvent {
    child: ChildEvent,
    id: EventId,
    state: ProcessingState,
    stored_at: OffsetDateTime,
    message: Option<String>,
}

impl StoredChildEvent {
    pub fn new(
        child: ChildEvent,
        id: EventId,
        state: ProcessingState,
        stored_at: OffsetDateTime,
        message: Option<String>,
    ) -> Result<Self, ValidationError> {
        if !state.is_terminal() {
            return Err(ValidationError::NonTerminalChildState(state));
        }
        Ok(Self {
            child,
            id,
            state,
            stored_at,
            message,
        })
    }

    pub fn child(&self) -> &ChildEvent {
        &self.child
    }

    pub fn id(&self) -> &EventId {
        &self.id
    }

    pub fn state(&self) -> ProcessingState {
        self.state
    }

    pub fn stored_at(&self) -> OffsetDateTime {
        self.stored_at
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

#[derive(Deserialize)]
struct RawStoredChildEvent {
    child: ChildEvent,
    id: EventId,
    state: ProcessingState,
    stored_at: OffsetDateTime,
    #[serde(default)]
    message: Option<String>,
}

impl TryFrom<RawStoredChildEvent> for StoredChildEvent {
    type Error = ValidationError;

    fn try_from(raw: RawStoredChildEvent) -> Result<Self, Self::Error> {
        Self::new(raw.child, raw.id, raw.state, raw.stored_at, raw.message)
    }
}
