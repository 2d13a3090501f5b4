use super::id::EventId;
use super::kind::EventCategory;
use super::record::Event;
use super::state::ProcessingState;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Bookkeeping about the last state change of a stored event.
///
/// Queues never read this; it is carried along for the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateInfo {
    pub updated_at: OffsetDateTime,
    /// Free-form note from whoever changed the state.
    pub updater: Option<String>,
}

/// An [`Event`] that has been durably recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    event: Event,
    id: EventId,
    state: ProcessingState,
    update: Option<UpdateInfo>,
}

impl StoredEvent {
    pub fn new(event: Event, id: EventId, state: ProcessingState) -> Self {
        Self {
            event,
            id,
            state,
            update: None,
        }
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn id(&self) -> &EventId {
        &self.id
    }

    pub fn state(&self) -> ProcessingState {
        self.state
    }

    pub fn update(&self) -> Option<&UpdateInfo> {
        self.update.as_ref()
    }

    pub fn category(&self) -> EventCategory {
        self.event.category()
    }

    pub fn timestamp(&self) -> OffsetDateTime {
        self.event.timestamp()
    }

    /// Copy of this event in a different state.
    pub fn with_state(&self, state: ProcessingState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    /// Copy of this event with new update metadata.
    pub fn with_update(&self, update: UpdateInfo) -> Self {
        Self {
            update: Some(update),
            ..self.clone()
        }
    }

    /// Whether `other` refers to the same admitted event.
    ///
    /// Only the core event fields and the id take part; state and update
    /// metadata are ignored. Unlike `==`, two records of one event match here
    /// after either side has moved through the lifecycle.
    pub fn is_same_admission(&self, other: &StoredEvent) -> bool {
        self.id == other.id && self.event == other.event
    }
}
