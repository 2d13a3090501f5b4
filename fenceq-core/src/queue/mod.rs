//! Event admission and ordering.
//!
//! Three queues nest inside each other:
//!
//! 1. [`EventQueue`] holds one [`AccessGroupQueue`] per access group.
//! 2. [`AccessGroupQueue`] holds a chain of group-wide events and one
//!    [`ObjectQueue`] per object.
//! 3. [`ObjectQueue`] fences whole-object events against version events.
//!
//! Events move `UNPROCESSED -> READY -> PROCESSING` and leave the queue when
//! the worker reports completion. An event is promoted to `READY` only when
//! every earlier event in its scope that could conflict with it has
//! completed. Access groups never block each other.
//!
//! Events are ordered by timestamp, ties broken by event id.
//!
//! None of the queues lock internally. The owner must serialize calls.

pub mod access_group;
mod error;
pub mod event_queue;
mod lanes;
pub mod object;

pub use access_group::AccessGroupQueue;
pub use error::QueueError;
pub use event_queue::EventQueue;
pub use object::ObjectQueue;

use fenceq_sdk::event::{Event, EventId, StoredEvent};
use time::OffsetDateTime;

/// Total order of events inside a queue.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct QueueKey {
    timestamp: OffsetDateTime,
    id: EventId,
}

impl QueueKey {
    pub(crate) fn of(event: &StoredEvent) -> Self {
        Self {
            timestamp: event.timestamp(),
            id: event.id().clone(),
        }
    }
}

/// Key of an access-group queue inside an [`EventQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    /// Events that carry no access group.
    Ungrouped,
    Group(i64),
}

impl GroupKey {
    pub fn of(event: &Event) -> Self {
        match event.access_group() {
            Some(group) => GroupKey::Group(group),
            None => GroupKey::Ungrouped,
        }
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupKey::Ungrouped => write!(f, "ungrouped events"),
            GroupKey::Group(group) => write!(f, "access group {group}"),
        }
    }
}
