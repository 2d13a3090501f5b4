//! Event value types.
//!
//! Every type in this module is an immutable value. Scheduling code in
//! `fenceq-core` only ever reads them and builds new values when the
//! processing state changes.

mod child;
mod id;
mod kind;
mod record;
mod state;
mod stored;

pub use child::{ChildEvent, StoredChildEvent};
pub use id::EventId;
pub use kind::{EventCategory, EventType};
pub use record::{Event, EventBuilder};
pub use state::ProcessingState;
pub use stored::{StoredEvent, UpdateInfo};

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Build a timestamp from milliseconds since the Unix epoch.
    pub fn millis(ms: i64) -> time::OffsetDateTime {
        time::OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000).unwrap()
    }

    pub fn version_event(object_id: &str, ms: i64) -> Event {
        Event::builder("WS", EventType::NewVersion, millis(ms))
            .access_group(1)
            .object_id(object_id)
            .version(1)
            .build()
            .unwrap()
    }
}
