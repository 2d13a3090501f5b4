//! Postgres rows for stored events and the queries over them.
//!
//! Each query is a plain struct executed through
//! `Processor<Query> for DatabaseProcessor`.

pub mod child_event;
pub mod index_event;

use fenceq_sdk::ValidationError;
use fenceq_sdk::event::{Event, EventType};

/// Event columns shared by the `index_events` and `index_child_events` tables.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct EventColumns {
    pub storage_code: String,
    pub event_timestamp: time::OffsetDateTime,
    pub event_type: String,
    pub access_group: Option<i64>,
    pub object_id: Option<String>,
    pub version: Option<i64>,
    pub new_name: Option<String>,
    pub is_public: Option<bool>,
    pub overwrite_existing_data: bool,
}

impl EventColumns {
    pub fn from_event(event: &Event) -> Self {
        Self {
            storage_code: event.storage_code().to_string(),
            event_timestamp: event.timestamp(),
            event_type: event.event_type().to_string(),
            access_group: event.access_group(),
            object_id: event.object_id().map(str::to_string),
            version: event.version(),
            new_name: event.new_name().map(str::to_string),
            is_public: event.is_public(),
            overwrite_existing_data: event.overwrite_existing_data(),
        }
    }

    pub fn into_event(self) -> Result<Event, ValidationError> {
        let event_type: EventType = self.event_type.parse()?;
        let mut builder = Event::builder(self.storage_code, event_type, self.event_timestamp)
            .overwrite_existing_data(self.overwrite_existing_data);
        if let Some(group) = self.access_group {
            builder = builder.access_group(group);
        }
        if let Some(object_id) = self.object_id {
            builder = builder.object_id(object_id);
        }
        if let Some(version) = self.version {
            builder = builder.version(version);
        }
        if let Some(name) = self.new_name {
            builder = builder.new_name(name);
        }
        if let Some(public) = self.is_public {
            builder = builder.is_public(public);
        }
        builder.build()
    }
}
