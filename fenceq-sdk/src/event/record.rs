use super::kind::{EventCategory, EventType};
use crate::error::ValidationError;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A change to an externally stored object or access group.
///
/// Events are built with [`Event::builder`], which checks that the fields
/// required by the event type are present.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawEvent")]
pub struct Event {
    storage_code: CompactString,
    timestamp: OffsetDateTime,
    event_type: EventType,
    access_group: Option<i64>,
    object_id: Option<CompactString>,
    version: Option<i64>,
    new_name: Option<String>,
    is_public: Option<bool>,
    overwrite_existing_data: bool,
}

impl Event {
    /// Start building an event.
    ///
    /// # Arguments
    ///
    /// * `storage_code` - Code of the storage system the event originated from
    /// * `event_type` - What kind of change happened
    /// * `timestamp` - When the change happened; used as the ordering key
    pub fn builder(
        storage_code: impl Into<CompactString>,
        event_type: EventType,
        timestamp: OffsetDateTime,
    ) -> EventBuilder {
        EventBuilder {
            storage_code: storage_code.into(),
            timestamp,
            event_type,
            access_group: None,
            object_id: None,
            version: None,
            new_name: None,
            is_public: None,
            overwrite_existing_data: false,
        }
    }

    pub fn storage_code(&self) -> &str {
        &self.storage_code
    }

    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn category(&self) -> EventCategory {
        self.event_type.category()
    }

    pub fn access_group(&self) -> Option<i64> {
        self.access_group
    }

    pub fn object_id(&self) -> Option<&str> {
        self.object_id.as_deref()
    }

    pub fn version(&self) -> Option<i64> {
        self.version
    }

    pub fn new_name(&self) -> Option<&str> {
        self.new_name.as_deref()
    }

    pub fn is_public(&self) -> Option<bool> {
        self.is_public
    }

    /// Whether the indexer should replace documents it already holds.
    pub fn overwrite_existing_data(&self) -> bool {
        self.overwrite_existing_data
    }
}

/// Validating builder for [`Event`].
#[derive(Debug, Clone)]
pub struct EventBuilder {
    storage_code: CompactString,
    timestamp: OffsetDateTime,
    event_type: EventType,
    access_group: Option<i64>,
    object_id: Option<CompactString>,
    version: Option<i64>,
    new_name: Option<String>,
    is_public: Option<bool>,
    overwrite_existing_data: bool,
}

impl EventBuilder {
    pub fn access_group(mut self, access_group: i64) -> Self {
        self.access_group = Some(access_group);
        self
    }

    pub fn object_id(mut self, object_id: impl Into<CompactString>) -> Self {
        self.object_id = Some(object_id.into());
        self
    }

    pub fn version(mut self, version: i64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn new_name(mut self, new_name: impl Into<String>) -> Self {
        self.new_name = Some(new_name.into());
        self
    }

    pub fn is_public(mut self, is_public: bool) -> Self {
        self.is_public = Some(is_public);
        self
    }

    pub fn overwrite_existing_data(mut self, overwrite: bool) -> Self {
        self.overwrite_existing_data = overwrite;
        self
    }

    /// Validate the collected fields and build the event.
    pub fn build(self) -> Result<Event, ValidationError> {
        let event_type = self.event_type;
        if self.storage_code.trim().is_empty() {
            return Err(ValidationError::Blank("storage code"));
        }

        match event_type.category() {
            EventCategory::Group => {
                if self.access_group.is_none() {
                    return Err(ValidationError::Missing {
                        field: "access group",
                        event_type,
                    });
                }
                if self.object_id.is_some() {
                    return Err(ValidationError::NotAllowed {
                        field: "object id",
                        event_type,
                    });
                }
            }
            EventCategory::Object | EventCategory::Version => match &self.object_id {
                None => {
                    return Err(ValidationError::Missing {
                        field: "object id",
                        event_type,
                    });
                }
                Some(id) if id.trim().is_empty() => {
                    return Err(ValidationError::Blank("object id"));
                }
                Some(_) => {}
            },
        }

        if event_type == EventType::NewVersion && self.version.is_none() {
            return Err(ValidationError::Missing {
                field: "version",
                event_type,
            });
        }

        let new_name = match (event_type, self.new_name) {
            (EventType::RenameAllVersions, None) => {
                return Err(ValidationError::Missing {
                    field: "new name",
                    event_type,
                });
            }
            (EventType::RenameAllVersions, Some(name)) if name.trim().is_empty() => {
                return Err(ValidationError::Blank("new name"));
            }
            (EventType::RenameAllVersions, Some(name)) => Some(name),
            (_, Some(_)) => {
                return Err(ValidationError::NotAllowed {
                    field: "new name",
                    event_type,
                });
            }
            (_, None) => None,
        };

        let is_public = event_type.implied_public().or(self.is_public);

        Ok(Event {
            storage_code: self.storage_code,
            timestamp: self.timestamp,
            event_type,
            access_group: self.access_group,
            object_id: self.object_id,
            version: self.version,
            new_name,
            is_public,
            overwrite_existing_data: self.overwrite_existing_data,
        })
    }
}

/// Wire form of [`Event`]; deserialized events go through the builder.
#[derive(Deserialize)]
struct RawEvent {
    storage_code: CompactString,
    timestamp: OffsetDateTime,
    event_type: EventType,
    #[serde(default)]
    access_group: Option<i64>,
    #[serde(default)]
    object_id: Option<CompactString>,
    #[serde(default)]
    version: Option<i64>,
    #[serde(default)]
    new_name: Option<String>,
    #[serde(default)]
    is_public: Option<bool>,
    #[serde(default)]
    overwrite_existing_data: bool,
}

impl TryFrom<RawEvent> for Event {
    type Error = ValidationError;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        let mut builder = Event::builder(raw.storage_code, raw.event_type, raw.timestamp)
            .overwrite_existing_data(raw.overwrite_existing_data);
        if let Some(group) = raw.access_group {
            builder = builder.access_group(group);
        }
        if let Some(object_id) = raw.object_id {
            builder = builder.object_id(object_id);
        }
        if let Some(version) = raw.version {
            builder = builder.version(version);
        }
        if let Some(name) = raw.new_name {
            builder = builder.new_name(name);
        }
        if let Some(public) = raw.is_public {
            builder = builder.is_public(public);
        }
        builder.build()
    }
}
