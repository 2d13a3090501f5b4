use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// Scheduling category of an event type.
///
/// The category, not the specific type, decides how an event is fenced
/// against the other events of its access group and object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventCategory {
    /// Affects a whole access group. Fences every object in the group.
    Group,
    /// Affects every version of one object. Fences that object.
    Object,
    /// Affects a single version of one object.
    Version,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventCategory::Group => write!(f, "GROUP"),
            EventCategory::Object => write!(f, "OBJECT"),
            EventCategory::Version => write!(f, "VERSION"),
        }
    }
}

/// Kind of change an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    CopyAccessGroup,
    DeleteAccessGroup,
    PublishAccessGroup,
    UnpublishAccessGroup,
    NewAllVersions,
    DeleteAllVersions,
    UndeleteAllVersions,
    RenameAllVersions,
    PublishAllVersions,
    UnpublishAllVersions,
    NewVersion,
}

impl EventType {
    pub const ALL: [EventType; 11] = [
        EventType::CopyAccessGroup,
        EventType::DeleteAccessGroup,
        EventType::PublishAccessGroup,
        EventType::UnpublishAccessGroup,
        EventType::NewAllVersions,
        EventType::DeleteAllVersions,
        EventType::UndeleteAllVersions,
        EventType::RenameAllVersions,
        EventType::PublishAllVersions,
        EventType::UnpublishAllVersions,
        EventType::NewVersion,
    ];

    pub const fn category(self) -> EventCategory {
        match self {
            EventType::CopyAccessGroup
            | EventType::DeleteAccessGroup
            | EventType::PublishAccessGroup
            | EventType::UnpublishAccessGroup => EventCategory::Group,
            EventType::NewAllVersions
            | EventType::DeleteAllVersions
            | EventType::UndeleteAllVersions
            | EventType::RenameAllVersions
            | EventType::PublishAllVersions
            | EventType::UnpublishAllVersions => EventCategory::Object,
            EventType::NewVersion => EventCategory::Version,
        }
    }

    /// Visibility implied by publish/unpublish types, `None` for the rest.
    pub const fn implied_public(self) -> Option<bool> {
        match self {
            EventType::PublishAccessGroup | EventType::PublishAllVersions => Some(true),
            EventType::UnpublishAccessGroup | EventType::UnpublishAllVersions => Some(false),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            EventType::CopyAccessGroup => "COPY_ACCESS_GROUP",
            EventType::DeleteAccessGroup => "DELETE_ACCESS_GROUP",
            EventType::PublishAccessGroup => "PUBLISH_ACCESS_GROUP",
            EventType::UnpublishAccessGroup => "UNPUBLISH_ACCESS_GROUP",
            EventType::NewAllVersions => "NEW_ALL_VERSIONS",
            EventType::DeleteAllVersions => "DELETE_ALL_VERSIONS",
            EventType::UndeleteAllVersions => "UNDELETE_ALL_VERSIONS",
            EventType::RenameAllVersions => "RENAME_ALL_VERSIONS",
            EventType::PublishAllVersions => "PUBLISH_ALL_VERSIONS",
            EventType::UnpublishAllVersions => "UNPUBLISH_ALL_VERSIONS",
            EventType::NewVersion => "NEW_VERSION",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::Unknown {
                kind: "event type",
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let groups = EventType::ALL
            .iter()
            .filter(|t| t.category() == EventCategory::Group)
            .count();
        let objects = EventType::ALL
            .iter()
            .filter(|t| t.category() == EventCategory::Object)
            .count();
        assert_eq!(groups, 4);
        assert_eq!(objects, 6);
        assert_eq!(EventType::NewVersion.category(), EventCategory::Version);
    }

    #[test]
    fn test_parse_matches_display() {
        for t in EventType::ALL {
            assert_eq!(t.to_string().parse::<EventType>().unwrap(), t);
        }
        assert!("NEW_THING".parse::<EventType>().is_err());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&EventType::RenameAllVersions).unwrap(),
            "\"RENAME_ALL_VERSIONS\""
        );
    }
}
