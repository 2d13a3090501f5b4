use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a stored event.
///
/// Queues only ever hold `Unprocessed`, `Ready` and `Processing` events.
/// The remaining states are written by the indexer once an event is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingState {
    Unprocessed,
    Ready,
    Processing,
    Indexed,
    Unindexed,
    Failed,
}

impl ProcessingState {
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ProcessingState::Indexed | ProcessingState::Unindexed | ProcessingState::Failed
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ProcessingState::Unprocessed => "UNPROCESSED",
            ProcessingState::Ready => "READY",
            ProcessingState::Processing => "PROCESSING",
            ProcessingState::Indexed => "INDEXED",
            ProcessingState::Unindexed => "UNINDEXED",
            ProcessingState::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProcessingState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNPROCESSED" => Ok(ProcessingState::Unprocessed),
            "READY" => Ok(ProcessingState::Ready),
            "PROCESSING" => Ok(ProcessingState::Processing),
            "INDEXED" => Ok(ProcessingState::Indexed),
            "UNINDEXED" => Ok(ProcessingState::Unindexed),
            "FAILED" => Ok(ProcessingState::Failed),
            other => Err(ValidationError::Unknown {
                kind: "processing state",
                value: other.to_string(),
            }),
        }
    }
}
