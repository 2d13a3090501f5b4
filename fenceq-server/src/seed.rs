//! Loading events from a JSON-lines file into storage.

use anyhow::Context;
use fenceq_core::storage::EventStorage;
use fenceq_sdk::event::Event;
use std::path::Path;

/// Store every event of `path`, one JSON document per line.
///
/// Blank lines are skipped. Nothing is stored if any line fails to parse.
pub async fn seed_events(storage: &dyn EventStorage, path: &Path) -> anyhow::Result<usize> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    let events = parse_events(&content)?;
    let count = events.len();
    for event in events {
        storage.store(event).await?;
    }
    tracing::info!(count, path = %path.display(), "Seeded events");
    Ok(count)
}

fn parse_events(content: &str) -> anyhow::Result<Vec<Event>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).with_context(|| format!("invalid event on line {}", n + 1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fenceq_sdk::event::EventType;

    #[test]
    fn test_parse_events_skips_blank_lines() {
        let content = r#"{"storage_code":"WS","timestamp":"2024-05-01 10:00:00.0 +00:00:00","event_type":"DELETE_ACCESS_GROUP","access_group":7}

{"storage_code":"WS","timestamp":"2024-05-01 10:00:01.0 +00:00:00","event_type":"NEW_VERSION","access_group":7,"object_id":"24","version":3}
"#;
        let events = parse_events(content).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type(), EventType::DeleteAccessGroup);
        assert_eq!(events[1].object_id(), Some("24"));
    }

    #[test]
    fn test_parse_events_reports_line() {
        let content = "{\"storage_code\":\"WS\",\"timestamp\":\"2024-05-01 10:00:00.0 +00:00:00\",\"event_type\":\"NEW_VERSION\",\"access_group\":7}\n";
        let err = parse_events(content).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }
}
