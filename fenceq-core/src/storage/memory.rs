use super::{EventStorage, StorageError, new_event_id};
use async_trait::async_trait;
use fenceq_sdk::event::{
    ChildEvent, Event, EventId, ProcessingState, StoredChildEvent, StoredEvent, UpdateInfo,
};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Event storage held in process memory.
///
/// Used by tests and by the server when no database is configured. Nothing
/// survives a restart.
#[derive(Default)]
pub struct MemoryEventStorage {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    events: HashMap<EventId, StoredEvent>,
    children: Vec<StoredChildEvent>,
}

impl MemoryEventStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every child event recorded so far, in insertion order.
    pub async fn children(&self) -> Vec<StoredChildEvent> {
        self.inner.lock().await.children.clone()
    }
}

#[async_trait]
impl EventStorage for MemoryEventStorage {
    async fn store(&self, event: Event) -> Result<StoredEvent, StorageError> {
        let stored = StoredEvent::new(event, new_event_id()?, ProcessingState::Unprocessed);
        self.inner
            .lock()
            .await
            .events
            .insert(stored.id().clone(), stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: &EventId) -> Result<Option<StoredEvent>, StorageError> {
        Ok(self.inner.lock().await.events.get(id).cloned())
    }

    async fn get_by_states(
        &self,
        states: &[ProcessingState],
        limit: usize,
    ) -> Result<Vec<StoredEvent>, StorageError> {
        let inner = self.inner.lock().await;
        let mut matching: Vec<StoredEvent> = inner
            .events
            .values()
            .filter(|e| states.contains(&e.state()))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            a.timestamp()
                .cmp(&b.timestamp())
                .then_with(|| a.id().cmp(b.id()))
        });
        matching.truncate(limit);
        Ok(matching)
    }

    async fn set_state(
        &self,
        id: &EventId,
        expected: ProcessingState,
        new: ProcessingState,
        updater: Option<&str>,
    ) -> Result<bool, StorageError> {
        let mut inner = self.inner.lock().await;
        let Some(current) = inner.events.get_mut(id) else {
            return Ok(false);
        };
        if current.state() != expected {
            return Ok(false);
        }
        *current = current.with_state(new).with_update(UpdateInfo {
            updated_at: time::OffsetDateTime::now_utc(),
            updater: updater.map(str::to_string),
        });
        Ok(true)
    }

    async fn store_child(
        &self,
        child: ChildEvent,
        state: ProcessingState,
        message: Option<String>,
    ) -> Result<StoredChildEvent, StorageError> {
        let stored = StoredChildEvent::new(
            child,
            new_event_id()?,
            state,
            time::OffsetDateTime::now_utc(),
            message,
        )?;
        self.inner.lock().await.children.push(stored.clone());
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fenceq_sdk::event::EventType;

    fn event(object: &str, secs: i64) -> Event {
        let timestamp = time::OffsetDateTime::from_unix_timestamp(secs).unwrap();
        Event::builder("WS", EventType::NewAllVersions, timestamp)
            .access_group(1)
            .object_id(object)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_store_assigns_ids_and_state() {
        let storage = MemoryEventStorage::new();
        let a = storage.store(event("1", 10)).await.unwrap();
        let b = storage.store(event("2", 5)).await.unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.state(), ProcessingState::Unprocessed);
        assert_eq!(storage.get(a.id()).await.unwrap(), Some(a.clone()));

        let unprocessed = storage
            .get_by_states(&[ProcessingState::Unprocessed], 10)
            .await
            .unwrap();
        assert_eq!(unprocessed, vec![b.clone(), a.clone()]);
        let limited = storage
            .get_by_states(&[ProcessingState::Unprocessed], 1)
            .await
            .unwrap();
        assert_eq!(limited, vec![b]);
    }

    #[tokio::test]
    async fn test_set_state_is_compare_and_set() {
        let storage = MemoryEventStorage::new();
        let a = storage.store(event("1", 10)).await.unwrap();

        assert!(
            !storage
                .set_state(a.id(), ProcessingState::Ready, ProcessingState::Processing, None)
                .await
                .unwrap()
        );
        assert!(
            storage
                .set_state(
                    a.id(),
                    ProcessingState::Unprocessed,
                    ProcessingState::Ready,
                    Some("coordinator")
                )
                .await
                .unwrap()
        );
        let updated = storage.get(a.id()).await.unwrap().unwrap();
        assert_eq!(updated.state(), ProcessingState::Ready);
        assert_eq!(
            updated.update().and_then(|u| u.updater.as_deref()),
            Some("coordinator")
        );
        assert!(updated.is_same_admission(&a));

        let missing = EventId::new("missing").unwrap();
        assert!(
            !storage
                .set_state(&missing, ProcessingState::Ready, ProcessingState::Processing, None)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_store_child_requires_terminal_state() {
        let storage = MemoryEventStorage::new();
        let parent = storage.store(event("1", 10)).await.unwrap();
        let child = ChildEvent::new(parent.event().clone(), parent.id().clone());

        let result = storage
            .store_child(child.clone(), ProcessingState::Processing, None)
            .await;
        assert!(matches!(result, Err(StorageError::Invalid(_))));
        storage
            .store_child(child, ProcessingState::Failed, Some("boom".to_string()))
            .await
            .unwrap();
        let children = storage.children().await;
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].child().parent_id(), parent.id());
    }
}
