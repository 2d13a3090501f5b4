use super::{QueueError, QueueKey};
use fenceq_sdk::event::{EventCategory, EventId, ProcessingState, StoredEvent};
use std::collections::BTreeMap;

/// The three in-queue states of a single fencing scope, each kept in
/// queue order.
#[derive(Debug, Clone, Default)]
pub(crate) struct Lanes {
    unprocessed: BTreeMap<QueueKey, StoredEvent>,
    ready: BTreeMap<QueueKey, StoredEvent>,
    processing: BTreeMap<QueueKey, StoredEvent>,
}

impl Lanes {
    pub(crate) fn len(&self) -> usize {
        self.unprocessed.len() + self.ready.len() + self.processing.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn contains_id(&self, id: &EventId) -> bool {
        self.unprocessed
            .values()
            .chain(self.ready.values())
            .chain(self.processing.values())
            .any(|e| e.id() == id)
    }

    /// Error if `event` is already held.
    pub(crate) fn check_absent(&self, event: &StoredEvent) -> Result<(), QueueError> {
        if self.contains_id(event.id()) {
            return Err(QueueError::DuplicateEvent {
                id: event.id().clone(),
            });
        }
        Ok(())
    }

    pub(crate) fn push_unprocessed(&mut self, event: StoredEvent) {
        self.unprocessed.insert(QueueKey::of(&event), event);
    }

    /// Put back an event that was already ready or processing.
    pub(crate) fn push_in_flight(&mut self, event: StoredEvent) {
        let key = QueueKey::of(&event);
        match event.state() {
            ProcessingState::Processing => {
                self.processing.insert(key, event);
            }
            _ => {
                self.ready.insert(key, event);
            }
        }
    }

    pub(crate) fn first_unprocessed(&self) -> Option<(&QueueKey, &StoredEvent)> {
        self.unprocessed.first_key_value()
    }

    /// Move the earliest unprocessed event to ready.
    pub(crate) fn promote_first(&mut self) -> Option<StoredEvent> {
        let (key, event) = self.unprocessed.pop_first()?;
        let event = event.with_state(ProcessingState::Ready);
        self.ready.insert(key, event.clone());
        Some(event)
    }

    pub(crate) fn has_in_flight(&self) -> bool {
        !self.ready.is_empty() || !self.processing.is_empty()
    }

    pub(crate) fn in_flight_has(&self, category: EventCategory) -> bool {
        self.ready
            .values()
            .chain(self.processing.values())
            .any(|e| e.category() == category)
    }

    pub(crate) fn is_processing(&self) -> bool {
        !self.processing.is_empty()
    }

    pub(crate) fn move_ready_to_processing(&mut self) -> Vec<StoredEvent> {
        let ready = std::mem::take(&mut self.ready);
        ready
            .into_iter()
            .map(|(key, event)| {
                let event = event.with_state(ProcessingState::Processing);
                self.processing.insert(key, event.clone());
                event
            })
            .collect()
    }

    /// Remove and return the processing event that is the same admission
    /// as `event`.
    pub(crate) fn take_processing(&mut self, event: &StoredEvent) -> Option<StoredEvent> {
        let key = QueueKey::of(event);
        let matches = self
            .processing
            .get(&key)
            .is_some_and(|held| held.is_same_admission(event));
        if matches {
            self.processing.remove(&key)
        } else {
            None
        }
    }

    pub(crate) fn ready(&self) -> impl Iterator<Item = &StoredEvent> {
        self.ready.values()
    }

    pub(crate) fn processing(&self) -> impl Iterator<Item = &StoredEvent> {
        self.processing.values()
    }
}
