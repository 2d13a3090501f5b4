//! Top-level queue routing events to their access group.

use super::{AccessGroupQueue, GroupKey, QueueError, QueueKey};
use fenceq_sdk::event::{EventId, ProcessingState, StoredEvent};
use itertools::Itertools;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, trace};

/// Queue of every event awaiting indexing.
///
/// Access groups are scheduled independently; an event in one group never
/// waits on an event in another. Events without an access group share one
/// [`GroupKey::Ungrouped`] queue.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    groups: BTreeMap<GroupKey, AccessGroupQueue>,
    /// Ids of every held event.
    ids: HashSet<EventId>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a queue from events that were ready or processing when the
    /// previous queue went away.
    ///
    /// Fails as a whole if any event is in another state or if an id repeats.
    /// No promotion runs, so the queue reports exactly the given partition.
    pub fn from_events(events: impl IntoIterator<Item = StoredEvent>) -> Result<Self, QueueError> {
        let mut queue = Self::new();
        for event in events {
            if !queue.ids.insert(event.id().clone()) {
                return Err(QueueError::DuplicateEvent {
                    id: event.id().clone(),
                });
            }
            let key = GroupKey::of(event.event());
            queue
                .groups
                .entry(key)
                .or_insert_with(|| AccessGroupQueue::new(key))
                .restore(event)?;
        }
        debug!(
            size = queue.size(),
            groups = queue.groups.len(),
            "Rebuilt event queue from stored events"
        );
        Ok(queue)
    }

    /// Add an unprocessed event.
    pub fn load(&mut self, event: StoredEvent) -> Result<(), QueueError> {
        if event.state() != ProcessingState::Unprocessed {
            return Err(QueueError::InvalidState {
                id: event.id().clone(),
                state: event.state(),
                expected: "UNPROCESSED",
            });
        }
        if self.ids.contains(event.id()) {
            return Err(QueueError::DuplicateEvent {
                id: event.id().clone(),
            });
        }
        let key = GroupKey::of(event.event());
        let id = event.id().clone();
        trace!(event_id = %id, group = %key, "Loading event");
        match self.groups.get_mut(&key) {
            Some(group) => group.load(event)?,
            None => {
                let mut group = AccessGroupQueue::new(key);
                group.load(event)?;
                self.groups.insert(key, group);
            }
        }
        self.ids.insert(id);
        Ok(())
    }

    /// Promote every event that may run now, across all access groups.
    pub fn move_to_ready(&mut self) -> Vec<StoredEvent> {
        let promoted: Vec<StoredEvent> = self
            .groups
            .values_mut()
            .flat_map(AccessGroupQueue::move_to_ready)
            .sorted_by_key(QueueKey::of)
            .collect();
        if !promoted.is_empty() {
            debug!(count = promoted.len(), "Promoted events to ready");
        }
        promoted
    }

    /// Check out every ready event.
    pub fn move_ready_to_processing(&mut self) -> Vec<StoredEvent> {
        self.groups
            .values_mut()
            .flat_map(AccessGroupQueue::move_ready_to_processing)
            .sorted_by_key(QueueKey::of)
            .collect()
    }

    /// Remove a processing event and return the events it unblocked, which
    /// are already `READY` when this returns.
    pub fn set_processing_complete(
        &mut self,
        event: &StoredEvent,
    ) -> Result<Vec<StoredEvent>, QueueError> {
        let key = GroupKey::of(event.event());
        let Some(group) = self.groups.get_mut(&key) else {
            return Err(QueueError::NoSuchEvent {
                id: event.id().clone(),
            });
        };
        let released = group.set_processing_complete(event)?;
        if group.is_empty() {
            self.groups.remove(&key);
        }
        self.ids.remove(event.id());
        debug!(
            event_id = %event.id(),
            released = released.len(),
            "Event processing complete"
        );
        Ok(released)
    }

    pub fn is_processing(&self) -> bool {
        self.groups.values().any(AccessGroupQueue::is_processing)
    }

    pub fn contains(&self, id: &EventId) -> bool {
        self.ids.contains(id)
    }

    pub fn ready_for_processing(&self) -> Vec<StoredEvent> {
        self.groups
            .values()
            .flat_map(AccessGroupQueue::ready_for_processing)
            .sorted_by_key(QueueKey::of)
            .collect()
    }

    pub fn processing(&self) -> Vec<StoredEvent> {
        self.groups
            .values()
            .flat_map(AccessGroupQueue::processing)
            .sorted_by_key(QueueKey::of)
            .collect()
    }

    pub fn size(&self) -> usize {
        self.groups.values().map(AccessGroupQueue::size).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }
}
