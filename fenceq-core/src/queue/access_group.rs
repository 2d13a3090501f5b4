//! Scheduling for the events of a single access group.

use super::lanes::Lanes;
use super::object::{ObjectQueue, object_id_of};
use super::{GroupKey, QueueError, QueueKey};
use compact_str::CompactString;
use fenceq_sdk::event::{EventCategory, EventId, ProcessingState, StoredEvent};
use itertools::Itertools;
use std::collections::BTreeMap;

/// Queue for every event of one access group.
///
/// `GROUP` events form a chain that fences the whole group: a group event
/// is promoted only once it is the earliest event in the group and nothing
/// else in the group is ready or processing, and while it is in flight
/// nothing else in the group is promoted. Other events are scheduled by
/// their [`ObjectQueue`], but never past an earlier unprocessed group event.
#[derive(Debug, Clone)]
pub struct AccessGroupQueue {
    key: GroupKey,
    chain: Lanes,
    objects: BTreeMap<CompactString, ObjectQueue>,
}

impl AccessGroupQueue {
    pub fn new(key: GroupKey) -> Self {
        Self {
            key,
            chain: Lanes::default(),
            objects: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> GroupKey {
        self.key
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
        self.check_scope(&event)?;
        if event.category() == EventCategory::Group {
            self.chain.check_absent(&event)?;
            self.chain.push_unprocessed(event);
            return Ok(());
        }
        let object_id = object_id_of(&event)?;
        match self.objects.get_mut(&object_id) {
            Some(queue) => queue.load(event),
            None => {
                let mut queue = ObjectQueue::new(object_id.clone());
                queue.load(event)?;
                self.objects.insert(object_id, queue);
                Ok(())
            }
        }
    }

    /// Add a ready or processing event without running promotion.
    pub(crate) fn restore(&mut self, event: StoredEvent) -> Result<(), QueueError> {
        self.check_scope(&event)?;
        if event.category() != EventCategory::Group {
            let object_id = object_id_of(&event)?;
            return match self.objects.get_mut(&object_id) {
                Some(queue) => queue.restore(event),
                None => {
                    let queue = ObjectQueue::from_event(event)?;
                    self.objects.insert(object_id, queue);
                    Ok(())
                }
            };
        }
        if !matches!(
            event.state(),
            ProcessingState::Ready | ProcessingState::Processing
        ) {
            return Err(QueueError::InvalidState {
                id: event.id().clone(),
                state: event.state(),
                expected: "READY or PROCESSING",
            });
        }
        self.chain.check_absent(&event)?;
        self.chain.push_in_flight(event);
        Ok(())
    }

    /// Promote every event that may run now and return them in queue order.
    pub fn move_to_ready(&mut self) -> Vec<StoredEvent> {
        if self.chain.has_in_flight() {
            return Vec::new();
        }

        let fence = self.chain.first_unprocessed().map(|(key, _)| key.clone());
        if let Some(fence) = &fence {
            let blocked = self.objects.values().any(|queue| {
                queue.has_in_flight()
                    || queue
                        .earliest_unprocessed()
                        .is_some_and(|earliest| earliest < fence)
            });
            if !blocked {
                return self.chain.promote_first().into_iter().collect();
            }
        }

        self.objects
            .values_mut()
            .flat_map(|queue| queue.move_to_ready_before(fence.as_ref()))
            .sorted_by_key(QueueKey::of)
            .collect()
    }

    pub fn move_ready_to_processing(&mut self) -> Vec<StoredEvent> {
        let mut moved = self.chain.move_ready_to_processing();
        moved.extend(
            self.objects
                .values_mut()
                .flat_map(ObjectQueue::move_ready_to_processing),
        );
        moved.sort_by_key(QueueKey::of);
        moved
    }

    pub fn is_processing(&self) -> bool {
        self.chain.is_processing() || self.objects.values().any(ObjectQueue::is_processing)
    }

    /// Remove a processing event and re-evaluate the whole group.
    ///
    /// Returns every event promoted as a result. Completing a group event
    /// can release events in many objects at once.
    pub fn set_processing_complete(
        &mut self,
        event: &StoredEvent,
    ) -> Result<Vec<StoredEvent>, QueueError> {
        if !self.take_processing(event) {
            return Err(QueueError::NoSuchEvent {
                id: event.id().clone(),
            });
        }
        Ok(self.move_to_ready())
    }

    fn take_processing(&mut self, event: &StoredEvent) -> bool {
        if GroupKey::of(event.event()) != self.key {
            return false;
        }
        if event.category() == EventCategory::Group {
            return self.chain.take_processing(event).is_some();
        }
        let Some(object_id) = event.event().object_id() else {
            return false;
        };
        let Some(queue) = self.objects.get_mut(object_id) else {
            return false;
        };
        if queue.take_processing(event).is_none() {
            return false;
        }
        if queue.is_empty() {
            self.objects.remove(object_id);
        }
        true
    }

    pub fn contains(&self, id: &EventId) -> bool {
        self.chain.contains_id(id) || self.objects.values().any(|queue| queue.contains_id(id))
    }

    pub fn ready_for_processing(&self) -> Vec<StoredEvent> {
        self.chain
            .ready()
            .chain(self.objects.values().flat_map(|queue| queue.ready_iter()))
            .cloned()
            .sorted_by_key(QueueKey::of)
            .collect()
    }

    pub fn processing(&self) -> Vec<StoredEvent> {
        self.chain
            .processing()
            .chain(self.objects.values().flat_map(|queue| queue.processing_iter()))
            .cloned()
            .sorted_by_key(QueueKey::of)
            .collect()
    }

    pub fn size(&self) -> usize {
        self.chain.len() + self.objects.values().map(ObjectQueue::size).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    fn check_scope(&self, event: &StoredEvent) -> Result<(), QueueError> {
        if GroupKey::of(event.event()) == self.key {
            Ok(())
        } else {
            Err(QueueError::WrongScope {
                id: event.id().clone(),
                scope: self.key.to_string(),
            })
        }
    }
}
