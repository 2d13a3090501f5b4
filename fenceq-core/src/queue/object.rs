//! Scheduling for the events of a single object.

use super::lanes::Lanes;
use super::{QueueError, QueueKey};
use compact_str::CompactString;
use fenceq_sdk::event::{EventCategory, ProcessingState, StoredEvent};

/// Queue for the `OBJECT` and `VERSION` events of one object.
///
/// Version events run concurrently with each other. An object event waits
/// until it is the earliest event of the object and nothing else is ready
/// or processing, then blocks every later event until it completes.
#[derive(Debug, Clone)]
pub struct ObjectQueue {
    object_id: CompactString,
    lanes: Lanes,
}

impl ObjectQueue {
    pub fn new(object_id: impl Into<CompactString>) -> Self {
        Self {
            object_id: object_id.into(),
            lanes: Lanes::default(),
        }
    }

    /// Rebuild a queue from an event that was already ready or processing.
    pub fn from_event(event: StoredEvent) -> Result<Self, QueueError> {
        let object_id = object_id_of(&event)?;
        let mut queue = Self::new(object_id);
        queue.restore(event)?;
        Ok(queue)
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    /// Add a ready or processing event without running promotion.
    pub(crate) fn restore(&mut self, event: StoredEvent) -> Result<(), QueueError> {
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
        self.check_scope(&event)?;
        self.lanes.check_absent(&event)?;
        self.lanes.push_in_flight(event);
        Ok(())
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
        self.lanes.check_absent(&event)?;
        self.lanes.push_unprocessed(event);
        Ok(())
    }

    /// Promote every event that may run now and return them.
    pub fn move_to_ready(&mut self) -> Vec<StoredEvent> {
        self.move_to_ready_before(None)
    }

    /// Promote like [`move_to_ready`](Self::move_to_ready), but never
    /// promote anything at or after `fence`.
    pub(crate) fn move_to_ready_before(&mut self, fence: Option<&QueueKey>) -> Vec<StoredEvent> {
        let mut promoted = Vec::new();
        if self.lanes.in_flight_has(EventCategory::Object) {
            return promoted;
        }
        while let Some((key, next)) = self.lanes.first_unprocessed() {
            if fence.is_some_and(|fence| key >= fence) {
                break;
            }
            if next.category() == EventCategory::Object {
                if !self.lanes.has_in_flight() {
                    promoted.extend(self.lanes.promote_first());
                }
                break;
            }
            match self.lanes.promote_first() {
                Some(event) => promoted.push(event),
                None => break,
            }
        }
        promoted
    }

    pub fn move_ready_to_processing(&mut self) -> Vec<StoredEvent> {
        self.lanes.move_ready_to_processing()
    }

    pub fn is_processing(&self) -> bool {
        self.lanes.is_processing()
    }

    /// Remove a processing event and promote whatever it was blocking.
    ///
    /// Returns the events promoted as a result.
    pub fn set_processing_complete(
        &mut self,
        event: &StoredEvent,
    ) -> Result<Vec<StoredEvent>, QueueError> {
        if self.take_processing(event).is_none() {
            return Err(QueueError::NoSuchEvent {
                id: event.id().clone(),
            });
        }
        Ok(self.move_to_ready())
    }

    pub(crate) fn take_processing(&mut self, event: &StoredEvent) -> Option<StoredEvent> {
        self.lanes.take_processing(event)
    }

    pub(crate) fn earliest_unprocessed(&self) -> Option<&QueueKey> {
        self.lanes.first_unprocessed().map(|(key, _)| key)
    }

    pub(crate) fn has_in_flight(&self) -> bool {
        self.lanes.has_in_flight()
    }

    pub(crate) fn contains_id(&self, id: &fenceq_sdk::event::EventId) -> bool {
        self.lanes.contains_id(id)
    }

    pub fn ready_for_processing(&self) -> Vec<StoredEvent> {
        self.lanes.ready().cloned().collect()
    }

    pub fn processing(&self) -> Vec<StoredEvent> {
        self.lanes.processing().cloned().collect()
    }

    pub(crate) fn ready_iter(&self) -> impl Iterator<Item = &StoredEvent> {
        self.lanes.ready()
    }

    pub(crate) fn processing_iter(&self) -> impl Iterator<Item = &StoredEvent> {
        self.lanes.processing()
    }

    pub fn size(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    fn check_scope(&self, event: &StoredEvent) -> Result<(), QueueError> {
        let belongs = event.category() != EventCategory::Group
            && event.event().object_id() == Some(self.object_id.as_str());
        if belongs {
            Ok(())
        } else {
            Err(QueueError::WrongScope {
                id: event.id().clone(),
                scope: format!("object {}", self.object_id),
            })
        }
    }
}

/// Object id of an `OBJECT` or `VERSION` event.
pub(crate) fn object_id_of(event: &StoredEvent) -> Result<CompactString, QueueError> {
    match (event.category(), event.event().object_id()) {
        (EventCategory::Object | EventCategory::Version, Some(id)) => Ok(CompactString::from(id)),
        _ => Err(QueueError::WrongScope {
            id: event.id().clone(),
            scope: "an object queue".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::test_support::{group, ids, object, version};

    #[test]
    fn test_version_then_object() {
        let mut queue = ObjectQueue::new("24");
        let v1 = version("v1", 1, "24", 50_000);
        let o1 = object("o1", 1, "24", 60_000);
        queue.load(v1.clone()).unwrap();
        queue.load(o1.clone()).unwrap();
        assert_eq!(queue.size(), 2);

        assert_eq!(ids(&queue.move_to_ready()), vec!["v1"]);
        assert_eq!(ids(&queue.move_to_ready()), Vec::<&str>::new());
        let checked_out = queue.move_ready_to_processing();
        assert_eq!(ids(&checked_out), vec!["v1"]);
        assert!(queue.is_processing());

        // The object event waits for the in-flight version event.
        assert!(queue.move_to_ready().is_empty());

        let released = queue.set_processing_complete(&checked_out[0]).unwrap();
        assert_eq!(ids(&released), vec!["o1"]);
        assert_eq!(released[0].state(), ProcessingState::Ready);
        assert!(queue.move_to_ready().is_empty());
        assert_eq!(ids(&queue.ready_for_processing()), vec!["o1"]);

        let checked_out = queue.move_ready_to_processing();
        assert!(queue.set_processing_complete(&checked_out[0]).unwrap().is_empty());
        assert!(queue.is_empty());
        assert_eq!(queue.size(), 0);
    }

    #[test]
    fn test_versions_promote_together() {
        let mut queue = ObjectQueue::new("25");
        queue.load(version("v2", 1, "25", 60_000)).unwrap();
        queue.load(version("v1", 1, "25", 50_000)).unwrap();

        assert_eq!(ids(&queue.move_to_ready()), vec!["v1", "v2"]);
        assert_eq!(ids(&queue.move_ready_to_processing()), vec!["v1", "v2"]);
        assert_eq!(queue.processing().len(), 2);
    }

    #[test]
    fn test_object_event_fences_later_events() {
        let mut queue = ObjectQueue::new("24");
        queue.load(object("o1", 1, "24", 10_000)).unwrap();
        queue.load(version("v1", 1, "24", 20_000)).unwrap();
        queue.load(object("o2", 1, "24", 30_000)).unwrap();
        queue.load(version("v2", 1, "24", 40_000)).unwrap();

        assert_eq!(ids(&queue.move_to_ready()), vec!["o1"]);
        let o1 = queue.move_ready_to_processing();
        assert!(queue.move_to_ready().is_empty());

        assert_eq!(ids(&queue.set_processing_complete(&o1[0]).unwrap()), vec!["v1"]);
        let v1 = queue.move_ready_to_processing();
        assert!(queue.move_to_ready().is_empty());

        assert_eq!(ids(&queue.set_processing_complete(&v1[0]).unwrap()), vec!["o2"]);
        let o2 = queue.move_ready_to_processing();
        assert_eq!(ids(&queue.set_processing_complete(&o2[0]).unwrap()), vec!["v2"]);
        assert_eq!(queue.size(), 1);
    }

    #[test]
    fn test_version_loaded_after_object_promotion_waits() {
        let mut queue = ObjectQueue::new("24");
        queue.load(object("o1", 1, "24", 10_000)).unwrap();
        queue.move_to_ready();
        // Earlier timestamp, but the object event already holds the fence.
        queue.load(version("v0", 1, "24", 5_000)).unwrap();
        assert!(queue.move_to_ready().is_empty());
        assert_eq!(ids(&queue.ready_for_processing()), vec!["o1"]);
    }

    #[test]
    fn test_equal_timestamps_ordered_by_id() {
        let mut queue = ObjectQueue::new("24");
        queue.load(version("b", 1, "24", 1_000)).unwrap();
        queue.load(object("a", 1, "24", 1_000)).unwrap();
        assert_eq!(ids(&queue.move_to_ready()), vec!["a"]);

        let mut queue = ObjectQueue::new("24");
        queue.load(object("b", 1, "24", 1_000)).unwrap();
        queue.load(version("a", 1, "24", 1_000)).unwrap();
        assert_eq!(ids(&queue.move_to_ready()), vec!["a"]);
        let a = queue.move_ready_to_processing();
        assert!(queue.move_to_ready().is_empty());
        assert_eq!(ids(&queue.set_processing_complete(&a[0]).unwrap()), vec!["b"]);
    }

    #[test]
    fn test_load_rejects_non_unprocessed() {
        let mut queue = ObjectQueue::new("24");
        for state in [
            ProcessingState::Ready,
            ProcessingState::Processing,
            ProcessingState::Indexed,
        ] {
            let event = version("v1", 1, "24", 1).with_state(state);
            let err = queue.load(event).unwrap_err();
            assert!(matches!(err, QueueError::InvalidState { .. }));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_load_rejects_wrong_scope_and_duplicates() {
        let mut queue = ObjectQueue::new("24");
        assert!(matches!(
            queue.load(version("v1", 1, "25", 1)),
            Err(QueueError::WrongScope { .. })
        ));
        assert!(matches!(
            queue.load(group("g1", 1, 1)),
            Err(QueueError::WrongScope { .. })
        ));
        queue.load(version("v1", 1, "24", 1)).unwrap();
        assert_eq!(
            queue.load(version("v1", 1, "24", 2)),
            Err(QueueError::DuplicateEvent {
                id: fenceq_sdk::event::EventId::new("v1").unwrap()
            })
        );
        assert_eq!(queue.size(), 1);
    }

    #[test]
    fn test_from_event() {
        let ready = version("v1", 1, "24", 1).with_state(ProcessingState::Ready);
        let queue = ObjectQueue::from_event(ready).unwrap();
        assert_eq!(queue.object_id(), "24");
        assert_eq!(ids(&queue.ready_for_processing()), vec!["v1"]);
        assert!(queue.processing().is_empty());

        let processing = object("o1", 1, "24", 1).with_state(ProcessingState::Processing);
        let queue = ObjectQueue::from_event(processing).unwrap();
        assert!(queue.is_processing());

        for state in [ProcessingState::Unprocessed, ProcessingState::Failed] {
            let err = ObjectQueue::from_event(version("v1", 1, "24", 1).with_state(state));
            assert!(matches!(err, Err(QueueError::InvalidState { .. })));
        }
    }

    #[test]
    fn test_complete_failures_leave_queue_unchanged() {
        let mut queue = ObjectQueue::new("24");
        let err = queue
            .set_processing_complete(&version("v1", 1, "24", 1))
            .unwrap_err();
        assert!(matches!(err, QueueError::NoSuchEvent { .. }));

        queue.load(version("v1", 1, "24", 1)).unwrap();
        queue.move_to_ready();
        // Ready but not processing.
        let ready = queue.ready_for_processing();
        assert!(queue.set_processing_complete(&ready[0]).is_err());
        assert_eq!(ids(&queue.ready_for_processing()), vec!["v1"]);

        let processing = queue.move_ready_to_processing();
        let moved = version("v1", 1, "99", 1).with_state(ProcessingState::Processing);
        assert!(queue.set_processing_complete(&moved).is_err());
        assert_eq!(queue.processing(), processing);
    }

    #[test]
    fn test_snapshots_are_detached() {
        let mut queue = ObjectQueue::new("24");
        queue.load(version("v1", 1, "24", 1)).unwrap();
        queue.move_to_ready();
        let mut snapshot = queue.ready_for_processing();
        snapshot.clear();
        assert_eq!(queue.ready_for_processing().len(), 1);
    }
}
