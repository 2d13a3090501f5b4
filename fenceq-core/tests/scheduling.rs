use fenceq_core::queue::{EventQueue, QueueError};
use fenceq_sdk::event::{Event, EventCategory, EventId, EventType, ProcessingState, StoredEvent};
use std::collections::{HashMap, HashSet};
use time::OffsetDateTime;

fn at(ms: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000).unwrap()
}

fn stored(event: Event, id: &str) -> StoredEvent {
    StoredEvent::new(event, EventId::new(id).unwrap(), ProcessingState::Unprocessed)
}

fn version(id: &str, group: i64, object: &str, ms: i64) -> StoredEvent {
    let event = Event::builder("WS", EventType::NewVersion, at(ms))
        .access_group(group)
        .object_id(object)
        .version(1)
        .build()
        .unwrap();
    stored(event, id)
}

fn object(id: &str, group: i64, object: &str, ms: i64) -> StoredEvent {
    let event = Event::builder("WS", EventType::RenameAllVersions, at(ms))
        .access_group(group)
        .object_id(object)
        .new_name("renamed")
        .build()
        .unwrap();
    stored(event, id)
}

fn group(id: &str, group: i64, ms: i64) -> StoredEvent {
    let event = Event::builder("WS", EventType::PublishAccessGroup, at(ms))
        .access_group(group)
        .build()
        .unwrap();
    stored(event, id)
}

fn ids(events: &[StoredEvent]) -> Vec<&str> {
    events.iter().map(|e| e.id().as_str()).collect()
}

fn assert_size_invariant(queue: &EventQueue, unprocessed: usize) {
    assert_eq!(
        queue.size(),
        queue.ready_for_processing().len() + queue.processing().len() + unprocessed
    );
    assert_eq!(queue.is_empty(), queue.size() == 0);
}

#[test]
fn version_then_object_in_one_object() {
    let mut queue = EventQueue::new();
    queue.load(version("V1", 1, "24", 50_000)).unwrap();
    queue.load(object("O1", 1, "24", 60_000)).unwrap();
    assert_size_invariant(&queue, 2);

    assert_eq!(ids(&queue.move_to_ready()), vec!["V1"]);
    assert_size_invariant(&queue, 1);
    let v1 = queue.move_ready_to_processing();
    assert_eq!(ids(&v1), vec!["V1"]);
    assert_eq!(v1[0].state(), ProcessingState::Processing);

    let released = queue.set_processing_complete(&v1[0]).unwrap();
    assert_eq!(ids(&released), vec!["O1"]);
    assert!(queue.move_to_ready().is_empty());
    assert_size_invariant(&queue, 0);

    let o1 = queue.move_ready_to_processing();
    assert!(queue.set_processing_complete(&o1[0]).unwrap().is_empty());
    assert!(queue.is_empty());
}

#[test]
fn versions_without_barrier_run_together() {
    let mut queue = EventQueue::new();
    queue.load(version("V1", 1, "25", 50_000)).unwrap();
    queue.load(version("V2", 1, "25", 60_000)).unwrap();

    assert_eq!(ids(&queue.move_to_ready()), vec!["V1", "V2"]);
    assert_eq!(ids(&queue.move_ready_to_processing()), vec!["V1", "V2"]);
}

#[test]
fn group_event_blocks_unrelated_object() {
    let mut queue = EventQueue::new();
    queue.load(group("G1", 1, 100_000)).unwrap();
    queue.load(object("O1", 1, "3", 110_000)).unwrap();

    assert_eq!(ids(&queue.move_to_ready()), vec!["G1"]);
    let g1 = queue.move_ready_to_processing();
    assert!(queue.move_to_ready().is_empty());
    assert!(queue.ready_for_processing().is_empty());

    assert_eq!(ids(&queue.set_processing_complete(&g1[0]).unwrap()), vec!["O1"]);
}

#[test]
fn complete_on_empty_queue_fails() {
    let mut queue = EventQueue::new();
    let event = version("V1", 1, "1", 1).with_state(ProcessingState::Processing);
    assert_eq!(
        queue.set_processing_complete(&event),
        Err(QueueError::NoSuchEvent {
            id: EventId::new("V1").unwrap()
        })
    );
}

#[test]
fn load_of_processing_event_fails() {
    let mut queue = EventQueue::new();
    let event = version("V1", 1, "1", 1).with_state(ProcessingState::Processing);
    assert!(matches!(
        queue.load(event),
        Err(QueueError::InvalidState {
            state: ProcessingState::Processing,
            ..
        })
    ));
    assert!(queue.is_empty());
    assert_eq!(queue.size(), 0);
}

#[test]
fn warm_start_with_unprocessed_entry_fails_entirely() {
    let events = vec![
        version("V1", 1, "1", 1).with_state(ProcessingState::Ready),
        version("V2", 2, "1", 2),
        version("V3", 3, "1", 3).with_state(ProcessingState::Processing),
    ];
    assert!(matches!(
        EventQueue::from_events(events),
        Err(QueueError::InvalidState { .. })
    ));
}

#[test]
fn warm_start_round_trip() {
    let events = vec![
        version("V1", 1, "1", 1).with_state(ProcessingState::Ready),
        object("O1", 1, "2", 2).with_state(ProcessingState::Processing),
        group("G1", 2, 3).with_state(ProcessingState::Processing),
        version("V2", 3, "1", 4).with_state(ProcessingState::Ready),
    ];
    let mut queue = EventQueue::from_events(events).unwrap();
    assert_eq!(ids(&queue.ready_for_processing()), vec!["V1", "V2"]);
    assert_eq!(ids(&queue.processing()), vec!["O1", "G1"]);
    assert!(queue.move_to_ready().is_empty());
    assert_size_invariant(&queue, 0);
}

#[test]
fn completion_tolerates_changed_bookkeeping_only() {
    let mut queue = EventQueue::new();
    queue.load(version("V1", 1, "1", 1)).unwrap();
    queue.move_to_ready();
    let checked_out = queue.move_ready_to_processing();

    let other_object = version("V1", 1, "2", 1).with_state(ProcessingState::Processing);
    assert!(queue.set_processing_complete(&other_object).is_err());
    let other_group = version("V1", 9, "1", 1).with_state(ProcessingState::Processing);
    assert!(queue.set_processing_complete(&other_group).is_err());
    assert_eq!(queue.processing(), checked_out);

    let returned = checked_out[0].with_state(ProcessingState::Indexed);
    queue.set_processing_complete(&returned).unwrap();
    assert!(queue.is_empty());
}

#[test]
fn snapshots_do_not_alias_the_queue() {
    let mut queue = EventQueue::new();
    queue.load(version("V1", 1, "1", 1)).unwrap();
    queue.move_to_ready();
    let mut ready = queue.ready_for_processing();
    ready.push(version("X", 1, "1", 2));
    ready.remove(0);
    assert_eq!(ids(&queue.ready_for_processing()), vec!["V1"]);
}

#[test]
fn groups_do_not_affect_each_other() {
    let mut queue = EventQueue::new();
    queue.load(group("G1", 1, 10)).unwrap();
    queue.load(version("A", 2, "1", 20)).unwrap();
    queue.load(object("B", 2, "2", 30)).unwrap();

    assert_eq!(ids(&queue.move_to_ready()), vec!["G1", "A", "B"]);
    let batch = queue.move_ready_to_processing();

    let g1 = batch.iter().find(|e| e.id().as_str() == "G1").unwrap();
    assert!(queue.set_processing_complete(g1).unwrap().is_empty());
    assert_eq!(ids(&queue.processing()), vec!["A", "B"]);
}

/// Deterministic pseudo-random sequence.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 33) % bound
    }
}

/// Check the fence rules over everything currently ready or processing.
fn assert_fences(in_flight: &[StoredEvent], unprocessed: &HashMap<String, StoredEvent>) {
    let key = |e: &StoredEvent| (e.timestamp(), e.id().clone());
    for running in in_flight {
        let group = running.event().access_group();
        let object = running.event().object_id();
        for waiting in unprocessed.values() {
            if waiting.event().access_group() != group || key(waiting) > key(running) {
                continue;
            }
            // Everything earlier in the group still waiting must not be a barrier over `running`.
            match (running.category(), waiting.category()) {
                (EventCategory::Group, _) => panic!("{} ran before {}", running.id(), waiting.id()),
                (_, EventCategory::Group) => panic!("{} ran before {}", running.id(), waiting.id()),
                (EventCategory::Object, _) if waiting.event().object_id() == object => {
                    panic!("{} ran before {}", running.id(), waiting.id())
                }
                (EventCategory::Version, EventCategory::Object)
                    if waiting.event().object_id() == object =>
                {
                    panic!("{} ran before {}", running.id(), waiting.id())
                }
                _ => {}
            }
        }
        for other in in_flight {
            if other.id() == running.id() || other.event().access_group() != group {
                continue;
            }
            let exclusive = match running.category() {
                EventCategory::Group => true,
                EventCategory::Object => other.event().object_id() == object,
                EventCategory::Version => false,
            };
            assert!(!exclusive, "{} ran alongside {}", running.id(), other.id());
        }
    }
}

#[test]
fn random_workload_respects_fences_and_drains() {
    let mut rng = Lcg(42);
    let mut queue = EventQueue::new();
    let mut unprocessed = HashMap::new();

    for n in 0..300 {
        let id = format!("e{n}");
        let group_id = rng.next(3) as i64;
        let object_id = rng.next(4).to_string();
        let ms = rng.next(10_000) as i64;
        let event = match rng.next(10) {
            0 => group(&id, group_id, ms),
            1 | 2 => object(&id, group_id, &object_id, ms),
            _ => version(&id, group_id, &object_id, ms),
        };
        unprocessed.insert(id, event.clone());
        queue.load(event).unwrap();
    }

    let mut completed = HashSet::new();
    while !queue.is_empty() {
        for event in queue.move_to_ready() {
            unprocessed.remove(event.id().as_str());
        }
        queue.move_ready_to_processing();
        assert_size_invariant(&queue, unprocessed.len());

        let processing = queue.processing();
        assert!(!processing.is_empty(), "queue stalled with {} events", queue.size());
        assert_fences(&processing, &unprocessed);

        let done = &processing[rng.next(processing.len() as u64) as usize];
        for event in queue.set_processing_complete(done).unwrap() {
            unprocessed.remove(event.id().as_str());
        }
        assert!(completed.insert(done.id().clone()));
        let mut in_flight = queue.ready_for_processing();
        in_flight.extend(queue.processing());
        assert_fences(&in_flight, &unprocessed);
    }

    assert_eq!(completed.len(), 300);
    assert!(unprocessed.is_empty());
}
