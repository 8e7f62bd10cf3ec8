//!
//! Replay witness: re-runs an accepted candidate execution along its synthesized total order,
//! checking that every read returns the value of the write it should read from and that lock
//! discipline holds throughout (spec.md §4.G "Replay witness", §8 Property 8 "coherence
//! round-trip").
//!
//! Replay failure here means the coherence search accepted an order its own construction
//! violates — an internal invariant violation in the checkers, not a finding about the system
//! under test, since [`crate::coherence::find_execution_order`] is supposed to only ever return
//! orders that already satisfy these constraints.
//!

use lincheck_events::event::{AccessKind, Event, EventId, EventLabel, Location, Phase};
use std::collections::{HashMap, HashSet};

/// A replay-time invariant violation: the witness order produced by coherence search does not
/// actually replay cleanly.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ReplayViolation {
    /// A read in the witness order didn't observe the value its dependency write produced.
    #[error("replay mismatch at {location:?}: event {event} read {actual:?}, expected {expected:?} from {source}")]
    ValueMismatch {
        /// The location being read.
        location: Location,
        /// The offending read event.
        event: EventId,
        /// The value the witness read.
        actual: lincheck_events::event::EventValue,
        /// The value the source write produced.
        expected: lincheck_events::event::EventValue,
        /// The write event the read should have observed.
        source: EventId,
    },
    /// An `Unlock` appeared in the order without a matching outstanding `Lock`.
    #[error("replay lock violation on monitor {monitor:?} at event {event}")]
    LockViolation {
        /// The offending monitor.
        monitor: Location,
        /// The event where discipline broke.
        event: EventId,
    },
    /// The witness order references an event id not present in the store.
    #[error("witness order references unknown event {0}")]
    UnknownEvent(EventId),
}

/// Replays `store` along `order`, a witness produced by
/// [`crate::coherence::find_execution_order`], verifying every read's value and lock discipline.
///
/// This is a deterministic abstract machine: it holds only a per-location "current value" map
/// and a held-monitor set, both built purely from the events it has already replayed.
pub fn replay(store: &[Event], order: &[EventId]) -> Result<(), ReplayViolation> {
    let by_id: HashMap<EventId, &Event> = store.iter().map(|e| (e.id, e)).collect();
    let mut held: HashSet<Location> = HashSet::new();

    for &id in order {
        let event = *by_id.get(&id).ok_or(ReplayViolation::UnknownEvent(id))?;
        match &event.label {
            EventLabel::MemoryAccess {
                kind: AccessKind::Read,
                phase: Phase::Response,
                location,
                value,
                ..
            } => {
                if let Some(&source_id) = event.dependencies.first() {
                    let source = by_id.get(&source_id).ok_or(ReplayViolation::UnknownEvent(source_id))?;
                    let expected = match &source.label {
                        EventLabel::MemoryAccess { value, .. } | EventLabel::Initialization { value, .. } => *value,
                        other => panic!("read dependency {source_id} is not a write-producing label: {other}"),
                    };
                    if expected != *value {
                        return Err(ReplayViolation::ValueMismatch {
                            location: *location,
                            event: id,
                            actual: *value,
                            expected,
                            source: source_id,
                        });
                    }
                }
            }
            EventLabel::Lock { monitor } => {
                held.insert(*monitor);
            }
            EventLabel::Unlock { monitor } => {
                if !held.remove(monitor) {
                    return Err(ReplayViolation::LockViolation {
                        monitor: *monitor,
                        event: id,
                    });
                }
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coherence::find_execution_order;
    use lincheck_actor::clock::HBClock;
    use lincheck_events::event::EventValue;

    fn write(id: EventId, location: Location, value: u64) -> Event {
        Event {
            id,
            thread_id: 0,
            position: id,
            label: EventLabel::MemoryAccess {
                kind: AccessKind::Write,
                location,
                value: EventValue(value),
                is_exclusive: false,
                phase: Phase::Total,
            },
            parent: if id == 0 { None } else { Some(id - 1) },
            dependencies: Vec::new(),
            causality_clock: HBClock::zero(1),
        }
    }

    fn read(id: EventId, location: Location, value: u64, source: EventId) -> Event {
        Event {
            id,
            thread_id: 0,
            position: id,
            label: EventLabel::MemoryAccess {
                kind: AccessKind::Read,
                location,
                value: EventValue(value),
                is_exclusive: false,
                phase: Phase::Response,
            },
            parent: Some(id - 1),
            dependencies: vec![source],
            causality_clock: HBClock::zero(1),
        }
    }

    #[test]
    fn matching_read_replays_cleanly() {
        let store = vec![write(0, Location(1), 7), read(1, Location(1), 7, 0)];
        let order: Vec<EventId> = find_execution_order(&store).unwrap().unwrap();
        assert!(replay(&store, &order).is_ok());
    }

    #[test]
    fn mismatched_read_value_is_rejected() {
        let store = vec![write(0, Location(1), 7), read(1, Location(1), 99, 0)];
        let err = replay(&store, &[0, 1]).unwrap_err();
        assert!(matches!(err, ReplayViolation::ValueMismatch { .. }));
    }

    #[test]
    fn unlock_without_lock_is_rejected() {
        let store = vec![Event {
            id: 0,
            thread_id: 0,
            position: 0,
            label: EventLabel::Unlock { monitor: Location(1) },
            parent: None,
            dependencies: Vec::new(),
            causality_clock: HBClock::zero(1),
        }];
        let err = replay(&store, &[0]).unwrap_err();
        assert!(matches!(err, ReplayViolation::LockViolation { .. }));
    }
}
