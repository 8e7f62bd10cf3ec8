//!
//! Atomicity checker: maintains, per location, the read-modify-write chains, and rejects a new
//! exclusive write if another chain already extends from the same predecessor (spec.md §4.G
//! "Atomicity checker").
//!

use crate::aggregator::{FullChecker, IncrementalChecker};
use crate::inconsistency::{IncrementalVerdict, Inconsistency};
use lincheck_events::event::{Event, EventId, Location};
use lincheck_events::execution::Execution;
use lincheck_events::rmw::{is_exclusive_write, ReadModifyWriteChain};
use std::collections::HashMap;

/// An exclusive write's predecessor key: the write its exclusive read-part observed, or `None`
/// for the chain's anchor.
type ChainKey = (Location, Option<EventId>);

/// Groups every exclusive write in `store` into its [`ReadModifyWriteChain`], keyed by location.
///
/// Two writes sharing a `(location, predecessor)` key belong to the same anchor and are an
/// atomicity violation rather than two valid chains; this function reports the first such pair
/// it finds via `Err`, or the completed per-location chain map via `Ok`.
pub fn build_chains(store: &[Event]) -> Result<HashMap<Location, Vec<ReadModifyWriteChain>>, Inconsistency> {
    let mut anchors: HashMap<ChainKey, EventId> = HashMap::new();
    // Index of the chain currently tipped by a given write, per location.
    let mut tip_index: HashMap<(Location, EventId), usize> = HashMap::new();
    let mut chains: HashMap<Location, Vec<ReadModifyWriteChain>> = HashMap::new();

    for event in store {
        if !is_exclusive_write(event) {
            continue;
        }
        let location = event.label.location().expect("exclusive write has a location");
        let predecessor = event.dependencies.first().copied();
        let key = (location, predecessor);

        if let Some(&existing) = anchors.get(&key) {
            if existing != event.id {
                return Err(Inconsistency::Atomicity {
                    location,
                    first: existing,
                    second: event.id,
                });
            }
            continue;
        }
        anchors.insert(key, event.id);

        let list = chains.entry(location).or_default();
        match predecessor.and_then(|p| tip_index.remove(&(location, p))) {
            Some(chain_index) => {
                list[chain_index].push(event.id);
                tip_index.insert((location, event.id), chain_index);
            }
            None => {
                list.push(ReadModifyWriteChain::new(location, event.id));
                tip_index.insert((location, event.id), list.len() - 1);
            }
        }
    }

    Ok(chains)
}

/// Incremental + full atomicity checker (spec.md §4.G, Property 7).
#[derive(Debug, Default)]
pub struct AtomicityChecker {
    anchors: HashMap<ChainKey, EventId>,
}

impl AtomicityChecker {
    /// A fresh checker with no recorded anchors.
    pub fn new() -> Self {
        Self::default()
    }
}

impl IncrementalChecker for AtomicityChecker {
    fn reset(&mut self, _store: &[Event], _execution: &Execution) {
        self.anchors.clear();
    }

    fn check_event(&mut self, _store: &[Event], event: &Event) -> IncrementalVerdict {
        if !is_exclusive_write(event) {
            return IncrementalVerdict::Consistent;
        }
        let location = event.label.location().expect("exclusive write has a location");
        let predecessor = event.dependencies.first().copied();
        let key = (location, predecessor);

        match self.anchors.get(&key) {
            Some(&existing) if existing != event.id => IncrementalVerdict::Inconsistent(Inconsistency::Atomicity {
                location,
                first: existing,
                second: event.id,
            }),
            _ => {
                self.anchors.insert(key, event.id);
                IncrementalVerdict::Consistent
            }
        }
    }
}

impl FullChecker for AtomicityChecker {
    fn check(&self, store: &[Event], _execution: &Execution) -> Option<Inconsistency> {
        build_chains(store).err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lincheck_actor::clock::HBClock;
    use lincheck_events::event::{AccessKind, EventLabel, EventValue, Phase};

    fn exclusive_write(id: EventId, thread_id: usize, location: Location, reads_from: Option<EventId>) -> Event {
        Event {
            id,
            thread_id,
            position: id,
            label: EventLabel::MemoryAccess {
                kind: AccessKind::Write,
                location,
                value: EventValue(id),
                is_exclusive: true,
                phase: Phase::Total,
            },
            parent: if id == 0 { None } else { Some(id - 1) },
            dependencies: reads_from.into_iter().collect(),
            causality_clock: HBClock::zero(1),
        }
    }

    #[test]
    fn two_chains_from_same_anchor_is_rejected() {
        let store = vec![
            exclusive_write(0, 0, Location(1), None),
            exclusive_write(1, 0, Location(1), Some(0)),
            exclusive_write(2, 0, Location(1), Some(0)),
        ];
        let err = build_chains(&store).unwrap_err();
        assert!(matches!(err, Inconsistency::Atomicity { .. }));
    }

    #[test]
    fn a_single_chain_is_accepted() {
        let store = vec![
            exclusive_write(0, 0, Location(1), None),
            exclusive_write(1, 0, Location(1), Some(0)),
            exclusive_write(2, 0, Location(1), Some(1)),
        ];
        let chains = build_chains(&store).unwrap();
        let chain = &chains[&Location(1)][0];
        assert_eq!(chain.writes(), &[0, 1, 2]);
    }

    #[test]
    fn incremental_checker_matches_full_checker() {
        let store = vec![
            exclusive_write(0, 0, Location(1), None),
            exclusive_write(1, 0, Location(1), Some(0)),
            exclusive_write(2, 0, Location(1), Some(0)),
        ];
        let mut checker = AtomicityChecker::new();
        let mut last = IncrementalVerdict::Consistent;
        for event in &store {
            last = checker.check_event(&store, event);
            if matches!(last, IncrementalVerdict::Inconsistent(_)) {
                break;
            }
        }
        assert!(matches!(last, IncrementalVerdict::Inconsistent(_)));
    }
}
