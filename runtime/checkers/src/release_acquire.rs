//!
//! Release/acquire (writes-before) checker: closes the writes-before relation at each location
//! over causality plus read-modify-write chain order, and rejects a cycle (spec.md §4.G, §7
//! `ReleaseAcquire`).
//!
//! Writes-before(`w1`, `w2`) holds when `w1` causally precedes `w2` (their causality clocks order
//! them), or when both belong to the same read-modify-write chain and `w1` precedes `w2` in chain
//! order. A location's writes-before relation must be a strict partial order; a cycle means two
//! writes are simultaneously ordered both ways, which cannot happen under any memory model.

use crate::aggregator::{FullChecker, IncrementalChecker};
use crate::atomicity::build_chains;
use crate::inconsistency::{IncrementalVerdict, Inconsistency};
use lincheck_events::event::{AccessKind, Event, EventId, EventLabel, Location, Phase};
use lincheck_events::execution::Execution;
use std::collections::{HashMap, HashSet};

/// Incremental + full release/acquire checker.
#[derive(Debug, Default)]
pub struct ReleaseAcquireChecker {
    writes_by_location: HashMap<Location, Vec<Event>>,
    reads_by_location: HashMap<Location, Vec<Event>>,
}

impl ReleaseAcquireChecker {
    /// A fresh checker with no recorded writes.
    pub fn new() -> Self {
        Self::default()
    }
}

/// `true` if `a` writes-before `b` via causality (their causality clocks are strictly ordered).
fn causally_orders(a: &Event, b: &Event) -> bool {
    a.causality_clock.happens_before(&b.causality_clock)
}

/// Derives the writes-before edges a location's reads force on its writes: for each read `r` and
/// each write `w` with `w hb r` and `w != readsFrom(r)`, `w` must be writes-before `readsFrom(r)`
/// (spec.md §4.G, second writes-before bullet) — otherwise `r` could have observed a write that a
/// causally-later write had already superseded.
fn read_derived_edges(writes: &[Event], reads: &[Event]) -> HashSet<(EventId, EventId)> {
    let mut edges = HashSet::new();
    for r in reads {
        let Some(&source) = r.dependencies.first() else {
            continue;
        };
        for w in writes {
            if w.id == source {
                continue;
            }
            if w.causality_clock.happens_before(&r.causality_clock) {
                edges.insert((w.id, source));
            }
        }
    }
    edges
}

/// Checks whether the writes at `location` admit an acyclic writes-before relation, combining
/// causal order, read-modify-write chain order, and the edges `reads` at this location force
/// (spec.md §4.G).
fn check_location(location: Location, writes: &[Event], reads: &[Event]) -> Option<Inconsistency> {
    let store: Vec<Event> = writes.to_vec();
    let chains = match build_chains(&store) {
        Ok(chains) => chains,
        Err(inc) => return Some(inc),
    };
    let mut chain_rank: HashMap<EventId, (usize, usize)> = HashMap::new();
    if let Some(chains_here) = chains.get(&location) {
        for (chain_idx, chain) in chains_here.iter().enumerate() {
            for (position, &id) in chain.writes().iter().enumerate() {
                chain_rank.insert(id, (chain_idx, position));
            }
        }
    }
    let derived = read_derived_edges(writes, reads);

    for a in writes {
        for b in writes {
            if a.id == b.id {
                continue;
            }
            let a_before_b = causally_orders(a, b)
                || matches!((chain_rank.get(&a.id), chain_rank.get(&b.id)), (Some((ca, pa)), Some((cb, pb))) if ca == cb && pa < pb)
                || derived.contains(&(a.id, b.id));
            let b_before_a = causally_orders(b, a)
                || matches!((chain_rank.get(&a.id), chain_rank.get(&b.id)), (Some((ca, pa)), Some((cb, pb))) if ca == cb && pb < pa)
                || derived.contains(&(b.id, a.id));
            if a_before_b && b_before_a {
                return Some(Inconsistency::ReleaseAcquire { location });
            }
        }
    }
    None
}

impl IncrementalChecker for ReleaseAcquireChecker {
    fn reset(&mut self, _store: &[Event], _execution: &Execution) {
        self.writes_by_location.clear();
        self.reads_by_location.clear();
    }

    fn check_event(&mut self, _store: &[Event], event: &Event) -> IncrementalVerdict {
        let is_write = matches!(
            event.label,
            EventLabel::MemoryAccess { kind: AccessKind::Write, .. } | EventLabel::Initialization { .. }
        );
        if let Some(location) = is_write.then(|| event.label.location()).flatten() {
            self.writes_by_location.entry(location).or_default().push(event.clone());
            // A full pairwise closure is cheap per-event only for small write sets; defer the
            // conclusive answer to the full pass rather than re-deriving chains on every event.
            return IncrementalVerdict::Unknown;
        }

        let is_read_response = matches!(
            event.label,
            EventLabel::MemoryAccess { kind: AccessKind::Read, phase: Phase::Response, .. }
        );
        if let Some(location) = is_read_response.then(|| event.label.location()).flatten() {
            self.reads_by_location.entry(location).or_default().push(event.clone());
            return IncrementalVerdict::Unknown;
        }

        IncrementalVerdict::Consistent
    }
}

impl FullChecker for ReleaseAcquireChecker {
    fn check(&self, store: &[Event], _execution: &Execution) -> Option<Inconsistency> {
        let mut writes_by_location: HashMap<Location, Vec<Event>> = HashMap::new();
        let mut reads_by_location: HashMap<Location, Vec<Event>> = HashMap::new();
        let mut seen_locations: HashSet<Location> = HashSet::new();
        for event in store {
            let is_write = matches!(
                event.label,
                EventLabel::MemoryAccess { kind: AccessKind::Write, .. } | EventLabel::Initialization { .. }
            );
            let is_read_response = matches!(
                event.label,
                EventLabel::MemoryAccess { kind: AccessKind::Read, phase: Phase::Response, .. }
            );
            let Some(location) = event.label.location() else { continue };
            if is_write {
                seen_locations.insert(location);
                writes_by_location.entry(location).or_default().push(event.clone());
            } else if is_read_response {
                reads_by_location.entry(location).or_default().push(event.clone());
            }
        }
        let empty = Vec::new();
        for location in seen_locations {
            let reads = reads_by_location.get(&location).unwrap_or(&empty);
            if let Some(inc) = check_location(location, &writes_by_location[&location], reads) {
                return Some(inc);
            }
        }
        None
    }
}
