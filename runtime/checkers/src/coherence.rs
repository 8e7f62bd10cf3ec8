//!
//! Coherence checker: the full sequential-consistency search. Enumerates per-location
//! topological orderings of the writes-before-plus-chain-order graph, builds the resulting
//! reads-from/reads-before edges, and attempts to fold everything plus program order and
//! wait/notify ordering into one acyclic global execution order via Kahn's algorithm (spec.md
//! §4.G, §7 `SequentialConsistencyCoherence`).
//!

use crate::aggregator::FullChecker;
use crate::atomicity::build_chains;
use crate::inconsistency::Inconsistency;
use lincheck_events::event::{AccessKind, Event, EventId, EventLabel, Location, Phase};
use lincheck_events::execution::Execution;
use std::collections::{HashMap, HashSet, VecDeque};

/// Above this many writes at a single location, coherence search falls back to accepting the
/// writes' causal/program order directly rather than enumerating permutations, to avoid
/// exponential blowup; this is logged via `tracing::warn` so callers can see when the bound
/// was hit.
const MAX_ENUMERATED_WRITES: usize = 8;

/// The full coherence (sequential-consistency) checker.
#[derive(Debug, Default)]
pub struct CoherenceChecker;

impl CoherenceChecker {
    /// A fresh coherence checker. Stateless: coherence is only ever checked as a full pass.
    pub fn new() -> Self {
        Self
    }
}

/// One candidate total order of the writes to a single location, tip-to-anchor reversed into
/// anchor-first order.
fn enumerate_orders(writes: &[EventId], edges: &HashMap<EventId, HashSet<EventId>>) -> Vec<Vec<EventId>> {
    if writes.len() > MAX_ENUMERATED_WRITES {
        tracing::warn!(
            count = writes.len(),
            bound = MAX_ENUMERATED_WRITES,
            "coherence: too many writes to enumerate, falling back to a single causal order"
        );
        let mut remaining: HashSet<EventId> = writes.iter().copied().collect();
        let mut order = Vec::new();
        while !remaining.is_empty() {
            let next = *remaining
                .iter()
                .find(|&&w| {
                    edges
                        .get(&w)
                        .map(|preds| preds.iter().all(|p| !remaining.contains(p)))
                        .unwrap_or(true)
                })
                .unwrap_or_else(|| remaining.iter().next().expect("remaining is non-empty"));
            order.push(next);
            remaining.remove(&next);
        }
        return vec![order];
    }

    fn backtrack(
        remaining: &HashSet<EventId>,
        edges: &HashMap<EventId, HashSet<EventId>>,
        chosen: &mut Vec<EventId>,
        out: &mut Vec<Vec<EventId>>,
    ) {
        if remaining.is_empty() {
            out.push(chosen.clone());
            return;
        }
        let ready: Vec<EventId> = remaining
            .iter()
            .copied()
            .filter(|w| edges.get(w).map(|preds| preds.is_disjoint(remaining)).unwrap_or(true))
            .collect();
        for candidate in ready {
            let mut next_remaining = remaining.clone();
            next_remaining.remove(&candidate);
            chosen.push(candidate);
            backtrack(&next_remaining, edges, chosen, out);
            chosen.pop();
        }
    }

    let remaining: HashSet<EventId> = writes.iter().copied().collect();
    let mut out = Vec::new();
    backtrack(&remaining, edges, &mut Vec::new(), &mut out);
    out
}

/// Builds the predecessor map (event -> writes that must precede it in any valid order) from
/// causal order, read-modify-write chain order, and the edges `reads` at this location force:
/// for each read `r` and each write `w` with `w hb r` and `w != readsFrom(r)`, `w` must precede
/// `readsFrom(r)` (spec.md §4.G, second writes-before bullet) — mirroring
/// [`crate::release_acquire::ReleaseAcquireChecker`]'s notion of writes-before.
fn writes_before_edges(
    location: Location,
    writes: &[Event],
    chains: &HashMap<Location, Vec<lincheck_events::rmw::ReadModifyWriteChain>>,
    reads: &[&Event],
) -> HashMap<EventId, HashSet<EventId>> {
    let mut chain_rank: HashMap<EventId, (usize, usize)> = HashMap::new();
    if let Some(chains_here) = chains.get(&location) {
        for (chain_idx, chain) in chains_here.iter().enumerate() {
            for (position, &id) in chain.writes().iter().enumerate() {
                chain_rank.insert(id, (chain_idx, position));
            }
        }
    }

    let mut edges: HashMap<EventId, HashSet<EventId>> = HashMap::new();
    for a in writes {
        for b in writes {
            if a.id == b.id {
                continue;
            }
            let ordered = a.causality_clock.happens_before(&b.causality_clock)
                || matches!((chain_rank.get(&a.id), chain_rank.get(&b.id)), (Some((ca, pa)), Some((cb, pb))) if ca == cb && pa < pb);
            if ordered {
                edges.entry(b.id).or_default().insert(a.id);
            }
        }
    }
    for r in reads {
        let Some(&source) = r.dependencies.first() else {
            continue;
        };
        for w in writes {
            if w.id == source {
                continue;
            }
            if w.causality_clock.happens_before(&r.causality_clock) {
                edges.entry(source).or_default().insert(w.id);
            }
        }
    }
    edges
}

/// Builds the reads-from/reads-before edges a completed coherence order on `writes` (anchor
/// first) implies for every read at `location`: each read must be ordered after the write it
/// synchronized with, and before every write later in the order (spec.md §4.G "extended
/// coherence").
fn extended_coherence_edges(order: &[EventId], reads: &[&Event]) -> Vec<(EventId, EventId)> {
    let mut edges = Vec::new();
    for read in reads {
        let Some(&source) = read.dependencies.first() else {
            continue;
        };
        let Some(source_pos) = order.iter().position(|&w| w == source) else {
            continue;
        };
        edges.push((source, read.id));
        for &later in &order[source_pos + 1..] {
            edges.push((read.id, later));
        }
    }
    edges
}

/// Attempts to fold `base_edges` (program order, extended coherence, wait-before-notify) plus
/// one `extra` set of per-location coherence edges into a single acyclic total order via Kahn's
/// algorithm.
fn try_topological_order(
    all_ids: &HashSet<EventId>,
    base_edges: &[(EventId, EventId)],
    extra: &[(EventId, EventId)],
) -> Option<Vec<EventId>> {
    let mut indegree: HashMap<EventId, usize> = all_ids.iter().map(|&id| (id, 0)).collect();
    let mut adj: HashMap<EventId, Vec<EventId>> = HashMap::new();
    for &(before, after) in base_edges.iter().chain(extra.iter()) {
        adj.entry(before).or_default().push(after);
        *indegree.entry(after).or_insert(0) += 1;
    }

    let mut queue: VecDeque<EventId> = indegree
        .iter()
        .filter(|&(_, &deg)| deg == 0)
        .map(|(&id, _)| id)
        .collect();
    let mut order = Vec::with_capacity(all_ids.len());
    while let Some(id) = queue.pop_front() {
        order.push(id);
        if let Some(succs) = adj.get(&id) {
            for &succ in succs {
                let deg = indegree.get_mut(&succ).expect("successor tracked in indegree map");
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(succ);
                }
            }
        }
    }
    (order.len() == all_ids.len()).then_some(order)
}

/// Program order plus wait-before-notify edges, independent of any per-location coherence
/// choice.
fn base_edges(store: &[Event]) -> Vec<(EventId, EventId)> {
    let mut edges = Vec::new();
    for event in store {
        if let Some(parent) = event.parent {
            edges.push((parent, event.id));
        }
        for &dep in &event.dependencies {
            edges.push((dep, event.id));
        }
        if matches!(event.label, EventLabel::Wait { .. }) {
            if let Some(notify) = store
                .iter()
                .find(|e| matches!(&e.label, EventLabel::Notify { monitor } if Some(*monitor) == event.label.location()) && e.id != event.id)
            {
                edges.push((event.id, notify.id));
            }
        }
    }
    edges
}

/// Attempts to find a total execution order consistent with causality, extended coherence, and
/// the wait-before-notify / dependency-before-event atomicity constraints (spec.md §4.G
/// "Coherence order"). Returns the witness order, anchor-first, or `None` if no candidate
/// per-location coherence ordering extends to an acyclic global order.
pub fn find_execution_order(store: &[Event]) -> Result<Option<Vec<EventId>>, Inconsistency> {
    let chains = build_chains(store)?;

    let mut by_location: HashMap<Location, Vec<Event>> = HashMap::new();
    let mut reads_by_location: HashMap<Location, Vec<&Event>> = HashMap::new();
    for event in store {
        let Some(location) = event.label.location() else { continue };
        match &event.label {
            EventLabel::MemoryAccess { kind: AccessKind::Write, .. } | EventLabel::Initialization { .. } => {
                by_location.entry(location).or_default().push(event.clone());
            }
            EventLabel::MemoryAccess {
                kind: AccessKind::Read,
                phase: Phase::Response,
                ..
            } => {
                reads_by_location.entry(location).or_default().push(event);
            }
            _ => {}
        }
    }

    let base = base_edges(store);
    let all_ids: HashSet<EventId> = store.iter().map(|e| e.id).collect();

    let locations: Vec<Location> = by_location.keys().copied().collect();
    let empty_reads: Vec<&Event> = Vec::new();
    let candidate_orders: Vec<Vec<Vec<EventId>>> = locations
        .iter()
        .map(|&location| {
            let writes = &by_location[&location];
            let ids: Vec<EventId> = writes.iter().map(|w| w.id).collect();
            let reads = reads_by_location.get(&location).unwrap_or(&empty_reads);
            let edges = writes_before_edges(location, writes, &chains, reads);
            enumerate_orders(&ids, &edges)
        })
        .collect();

    Ok(search_combinations(&locations, &candidate_orders, &reads_by_location, &all_ids, &base, 0, &mut Vec::new()))
}

impl FullChecker for CoherenceChecker {
    fn check(&self, store: &[Event], _execution: &Execution) -> Option<Inconsistency> {
        match find_execution_order(store) {
            Err(inc) => Some(inc),
            Ok(Some(_)) => None,
            Ok(None) => {
                let location = store.iter().find_map(|e| e.label.location());
                location.map(|location| Inconsistency::SequentialConsistencyCoherence { location })
            }
        }
    }
}

/// Recursively tries every combination of per-location candidate orders, accepting the first
/// one whose extended-coherence edges plus `base` fold into an acyclic total order.
fn search_combinations(
    locations: &[Location],
    candidate_orders: &[Vec<Vec<EventId>>],
    reads_by_location: &HashMap<Location, Vec<&Event>>,
    all_ids: &HashSet<EventId>,
    base: &[(EventId, EventId)],
    index: usize,
    chosen_edges: &mut Vec<(EventId, EventId)>,
) -> Option<Vec<EventId>> {
    if index == locations.len() {
        return try_topological_order(all_ids, base, chosen_edges);
    }
    let location = locations[index];
    let empty = Vec::new();
    let reads = reads_by_location.get(&location).unwrap_or(&empty);
    if candidate_orders[index].is_empty() {
        return search_combinations(locations, candidate_orders, reads_by_location, all_ids, base, index + 1, chosen_edges);
    }
    for order in &candidate_orders[index] {
        let mut extra = extended_coherence_edges(order, reads);
        let before_len = chosen_edges.len();
        chosen_edges.append(&mut extra);
        if let Some(witness) = search_combinations(locations, candidate_orders, reads_by_location, all_ids, base, index + 1, chosen_edges) {
            return Some(witness);
        }
        chosen_edges.truncate(before_len);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use lincheck_actor::clock::HBClock;
    use lincheck_events::event::EventValue;

    fn write(id: EventId, thread: usize, clock_component: u64, location: Location) -> Event {
        let mut clock = HBClock::zero(2);
        for _ in 0..clock_component {
            clock.advance(thread);
        }
        Event {
            id,
            thread_id: thread,
            position: 0,
            label: EventLabel::MemoryAccess {
                kind: AccessKind::Write,
                location,
                value: EventValue(id),
                is_exclusive: false,
                phase: Phase::Total,
            },
            parent: None,
            dependencies: Vec::new(),
            causality_clock: clock,
        }
    }

    #[test]
    fn two_concurrent_writes_have_a_coherence_order() {
        let store = vec![write(0, 0, 1, Location(1)), write(1, 1, 1, Location(1))];
        let execution = Execution::from_frontier(&store, &lincheck_events::execution::ExecutionFrontier::new(2));
        let checker = CoherenceChecker::new();
        assert!(checker.check(&store, &execution).is_none());
    }

    #[test]
    fn read_derived_edge_constrains_candidate_order() {
        // w0 and w1 are concurrent; with no reads, either write-order is a valid candidate.
        let w0 = write(0, 0, 1, Location(1));
        let w1 = write(1, 1, 1, Location(1));
        let chains = build_chains(&[w0.clone(), w1.clone()]).unwrap();
        let edges = writes_before_edges(Location(1), &[w0.clone(), w1.clone()], &chains, &[]);
        assert!(edges.get(&0).map(|preds| preds.is_empty()).unwrap_or(true));
        assert!(edges.get(&1).map(|preds| preds.is_empty()).unwrap_or(true));

        // A read on w0's thread, after w0, that reads from w1 forces w0 before w1: w0 hb the
        // read and the read's source is w1.
        let mut read_clock = HBClock::zero(2);
        read_clock.advance(0);
        read_clock.advance(0);
        let read = Event {
            id: 2,
            thread_id: 0,
            position: 1,
            label: EventLabel::MemoryAccess {
                kind: AccessKind::Read,
                location: Location(1),
                value: EventValue(1),
                is_exclusive: false,
                phase: Phase::Response,
            },
            parent: Some(0),
            dependencies: vec![1],
            causality_clock: read_clock,
        };
        let edges = writes_before_edges(Location(1), &[w0, w1], &chains, &[&read]);
        assert!(edges.get(&1).expect("w1 must now have a recorded predecessor").contains(&0));
    }

    #[test]
    fn no_writes_is_trivially_coherent() {
        let store: Vec<Event> = Vec::new();
        let execution = Execution::from_frontier(&store, &lincheck_events::execution::ExecutionFrontier::new(0));
        let checker = CoherenceChecker::new();
        assert!(checker.check(&store, &execution).is_none());
    }
}
