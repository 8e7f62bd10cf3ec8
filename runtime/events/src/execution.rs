//!
//! `ExecutionFrontier` and `Execution`: the per-thread last-event map and the thread-indexed
//! views of the event store it drives (spec.md §3).
//!

use crate::event::{Event, EventId, ThreadId};
use std::fmt;

/// A mapping `threadId -> last event in that thread`; the execution's program-order maximum
/// (spec.md §3 `ExecutionFrontier`).
///
/// Snapshotted at the moment an event is created (so `startNextExploration` can reconstruct the
/// state of the world at a chosen branching point) and used to drive replay (the position in
/// each thread's event list the next `tryReplay` call should compare against).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionFrontier {
    last_event: Vec<Option<EventId>>,
}

impl ExecutionFrontier {
    /// An empty frontier over `n_threads` threads.
    pub fn new(n_threads: usize) -> Self {
        Self {
            last_event: vec![None; n_threads],
        }
    }

    /// Number of threads this frontier tracks.
    pub fn n_threads(&self) -> usize {
        self.last_event.len()
    }

    /// Thread `t`'s last recorded event, if any.
    pub fn get(&self, t: ThreadId) -> Option<EventId> {
        self.last_event[t]
    }

    /// Advances thread `t`'s frontier to `event`.
    pub fn advance(&mut self, t: ThreadId, event: EventId) {
        self.last_event[t] = Some(event);
    }

    /// Rewinds thread `t`'s frontier, e.g. during rollback.
    pub fn set(&mut self, t: ThreadId, event: Option<EventId>) {
        self.last_event[t] = event;
    }
}

impl fmt::Display for ExecutionFrontier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, e) in self.last_event.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match e {
                Some(id) => write!(f, "{id}")?,
                None => write!(f, "_")?,
            }
        }
        write!(f, "]")
    }
}

/// A thread-indexed view of an event store, closed under program order (spec.md §3
/// `Execution`): for each thread, the ordered list of events up to some [`ExecutionFrontier`].
#[derive(Clone, Debug)]
pub struct Execution {
    per_thread: Vec<Vec<EventId>>,
}

impl Execution {
    /// Builds the per-thread event-id lists implied by `frontier` over `store`, by walking each
    /// thread's chain of `parent` links back from its frontier entry.
    pub fn from_frontier(store: &[Event], frontier: &ExecutionFrontier) -> Self {
        let mut per_thread = vec![Vec::new(); frontier.n_threads()];
        for t in 0..frontier.n_threads() {
            let mut chain = Vec::new();
            let mut cursor = frontier.get(t);
            while let Some(id) = cursor {
                chain.push(id);
                cursor = store.iter().find(|e| e.id == id).and_then(|e| e.parent);
            }
            chain.reverse();
            per_thread[t] = chain;
        }
        Self { per_thread }
    }

    /// Thread `t`'s program-order event-id list.
    pub fn thread(&self, t: ThreadId) -> &[EventId] {
        &self.per_thread[t]
    }

    /// Number of threads in this execution.
    pub fn n_threads(&self) -> usize {
        self.per_thread.len()
    }

    /// Iterates over every event id in this execution, in no particular cross-thread order.
    pub fn all_ids(&self) -> impl Iterator<Item = EventId> + '_ {
        self.per_thread.iter().flatten().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventLabel;
    use lincheck_actor::clock::HBClock;

    fn event(id: EventId, thread_id: ThreadId, position: u64, parent: Option<EventId>) -> Event {
        Event {
            id,
            thread_id,
            position,
            label: EventLabel::ThreadStart,
            parent,
            dependencies: Vec::new(),
            causality_clock: HBClock::zero(1),
        }
    }

    #[test]
    fn from_frontier_walks_parent_chain_in_order() {
        let store = vec![event(0, 0, 0, None), event(1, 0, 1, Some(0)), event(2, 0, 2, Some(1))];
        let mut frontier = ExecutionFrontier::new(1);
        frontier.advance(0, 2);
        let execution = Execution::from_frontier(&store, &frontier);
        assert_eq!(execution.thread(0), &[0, 1, 2]);
    }

    #[test]
    fn empty_frontier_yields_empty_thread() {
        let store: Vec<Event> = Vec::new();
        let frontier = ExecutionFrontier::new(2);
        let execution = Execution::from_frontier(&store, &frontier);
        assert!(execution.thread(0).is_empty());
        assert!(execution.thread(1).is_empty());
    }
}
