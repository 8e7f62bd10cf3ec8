//!
//! `EventStructure`: the append-only DAG of events an invocation's trace is built from, and the
//! operations that grow, explore, and replay it (spec.md §4.F).
//!

use crate::event::{Event, EventId, EventLabel, ThreadId};
use crate::execution::ExecutionFrontier;
use crate::sync_algebra::{synchronize_barrier, synchronize_binary};
use lincheck_actor::clock::HBClock;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::trace;

/// Failures raised while growing or exploring an [`EventStructure`].
#[derive(Debug, Error)]
pub enum EventsError {
    /// A non-initializer label was added to a thread that has no `ThreadStart` yet.
    #[error("thread {thread} is not yet initialized for label {label}")]
    ThreadNotInitialized {
        /// The offending thread.
        thread: ThreadId,
        /// The label's `Display` rendering, for diagnostics.
        label: String,
    },
    /// A `ThreadStart` was added to an already-initialized thread.
    #[error("thread {thread} is already initialized")]
    ThreadAlreadyInitialized {
        /// The offending thread.
        thread: ThreadId,
    },
    /// Adding this event would make a dependency causally after its own would-be position.
    #[error("adding an event depending on {dependency} would create a causality cycle")]
    CausalityCycle {
        /// The dependency that is already causally ahead of the new event.
        dependency: EventId,
    },
    /// No candidate total event anywhere in the structure synchronizes with this request.
    #[error("no candidate event synchronizes with request {request}")]
    NoMatchingCandidate {
        /// The request event with no viable candidate.
        request: EventId,
    },
    /// A barrier request is missing one or more of the events it needs to fold.
    #[error("barrier request {request} is still missing candidates")]
    BarrierIncomplete {
        /// The incomplete barrier request.
        request: EventId,
    },
    /// An id was referenced that isn't (or is no longer, post-rollback) in the structure.
    #[error("unknown event id {0}")]
    UnknownEvent(EventId),
}

/// The append-only event DAG for one scenario invocation's trace (spec.md §3, §4.F).
pub struct EventStructure {
    store: Vec<Event>,
    frontier: ExecutionFrontier,
    /// Frontier as of just after each event was appended; used to reconstruct state when
    /// `start_next_exploration` rewinds to that event.
    snapshots: HashMap<EventId, ExecutionFrontier>,
    visited: HashSet<EventId>,
    initialized_threads: HashSet<ThreadId>,
    next_id: EventId,
    n_threads: usize,
}

impl EventStructure {
    /// An empty structure over `n_threads` threads.
    pub fn new(n_threads: usize) -> Self {
        Self {
            store: Vec::new(),
            frontier: ExecutionFrontier::new(n_threads),
            snapshots: HashMap::new(),
            visited: HashSet::new(),
            initialized_threads: HashSet::new(),
            next_id: 0,
            n_threads,
        }
    }

    /// Number of threads this structure was built for.
    pub fn n_threads(&self) -> usize {
        self.n_threads
    }

    /// Every event currently in the structure, in append (id) order.
    pub fn events(&self) -> &[Event] {
        &self.store
    }

    /// The current execution frontier.
    pub fn frontier(&self) -> &ExecutionFrontier {
        &self.frontier
    }

    /// Looks up an event by id.
    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.store.iter().find(|e| e.id == id)
    }

    /// Appends a self-contained event with no synchronization partner (spec.md §4.F
    /// `addTotal`), e.g. a non-exclusive write or a plain `ThreadStart`.
    pub fn add_total(&mut self, thread_id: ThreadId, label: EventLabel) -> Result<EventId, EventsError> {
        self.append(thread_id, label, Vec::new())
    }

    /// Appends a request event awaiting a later `add_response` (spec.md §4.F `addRequest`).
    pub fn add_request(&mut self, thread_id: ThreadId, label: EventLabel) -> Result<EventId, EventsError> {
        self.append(thread_id, label, Vec::new())
    }

    /// Appends an event whose causal dependencies are already known, rather than resolved by
    /// exploring candidates the way `add_response` does. For recording a real, already-observed
    /// execution (as opposed to branching exploration of hypothetical ones): the caller already
    /// knows which write a read observed, so it supplies that edge directly (spec.md §2, §6 "the
    /// core consumes... a stream of typed events").
    pub fn record_with_dependencies(&mut self, thread_id: ThreadId, label: EventLabel, dependencies: Vec<EventId>) -> Result<EventId, EventsError> {
        self.append(thread_id, label, dependencies)
    }

    /// Resolves `request_event` against every current candidate (spec.md §4.F `addResponse`).
    ///
    /// `Binary` requests produce one new response event per matching candidate (branching
    /// exploration); `Barrier` requests (only `ThreadJoin` today) produce at most one response,
    /// and only once every member of the barrier's candidate set is present.
    pub fn add_response(&mut self, request_event: EventId) -> Result<Vec<EventId>, EventsError> {
        let request = self
            .get(request_event)
            .cloned()
            .ok_or(EventsError::UnknownEvent(request_event))?;

        match request.label.sync_kind() {
            crate::event::SyncKind::Binary => {
                let location = request.label.location();
                let candidates: Vec<Event> = self
                    .store
                    .iter()
                    .filter(|e| e.label.location() == location && e.id != request_event)
                    .cloned()
                    .collect();

                let mut produced = Vec::new();
                for candidate in candidates {
                    if let Some(response_label) = synchronize_binary(&request.label, &candidate.label) {
                        let id = self.append(request.thread_id, response_label, vec![candidate.id])?;
                        produced.push(id);
                    }
                }

                if produced.is_empty() {
                    Err(EventsError::NoMatchingCandidate { request: request_event })
                } else {
                    Ok(produced)
                }
            }
            crate::event::SyncKind::Barrier => {
                let EventLabel::ThreadJoin { joined } = &request.label else {
                    unreachable!("only ThreadJoin is Barrier-kind today")
                };
                let finished_threads: Vec<ThreadId> = self
                    .store
                    .iter()
                    .filter(|e| matches!(e.label, EventLabel::ThreadFinish))
                    .map(|e| e.thread_id)
                    .collect();

                match synchronize_barrier(&request.label, &finished_threads) {
                    Some(response_label) => {
                        let dependencies: Vec<EventId> = self
                            .store
                            .iter()
                            .filter(|e| matches!(e.label, EventLabel::ThreadFinish) && joined.contains(&e.thread_id))
                            .map(|e| e.id)
                            .collect();
                        let id = self.append(request.thread_id, response_label, dependencies)?;
                        Ok(vec![id])
                    }
                    None => Err(EventsError::BarrierIncomplete { request: request_event }),
                }
            }
        }
    }

    /// Picks the most recently added unvisited event, truncates everything younger, restores
    /// the frontier to that event's post-append snapshot, and marks it visited (spec.md §4.F
    /// `startNextExploration`).
    pub fn start_next_exploration(&mut self) -> Option<EventId> {
        let candidate = self.store.iter().rev().find(|e| !self.visited.contains(&e.id))?.id;
        self.truncate_after(candidate);
        self.frontier = self
            .snapshots
            .get(&candidate)
            .cloned()
            .unwrap_or_else(|| ExecutionFrontier::new(self.n_threads));
        self.visited.insert(candidate);
        trace!(event = candidate, "starting next exploration branch");
        Some(candidate)
    }

    fn truncate_after(&mut self, id: EventId) {
        self.store.retain(|e| e.id <= id);
        self.snapshots.retain(|&k, _| k <= id);
        self.visited.retain(|&v| v <= id);
        self.next_id = id + 1;
        self.initialized_threads = self
            .store
            .iter()
            .filter(|e| matches!(e.label, EventLabel::ThreadStart))
            .map(|e| e.thread_id)
            .collect();
    }

    /// If the test emits a label matching the stored event at `thread_id`'s current frontier
    /// position, returns that event's id without creating a new one, preserving its identity
    /// and dependencies (spec.md §4.F Replay). Returns `None` once the frontier for this thread
    /// is exhausted or the emitted label no longer matches, meaning the caller should fall back
    /// to `add_total`/`add_request`.
    pub fn try_replay(&mut self, thread_id: ThreadId, label: &EventLabel) -> Option<EventId> {
        let next_position = match self.frontier.get(thread_id) {
            Some(last) => self.get(last)?.position + 1,
            None => 0,
        };
        let candidate = self
            .store
            .iter()
            .find(|e| e.thread_id == thread_id && e.position == next_position)?;
        if &candidate.label != label {
            return None;
        }
        let id = candidate.id;
        self.frontier.advance(thread_id, id);
        Some(id)
    }

    fn validate_thread_for(&self, thread_id: ThreadId, label: &EventLabel) -> Result<(), EventsError> {
        let is_initializer = matches!(label, EventLabel::ThreadStart);
        let already_init = self.initialized_threads.contains(&thread_id);
        if is_initializer {
            if already_init {
                return Err(EventsError::ThreadAlreadyInitialized { thread: thread_id });
            }
        } else if !already_init {
            return Err(EventsError::ThreadNotInitialized {
                thread: thread_id,
                label: label.to_string(),
            });
        }
        Ok(())
    }

    fn append(
        &mut self,
        thread_id: ThreadId,
        label: EventLabel,
        dependencies: Vec<EventId>,
    ) -> Result<EventId, EventsError> {
        self.validate_thread_for(thread_id, &label)?;

        let parent = self.frontier.get(thread_id);
        let position = match parent {
            Some(p) => self.get(p).ok_or(EventsError::UnknownEvent(p))?.position + 1,
            None => 0,
        };

        let mut clock = match parent {
            Some(p) => self.get(p).unwrap().causality_clock.clone(),
            None => HBClock::zero(self.n_threads),
        };
        for &dep in &dependencies {
            let dep_event = self.get(dep).ok_or(EventsError::UnknownEvent(dep))?;
            if dep_event.causality_clock.get(thread_id) > position {
                return Err(EventsError::CausalityCycle { dependency: dep });
            }
            clock.join(&dep_event.causality_clock);
        }
        clock.set(thread_id, position + 1);

        let is_thread_start = matches!(label, EventLabel::ThreadStart);
        let id = self.next_id;
        self.next_id += 1;

        self.store.push(Event {
            id,
            thread_id,
            position,
            label,
            parent,
            dependencies,
            causality_clock: clock,
        });
        self.frontier.advance(thread_id, id);
        self.snapshots.insert(id, self.frontier.clone());
        if is_thread_start {
            self.initialized_threads.insert(thread_id);
        }

        Ok(id)
    }
}

impl std::fmt::Debug for EventStructure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStructure")
            .field("n_events", &self.store.len())
            .field("n_threads", &self.n_threads)
            .field("frontier", &self.frontier)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{AccessKind, EventValue, Location, Phase};

    fn start(structure: &mut EventStructure, thread: ThreadId) -> EventId {
        structure.add_total(thread, EventLabel::ThreadStart).unwrap()
    }

    #[test]
    fn non_initializer_label_on_uninitialized_thread_is_rejected() {
        let mut structure = EventStructure::new(1);
        let err = structure
            .add_total(
                0,
                EventLabel::MemoryAccess {
                    kind: AccessKind::Write,
                    location: Location(1),
                    value: EventValue(1),
                    is_exclusive: false,
                    phase: Phase::Total,
                },
            )
            .unwrap_err();
        assert!(matches!(err, EventsError::ThreadNotInitialized { thread: 0, .. }));
    }

    #[test]
    fn double_thread_start_is_rejected() {
        let mut structure = EventStructure::new(1);
        start(&mut structure, 0);
        let err = structure.add_total(0, EventLabel::ThreadStart).unwrap_err();
        assert!(matches!(err, EventsError::ThreadAlreadyInitialized { thread: 0 }));
    }

    #[test]
    fn program_order_positions_increase_monotonically() {
        let mut structure = EventStructure::new(1);
        start(&mut structure, 0);
        let write = |s: &mut EventStructure, v: u64| {
            s.add_total(
                0,
                EventLabel::MemoryAccess {
                    kind: AccessKind::Write,
                    location: Location(1),
                    value: EventValue(v),
                    is_exclusive: false,
                    phase: Phase::Total,
                },
            )
            .unwrap()
        };
        let a = write(&mut structure, 1);
        let b = write(&mut structure, 2);
        assert_eq!(structure.get(a).unwrap().position, 1);
        assert_eq!(structure.get(b).unwrap().position, 2);
        assert!(structure.get(b).unwrap().causality_clock.get(0) > structure.get(a).unwrap().causality_clock.get(0));
    }

    #[test]
    fn read_request_synchronizes_with_existing_write() {
        let mut structure = EventStructure::new(2);
        start(&mut structure, 0);
        start(&mut structure, 1);
        structure
            .add_total(
                0,
                EventLabel::MemoryAccess {
                    kind: AccessKind::Write,
                    location: Location(1),
                    value: EventValue(7),
                    is_exclusive: false,
                    phase: Phase::Total,
                },
            )
            .unwrap();
        let request = structure
            .add_request(
                1,
                EventLabel::MemoryAccess {
                    kind: AccessKind::Read,
                    location: Location(1),
                    value: EventValue(0),
                    is_exclusive: false,
                    phase: Phase::Request,
                },
            )
            .unwrap();
        let responses = structure.add_response(request).unwrap();
        assert_eq!(responses.len(), 1);
        let response = structure.get(responses[0]).unwrap();
        match &response.label {
            EventLabel::MemoryAccess { value, phase, .. } => {
                assert_eq!(*value, EventValue(7));
                assert_eq!(*phase, Phase::Response);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn read_request_with_no_write_has_no_candidate() {
        let mut structure = EventStructure::new(1);
        start(&mut structure, 0);
        let request = structure
            .add_request(
                0,
                EventLabel::MemoryAccess {
                    kind: AccessKind::Read,
                    location: Location(1),
                    value: EventValue(0),
                    is_exclusive: false,
                    phase: Phase::Request,
                },
            )
            .unwrap();
        let err = structure.add_response(request).unwrap_err();
        assert!(matches!(err, EventsError::NoMatchingCandidate { .. }));
    }

    #[test]
    fn thread_join_waits_for_every_joined_finish() {
        let mut structure = EventStructure::new(3);
        start(&mut structure, 0);
        start(&mut structure, 1);
        start(&mut structure, 2);
        let join = structure
            .add_request(0, EventLabel::ThreadJoin { joined: vec![1, 2] })
            .unwrap();
        assert!(matches!(
            structure.add_response(join).unwrap_err(),
            EventsError::BarrierIncomplete { .. }
        ));

        structure.add_total(1, EventLabel::ThreadFinish).unwrap();
        assert!(matches!(
            structure.add_response(join).unwrap_err(),
            EventsError::BarrierIncomplete { .. }
        ));

        structure.add_total(2, EventLabel::ThreadFinish).unwrap();
        let responses = structure.add_response(join).unwrap();
        assert_eq!(responses.len(), 1);
    }

    #[test]
    fn start_next_exploration_truncates_younger_events_and_marks_visited() {
        let mut structure = EventStructure::new(1);
        let a = start(&mut structure, 0);
        let b = structure
            .add_total(
                0,
                EventLabel::MemoryAccess {
                    kind: AccessKind::Write,
                    location: Location(1),
                    value: EventValue(1),
                    is_exclusive: false,
                    phase: Phase::Total,
                },
            )
            .unwrap();

        let branch_point = structure.start_next_exploration().unwrap();
        assert_eq!(branch_point, b);
        assert_eq!(structure.events().len(), 2);

        let branch_point_2 = structure.start_next_exploration().unwrap();
        assert_eq!(branch_point_2, a);
        assert_eq!(structure.events().len(), 1);

        assert!(structure.start_next_exploration().is_none());
    }

    #[test]
    fn try_replay_reuses_matching_event_identity() {
        let mut structure = EventStructure::new(1);
        let a = start(&mut structure, 0);
        assert_eq!(structure.try_replay(0, &EventLabel::ThreadStart), None);

        // Rewind without truncating the store itself, to exercise replay against history: take
        // a fresh structure with the same trace and rewind its frontier only.
        let mut replayed = EventStructure::new(1);
        replayed.store = structure.store.clone();
        replayed.next_id = structure.next_id;
        replayed.frontier = ExecutionFrontier::new(1);

        let reused = replayed.try_replay(0, &EventLabel::ThreadStart).unwrap();
        assert_eq!(reused, a);
        assert_eq!(replayed.frontier.get(0), Some(a));
    }
}
