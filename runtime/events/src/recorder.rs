//!
//! `TraceRecorder`: feeds a real, already-observed execution directly into an [`EventStructure`]
//! (spec.md §2, §6 "the core consumes, from the instrumentation layer, a stream of typed events
//! per worker thread").
//!
//! Unlike `EventStructure::add_request`/`add_response`, which branch over every candidate a
//! request might synchronize with, a `TraceRecorder` already knows exactly which write a read
//! observed — the actor reported it directly — so it resolves each event's dependencies itself
//! instead of enumerating candidates. A location's first access synthesizes the ghost
//! `Initialization` write (spec.md §4.F "Initialization writes").
//!

use crate::event::{AccessKind, EventId, EventLabel, EventValue, Location, Phase, ThreadId};
use crate::structure::{EventStructure, EventsError};
use std::collections::HashMap;

/// Records one real execution's reported accesses into an owned [`EventStructure`], tracking
/// each location's most recent writer so reads and read-modify-writes can resolve their source
/// without search.
#[derive(Debug)]
pub struct TraceRecorder {
    structure: EventStructure,
    last_writer: HashMap<Location, EventId>,
}

impl TraceRecorder {
    /// A fresh recorder over `n_threads` threads, with nothing recorded yet.
    pub fn new(n_threads: usize) -> Self {
        Self {
            structure: EventStructure::new(n_threads),
            last_writer: HashMap::new(),
        }
    }

    /// The structure built so far.
    pub fn structure(&self) -> &EventStructure {
        &self.structure
    }

    /// Consumes the recorder, yielding the structure it built.
    pub fn into_structure(self) -> EventStructure {
        self.structure
    }

    /// Initializes `thread_id`; must be called once, before any other event on that thread.
    pub fn start_thread(&mut self, thread_id: ThreadId) -> Result<EventId, EventsError> {
        self.structure.add_total(thread_id, EventLabel::ThreadStart)
    }

    /// Marks `thread_id` as finished.
    pub fn finish_thread(&mut self, thread_id: ThreadId) -> Result<EventId, EventsError> {
        self.structure.add_total(thread_id, EventLabel::ThreadFinish)
    }

    fn source_for(&mut self, thread_id: ThreadId, location: Location, default_value: EventValue) -> Result<EventId, EventsError> {
        if let Some(&id) = self.last_writer.get(&location) {
            return Ok(id);
        }
        let id = self.structure.record_with_dependencies(
            thread_id,
            EventLabel::Initialization {
                location,
                value: default_value,
            },
            Vec::new(),
        )?;
        self.last_writer.insert(location, id);
        Ok(id)
    }

    /// Records a load of `location`, observing `value`. Synthesizes an `Initialization` write if
    /// this is the location's first access.
    pub fn record_read(&mut self, thread_id: ThreadId, location: Location, value: EventValue) -> Result<EventId, EventsError> {
        let source = self.source_for(thread_id, location, value)?;
        self.structure.record_with_dependencies(
            thread_id,
            EventLabel::MemoryAccess {
                kind: AccessKind::Read,
                location,
                value,
                is_exclusive: false,
                phase: Phase::Response,
            },
            vec![source],
        )
    }

    /// Records a plain store of `value` to `location`.
    pub fn record_write(&mut self, thread_id: ThreadId, location: Location, value: EventValue) -> Result<EventId, EventsError> {
        let id = self.structure.record_with_dependencies(
            thread_id,
            EventLabel::MemoryAccess {
                kind: AccessKind::Write,
                location,
                value,
                is_exclusive: false,
                phase: Phase::Total,
            },
            Vec::new(),
        )?;
        self.last_writer.insert(location, id);
        Ok(id)
    }

    /// Records the write half of a read-modify-write at `location`: its dependency is whichever
    /// write it atomically extended from, seeding this location's read-modify-write chain
    /// (spec.md §3 `ReadModifyWriteChain`).
    pub fn record_exclusive_write(&mut self, thread_id: ThreadId, location: Location, value: EventValue) -> Result<EventId, EventsError> {
        let source = self.source_for(thread_id, location, value)?;
        let id = self.structure.record_with_dependencies(
            thread_id,
            EventLabel::MemoryAccess {
                kind: AccessKind::Write,
                location,
                value,
                is_exclusive: true,
                phase: Phase::Total,
            },
            vec![source],
        )?;
        self.last_writer.insert(location, id);
        Ok(id)
    }

    /// Records a monitor acquire.
    pub fn record_lock(&mut self, thread_id: ThreadId, monitor: Location) -> Result<EventId, EventsError> {
        self.structure.add_total(thread_id, EventLabel::Lock { monitor })
    }

    /// Records a monitor release.
    pub fn record_unlock(&mut self, thread_id: ThreadId, monitor: Location) -> Result<EventId, EventsError> {
        self.structure.add_total(thread_id, EventLabel::Unlock { monitor })
    }

    /// Records a wait on a monitor's condition.
    pub fn record_wait(&mut self, thread_id: ThreadId, monitor: Location) -> Result<EventId, EventsError> {
        self.structure.add_total(thread_id, EventLabel::Wait { monitor })
    }

    /// Records a notify on a monitor's condition.
    pub fn record_notify(&mut self, thread_id: ThreadId, monitor: Location) -> Result<EventId, EventsError> {
        self.structure.add_total(thread_id, EventLabel::Notify { monitor })
    }
}
