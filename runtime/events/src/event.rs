//!
//! The event and label vocabulary an execution is built from (spec.md §3, §4.F).
//!

use lincheck_actor::clock::HBClock;
use std::fmt;

/// Globally monotone event identifier.
pub type EventId = u64;

/// Index of a parallel thread, matching the thread indices used by `lincheck-pool`.
pub type ThreadId = usize;

/// An opaque, hashable identity for a memory location. The instrumentation layer is expected to
/// derive this from whatever address or field identity it observes; lincheck never interprets
/// the value itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location(pub u64);

/// An opaque value read or written by a memory access, or carried by a lock/wait/notify event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EventValue(pub u64);

/// Read or write side of a [`EventLabel::MemoryAccess`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessKind {
    /// A load.
    Read,
    /// A store.
    Write,
}

/// Which of the three emission styles (spec.md §4.F) produced an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// The first half of a synchronized operation (e.g. a blocking read before it has a
    /// source).
    Request,
    /// The synchronized completion of a prior request.
    Response,
    /// An unsynchronized, self-contained event (e.g. a plain write).
    Total,
}

/// Whether a label's response is produced by pairing with a single candidate or by folding a
/// whole set of candidates (spec.md §4.F Synchronization algebra).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyncKind {
    /// A response pairs the request with exactly one candidate total event; every candidate
    /// yields its own new response event, enabling branching exploration.
    Binary,
    /// A response requires folding the request together with a whole set of candidates; it is
    /// only emitted once every candidate in the set is present.
    Barrier,
}

/// The label of one [`Event`] (spec.md §3 `EventLabel variants`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventLabel {
    /// A thread is forked from its parent.
    ThreadFork {
        /// The forked child's thread id.
        child: ThreadId,
    },
    /// A thread begins running.
    ThreadStart,
    /// A thread has finished running.
    ThreadFinish,
    /// A join request/response on a set of other threads; a `Barrier` synchronization that only
    /// completes once every joined thread has a recorded `ThreadFinish`.
    ThreadJoin {
        /// The threads being joined.
        joined: Vec<ThreadId>,
    },
    /// A read or write of a memory location.
    MemoryAccess {
        /// Read or write.
        kind: AccessKind,
        /// The location accessed.
        location: Location,
        /// The value written, or (once resolved) the value read.
        value: EventValue,
        /// `true` for a read-modify-write's exclusive part (spec.md §3 `ReadModifyWriteChain`).
        is_exclusive: bool,
        /// Request, Response, or Total.
        phase: Phase,
    },
    /// A monitor acquire.
    Lock {
        /// The monitor's identity.
        monitor: Location,
    },
    /// A monitor release.
    Unlock {
        /// The monitor's identity.
        monitor: Location,
    },
    /// A wait on a monitor's condition.
    Wait {
        /// The monitor's identity.
        monitor: Location,
    },
    /// A notify on a monitor's condition.
    Notify {
        /// The monitor's identity.
        monitor: Location,
    },
    /// A synthesized initializer write, emitted the first time a location is read with no prior
    /// write in the execution (spec.md §4.F "Initialization writes").
    Initialization {
        /// The location being initialized.
        location: Location,
        /// The type's default value.
        value: EventValue,
    },
    /// A heap allocation.
    ObjectAllocation {
        /// The allocated location's identity.
        location: Location,
    },
}

impl EventLabel {
    /// This label's synchronization kind.
    pub fn sync_kind(&self) -> SyncKind {
        match self {
            EventLabel::ThreadJoin { .. } => SyncKind::Barrier,
            _ => SyncKind::Binary,
        }
    }

    /// The location this label touches, if any. Used to group candidates for synchronization
    /// and to index read-modify-write chains.
    pub fn location(&self) -> Option<Location> {
        match self {
            EventLabel::MemoryAccess { location, .. }
            | EventLabel::Lock { monitor: location }
            | EventLabel::Unlock { monitor: location }
            | EventLabel::Wait { monitor: location }
            | EventLabel::Notify { monitor: location }
            | EventLabel::Initialization { location, .. }
            | EventLabel::ObjectAllocation { location } => Some(*location),
            EventLabel::ThreadFork { .. } | EventLabel::ThreadStart | EventLabel::ThreadFinish | EventLabel::ThreadJoin { .. } => None,
        }
    }

    /// `true` if this label was created as a request awaiting a response.
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            EventLabel::MemoryAccess {
                phase: Phase::Request,
                ..
            }
        ) || matches!(self, EventLabel::Lock { .. } | EventLabel::Wait { .. } | EventLabel::ThreadJoin { .. })
    }
}

impl fmt::Display for EventLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventLabel::ThreadFork { child } => write!(f, "ThreadFork(child={child})"),
            EventLabel::ThreadStart => write!(f, "ThreadStart"),
            EventLabel::ThreadFinish => write!(f, "ThreadFinish"),
            EventLabel::ThreadJoin { joined } => write!(f, "ThreadJoin(joined={joined:?})"),
            EventLabel::MemoryAccess {
                kind,
                location,
                phase,
                is_exclusive,
                ..
            } => write!(
                f,
                "MemoryAccess({kind:?}, {location:?}, phase={phase:?}, excl={is_exclusive})"
            ),
            EventLabel::Lock { monitor } => write!(f, "Lock({monitor:?})"),
            EventLabel::Unlock { monitor } => write!(f, "Unlock({monitor:?})"),
            EventLabel::Wait { monitor } => write!(f, "Wait({monitor:?})"),
            EventLabel::Notify { monitor } => write!(f, "Notify({monitor:?})"),
            EventLabel::Initialization { location, .. } => write!(f, "Initialization({location:?})"),
            EventLabel::ObjectAllocation { location } => write!(f, "ObjectAllocation({location:?})"),
        }
    }
}

/// An immutable record of one memory or synchronization action (spec.md §3 `Event`).
///
/// `position = parent.position + 1`, or `0` for a thread's first event. `causality_clock =
/// max(parent.clock, ⋁ dependency.clock)` with this event's own thread component bumped past
/// whatever it already held.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally monotone identifier.
    pub id: EventId,
    /// The thread this event belongs to (`label.thread_id` in spec terms — carried directly
    /// here rather than recomputed from the label since several labels, e.g. `ThreadJoin`, name
    /// other threads too).
    pub thread_id: ThreadId,
    /// Position within `thread_id`'s program order.
    pub position: u64,
    /// This event's label.
    pub label: EventLabel,
    /// The program-order predecessor, if any.
    pub parent: Option<EventId>,
    /// Non-program-order causal predecessors (e.g. the write a read synchronized with).
    pub dependencies: Vec<EventId>,
    /// This event's causality clock.
    pub causality_clock: HBClock,
}

impl Event {
    /// `true` if `self` causally depends on `other` via program order or an explicit
    /// dependency edge (not via the causality clock, which this is used to *build*).
    pub fn directly_depends_on(&self, other: EventId) -> bool {
        self.parent == Some(other) || self.dependencies.contains(&other)
    }
}
