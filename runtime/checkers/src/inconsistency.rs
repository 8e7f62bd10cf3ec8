//!
//! The inconsistency taxonomy checkers report (spec.md §4.G, §7 `InconsistencyDetected(kind)`).
//!

use lincheck_events::event::{EventId, Location};

/// Which memory-model axiom an [`Inconsistency`] violates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InconsistencyKind {
    /// Two read-modify-write chains both extended from the same anchor write.
    Atomicity,
    /// The writes-before relation has a cycle.
    ReleaseAcquire,
    /// No topological ordering of writes-before plus reads-from/reads-before yields an acyclic
    /// total execution order.
    SequentialConsistencyCoherence,
    /// The cheaper fixpoint closure that runs before coherence search found a cycle.
    SequentialConsistencyApprox,
    /// Lock discipline (mutual exclusion or wait/notify ordering) was violated.
    Lock,
}

/// The minimal information needed to identify an offending memory-model violation (spec.md
/// §4.G Failure semantics: "carry the minimal information needed to identify the offending
/// kind"). Pretty-printing for end users is external to this crate.
#[derive(Clone, Debug, thiserror::Error)]
pub enum Inconsistency {
    /// Two exclusive writes both read from the same predecessor write at `location`.
    #[error("atomicity violation at {location:?}: events {first} and {second} both extend the same predecessor")]
    Atomicity {
        /// The shared location.
        location: Location,
        /// The first-encountered offending write.
        first: EventId,
        /// The second, conflicting write.
        second: EventId,
    },

    /// The writes-before relation at `location` contains a cycle.
    #[error("release/acquire (writes-before) cycle at {location:?}")]
    ReleaseAcquire {
        /// The location whose writes-before relation is cyclic.
        location: Location,
    },

    /// No candidate coherence order for `location` (among writes-before-consistent topological
    /// orderings) synthesizes into an acyclic total execution order.
    #[error("no coherence order at {location:?} extends to an acyclic execution order")]
    SequentialConsistencyCoherence {
        /// The location with no viable coherence order.
        location: Location,
    },

    /// The cheap pre-coherence fixpoint closure found a cycle at `location`.
    #[error("sequential-consistency approximation cycle at {location:?}")]
    SequentialConsistencyApprox {
        /// The location whose approximate closure is cyclic.
        location: Location,
    },

    /// Lock discipline was violated on `monitor`.
    #[error("lock consistency violation on monitor {monitor:?}")]
    Lock {
        /// The monitor whose discipline was violated.
        monitor: Location,
    },
}

impl Inconsistency {
    /// This inconsistency's kind, for callers that only need the taxonomy (spec.md §7).
    pub fn kind(&self) -> InconsistencyKind {
        match self {
            Inconsistency::Atomicity { .. } => InconsistencyKind::Atomicity,
            Inconsistency::ReleaseAcquire { .. } => InconsistencyKind::ReleaseAcquire,
            Inconsistency::SequentialConsistencyCoherence { .. } => {
                InconsistencyKind::SequentialConsistencyCoherence
            }
            Inconsistency::SequentialConsistencyApprox { .. } => InconsistencyKind::SequentialConsistencyApprox,
            Inconsistency::Lock { .. } => InconsistencyKind::Lock,
        }
    }
}

/// The result of an [`IncrementalChecker::check_event`](crate::aggregator::IncrementalChecker)
/// call.
#[derive(Clone, Debug)]
pub enum IncrementalVerdict {
    /// Nothing wrong found so far.
    Consistent,
    /// A violation was conclusively detected.
    Inconsistent(Inconsistency),
    /// This checker cannot answer incrementally; the aggregator must run a full pass.
    Unknown,
}
