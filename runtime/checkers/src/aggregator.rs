//!
//! The checker composition traits and the `CompositeChecker` that runs every consistency axiom
//! over one candidate execution (spec.md §4.G "Aggregation").
//!

use crate::inconsistency::{IncrementalVerdict, Inconsistency};
use lincheck_events::event::Event;
use lincheck_events::execution::Execution;

/// A checker that can answer incrementally as events are appended, but may decline to (spec.md
/// §4.G: "incremental form `check(event) -> {Consistent | Inconsistent(kind) | Unknown}`").
///
/// An `Unknown` verdict from any incremental checker forces the aggregator to fall back to a
/// full pass once replay finishes; it never itself means the execution is accepted.
pub trait IncrementalChecker {
    /// Discards whatever incremental state was accumulated for the previous candidate execution,
    /// so the checker can be reused across `EventStructure::start_next_exploration` calls.
    fn reset(&mut self, store: &[Event], execution: &Execution);

    /// Folds one newly appended event into the checker's incremental state.
    fn check_event(&mut self, store: &[Event], event: &Event) -> IncrementalVerdict;
}

/// A checker that only answers once, over a complete candidate execution (spec.md §4.G "full
/// form `check(execution) -> Option<Inconsistency>`").
pub trait FullChecker {
    /// Checks the full candidate execution, returning the first violation found, if any.
    fn check(&self, store: &[Event], execution: &Execution) -> Option<Inconsistency>;
}

/// Runs every consistency axiom over one candidate execution, preferring each checker's
/// incremental form and falling back to its full form only when the incremental form declines
/// to answer (spec.md §4.G: "a full pass is run only when some checker answered `Unknown`").
#[derive(Debug, Default)]
pub struct CompositeChecker {
    atomicity: crate::atomicity::AtomicityChecker,
    release_acquire: crate::release_acquire::ReleaseAcquireChecker,
    sc_approx: crate::sc_approx::SequentialConsistencyApproxChecker,
    coherence: crate::coherence::CoherenceChecker,
    lock: crate::lock::LockChecker,
}

impl CompositeChecker {
    /// A fresh composite checker with no prior state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets every incremental checker's state ahead of replaying a new candidate execution.
    pub fn reset(&mut self, store: &[Event], execution: &Execution) {
        self.atomicity.reset(store, execution);
        self.release_acquire.reset(store, execution);
        self.sc_approx.reset(store, execution);
        self.lock.reset(store, execution);
    }

    /// Folds one newly appended event into every incremental checker, short-circuiting on the
    /// first conclusive violation.
    ///
    /// Returns `Consistent` if every checker agreed, `Inconsistent` on the first violation, or
    /// `Unknown` if every checker agreed so far but at least one declined to answer
    /// conclusively (meaning a full pass is still owed once the candidate is complete).
    pub fn check_event(&mut self, store: &[Event], event: &Event) -> IncrementalVerdict {
        let mut saw_unknown = false;
        for verdict in [
            self.atomicity.check_event(store, event),
            self.release_acquire.check_event(store, event),
            self.sc_approx.check_event(store, event),
            self.lock.check_event(store, event),
        ] {
            match verdict {
                IncrementalVerdict::Inconsistent(inc) => return IncrementalVerdict::Inconsistent(inc),
                IncrementalVerdict::Unknown => saw_unknown = true,
                IncrementalVerdict::Consistent => {}
            }
        }
        if saw_unknown {
            IncrementalVerdict::Unknown
        } else {
            IncrementalVerdict::Consistent
        }
    }

    /// Runs every checker's full form over the complete candidate execution. Called once a
    /// candidate is complete and at least one incremental checker answered `Unknown` along the
    /// way, or as the definitive check before accepting a witness.
    pub fn check_full(&self, store: &[Event], execution: &Execution) -> Option<Inconsistency> {
        self.atomicity
            .check(store, execution)
            .or_else(|| self.release_acquire.check(store, execution))
            .or_else(|| self.coherence.check(store, execution))
            .or_else(|| self.lock.check(store, execution))
    }

    /// Runs the checks a release/acquire subject must still satisfy, omitting the full
    /// coherence search: under `MemoryModel::ReleaseAcquire` the subject only promises ordering
    /// between synchronizing accesses, not a single global total order over every write (spec.md
    /// §4.G).
    pub fn check_release_acquire(&self, store: &[Event], execution: &Execution) -> Option<Inconsistency> {
        self.atomicity
            .check(store, execution)
            .or_else(|| self.release_acquire.check(store, execution))
            .or_else(|| self.lock.check(store, execution))
    }
}
