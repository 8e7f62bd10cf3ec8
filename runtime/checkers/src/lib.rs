//!
//! `lincheck-checkers`: the consistency layer that decides whether one candidate execution is
//! admissible under the target memory model (spec.md §4.G) — atomicity, release/acquire,
//! sequential-consistency approximation and full coherence search, lock discipline, and the
//! replay witness that confirms an accepted order actually reproduces every observed value.
//!

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![warn(unused_imports)]
#![forbid(unused_must_use)]
#![forbid(unused_import_braces)]

pub mod aggregator;
pub mod atomicity;
pub mod coherence;
pub mod inconsistency;
pub mod lock;
pub mod release_acquire;
pub mod replay;
pub mod sc_approx;

/// Re-exports for the facade crate.
pub mod prelude {
    pub use crate::aggregator::{CompositeChecker, FullChecker, IncrementalChecker};
    pub use crate::atomicity::{build_chains, AtomicityChecker};
    pub use crate::coherence::{find_execution_order, CoherenceChecker};
    pub use crate::inconsistency::{IncrementalVerdict, Inconsistency, InconsistencyKind};
    pub use crate::lock::LockChecker;
    pub use crate::release_acquire::ReleaseAcquireChecker;
    pub use crate::replay::{replay, ReplayViolation};
    pub use crate::sc_approx::SequentialConsistencyApproxChecker;
}
