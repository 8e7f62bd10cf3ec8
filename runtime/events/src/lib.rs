//!
//! `lincheck-events`: the append-only event structure modelling one interleaving as a labelled
//! partial order, its synchronization algebra, and read-modify-write chain bookkeeping (spec.md
//! §3, §4.F).
//!

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![warn(unused_imports)]
#![forbid(unused_must_use)]
#![forbid(unused_import_braces)]

pub mod event;
pub mod execution;
pub mod recorder;
pub mod rmw;
pub mod structure;
pub mod sync_algebra;

/// Re-exports for downstream crates (notably `lincheck-checkers`).
pub mod prelude {
    pub use crate::event::{
        AccessKind, Event, EventId, EventLabel, EventValue, Location, Phase, SyncKind, ThreadId,
    };
    pub use crate::execution::{Execution, ExecutionFrontier};
    pub use crate::recorder::TraceRecorder;
    pub use crate::rmw::{is_exclusive_write, ReadModifyWriteChain};
    pub use crate::structure::{EventStructure, EventsError};
    pub use crate::sync_algebra::{initialization_label, synchronize_barrier, synchronize_binary};
}
