//!
//! `lincheck-pool`: the active-thread pool executor and per-thread clocked actor loop that
//! drive a scenario's phases across genuine OS threads (spec.md §4.B, §4.C).
//!

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![warn(unused_imports)]
#![forbid(unused_must_use)]
#![forbid(unused_import_braces)]

pub mod clocked;
pub mod error;
pub mod pool;
pub mod slot;

/// Re-exports for downstream crates that only need the common entry points.
pub mod prelude {
    pub use crate::clocked::{ClockPolicy, ClockedThreadExecution, PendingSuspension};
    pub use crate::error::{PoolError, SuppressedFailure, TaskError};
    pub use crate::pool::{ActiveThreadPool, PoolTask, ThreadDump, ThreadDumpEntry};
}
