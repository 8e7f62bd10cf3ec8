//!
//! Vocabulary shared between lincheck's pool, runner and checkers.
//!
//! This crate is intentionally small: it has no threads of its own and no notion of a
//! scenario. It defines the handful of value types that flow across those boundaries —
//! [`Spinner`]/[`SpinnerGroup`] (bounded spin-wait with adaptive park fallback), [`HBClock`]
//! (the per-thread vector clock), [`Actor`]/[`ActorFlags`] (one operation invocation in a
//! scenario), [`Outcome`] (the tagged result of running one), and [`Completion`] (the
//! suspend/resume/cancel state machine for suspendable actors).
//!

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![warn(unused_imports)]
#![forbid(unused_must_use)]
#![forbid(unused_import_braces)]

pub mod actor;
pub mod clock;
pub mod completion;
pub mod outcome;
pub mod recorder;
pub mod spinner;

/// The lincheck-actor prelude.
pub mod prelude {
    pub use crate::actor::*;
    pub use crate::clock::*;
    pub use crate::completion::*;
    pub use crate::outcome::*;
    pub use crate::recorder::*;
    pub use crate::spinner::*;
}
