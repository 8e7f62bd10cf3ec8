//!
//! `lincheck`: randomized linearizability and memory-model consistency testing for concurrent
//! data structures, built from independently testable layers — actor/suspension modelling
//! ([`lincheck_actor`]), a reusable thread pool ([`lincheck_pool`]), an append-only event
//! structure ([`lincheck_events`]), and a consistency checking layer
//! ([`lincheck_checkers`]) — glued together here by [`scenario::Scenario`],
//! [`runner::ScenarioRunner`] and [`planner::AdaptivePlanner`] (spec.md §1-§2).
//!
//! A typical embedding test driver:
//!
//! 1. Builds a [`scenario::Scenario`] out of [`lincheck_actor::actor::Actor`]s closing over its
//!    own subject type.
//! 2. Builds one [`runner::ScenarioRunner`] sized for that scenario and reuses it across many
//!    invocations.
//! 3. Drives invocations through an [`planner::AdaptivePlanner`] until its time budget is spent,
//!    feeding each [`runner::InvocationResult`] to the consistency layer
//!    ([`lincheck_checkers::prelude`]) for admissibility checking.
//!

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![warn(unused_imports)]
#![forbid(unused_must_use)]
#![forbid(unused_import_braces)]

pub mod error;
pub mod planner;
pub mod runner;
pub mod scenario;
pub mod state_repr;

/// Re-exports for callers who just want the common entry points.
pub mod prelude {
    pub use crate::error::LincheckError;
    pub use crate::planner::{AdaptivePlanner, Mode, PlannerConfig};
    pub use crate::runner::{InvocationResult, MemoryModel, RunnerConfig, ScenarioRunner};
    pub use crate::scenario::Scenario;
    pub use crate::state_repr::{NoStateRepr, StateRepr};

    pub use lincheck_actor::actor::{Actor, ActorFlags, ActorPoll};
    pub use lincheck_actor::outcome::Outcome;
    pub use lincheck_checkers::prelude::*;
    pub use lincheck_events::prelude::*;
    pub use lincheck_pool::clocked::ClockPolicy;
}
