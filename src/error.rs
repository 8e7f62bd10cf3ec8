//!
//! Top-level error taxonomy for one scenario invocation (spec.md §7).
//!
//! [`LincheckError`] is the union the planner and the embedding test driver actually see: pool
//! failures and detected inconsistencies are wrapped via `#[from]`, and the remaining variants
//! name the runner-level conditions spec.md §4.D's `InvocationResult` enumerates.

use lincheck_checkers::inconsistency::Inconsistency;
use lincheck_pool::error::PoolError;
use lincheck_pool::pool::ThreadDump;

/// Everything that can end a scenario invocation without it reaching `Completed`.
#[derive(Debug, thiserror::Error)]
pub enum LincheckError {
    /// The pool's phase deadline elapsed with at least one worker still running.
    #[error("scenario timed out waiting for {phase} to finish")]
    ScenarioTimeout {
        /// Which phase (`"init"`, `"parallel"`, `"post"`, `"validation"`) timed out.
        phase: &'static str,
        /// A snapshot of what every worker was doing when the deadline expired.
        thread_dump: ThreadDump,
    },

    /// A thread crashed running user code in a way the runner could not classify as a legitimate
    /// `Outcome::Exception`.
    #[error("unexpected exception: {message}")]
    UnexpectedException {
        /// The panic payload or propagated error, stringified.
        message: String,
    },

    /// The validation actor, run after POST, raised an exception.
    #[error("validation failed after scenario prefix {scenario_prefix:?}: {message}")]
    ValidationFailure {
        /// Diagnostic description of the actors run before validation.
        scenario_prefix: String,
        /// The validation failure itself.
        message: String,
    },

    /// A `cancel_on_suspension` actor's suspension could not be cancelled and cancellation was
    /// required for progress to remain possible (spec.md §8 Property 4).
    #[error("obstruction-freedom violated: {reason}")]
    ObstructionFreedomViolation {
        /// What progress guarantee was violated.
        reason: String,
    },

    /// The scenario went globally quiescent with actors still suspended and no resumer able to
    /// make further progress.
    #[error("managed deadlock: scenario reached quiescence with actors still suspended")]
    ManagedDeadlock,

    /// A spin-wait exhausted its configured [`lincheck_actor::spinner::SpinBudget`] before the
    /// condition it was waiting on settled.
    #[error("spin loop bound exceeded")]
    SpinLoopBound,

    /// The consistency layer rejected the recorded event trace.
    #[error("inconsistency detected: {0}")]
    InconsistencyDetected(#[from] Inconsistency),

    /// A pool-level precondition or infrastructure failure not covered by the variants above.
    #[error(transparent)]
    Pool(#[from] PoolError),
}
