//!
//! Bounded spin-wait with adaptive park fallback.
//!
//! A [`Spinner`] polls a closure for an implementation-chosen number of iterations before
//! giving up; a [`SpinnerGroup`] sizes that bound from the ratio of logical CPUs to the
//! group's declared thread count, collapsing to effectively zero iterations when the group is
//! oversubscribed. This keeps workers hot when there is headroom and yields the CPU
//! immediately when there is not.
//!

use crossbeam_utils::Backoff;
use std::fmt;

/// Base number of spin iterations granted to a single, unshared spinner.
const BASE_SPINS: u32 = 100;

/// How many bounded-spin attempts a [`Spinner`] will make before reporting
/// [`SpinOutcome::Exhausted`].
///
/// Exposed so callers (notably [`crate::completion::Completion`] resumption loops and
/// `lincheck-pool`'s rendezvous protocol) can distinguish "gave up, try a park" from "the
/// configured spin budget for this invocation was exceeded", the latter being reported to the
/// scenario runner as a `SpinLoopBound` failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpinBudget {
    max_iterations: u32,
}

impl SpinBudget {
    /// A spin budget of exactly `max_iterations` bounded-spin attempts.
    pub const fn new(max_iterations: u32) -> Self {
        Self { max_iterations }
    }

    /// A spin budget that never reports exhaustion; used for the happens-before clock
    /// snapshots and other spins whose caller has its own notion of a deadline.
    pub const fn unbounded() -> Self {
        Self {
            max_iterations: u32::MAX,
        }
    }

    /// The disabled budget: a single poll, then immediate fallback. Used when a
    /// [`SpinnerGroup`] is oversubscribed.
    pub const fn disabled() -> Self {
        Self { max_iterations: 0 }
    }
}

impl Default for SpinBudget {
    fn default() -> Self {
        Self::new(BASE_SPINS)
    }
}

/// The result of a single [`Spinner::spin_wait_bounded`] call.
#[derive(Debug)]
pub enum SpinOutcome<T> {
    /// `read` returned `Some` before the bound was reached.
    Ready(T),
    /// The bound was reached before `read` returned `Some`; the caller should fall back to
    /// parking.
    TimedOut,
    /// The spinner's configured [`SpinBudget`] was fully consumed — not merely this one
    /// bounded attempt, but the cumulative budget assigned at construction. Surfaced by the
    /// scenario runner as `SpinLoopBound`.
    Exhausted,
}

impl<T> SpinOutcome<T> {
    /// `true` for [`SpinOutcome::Ready`].
    pub fn is_ready(&self) -> bool {
        matches!(self, SpinOutcome::Ready(_))
    }

    /// Converts to `Option<T>`, treating both `TimedOut` and `Exhausted` as `None`.
    pub fn into_option(self) -> Option<T> {
        match self {
            SpinOutcome::Ready(v) => Some(v),
            SpinOutcome::TimedOut | SpinOutcome::Exhausted => None,
        }
    }
}

/// A bounded spin-waiter.
///
/// Each call to [`spin_wait_bounded`](Spinner::spin_wait_bounded) polls `read` using a
/// [`crossbeam_utils::Backoff`] (spin, then `SPIN_LIMIT`-yield, then genuinely block the
/// calling thread on the backoff's internal snooze) until either `read` returns `Some`, or the
/// spinner's cumulative iteration budget is spent.
pub struct Spinner {
    budget: SpinBudget,
    spent: u32,
}

impl fmt::Debug for Spinner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spinner")
            .field("budget", &self.budget.max_iterations)
            .field("spent", &self.spent)
            .finish()
    }
}

impl Spinner {
    /// Creates a spinner with the given budget.
    pub fn new(budget: SpinBudget) -> Self {
        Self { budget, spent: 0 }
    }

    /// Polls `read` for an implementation-chosen number of iterations and returns the first
    /// non-`None` value, or an outcome explaining why it gave up.
    pub fn spin_wait_bounded<T>(&mut self, mut read: impl FnMut() -> Option<T>) -> SpinOutcome<T> {
        if self.spent >= self.budget.max_iterations {
            return SpinOutcome::Exhausted;
        }

        let backoff = Backoff::new();
        loop {
            if let Some(v) = read() {
                return SpinOutcome::Ready(v);
            }
            if self.spent >= self.budget.max_iterations {
                return SpinOutcome::TimedOut;
            }
            self.spent += 1;
            backoff.snooze();
        }
    }

    /// Number of spin iterations consumed so far.
    pub fn spent(&self) -> u32 {
        self.spent
    }
}

/// Sizes [`Spinner`]s for a fixed-size group of `declared_threads` cooperating threads,
/// shrinking the per-spinner budget as the group becomes oversubscribed relative to the
/// machine's logical CPU count.
///
/// Rationale: keep workers hot when there is headroom (few threads per core, spinning wins
/// over a park/unpark round trip); yield the CPU immediately when oversubscribed (many
/// threads per core, spinning just burns a scheduler quantum the lagging peer needed).
#[derive(Debug, Clone, Copy)]
pub struct SpinnerGroup {
    budget: SpinBudget,
}

impl SpinnerGroup {
    /// Builds a group sized for `declared_threads` threads against the machine's logical CPU
    /// count (via [`num_cpus::get`]).
    pub fn new(declared_threads: usize) -> Self {
        Self::with_cpu_count(declared_threads, num_cpus::get())
    }

    /// As [`SpinnerGroup::new`], but with an explicit CPU count — used by tests that need
    /// deterministic budgets regardless of the host machine.
    pub fn with_cpu_count(declared_threads: usize, cpus: usize) -> Self {
        let declared_threads = declared_threads.max(1);
        let budget = if declared_threads > cpus {
            // Oversubscribed: spinning just steals a quantum another thread in the group
            // needs to make progress. Collapse to (near) zero iterations.
            SpinBudget::disabled()
        } else {
            let ratio = (cpus / declared_threads).max(1) as u32;
            SpinBudget::new(BASE_SPINS.saturating_mul(ratio))
        };
        Self { budget }
    }

    /// The per-spinner budget this group hands out.
    pub fn budget(&self) -> SpinBudget {
        self.budget
    }

    /// Creates a fresh [`Spinner`] sized by this group.
    pub fn spinner(&self) -> Spinner {
        Spinner::new(self.budget)
    }
}
