//!
//! The suspend/resume/cancel state machine for one suspendable actor invocation.
//!
//! Modelled as a sum-typed value rather than a language-level coroutine (spec.md §9 Design
//! Notes): a `Completion` starts `Pending`, and exactly one of a resuming peer or a cancelling
//! runner moves it to `Resumed` or `Cancelled` via a CAS on its status word. The loser of that
//! race observes its own CAS fail and must compensate whatever counter it had already adjusted
//! (the scenario runner's `completedOrSuspended` counter in spec.md §4.D) — `Completion` itself
//! only arbitrates the race, it does not know about that counter.
//!

use crate::outcome::Outcome;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

const PENDING: u8 = 0;
const RESUMED: u8 = 1;
const CANCELLED: u8 = 2;

/// A snapshot of a [`Completion`]'s current state.
#[derive(Debug)]
pub enum CompletionPoll<V, K> {
    /// No resumer or canceller has acted yet.
    Pending,
    /// A peer resumed the actor with the given outcome.
    Resumed(Outcome<V, K>),
    /// The actor's suspension was cancelled.
    Cancelled,
}

/// The continuation object consulted by the runner when an actor's method returns the
/// sentinel meaning "suspended" (spec.md §4.D).
///
/// `resume` and `cancel` race via compare-and-swap on an internal status word; at most one of
/// them wins. The loser's return value (`false`) tells the caller it must compensate.
pub struct Completion<V, K> {
    status: AtomicU8,
    slot: Mutex<Option<Outcome<V, K>>>,
}

impl<V, K> Default for Completion<V, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, K> Completion<V, K> {
    /// A fresh, pending completion.
    pub fn new() -> Self {
        Self {
            status: AtomicU8::new(PENDING),
            slot: Mutex::new(None),
        }
    }

    /// Attempts to resume this actor with `outcome`. Returns `true` if this call won the race
    /// against a concurrent [`Completion::cancel`]; `false` means the actor was already
    /// cancelled and `outcome` was discarded.
    ///
    /// The payload is written before the status CAS so that a concurrent poller which observes
    /// `RESUMED` is guaranteed to see the write (release on success; the poller's load is an
    /// acquire).
    pub fn resume(&self, outcome: Outcome<V, K>) -> bool {
        *self.slot.lock() = Some(outcome);
        self.status
            .compare_exchange(PENDING, RESUMED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Attempts to cancel this actor's suspension. Returns `true` if this call won the race
    /// against a concurrent [`Completion::resume`].
    pub fn cancel(&self) -> bool {
        self.status
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Reads the current state without blocking.
    pub fn poll(&self) -> CompletionPoll<V, K> {
        match self.status.load(Ordering::Acquire) {
            PENDING => CompletionPoll::Pending,
            RESUMED => {
                let outcome = self
                    .slot
                    .lock()
                    .take()
                    .expect("status is RESUMED but no outcome was stored");
                CompletionPoll::Resumed(outcome)
            }
            CANCELLED => CompletionPoll::Cancelled,
            other => unreachable!("invalid completion status {other}"),
        }
    }

    /// `true` once either `resume` or `cancel` has won.
    pub fn is_settled(&self) -> bool {
        self.status.load(Ordering::Acquire) != PENDING
    }
}

impl<V, K> fmt::Debug for Completion<V, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self.status.load(Ordering::Relaxed) {
            PENDING => "Pending",
            RESUMED => "Resumed",
            CANCELLED => "Cancelled",
            _ => "Invalid",
        };
        f.debug_struct("Completion").field("status", &status).finish()
    }
}
