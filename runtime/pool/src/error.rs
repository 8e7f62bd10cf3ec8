//!
//! The failure taxonomy for [`crate::pool::ActiveThreadPool`] (spec.md §4.B).
//!

use std::fmt;

/// A boxed task failure. Tasks are arbitrary closures supplied by the scenario runner; the pool
/// only needs to move the failure across a thread boundary and report it, never inspect it.
pub type TaskError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// One worker's contribution to an aggregated [`PoolError::ExecutionFailure`].
#[derive(Debug)]
pub struct SuppressedFailure {
    /// The thread index whose task failed.
    pub thread: usize,
    /// The failure itself.
    pub error: TaskError,
}

impl fmt::Display for SuppressedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "thread {}: {}", self.thread, self.error)
    }
}

/// Errors surfaced by [`crate::pool::ActiveThreadPool::submit_and_await`] and
/// [`crate::pool::ActiveThreadPool::close`].
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// A submission named a thread index `>= n_threads`. Reported before any slot is touched.
    #[error("thread index {index} out of range for a pool of {n_threads} threads")]
    ThreadIndexOutOfRange {
        /// The offending index.
        index: usize,
        /// The pool's thread count.
        n_threads: usize,
    },

    /// A submission named the same thread index more than once.
    #[error("duplicate thread index {index} in a single submission")]
    DuplicateThreadIndex {
        /// The index that appeared twice.
        index: usize,
    },

    /// At least one task failed; `first` is reported as the cause and every other failure is
    /// recorded as suppressed.
    #[error("{failed_count} of {total} tasks failed: {first}")]
    ExecutionFailure {
        /// The first failure encountered, in thread-index order.
        first: SuppressedFailure,
        /// Every other failure from the same submission.
        suppressed: Vec<SuppressedFailure>,
        /// Number of tasks that failed (`1 + suppressed.len()`).
        failed_count: usize,
        /// Total tasks in the submission.
        total: usize,
    },

    /// The submitter's deadline elapsed before every awaited result slot was filled. The pool is
    /// now [stuck](crate::pool::ActiveThreadPool) and rejects further submissions.
    #[error("submitAndAwait deadline exceeded after {elapsed_nanos}ns; pool is now stuck")]
    Timeout {
        /// Wall-clock time spent waiting before giving up.
        elapsed_nanos: u128,
    },

    /// `submit_and_await` was called after a previous timeout left the pool stuck.
    #[error("submitAndAwait called on a stuck pool")]
    Stuck,

    /// `submit_and_await` was called after `close()`.
    #[error("submitAndAwait called on a closed pool")]
    Closed,
}
