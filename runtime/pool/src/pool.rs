//!
//! `ActiveThreadPool`: a fixed-size worker pool that drives many short parallel scenarios with
//! minimal parking overhead (spec.md §4.B).
//!

use crate::error::{PoolError, SuppressedFailure, TaskError};
use crate::slot::{wait_for, wait_for_deadline, RendezvousSlot};
use lincheck_actor::spinner::{Spinner, SpinnerGroup};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// A unit of work submitted to one worker. `label` is purely diagnostic (thread dumps, trace
/// spans); the closure itself is the `ClockedThreadExecution` step the caller wants run on that
/// worker's thread.
pub struct PoolTask {
    /// Diagnostic name shown in thread dumps and trace spans.
    pub label: String,
    /// The work itself.
    pub run: Box<dyn FnOnce() -> Result<(), TaskError> + Send>,
}

impl PoolTask {
    /// Builds a task named `label` running `run`.
    pub fn new(label: impl Into<String>, run: impl FnOnce() -> Result<(), TaskError> + Send + 'static) -> Self {
        Self {
            label: label.into(),
            run: Box::new(run),
        }
    }
}

enum TaskMsg {
    Run(PoolTask),
    Shutdown,
}

enum ResultMsg {
    Done,
    Failure(TaskError),
}

/// One entry of a timeout [`ThreadDump`].
#[derive(Debug, Clone)]
pub struct ThreadDumpEntry {
    /// The OS thread name assigned at spawn time.
    pub thread_name: String,
    /// The label of the task this worker was last known to be running, if any.
    pub current_task: Option<String>,
}

/// A diagnostic snapshot collected when `submit_and_await` times out (spec.md §5, Property 9).
///
/// Capturing another live thread's native call stack requires unsafe, platform-specific signal
/// plumbing that the `backtrace` crate does not expose safely; instead each worker publishes the
/// label of the task it is currently running, and the dump reports that alongside the
/// submitter's own backtrace at the moment of timeout.
#[derive(Debug, Clone)]
pub struct ThreadDump {
    /// One entry per pool-owned worker thread.
    pub workers: Vec<ThreadDumpEntry>,
    /// The submitter's own stack at the moment the deadline expired.
    pub submitter_backtrace: String,
}

struct WorkerHandle {
    task_slot: Arc<RendezvousSlot<TaskMsg>>,
    result_slot: Arc<RendezvousSlot<ResultMsg>>,
    current_task: Arc<Mutex<Option<String>>>,
    join: Option<JoinHandle<()>>,
    thread_name: String,
}

/// A fixed-size pool of pre-spawned worker threads, each owning one task slot / result slot
/// pair (spec.md §3, §4.B).
///
/// `submit_and_await` hands one task to each of a subset of workers and blocks until all of them
/// report `Done` or a deadline expires. There is no work-stealing and no dynamic resizing: every
/// worker is spawned once, in `new`, and reused across every scenario invocation for the life of
/// the pool.
pub struct ActiveThreadPool {
    n_threads: usize,
    workers: Vec<WorkerHandle>,
    spinner_group: SpinnerGroup,
    stuck: Arc<AtomicBool>,
    closed: bool,
}

impl ActiveThreadPool {
    /// Spawns `n_threads` workers, each parked on its own task slot until the first submission.
    pub fn new(n_threads: usize) -> Self {
        let spinner_group = SpinnerGroup::new(n_threads);
        let stuck = Arc::new(AtomicBool::new(false));
        let workers = (0..n_threads)
            .map(|i| Self::spawn_worker(i, spinner_group))
            .collect();
        Self {
            n_threads,
            workers,
            spinner_group,
            stuck,
            closed: false,
        }
    }

    fn spawn_worker(index: usize, spinner_group: SpinnerGroup) -> WorkerHandle {
        let task_slot: Arc<RendezvousSlot<TaskMsg>> = Arc::new(RendezvousSlot::new());
        let result_slot: Arc<RendezvousSlot<ResultMsg>> = Arc::new(RendezvousSlot::new());
        let current_task: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

        let worker_task_slot = task_slot.clone();
        let worker_result_slot = result_slot.clone();
        let worker_current_task = current_task.clone();
        let thread_name = format!("lincheck-pool-worker-{index}");

        let join = std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                let mut spinner = spinner_group.spinner();
                loop {
                    let msg = wait_for(&worker_task_slot, &mut spinner);
                    match msg {
                        TaskMsg::Shutdown => {
                            trace!(worker = index, "worker observed shutdown sentinel");
                            return;
                        }
                        TaskMsg::Run(task) => {
                            *worker_current_task.lock() = Some(task.label.clone());
                            let label = task.label;
                            let run = task.run;
                            let outcome = match catch_unwind(AssertUnwindSafe(run)) {
                                Ok(Ok(())) => ResultMsg::Done,
                                Ok(Err(e)) => ResultMsg::Failure(e),
                                Err(payload) => ResultMsg::Failure(panic_to_error(payload)),
                            };
                            *worker_current_task.lock() = None;
                            if matches!(outcome, ResultMsg::Failure(_)) {
                                warn!(worker = index, task = %label, "task failed");
                            }
                            if let Some(waiter) = worker_result_slot.put(outcome) {
                                waiter.unpark();
                            }
                        }
                    }
                }
            })
            .expect("failed to spawn lincheck-pool worker thread");

        WorkerHandle {
            task_slot,
            result_slot,
            current_task,
            join: Some(join),
            thread_name,
        }
    }

    /// This pool's worker count.
    pub fn n_threads(&self) -> usize {
        self.n_threads
    }

    /// `true` once a prior `submit_and_await` timed out; no further submissions are accepted
    /// (spec.md §4.B Timeout policy).
    pub fn is_stuck(&self) -> bool {
        self.stuck.load(Ordering::Acquire)
    }

    /// Hands one task to each `(thread_index, task)` pair and blocks until every targeted
    /// worker reports `Done` or `deadline` elapses.
    ///
    /// Returns the wall-clock time actually spent waiting. Fails with
    /// [`PoolError::ThreadIndexOutOfRange`] or [`PoolError::DuplicateThreadIndex`] before
    /// touching any slot (spec.md §4.B precondition violations), with
    /// [`PoolError::ExecutionFailure`] if any task failed, or with [`PoolError::Timeout`] (and a
    /// subsequent stuck pool) if the deadline expires first.
    pub fn submit_and_await(
        &self,
        tasks: Vec<(usize, PoolTask)>,
        deadline: Duration,
    ) -> Result<Duration, PoolError> {
        if self.closed {
            return Err(PoolError::Closed);
        }
        if self.is_stuck() {
            return Err(PoolError::Stuck);
        }

        let mut seen = vec![false; self.n_threads];
        for (index, _) in &tasks {
            if *index >= self.n_threads {
                return Err(PoolError::ThreadIndexOutOfRange {
                    index: *index,
                    n_threads: self.n_threads,
                });
            }
            if seen[*index] {
                return Err(PoolError::DuplicateThreadIndex { index: *index });
            }
            seen[*index] = true;
        }

        if tasks.is_empty() {
            return Ok(Duration::ZERO);
        }

        let start = Instant::now();
        let deadline_at = start + deadline;
        let indices: Vec<usize> = tasks.iter().map(|(i, _)| *i).collect();

        for (index, task) in tasks {
            trace!(thread = index, task = %task.label, "submitting task");
            if let Some(waiter) = self.workers[index].task_slot.put(TaskMsg::Run(task)) {
                waiter.unpark();
            }
        }

        let mut failures: Vec<SuppressedFailure> = Vec::new();
        for index in &indices {
            let mut spinner = self.spinner_group.spinner();
            match wait_for_deadline(&self.workers[*index].result_slot, &mut spinner, deadline_at) {
                Some(ResultMsg::Done) => {}
                Some(ResultMsg::Failure(error)) => {
                    failures.push(SuppressedFailure {
                        thread: *index,
                        error,
                    });
                }
                None => {
                    self.stuck.store(true, Ordering::Release);
                    warn!(thread = index, "submit_and_await deadline exceeded; pool is stuck");
                    return Err(PoolError::Timeout {
                        elapsed_nanos: start.elapsed().as_nanos(),
                    });
                }
            }
        }

        if let Some(first) = failures.pop() {
            let failed_count = 1 + failures.len();
            return Err(PoolError::ExecutionFailure {
                first,
                suppressed: failures,
                failed_count,
                total: indices.len(),
            });
        }

        let elapsed = start.elapsed();
        debug!(?elapsed, n = indices.len(), "submit_and_await completed");
        Ok(elapsed)
    }

    /// Captures a [`ThreadDump`] of every worker's currently-running task label, for attaching
    /// to a `RunnerTimeout` result.
    pub fn thread_dump(&self) -> ThreadDump {
        let workers = self
            .workers
            .iter()
            .map(|w| ThreadDumpEntry {
                thread_name: w.thread_name.clone(),
                current_task: w.current_task.lock().clone(),
            })
            .collect();
        ThreadDump {
            workers,
            submitter_backtrace: format!("{:?}", backtrace::Backtrace::new()),
        }
    }

    /// Releases the pool's workers. If the pool is stuck, attempts a last-resort forced
    /// termination instead of a clean shutdown handshake (spec.md §4.B, §9 Design Notes); this
    /// is inherently unsafe and only meant to let the test process exit, not to guarantee
    /// worker cleanup.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if self.is_stuck() {
            warn!("closing a stuck pool; worker threads may be abandoned rather than joined");
            // No portable, safe way to force-terminate a std::thread. We document the intent
            // from spec.md §9 but do not call any unsafe platform primitive: workers leak and
            // the process is expected to exit soon, exactly as the design notes anticipate.
            for worker in &mut self.workers {
                worker.join.take();
            }
            return;
        }

        for worker in &self.workers {
            if let Some(waiter) = worker.task_slot.put(TaskMsg::Shutdown) {
                waiter.unpark();
            }
        }
        for worker in &mut self.workers {
            if let Some(join) = worker.join.take() {
                let _ = join.join();
            }
        }
    }
}

impl Drop for ActiveThreadPool {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ActiveThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveThreadPool")
            .field("n_threads", &self.n_threads)
            .field("stuck", &self.is_stuck())
            .field("closed", &self.closed)
            .finish()
    }
}

fn panic_to_error(payload: Box<dyn std::any::Any + Send>) -> TaskError {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker task panicked with a non-string payload".to_string()
    };
    message.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn submit_and_await_runs_all_tasks() {
        let pool = ActiveThreadPool::new(4);
        let counter = Arc::new(AtomicUsize::new(0));
        let tasks = (0..4)
            .map(|i| {
                let counter = counter.clone();
                (
                    i,
                    PoolTask::new(format!("incr-{i}"), move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }),
                )
            })
            .collect();
        pool.submit_and_await(tasks, Duration::from_secs(1)).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn out_of_range_index_is_rejected_before_touching_slots() {
        let pool = ActiveThreadPool::new(2);
        let tasks = vec![(5, PoolTask::new("bad", || Ok(())))];
        let err = pool.submit_and_await(tasks, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, PoolError::ThreadIndexOutOfRange { index: 5, n_threads: 2 }));
    }

    #[test]
    fn duplicate_index_is_rejected() {
        let pool = ActiveThreadPool::new(2);
        let tasks = vec![(0, PoolTask::new("a", || Ok(()))), (0, PoolTask::new("b", || Ok(())))];
        let err = pool.submit_and_await(tasks, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, PoolError::DuplicateThreadIndex { index: 0 }));
    }

    #[test]
    fn task_failure_is_reported_as_execution_failure() {
        let pool = ActiveThreadPool::new(2);
        let tasks = vec![
            (0, PoolTask::new("ok", || Ok(()))),
            (1, PoolTask::new("bad", || Err("boom".into()))),
        ];
        let err = pool.submit_and_await(tasks, Duration::from_secs(1)).unwrap_err();
        match err {
            PoolError::ExecutionFailure { total, failed_count, .. } => {
                assert_eq!(total, 2);
                assert_eq!(failed_count, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn timeout_marks_pool_stuck() {
        let pool = ActiveThreadPool::new(1);
        let tasks = vec![(0, PoolTask::new("hang", || {
            std::thread::sleep(Duration::from_secs(10));
            Ok(())
        }))];
        let err = pool
            .submit_and_await(tasks, Duration::from_millis(20))
            .unwrap_err();
        assert!(matches!(err, PoolError::Timeout { .. }));
        assert!(pool.is_stuck());

        let err2 = pool
            .submit_and_await(vec![(0, PoolTask::new("x", || Ok(())))], Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err2, PoolError::Stuck));
    }

    #[test]
    fn pool_isolation_across_sequential_invocations() {
        let pool = ActiveThreadPool::new(2);
        for expected in 0..5 {
            let seen = Arc::new(AtomicUsize::new(999));
            let seen_clone = seen.clone();
            pool.submit_and_await(
                vec![(0, PoolTask::new("probe", move || {
                    seen_clone.store(expected, Ordering::SeqCst);
                    Ok(())
                }))],
                Duration::from_secs(1),
            )
            .unwrap();
            assert_eq!(seen.load(Ordering::SeqCst), expected);
        }
    }
}
