//!
//! `ClockedThreadExecution`: the per-thread actor loop run by one pool worker during a
//! scenario's PARALLEL phase (spec.md §4.C).
//!

use lincheck_actor::actor::{Actor, ActorFlags, ActorPoll};
use lincheck_actor::clock::HBClock;
use lincheck_actor::completion::{Completion, CompletionPoll};
use lincheck_actor::outcome::Outcome;
use lincheck_actor::recorder::{AccessRecorder, RecordedAccess};
use lincheck_actor::spinner::Spinner;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// How an execution decides whether to snapshot peer clocks before invoking the next actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockPolicy {
    /// Always snapshot peer clocks.
    Always,
    /// Draw the decision per invocation (the caller supplies the coin flip).
    Random,
}

/// A suspension left behind by an actor whose method returned the sentinel meaning "suspended".
/// Owned by the scenario runner, which resolves it via cancellation or a peer's resumption
/// before the execution's final result row is read.
#[derive(Debug)]
pub struct PendingSuspension<V, K> {
    /// Index of the actor within this thread's actor list.
    pub actor_index: usize,
    /// The completion a resumer or canceller will settle.
    pub completion: Arc<Completion<V, K>>,
}

/// One thread's worth of actor invocations for a single scenario invocation (spec.md §3
/// `ThreadExecution`, generalized with the clock-sampling behaviour of §4.C).
///
/// Bound to a fixed thread index for the lifetime of one scenario invocation; `reset` clears
/// results and clocks between invocations of the same compiled scenario so state never leaks
/// across invocations (spec.md §3 Lifecycle, Property 2).
#[derive(Debug)]
pub struct ClockedThreadExecution<T, V: Clone, K: Clone> {
    thread_index: usize,
    actors: Vec<Actor<T, V, K>>,
    results: Vec<Option<Outcome<V, K>>>,
    clock_rows: Vec<Option<HBClock>>,
    cur_clock: HBClock,
    pending: Vec<Option<Arc<Completion<V, K>>>>,
    recorded: Vec<Vec<RecordedAccess>>,
}

impl<T, V: Clone, K: Clone> ClockedThreadExecution<T, V, K> {
    /// Builds an execution for `thread_index` out of `n_threads` parallel threads, running
    /// `actors` in order.
    pub fn new(thread_index: usize, n_threads: usize, actors: Vec<Actor<T, V, K>>) -> Self {
        let len = actors.len();
        Self {
            thread_index,
            actors,
            results: (0..len).map(|_| None).collect(),
            clock_rows: (0..len).map(|_| None).collect(),
            cur_clock: HBClock::zero(n_threads),
            pending: (0..len).map(|_| None).collect(),
            recorded: (0..len).map(|_| Vec::new()).collect(),
        }
    }

    /// This execution's thread index.
    pub fn thread_index(&self) -> usize {
        self.thread_index
    }

    /// Number of actors bound to this thread.
    pub fn len(&self) -> usize {
        self.actors.len()
    }

    /// `true` if this thread has no actors for the current phase.
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// Clears results and clocks between invocations of the same scenario (spec.md §3
    /// Lifecycle).
    pub fn reset(&mut self, n_threads: usize) {
        self.results.iter_mut().for_each(|r| *r = None);
        self.clock_rows.iter_mut().for_each(|c| *c = None);
        self.pending.iter_mut().for_each(|p| *p = None);
        self.recorded.iter_mut().for_each(|r| r.clear());
        self.cur_clock = HBClock::zero(n_threads);
    }

    /// Runs actor `i`, optionally snapshotting `peers`' current clocks first (step 1 of §4.C),
    /// invoking the actor (step 2), and storing whichever `Outcome` the caller's suspension
    /// policy classifies the `ActorPoll` into (steps 3-4). `observe_clocks` is the
    /// already-resolved decision for this invocation (the runner draws the coin for
    /// [`ClockPolicy::Random`]; a deterministic `Always`/`Never` choice is passed straight
    /// through).
    ///
    /// Returns `Some(completion)` if the actor suspended and has no resolution yet; the runner
    /// is responsible for driving that completion to a final state before the thread's result
    /// row is considered final.
    ///
    /// If actor `i` panics, its declared `HANDLES_EXCEPTIONS` flag decides how the panic is
    /// classified (spec.md §3, §4.C step 3): if the panic payload downcasts to `K`, it becomes
    /// `Outcome::Exception`, exactly as if the actor had returned it directly; otherwise the
    /// panic is resumed unchanged, propagating to the pool's own panic handling as an
    /// unclassified task failure.
    pub fn run_actor(
        &mut self,
        i: usize,
        subject: &T,
        peers: &[&HBClock],
        observe_clocks: bool,
    ) -> Option<Arc<Completion<V, K>>>
    where
        K: 'static,
    {
        if observe_clocks {
            let mut row = self.cur_clock.clone();
            for peer in peers {
                row.join(peer);
            }
            self.clock_rows[i] = Some(row);
        }

        let handles_exceptions = self.actors[i].flags().contains(ActorFlags::HANDLES_EXCEPTIONS);
        let actor = self.actors[i].clone();
        let recorder = AccessRecorder::new();
        let poll = catch_unwind(AssertUnwindSafe(|| actor.invoke(subject, &recorder)));
        self.recorded[i] = recorder.drain();
        match poll {
            Ok(ActorPoll::Done(outcome)) => {
                self.results[i] = Some(outcome);
                self.cur_clock.advance(self.thread_index);
                None
            }
            Ok(ActorPoll::Suspended) => {
                let completion = Arc::new(Completion::new());
                self.pending[i] = Some(completion.clone());
                Some(completion)
            }
            Err(payload) => {
                if handles_exceptions {
                    if let Some(kind) = payload.downcast_ref::<K>() {
                        self.results[i] = Some(Outcome::Exception(kind.clone()));
                        self.cur_clock.advance(self.thread_index);
                        return None;
                    }
                }
                std::panic::resume_unwind(payload);
            }
        }
    }

    /// Resolves a previously-suspended actor `i` once its [`Completion`] has settled, finalizing
    /// its result row and advancing this thread's clock exactly as a normal completion would.
    pub fn settle_suspended(&mut self, i: usize) {
        let Some(completion) = self.pending[i].take() else {
            return;
        };
        let outcome = match completion.poll() {
            CompletionPoll::Pending => {
                // Still unresolved; the runner decides this only once quiescence or resumption
                // has already been observed, so re-entrance here means a logic error upstream.
                self.pending[i] = Some(completion);
                return;
            }
            CompletionPoll::Resumed(outcome) => outcome,
            CompletionPoll::Cancelled => Outcome::Cancelled,
        };
        self.results[i] = Some(outcome);
        self.cur_clock.advance(self.thread_index);
    }

    /// Marks actor `i` as suspended-with-no-resolution because the scenario went quiescent
    /// before any resumer or cancellation arrived.
    pub fn mark_quiescent(&mut self, i: usize) {
        self.pending[i] = None;
        self.results[i] = Some(Outcome::Suspended);
        self.cur_clock.advance(self.thread_index);
    }

    /// Marks actor `i` as having crashed the thread in a way the runner could not classify.
    pub fn mark_crash(&mut self, i: usize) {
        self.results[i] = Some(Outcome::Crash);
    }

    /// This thread's current happens-before clock, for peers sampling it via `run_actor`.
    pub fn current_clock(&self) -> &HBClock {
        &self.cur_clock
    }

    /// The finished result row, once every actor has a stored outcome. Unresolved slots are
    /// reported as [`Outcome::NoResult`].
    pub fn finish(&self) -> Vec<Outcome<V, K>> {
        self.results
            .iter()
            .map(|r| r.clone().unwrap_or(Outcome::NoResult))
            .collect()
    }

    /// Clock rows recorded for actors that observed peer clocks; `None` for actors that ran
    /// without observation.
    pub fn clock_rows(&self) -> &[Option<HBClock>] {
        &self.clock_rows
    }

    /// Per-actor accesses reported through this thread's actors' `AccessRecorder`s, in actor
    /// order. The scenario runner drains these after the phase completes to feed a shared
    /// `EventStructure` (spec.md §5 "single-writer... funnel into that driver").
    pub fn recorded_accesses(&self) -> &[Vec<RecordedAccess>] {
        &self.recorded
    }

    /// `true` if every actor in this thread has a stored outcome and no suspension remains
    /// unresolved.
    pub fn is_complete(&self) -> bool {
        self.results.iter().all(Option::is_some)
    }

    /// Spins bounded waiting for actor `i`'s suspension to settle, returning the settled poll
    /// without consuming it (the caller still calls [`ClockedThreadExecution::settle_suspended`]
    /// to finalize).
    pub fn spin_wait_suspension(&self, i: usize, spinner: &mut Spinner) -> Option<CompletionPoll<V, K>> {
        let completion = self.pending[i].as_ref()?.clone();
        spinner
            .spin_wait_bounded(|| {
                if completion.is_settled() {
                    Some(completion.poll())
                } else {
                    None
                }
            })
            .into_option()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lincheck_actor::actor::ActorFlags;
    use lincheck_actor::spinner::SpinBudget;

    fn actor(value: i32) -> Actor<(), i32, ()> {
        Actor::new("op", ActorFlags::empty(), move |_, _| {
            ActorPoll::Done(Outcome::Value(value))
        })
    }

    #[test]
    fn run_actor_advances_own_clock_component() {
        let mut exec: ClockedThreadExecution<(), i32, ()> =
            ClockedThreadExecution::new(0, 2, vec![actor(1), actor(2)]);
        assert_eq!(exec.current_clock().get(0), 0);
        assert!(exec.run_actor(0, &(), &[], false).is_none());
        assert_eq!(exec.current_clock().get(0), 1);
        assert!(exec.run_actor(1, &(), &[], false).is_none());
        assert_eq!(exec.current_clock().get(0), 2);
        assert!(exec.is_complete());
        assert_eq!(exec.finish(), vec![Outcome::Value(1), Outcome::Value(2)]);
    }

    #[test]
    fn observed_clock_joins_peers() {
        let mut exec: ClockedThreadExecution<(), i32, ()> =
            ClockedThreadExecution::new(0, 2, vec![actor(1)]);
        let mut peer = HBClock::zero(2);
        peer.set(1, 5);
        exec.run_actor(0, &(), &[&peer], true);
        let row = exec.clock_rows()[0].as_ref().unwrap();
        assert_eq!(row.get(1), 5);
    }

    #[test]
    fn reset_clears_results_and_clock() {
        let mut exec: ClockedThreadExecution<(), i32, ()> =
            ClockedThreadExecution::new(0, 1, vec![actor(1)]);
        exec.run_actor(0, &(), &[], false);
        exec.reset(1);
        assert!(!exec.is_complete());
        assert_eq!(exec.current_clock().get(0), 0);
    }

    #[test]
    fn suspended_actor_resolves_on_resume() {
        let mut exec: ClockedThreadExecution<(), i32, ()> = ClockedThreadExecution::new(
            0,
            1,
            vec![Actor::new("susp", ActorFlags::SUSPENDABLE, |_, _| {
                ActorPoll::Suspended
            })],
        );
        let completion = exec.run_actor(0, &(), &[], false).expect("suspended");
        assert!(!exec.is_complete());
        completion.resume(Outcome::Value(9));
        exec.settle_suspended(0);
        assert!(exec.is_complete());
        assert_eq!(exec.finish(), vec![Outcome::Value(9)]);
    }

    #[test]
    fn spin_wait_suspension_observes_settlement() {
        let mut exec: ClockedThreadExecution<(), i32, ()> = ClockedThreadExecution::new(
            0,
            1,
            vec![Actor::new("susp", ActorFlags::SUSPENDABLE, |_, _| {
                ActorPoll::Suspended
            })],
        );
        let completion = exec.run_actor(0, &(), &[], false).expect("suspended");
        completion.cancel();
        let mut spinner = Spinner::new(SpinBudget::new(10));
        assert!(matches!(
            exec.spin_wait_suspension(0, &mut spinner),
            Some(CompletionPoll::Cancelled)
        ));
        exec.settle_suspended(0);
        assert_eq!(exec.finish(), vec![Outcome::Cancelled]);
    }

    #[test]
    fn declared_exception_panic_becomes_outcome_exception() {
        let panicking: Actor<(), i32, &'static str> = Actor::new("throws", ActorFlags::HANDLES_EXCEPTIONS, |_, _| {
            std::panic::panic_any("declared-failure")
        });
        let mut exec: ClockedThreadExecution<(), i32, &'static str> = ClockedThreadExecution::new(0, 1, vec![panicking]);
        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));
        let result = exec.run_actor(0, &(), &[], false);
        std::panic::set_hook(prev_hook);
        assert!(result.is_none());
        assert_eq!(exec.finish(), vec![Outcome::Exception("declared-failure")]);
    }

    #[test]
    #[should_panic(expected = "unhandled-failure")]
    fn undeclared_panic_still_propagates() {
        let panicking: Actor<(), i32, &'static str> = Actor::new("throws", ActorFlags::empty(), |_, _| {
            panic!("unhandled-failure")
        });
        let mut exec: ClockedThreadExecution<(), i32, &'static str> = ClockedThreadExecution::new(0, 1, vec![panicking]);
        let _ = exec.run_actor(0, &(), &[], false);
    }
}
