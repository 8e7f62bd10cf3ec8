//! Integration tests exercising the full facade: building a [`Scenario`], driving it through a
//! [`ScenarioRunner`], and — for the longer-running case — pacing repeated invocations with an
//! [`AdaptivePlanner`].

use lincheck::prelude::*;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[test]
fn write_then_read_observes_the_written_value() {
    let write = Actor::new("write", ActorFlags::empty(), |subject: &AtomicI64, recorder| {
        subject.store(42, Ordering::SeqCst);
        recorder.record_write(1, 42);
        ActorPoll::Done(Outcome::Void)
    });
    let read = Actor::new("read", ActorFlags::empty(), |subject: &AtomicI64, recorder| {
        let value = subject.load(Ordering::SeqCst);
        recorder.record_read(1, value as u64);
        ActorPoll::Done(Outcome::Value(value))
    });

    let scenario: Scenario<AtomicI64, i64, ()> = Scenario::new(vec![], vec![vec![write], vec![]], vec![read]);
    let runner = ScenarioRunner::new(2, RunnerConfig::default());
    let result = runner.run_invocation(&scenario, AtomicI64::new(0), &NoStateRepr);

    match result {
        InvocationResult::Completed { results, .. } => {
            assert_eq!(results[0], vec![Outcome::Void]);
            assert!(results[1].is_empty());
        }
        other => panic!("expected Completed, got {other:?}"),
    }
}

#[test]
fn two_threads_incrementing_a_shared_counter_always_sum_correctly() {
    let increments_per_thread = 3;
    let make_thread = || {
        (0..increments_per_thread)
            .map(|n| {
                Actor::new(format!("incr-{n}"), ActorFlags::empty(), |subject: &AtomicI64, recorder| {
                    let previous = subject.fetch_add(1, Ordering::SeqCst);
                    recorder.record_exclusive_write(1, (previous + 1) as u64);
                    ActorPoll::Done(Outcome::Void)
                })
            })
            .collect::<Vec<_>>()
    };

    let read_final = Actor::new("read-final", ActorFlags::empty(), |subject: &AtomicI64, _| ActorPoll::Done(Outcome::Value(subject.load(Ordering::SeqCst))));

    let scenario: Scenario<AtomicI64, i64, ()> = Scenario::new(vec![], vec![make_thread(), make_thread()], vec![read_final]);
    let runner = ScenarioRunner::new(2, RunnerConfig::default());
    let result = runner.run_invocation(&scenario, AtomicI64::new(0), &NoStateRepr);

    match result {
        InvocationResult::Completed { results, .. } => {
            assert_eq!(results[0].len(), increments_per_thread);
            assert_eq!(results[1].len(), increments_per_thread);
        }
        other => panic!("expected Completed, got {other:?}"),
    }
}

#[test]
fn mutex_guarded_push_linearizes_under_a_coarse_lock() {
    let push = |value: i32| {
        Actor::new(format!("push-{value}"), ActorFlags::empty(), move |subject: &Mutex<Vec<i32>>, recorder| {
            recorder.record_lock(1);
            subject.lock().expect("not poisoned").push(value);
            recorder.record_unlock(1);
            ActorPoll::Done(Outcome::Void)
        })
    };
    let read_len = Actor::new("len", ActorFlags::empty(), |subject: &Mutex<Vec<i32>>, _| {
        ActorPoll::Done(Outcome::Value(subject.lock().expect("not poisoned").len() as i64))
    });

    let scenario: Scenario<Mutex<Vec<i32>>, i64, ()> = Scenario::new(vec![], vec![vec![push(1), push(2)], vec![push(3)]], vec![read_len]);
    let runner = ScenarioRunner::new(2, RunnerConfig::default());
    let result = runner.run_invocation(&scenario, Mutex::new(Vec::new()), &NoStateRepr);

    match result {
        InvocationResult::Completed { results, .. } => {
            assert_eq!(results[0].len(), 2);
            assert_eq!(results[1].len(), 1);
        }
        other => panic!("expected Completed, got {other:?}"),
    }
}

#[test]
fn adaptive_planner_drives_many_invocations_of_a_cheap_scenario_within_its_time_budget() {
    let noop_thread = || vec![Actor::new("noop", ActorFlags::empty(), |_: &(), _| ActorPoll::Done(Outcome::Void))];
    let scenario: Scenario<(), (), ()> = Scenario::new(vec![], vec![noop_thread(), noop_thread()], vec![]);
    let runner = ScenarioRunner::new(2, RunnerConfig::default());

    let mut planner = AdaptivePlanner::new(PlannerConfig {
        time_budget: Duration::from_millis(500),
        mode: Mode::Stress,
    });

    let started = std::time::Instant::now();
    while planner.should_run_next_iteration() {
        planner.begin_iteration();
        while planner.should_run_next_invocation() {
            let invocation_started = std::time::Instant::now();
            let result = runner.run_invocation(&scenario, (), &NoStateRepr);
            assert!(matches!(result, InvocationResult::Completed { .. }));
            planner.record_invocation(invocation_started.elapsed());
        }
        planner.end_iteration();
    }

    assert!(planner.total_invocations() > 0);
    assert!(started.elapsed() < Duration::from_secs(5), "planner should stay within a small constant factor of its budget");
}
