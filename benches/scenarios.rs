//! Benchmarks the per-invocation overhead of running a cheap two-thread scenario through
//! [`ScenarioRunner`], and of the [`AdaptivePlanner`] pacing a short burst of them.

use criterion::{criterion_group, criterion_main, Criterion};
use lincheck::prelude::*;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

fn increment_scenario() -> Scenario<AtomicI64, i64, ()> {
    let thread = || {
        vec![Actor::new("incr", ActorFlags::empty(), |subject: &AtomicI64, recorder| {
            let previous = subject.fetch_add(1, Ordering::SeqCst);
            recorder.record_exclusive_write(1, (previous + 1) as u64);
            ActorPoll::Done(Outcome::Void)
        })]
    };
    Scenario::new(vec![], vec![thread(), thread()], vec![])
}

fn bench_single_invocation(c: &mut Criterion) {
    let scenario = increment_scenario();
    let runner = ScenarioRunner::new(2, RunnerConfig::default());
    c.bench_function("single two-thread invocation", |b| {
        b.iter(|| {
            let result = runner.run_invocation(&scenario, AtomicI64::new(0), &NoStateRepr);
            assert!(matches!(result, InvocationResult::Completed { .. }));
        });
    });
}

fn bench_adaptive_planner_burst(c: &mut Criterion) {
    let scenario = increment_scenario();
    let runner = ScenarioRunner::new(2, RunnerConfig::default());
    c.bench_function("adaptive planner, 100ms burst", |b| {
        b.iter(|| {
            let mut planner = AdaptivePlanner::new(PlannerConfig {
                time_budget: Duration::from_millis(100),
                mode: Mode::Stress,
            });
            while planner.should_run_next_iteration() {
                planner.begin_iteration();
                while planner.should_run_next_invocation() {
                    let started = std::time::Instant::now();
                    let _ = runner.run_invocation(&scenario, AtomicI64::new(0), &NoStateRepr);
                    planner.record_invocation(started.elapsed());
                }
                planner.end_iteration();
            }
        });
    });
}

criterion_group!(benches, bench_single_invocation, bench_adaptive_planner_burst);
criterion_main!(benches);
