//! Benchmarks the rendezvous round-trip latency of `ActiveThreadPool::submit_and_await` under
//! varying thread counts, the same metric spec.md §8 Property 1 (pool liveness) and Property 5
//! (planner budget) are ultimately sensitive to.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use lincheck_pool::pool::{ActiveThreadPool, PoolTask};
use std::time::Duration;

fn submit_and_await_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_and_await");
    for n_threads in [1usize, 2, 4, 8] {
        let pool = ActiveThreadPool::new(n_threads);
        group.bench_with_input(BenchmarkId::from_parameter(n_threads), &n_threads, |b, &n| {
            b.iter(|| {
                let tasks = (0..n)
                    .map(|i| (i, PoolTask::new(format!("bench-{i}"), || Ok(()))))
                    .collect();
                pool.submit_and_await(tasks, Duration::from_secs(1)).unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, submit_and_await_roundtrip);
criterion_main!(benches);
