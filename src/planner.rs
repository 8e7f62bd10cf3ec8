//!
//! [`AdaptivePlanner`]: keeps a scenario's total wall-clock run within a small constant factor
//! of its configured time budget by doubling or halving the invocation count every `ADJ`
//! invocations, and rebalancing the iteration count after every iteration (spec.md §4.E).

use std::time::{Duration, Instant};

/// How aggressively the planner should push invocation counts. `Stress` favors throughput;
/// `ModelChecking` favors giving the consistency layer more wall-clock per invocation, so its
/// cap on the invocation bound is an order of magnitude lower.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Maximize invocation throughput; invocation bound can grow up to 10^6.
    Stress,
    /// Leave more time per invocation for heavier instrumentation; invocation bound capped at
    /// 2×10^4.
    ModelChecking,
}

impl Mode {
    fn invocations_cap(self) -> u64 {
        match self {
            Mode::Stress => 1_000_000,
            Mode::ModelChecking => 20_000,
        }
    }
}

/// Configuration for one [`AdaptivePlanner`] run.
#[derive(Clone, Copy, Debug)]
pub struct PlannerConfig {
    /// Total wall-clock budget for every iteration combined.
    pub time_budget: Duration,
    /// Throughput vs. model-checking tradeoff (see [`Mode`]).
    pub mode: Mode,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_secs(5),
            mode: Mode::Stress,
        }
    }
}

const INITIAL_ITERATIONS_BOUND: u64 = 10;
const INITIAL_INVOCATIONS_BOUND: u64 = 1_000;
const INVOCATIONS_FLOOR: u64 = 1_000;
const ADJ: u64 = 100;
const ITERATIONS_DELTA: u64 = 5;

/// Drives the outer iteration loop and inner invocation loop of a long-running scenario run,
/// adapting both bounds so the whole run finishes within a small constant factor of
/// `config.time_budget` regardless of how expensive one invocation turns out to be.
#[derive(Debug)]
pub struct AdaptivePlanner {
    config: PlannerConfig,
    deadline: Instant,
    iteration_index: u64,
    iterations_bound: u64,
    invocation_index: u64,
    invocations_bound: u64,
    iteration_deadline: Instant,
    invocation_time_total: Duration,
    invocation_time_count: u64,
    total_invocations: u64,
}

impl AdaptivePlanner {
    /// Starts a fresh planner; the time budget clock begins running now.
    pub fn new(config: PlannerConfig) -> Self {
        let now = Instant::now();
        Self {
            deadline: now + config.time_budget,
            iteration_deadline: now,
            config,
            iteration_index: 0,
            iterations_bound: INITIAL_ITERATIONS_BOUND,
            invocation_index: 0,
            invocations_bound: INITIAL_INVOCATIONS_BOUND,
            invocation_time_total: Duration::ZERO,
            invocation_time_count: 0,
            total_invocations: 0,
        }
    }

    /// `true` while the overall time budget remains and the iteration bound hasn't been
    /// reached.
    pub fn should_run_next_iteration(&self) -> bool {
        Instant::now() < self.deadline && self.iteration_index < self.iterations_bound
    }

    /// Resets the invocation bound and index for a new iteration, and computes that iteration's
    /// own time slice: the remaining overall budget divided evenly across the remaining
    /// iterations.
    pub fn begin_iteration(&mut self) {
        self.invocation_index = 0;
        self.invocations_bound = INITIAL_INVOCATIONS_BOUND.min(self.config.mode.invocations_cap());
        let now = Instant::now();
        let remaining_time = self.deadline.saturating_duration_since(now);
        let remaining_iterations = self.iterations_bound.saturating_sub(self.iteration_index).max(1);
        self.iteration_deadline = now + remaining_time / remaining_iterations as u32;
    }

    /// `true` while this iteration's time slice remains and the invocation bound hasn't been
    /// reached.
    pub fn should_run_next_invocation(&self) -> bool {
        Instant::now() < self.iteration_deadline && self.invocation_index < self.invocations_bound
    }

    /// Records one invocation's wall-clock cost, advancing the running average and, every `ADJ`
    /// invocations, recomputing the invocation bound.
    pub fn record_invocation(&mut self, elapsed: Duration) {
        self.invocation_index += 1;
        self.total_invocations += 1;
        self.invocation_time_total += elapsed;
        self.invocation_time_count += 1;
        if self.invocation_index % ADJ == 0 {
            self.rebalance_invocations_bound();
        }
    }

    fn average_invocation_time(&self) -> Duration {
        if self.invocation_time_count == 0 {
            Duration::ZERO
        } else {
            self.invocation_time_total / self.invocation_time_count as u32
        }
    }

    fn rebalance_invocations_bound(&mut self) {
        if self.invocation_time_count == 0 {
            return;
        }
        let average = self.average_invocation_time();
        let remaining_invocations = self.invocations_bound.saturating_sub(self.invocation_index);
        let estimate = average.saturating_mul(remaining_invocations.min(u32::MAX as u64) as u32);
        let remaining_time = self.iteration_deadline.saturating_duration_since(Instant::now());
        let cap = self.config.mode.invocations_cap();

        if estimate < remaining_time {
            let doubled = self.invocations_bound.saturating_mul(2).min(cap);
            if doubled > self.invocations_bound {
                tracing::debug!(from = self.invocations_bound, to = doubled, "adaptive planner: doubling invocation bound");
                self.invocations_bound = doubled;
            }
        } else if estimate > remaining_time {
            let halved = (self.invocations_bound / 2).max(INVOCATIONS_FLOOR);
            if halved < self.invocations_bound {
                tracing::debug!(from = self.invocations_bound, to = halved, "adaptive planner: halving invocation bound");
                self.invocations_bound = halved;
            }
        }
    }

    /// Closes out an iteration: advances the iteration index and additively rebalances the
    /// iterations bound based on whether a typical iteration (at the current invocation bound
    /// and average invocation cost) fits within its fair share of the remaining budget.
    pub fn end_iteration(&mut self) {
        self.iteration_index += 1;
        if self.invocation_time_count == 0 {
            return;
        }
        let average = self.average_invocation_time();
        let typical_iteration = average.saturating_mul(self.invocations_bound.min(u32::MAX as u64) as u32);
        let remaining_time = self.deadline.saturating_duration_since(Instant::now());
        let remaining_iterations = self.iterations_bound.saturating_sub(self.iteration_index).max(1);
        let share = remaining_time / remaining_iterations as u32;

        if typical_iteration < share {
            self.iterations_bound = self.iterations_bound.saturating_add(ITERATIONS_DELTA);
        } else if typical_iteration > share {
            let floor = self.iteration_index + 1;
            self.iterations_bound = self.iterations_bound.saturating_sub(ITERATIONS_DELTA).max(floor);
        }
    }

    /// The current iteration index (0-based).
    pub fn iteration_index(&self) -> u64 {
        self.iteration_index
    }

    /// The current iterations bound.
    pub fn iterations_bound(&self) -> u64 {
        self.iterations_bound
    }

    /// The current invocation index within this iteration (0-based).
    pub fn invocation_index(&self) -> u64 {
        self.invocation_index
    }

    /// The current invocations bound for this iteration.
    pub fn invocations_bound(&self) -> u64 {
        self.invocations_bound
    }

    /// Total invocations run across every iteration so far.
    pub fn total_invocations(&self) -> u64 {
        self.total_invocations
    }
}
