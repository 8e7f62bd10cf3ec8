//!
//! The sequential-consistency approximation: a cheap, causality-only incremental pre-check that
//! runs ahead of the full coherence search (spec.md §4.G, §7 `SequentialConsistencyApprox`).
//!
//! Unlike [`crate::release_acquire::ReleaseAcquireChecker`], this checker does not consult
//! read-modify-write chain order — only the causality clock. It catches the cheap, common case
//! (two writes whose causality clocks disagree about the one location's ordering) on every new
//! event, without waiting for a full pass. A miss here is not a false negative: the subsequent
//! full coherence checker still covers every case this approximation declines to rule on.

use crate::aggregator::IncrementalChecker;
use crate::inconsistency::{IncrementalVerdict, Inconsistency};
use lincheck_events::event::{AccessKind, Event, EventLabel, Location};
use lincheck_events::execution::Execution;
use std::collections::HashMap;

/// Incremental sequential-consistency approximation checker.
#[derive(Debug, Default)]
pub struct SequentialConsistencyApproxChecker {
    writes_by_location: HashMap<Location, Vec<Event>>,
}

impl SequentialConsistencyApproxChecker {
    /// A fresh checker with no recorded writes.
    pub fn new() -> Self {
        Self::default()
    }
}

impl IncrementalChecker for SequentialConsistencyApproxChecker {
    fn reset(&mut self, _store: &[Event], _execution: &Execution) {
        self.writes_by_location.clear();
    }

    fn check_event(&mut self, _store: &[Event], event: &Event) -> IncrementalVerdict {
        let is_write = matches!(
            event.label,
            EventLabel::MemoryAccess {
                kind: AccessKind::Write,
                ..
            } | EventLabel::Initialization { .. }
        );
        let Some(location) = is_write.then(|| event.label.location()).flatten() else {
            return IncrementalVerdict::Consistent;
        };

        let existing = self.writes_by_location.entry(location).or_default();
        for other in existing.iter() {
            let forward = other.causality_clock.happens_before(&event.causality_clock);
            let backward = event.causality_clock.happens_before(&other.causality_clock);
            if forward && backward {
                // happens_before is irreflexive by construction; this would mean the clock
                // implementation regressed.
                unreachable!("a causality clock cannot strictly precede itself");
            }
            if !forward && !backward && other.id != event.id {
                // Concurrent writes to the same location: resolvable only by coherence search,
                // not by causality alone.
                existing.push(event.clone());
                return IncrementalVerdict::Unknown;
            }
        }
        existing.push(event.clone());
        IncrementalVerdict::Consistent
    }
}
