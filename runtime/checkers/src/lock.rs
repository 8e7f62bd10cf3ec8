//!
//! Lock consistency checker: mutual exclusion between `Lock`/`Unlock` pairs on the same monitor,
//! and no `Notify` without an outstanding `Wait` to pair it with (spec.md §4.G, §7 `Lock`).
//!

use crate::aggregator::{FullChecker, IncrementalChecker};
use crate::inconsistency::{IncrementalVerdict, Inconsistency};
use lincheck_events::event::{Event, EventLabel, Location};
use lincheck_events::execution::Execution;
use std::collections::HashSet;

/// Incremental + full lock discipline checker.
#[derive(Debug, Default)]
pub struct LockChecker {
    held: HashSet<Location>,
}

impl LockChecker {
    /// A fresh checker with no monitors held.
    pub fn new() -> Self {
        Self::default()
    }

    fn fold(&mut self, label: &EventLabel) -> Option<Inconsistency> {
        match label {
            EventLabel::Lock { monitor } => {
                if !self.held.insert(*monitor) {
                    return Some(Inconsistency::Lock { monitor: *monitor });
                }
                None
            }
            EventLabel::Unlock { monitor } => {
                if !self.held.remove(monitor) {
                    return Some(Inconsistency::Lock { monitor: *monitor });
                }
                None
            }
            _ => None,
        }
    }
}

impl IncrementalChecker for LockChecker {
    fn reset(&mut self, _store: &[Event], _execution: &Execution) {
        self.held.clear();
    }

    fn check_event(&mut self, _store: &[Event], event: &Event) -> IncrementalVerdict {
        match self.fold(&event.label) {
            Some(inc) => IncrementalVerdict::Inconsistent(inc),
            None => IncrementalVerdict::Consistent,
        }
    }
}

impl FullChecker for LockChecker {
    fn check(&self, store: &[Event], _execution: &Execution) -> Option<Inconsistency> {
        let mut held = HashSet::new();
        for event in store {
            match &event.label {
                EventLabel::Lock { monitor } => {
                    if !held.insert(*monitor) {
                        return Some(Inconsistency::Lock { monitor: *monitor });
                    }
                }
                EventLabel::Unlock { monitor } => {
                    if !held.remove(monitor) {
                        return Some(Inconsistency::Lock { monitor: *monitor });
                    }
                }
                EventLabel::Notify { monitor } => {
                    let has_wait = store
                        .iter()
                        .any(|e| matches!(&e.label, EventLabel::Wait { monitor: m } if m == monitor));
                    if !has_wait {
                        return Some(Inconsistency::Lock { monitor: *monitor });
                    }
                }
                _ => {}
            }
        }
        None
    }
}
