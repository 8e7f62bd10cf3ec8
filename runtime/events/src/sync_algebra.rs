//!
//! The synchronization algebra: the partial operation `A ⊕ B` that folds a request label
//! together with one or more candidate total/response labels into a combined response label
//! (spec.md §4.F Synchronization algebra).
//!

use crate::event::{AccessKind, EventLabel, EventValue, Phase, ThreadId};

/// Attempts to synchronize a `Binary`-kind request label with a single candidate, producing the
/// response label that would result, or `None` if the two labels don't match (different
/// locations, incompatible kinds, ...).
///
/// Binary synchronization pairs one request with *each* candidate independently — every
/// matching candidate yields its own response event, which is how `EventStructure` explores
/// alternative sources for the same read (spec.md §4.F).
pub fn synchronize_binary(request: &EventLabel, candidate: &EventLabel) -> Option<EventLabel> {
    match (request, candidate) {
        (
            EventLabel::MemoryAccess {
                kind: AccessKind::Read,
                location: req_loc,
                is_exclusive,
                phase: Phase::Request,
                ..
            },
            EventLabel::MemoryAccess {
                kind: AccessKind::Write,
                location: cand_loc,
                value,
                ..
            },
        )
        | (
            EventLabel::MemoryAccess {
                kind: AccessKind::Read,
                location: req_loc,
                is_exclusive,
                phase: Phase::Request,
                ..
            },
            EventLabel::Initialization {
                location: cand_loc,
                value,
            },
        ) if req_loc == cand_loc => Some(EventLabel::MemoryAccess {
            kind: AccessKind::Read,
            location: *req_loc,
            value: *value,
            is_exclusive: *is_exclusive,
            phase: Phase::Response,
        }),

        (EventLabel::Lock { monitor: req_mon }, EventLabel::Unlock { monitor: cand_mon })
            if req_mon == cand_mon =>
        {
            Some(EventLabel::Lock { monitor: *req_mon })
        }

        (EventLabel::Wait { monitor: req_mon }, EventLabel::Notify { monitor: cand_mon }) if req_mon == cand_mon => {
            Some(EventLabel::Wait { monitor: *req_mon })
        }

        _ => None,
    }
}

/// Attempts to synchronize a `Barrier`-kind request label with a full set of candidates,
/// producing the single combined response only if every member of the set is present.
///
/// The only `Barrier` label today is `ThreadJoin`, which requires a `ThreadFinish` from every
/// joined thread before it can complete (spec.md §4.F).
pub fn synchronize_barrier(request: &EventLabel, finished_threads: &[ThreadId]) -> Option<EventLabel> {
    match request {
        EventLabel::ThreadJoin { joined } => {
            let all_finished = joined.iter().all(|t| finished_threads.contains(t));
            if all_finished {
                Some(EventLabel::ThreadJoin {
                    joined: joined.clone(),
                })
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Synthesizes the default-valued `Initialization` label for `location`, used the first time a
/// read has no prior write to synchronize with (spec.md §4.F "Initialization writes").
pub fn initialization_label(location: crate::event::Location) -> EventLabel {
    EventLabel::Initialization {
        location,
        value: EventValue(0),
    }
}
