//!
//! `AccessRecorder`: the handle an actor's method uses to report the memory accesses and
//! synchronization operations it performs against the test subject (spec.md §6 "the core
//! consumes, from the instrumentation layer, a stream of typed events per worker thread").
//!
//! Byte-code instrumentation that would derive these calls automatically from arbitrary user
//! code is out of scope (spec.md §1 Out of scope); `AccessRecorder` is the narrow interface a
//! hand-instrumented actor method reports through instead. Locations and values are opaque
//! `u64`s here — `lincheck-actor` has no dependency on `lincheck-events`, so translation into
//! that crate's `Location`/`EventValue`/`EventLabel` vocabulary happens one layer up, in the
//! facade that already depends on both.
//!

use std::cell::RefCell;

/// One reported memory access or synchronization operation, in emission order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordedAccess {
    /// A load from `location`, observing `value`.
    Read {
        /// The location read.
        location: u64,
        /// The value observed.
        value: u64,
    },
    /// A plain store of `value` to `location`.
    Write {
        /// The location written.
        location: u64,
        /// The value stored.
        value: u64,
    },
    /// The write half of a read-modify-write: atomically reads the prior value and stores
    /// `value`, extending this location's read-modify-write chain.
    ExclusiveWrite {
        /// The location written.
        location: u64,
        /// The value stored.
        value: u64,
    },
    /// A monitor acquire.
    Lock {
        /// The monitor's identity.
        monitor: u64,
    },
    /// A monitor release.
    Unlock {
        /// The monitor's identity.
        monitor: u64,
    },
    /// A wait on a monitor's condition.
    Wait {
        /// The monitor's identity.
        monitor: u64,
    },
    /// A notify on a monitor's condition.
    Notify {
        /// The monitor's identity.
        monitor: u64,
    },
}

/// Collects one actor invocation's reported accesses, in the order the actor's method reports
/// them. Built fresh for each invocation and drained by the pool driver once the actor returns
/// (spec.md §5 "the event structure's append list is single-writer... worker threads report
/// events through instrumentation callbacks that funnel into that driver").
///
/// Not `Sync`: an `AccessRecorder` is only ever used by the single thread running the actor it
/// was built for.
#[derive(Debug, Default)]
pub struct AccessRecorder {
    log: RefCell<Vec<RecordedAccess>>,
}

impl AccessRecorder {
    /// A fresh recorder with nothing reported yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports a load.
    pub fn record_read(&self, location: u64, value: u64) {
        self.log.borrow_mut().push(RecordedAccess::Read { location, value });
    }

    /// Reports a plain store.
    pub fn record_write(&self, location: u64, value: u64) {
        self.log.borrow_mut().push(RecordedAccess::Write { location, value });
    }

    /// Reports the write half of a read-modify-write.
    pub fn record_exclusive_write(&self, location: u64, value: u64) {
        self.log.borrow_mut().push(RecordedAccess::ExclusiveWrite { location, value });
    }

    /// Reports a monitor acquire.
    pub fn record_lock(&self, monitor: u64) {
        self.log.borrow_mut().push(RecordedAccess::Lock { monitor });
    }

    /// Reports a monitor release.
    pub fn record_unlock(&self, monitor: u64) {
        self.log.borrow_mut().push(RecordedAccess::Unlock { monitor });
    }

    /// Reports a wait on a monitor's condition.
    pub fn record_wait(&self, monitor: u64) {
        self.log.borrow_mut().push(RecordedAccess::Wait { monitor });
    }

    /// Reports a notify on a monitor's condition.
    pub fn record_notify(&self, monitor: u64) {
        self.log.borrow_mut().push(RecordedAccess::Notify { monitor });
    }

    /// Takes every access reported so far, leaving the recorder empty.
    pub fn drain(&self) -> Vec<RecordedAccess> {
        self.log.borrow_mut().drain(..).collect()
    }
}
