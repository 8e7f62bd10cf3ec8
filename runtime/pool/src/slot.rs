//!
//! The single-cell rendezvous slot underlying both the task and result handoff between the
//! pool's submitter and its workers (spec.md §3, §4.B).
//!
//! Both directions share the same protocol: the waiting side spins bounded
//! ([`lincheck_actor::spinner::Spinner`]), then CAS-installs its own thread identity as a
//! "parked" marker and calls [`std::thread::park`]; the producing side, on seeing the marker,
//! stores the real value and calls [`std::thread::Thread::unpark`]. This gives at most one
//! park/unpark per rendezvous even when contention makes spinning ineffective, and slot
//! transitions happen exclusively through [`AtomicU8::compare_exchange`] /
//! [`AtomicU8::swap`] — never a lock held across the handoff.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::Thread;

const EMPTY: u8 = 0;
const PARKED: u8 = 1;
const FULL: u8 = 2;

/// A single-producer/single-consumer rendezvous cell holding at most one `T` at a time.
///
/// Used to implement both the task slot (`T` = the worker's next unit of work, or a shutdown
/// sentinel) and the result slot (`T` = `Done` or `Failure(error)`) described in spec.md §3.
pub struct RendezvousSlot<T> {
    tag: AtomicU8,
    value: Mutex<Option<T>>,
    parked: Mutex<Option<Thread>>,
}

impl<T> RendezvousSlot<T> {
    /// A fresh, empty slot.
    pub fn new() -> Self {
        Self {
            tag: AtomicU8::new(EMPTY),
            value: Mutex::new(None),
            parked: Mutex::new(None),
        }
    }

    /// Non-blocking attempt to take the slot's value. Returns `None` if nothing has been
    /// published yet.
    pub fn try_take(&self) -> Option<T> {
        if self.tag.load(Ordering::Acquire) != FULL {
            return None;
        }
        let taken = self.value.lock().take();
        if taken.is_some() {
            self.tag.store(EMPTY, Ordering::Release);
        }
        taken
    }

    /// Publishes `value` into the slot. If a thread had registered itself as parked, it is
    /// returned so the caller can unpark it; the protocol guarantees at most one such thread is
    /// ever waiting at a time.
    pub fn put(&self, value: T) -> Option<Thread> {
        *self.value.lock() = Some(value);
        let prev = self.tag.swap(FULL, Ordering::AcqRel);
        debug_assert_ne!(prev, FULL, "put() into an already-full rendezvous slot");
        if prev == PARKED {
            self.parked.lock().take()
        } else {
            None
        }
    }

    /// Registers the calling thread as the slot's parked waiter. Returns `true` if the
    /// registration was installed (the caller should then [`std::thread::park`] and re-poll
    /// with [`RendezvousSlot::try_take`] on wake); `false` means a value was published in the
    /// meantime and the caller should call [`RendezvousSlot::try_take`] immediately instead.
    pub fn mark_parked(&self, thread: Thread) -> bool {
        *self.parked.lock() = Some(thread);
        match self
            .tag
            .compare_exchange(EMPTY, PARKED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => true,
            Err(_) => {
                // A value raced in before our CAS; drop the registration, the producer never
                // saw PARKED so it won't try to unpark us.
                self.parked.lock().take();
                false
            }
        }
    }
}

impl<T> Default for RendezvousSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Spins bounded on `slot`, parking on exhaustion, until a value is available.
///
/// This is the canonical consumer-side loop shared by the pool's submitter (waiting on a
/// result slot) and its workers (waiting on a task slot).
pub fn wait_for<T>(slot: &RendezvousSlot<T>, spinner: &mut lincheck_actor::spinner::Spinner) -> T {
    use lincheck_actor::spinner::SpinOutcome;
    loop {
        match spinner.spin_wait_bounded(|| slot.try_take()) {
            SpinOutcome::Ready(v) => return v,
            SpinOutcome::TimedOut | SpinOutcome::Exhausted => {
                if slot.mark_parked(std::thread::current()) {
                    std::thread::park();
                }
                if let Some(v) = slot.try_take() {
                    return v;
                }
                // Spurious wake, or we lost the `mark_parked` race and the value hasn't been
                // observed by `try_take` yet; loop back into spinning.
            }
        }
    }
}

/// As [`wait_for`], but gives up and returns `None` once `deadline` passes.
///
/// Used by the pool's submitter, which waits on a result slot under a per-phase deadline
/// (spec.md §4.B); workers waiting on their task slot use the unbounded [`wait_for`] instead,
/// since a worker simply has nothing to do until the next task arrives.
pub fn wait_for_deadline<T>(
    slot: &RendezvousSlot<T>,
    spinner: &mut lincheck_actor::spinner::Spinner,
    deadline: std::time::Instant,
) -> Option<T> {
    use lincheck_actor::spinner::SpinOutcome;
    loop {
        match spinner.spin_wait_bounded(|| slot.try_take()) {
            SpinOutcome::Ready(v) => return Some(v),
            SpinOutcome::TimedOut | SpinOutcome::Exhausted => {
                let now = std::time::Instant::now();
                if now >= deadline {
                    return slot.try_take();
                }
                if slot.mark_parked(std::thread::current()) {
                    std::thread::park_timeout(deadline.saturating_duration_since(now));
                }
                if let Some(v) = slot.try_take() {
                    return Some(v);
                }
                if std::time::Instant::now() >= deadline {
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lincheck_actor::spinner::{SpinBudget, Spinner};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn put_then_try_take() {
        let slot: RendezvousSlot<u32> = RendezvousSlot::new();
        assert!(slot.try_take().is_none());
        assert!(slot.put(7).is_none());
        assert_eq!(slot.try_take(), Some(7));
        assert!(slot.try_take().is_none());
    }

    #[test]
    fn wait_for_across_threads_unparks_exactly_once() {
        let slot: Arc<RendezvousSlot<u32>> = Arc::new(RendezvousSlot::new());
        let consumer_slot = slot.clone();
        let consumer = std::thread::spawn(move || {
            let mut spinner = Spinner::new(SpinBudget::new(4));
            wait_for(&consumer_slot, &mut spinner)
        });

        std::thread::sleep(Duration::from_millis(20));
        let unparked = slot.put(99);
        // Either the consumer was still spinning (no one parked yet) or it had registered.
        if let Some(t) = unparked {
            t.unpark();
        }

        assert_eq!(consumer.join().unwrap(), 99);
    }

    #[test]
    fn wait_for_deadline_times_out_when_nothing_arrives() {
        let slot: RendezvousSlot<u32> = RendezvousSlot::new();
        let mut spinner = Spinner::new(SpinBudget::new(4));
        let deadline = std::time::Instant::now() + Duration::from_millis(20);
        assert_eq!(wait_for_deadline(&slot, &mut spinner, deadline), None);
    }

    #[test]
    fn wait_for_deadline_returns_value_before_expiry() {
        let slot: RendezvousSlot<u32> = RendezvousSlot::new();
        slot.put(5);
        let mut spinner = Spinner::new(SpinBudget::new(4));
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        assert_eq!(wait_for_deadline(&slot, &mut spinner, deadline), Some(5));
    }
}
