//!
//! Actor descriptors: one operation invocation in a scenario, together with the flags that
//! govern how the runner treats its suspension and cancellation.
//!

use crate::outcome::Outcome;
use crate::recorder::AccessRecorder;
use bitflags::bitflags;
use std::fmt;
use std::sync::Arc;

bitflags! {
    /// Flags captured on an [`Actor`] at scenario-generation time (spec.md §3).
    #[derive(Default)]
    pub struct ActorFlags: u8 {
        /// The actor's method may suspend (return control without completing) and must be
        /// driven through the [`crate::completion::Completion`] protocol.
        const SUSPENDABLE = 1 << 0;
        /// If the actor suspends, the runner should attempt cancellation rather than waiting
        /// for a resumer.
        const CANCEL_ON_SUSPENSION = 1 << 1;
        /// A cancellation may be requested even after the continuation has been prepared for
        /// resumption; the runner's status CAS disambiguates the race.
        const PROMPT_CANCELLATION = 1 << 2;
        /// The actor declares a set of "legitimate" exception kinds; thrown exceptions outside
        /// that set should still surface as `UnexpectedException` rather than
        /// `Outcome::Exception`.
        const HANDLES_EXCEPTIONS = 1 << 3;
    }
}

/// What one call to an [`Actor`]'s method produced, before the runner's suspension/cancellation
/// bookkeeping (§4.C step 3) classifies it into a final [`Outcome`].
#[derive(Debug)]
pub enum ActorPoll<V, K> {
    /// The method ran to completion.
    Done(Outcome<V, K>),
    /// The method returned the sentinel meaning "suspended"; the runner must consult this
    /// actor's [`crate::completion::Completion`].
    Suspended,
}

/// One operation invocation in a scenario: an opaque descriptor identifying a user method
/// together with captured argument values (closed over by `invoke`) and the flags in
/// [`ActorFlags`].
///
/// `T` is the test subject's type, `V`/`K` the value/exception-kind types of this scenario's
/// [`Outcome`]s.
pub struct Actor<T, V, K> {
    name: String,
    flags: ActorFlags,
    invoke: Arc<dyn Fn(&T, &AccessRecorder) -> ActorPoll<V, K> + Send + Sync>,
}

impl<T, V, K> Actor<T, V, K> {
    /// Builds an actor named `name` (purely diagnostic — used in thread dumps and trace spans)
    /// that calls `invoke` against the test subject. `invoke` reports the memory accesses and
    /// synchronization operations it performs through the [`AccessRecorder`] it is handed
    /// (spec.md §6); an actor with nothing to report may simply ignore it.
    pub fn new(
        name: impl Into<String>,
        flags: ActorFlags,
        invoke: impl Fn(&T, &AccessRecorder) -> ActorPoll<V, K> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            flags,
            invoke: Arc::new(invoke),
        }
    }

    /// The actor's diagnostic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// This actor's flags.
    pub fn flags(&self) -> ActorFlags {
        self.flags
    }

    /// `true` if the method behind this actor may suspend.
    pub fn is_suspendable(&self) -> bool {
        self.flags.contains(ActorFlags::SUSPENDABLE)
    }

    /// `true` if a suspension of this actor should be cancelled rather than awaited.
    pub fn cancel_on_suspension(&self) -> bool {
        self.flags.contains(ActorFlags::CANCEL_ON_SUSPENSION)
    }

    /// `true` if this actor permits cancellation even after resumption has been prepared.
    pub fn prompt_cancellation(&self) -> bool {
        self.flags.contains(ActorFlags::PROMPT_CANCELLATION)
    }

    /// Runs this actor's method against `subject`, handing it `recorder` to report whatever
    /// memory accesses and synchronization operations it performs.
    pub fn invoke(&self, subject: &T, recorder: &AccessRecorder) -> ActorPoll<V, K> {
        (self.invoke)(subject, recorder)
    }
}

impl<T, V, K> Clone for Actor<T, V, K> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            flags: self.flags,
            invoke: self.invoke.clone(),
        }
    }
}

impl<T, V, K> fmt::Debug for Actor<T, V, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_roundtrip() {
        let actor: Actor<(), (), ()> = Actor::new(
            "push",
            ActorFlags::SUSPENDABLE | ActorFlags::CANCEL_ON_SUSPENSION,
            |_, _| ActorPoll::Done(Outcome::Void),
        );
        assert!(actor.is_suspendable());
        assert!(actor.cancel_on_suspension());
        assert!(!actor.prompt_cancellation());
    }

    #[test]
    fn invoke_runs_closure_against_subject() {
        let actor: Actor<i32, i32, ()> =
            Actor::new("read", ActorFlags::empty(), |subject, _| {
                ActorPoll::Done(Outcome::Value(*subject))
            });
        match actor.invoke(&42, &AccessRecorder::new()) {
            ActorPoll::Done(Outcome::Value(v)) => assert_eq!(v, 42),
            _ => panic!("expected a value"),
        }
    }

    #[test]
    fn invoke_passes_recorder_through_to_the_closure() {
        let actor: Actor<(), (), ()> = Actor::new("report", ActorFlags::empty(), |_, recorder| {
            recorder.record_write(1, 9);
            ActorPoll::Done(Outcome::Void)
        });
        let recorder = AccessRecorder::new();
        actor.invoke(&(), &recorder);
        assert_eq!(recorder.drain(), vec![crate::recorder::RecordedAccess::Write { location: 1, value: 9 }]);
    }
}
