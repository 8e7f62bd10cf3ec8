//!
//! The external hook a test driver uses to describe its subject's abstract state at a phase
//! boundary (spec.md §4.D "State representation").
//!
//! Lincheck never inspects `T` itself; it only ever asks the driver for an opaque string,
//! attached to the invocation result so a human (or a follow-up tool) can see what the subject
//! looked like right before, or right after, the parallel phase ran.

/// Implemented by the embedding test driver to describe `T`'s abstract state.
///
/// A plain `Fn(&T) -> String` closure implements this automatically, so most callers never name
/// the trait directly.
pub trait StateRepr<T> {
    /// Renders `subject`'s current abstract state.
    fn state_repr(&self, subject: &T) -> String;
}

impl<T, F> StateRepr<T> for F
where
    F: Fn(&T) -> String,
{
    fn state_repr(&self, subject: &T) -> String {
        (self)(subject)
    }
}

/// A [`StateRepr`] that never inspects the subject; used by scenarios that don't report state.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoStateRepr;

impl<T> StateRepr<T> for NoStateRepr {
    fn state_repr(&self, _subject: &T) -> String {
        String::new()
    }
}
