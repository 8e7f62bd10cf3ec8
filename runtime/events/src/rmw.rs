//!
//! Read-modify-write chains: the ordered sequence of exclusive writes at one location, each
//! reading from the write immediately before it (spec.md §3 `ReadModifyWriteChain`).
//!

use crate::event::{Event, EventId, EventLabel, Location};

/// One location's chain of exclusive writes, anchor-first.
///
/// Per spec.md §4.G Property 7, the chains at a location partition the location's exclusive
/// writes: every exclusive write belongs to exactly one chain, extending it from the write its
/// exclusive read-part observed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadModifyWriteChain {
    location: Location,
    writes: Vec<EventId>,
}

impl ReadModifyWriteChain {
    /// Starts a new chain anchored at `anchor` (the first exclusive write at `location`, or the
    /// synthesized `Initialization` write).
    pub fn new(location: Location, anchor: EventId) -> Self {
        Self {
            location,
            writes: vec![anchor],
        }
    }

    /// This chain's location.
    pub fn location(&self) -> Location {
        self.location
    }

    /// The chain's writes in order, anchor first.
    pub fn writes(&self) -> &[EventId] {
        &self.writes
    }

    /// The write this chain would extend from next.
    pub fn tip(&self) -> EventId {
        *self.writes.last().expect("a chain always has at least its anchor")
    }

    /// `true` if `candidate`'s exclusive read-part reads from this chain's current tip, meaning
    /// it legitimately extends this chain.
    pub fn extends(&self, reads_from: EventId) -> bool {
        reads_from == self.tip()
    }

    /// Appends `write` to the chain. Callers must have already checked
    /// [`ReadModifyWriteChain::extends`].
    pub fn push(&mut self, write: EventId) {
        self.writes.push(write);
    }

    /// Position of `id` within the chain, if present.
    pub fn position_of(&self, id: EventId) -> Option<usize> {
        self.writes.iter().position(|&w| w == id)
    }
}

/// `true` if `event` is an exclusive write, i.e. a candidate to extend or start a
/// [`ReadModifyWriteChain`].
pub fn is_exclusive_write(event: &Event) -> bool {
    matches!(
        event.label,
        EventLabel::MemoryAccess {
            kind: crate::event::AccessKind::Write,
            is_exclusive: true,
            ..
        }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_extends_only_from_its_tip() {
        let mut chain = ReadModifyWriteChain::new(Location(1), 0);
        assert!(chain.extends(0));
        assert!(!chain.extends(1));
        chain.push(5);
        assert_eq!(chain.tip(), 5);
        assert!(chain.extends(5));
        assert!(!chain.extends(0));
        assert_eq!(chain.position_of(0), Some(0));
        assert_eq!(chain.position_of(5), Some(1));
        assert_eq!(chain.position_of(99), None);
    }
}
