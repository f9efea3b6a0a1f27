//! Request identifiers.

/// Generates 16-bit request identifiers, wrapping modulo 65536.
///
/// The first identifier is random, so a restarted process does not collide
/// with responses the device may still hold for a previous one.
#[derive(Debug, Clone)]
pub struct Sequencer {
    next: u16,
}

impl Sequencer {
    /// Create a sequencer starting at a random identifier.
    pub fn new() -> Self {
        Self::starting_at(rand::random())
    }

    /// Create a sequencer starting at `first`.
    pub fn starting_at(first: u16) -> Self {
        Self { next: first }
    }

    /// Return the current identifier and advance.
    pub fn next_id(&mut self) -> u16 {
        let id = self.next;
        self.next = self.next.wrapping_add(1);
        id
    }

    /// The identifier the next call to [`next_id`](Self::next_id) returns.
    pub fn peek(&self) -> u16 {
        self.next
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn increments_by_one() {
        let mut seq = Sequencer::starting_at(10);
        assert_eq!(seq.next_id(), 10);
        assert_eq!(seq.next_id(), 11);
        assert_eq!(seq.peek(), 12);
    }

    #[test]
    fn wraps_at_u16_max() {
        let mut seq = Sequencer::starting_at(u16::MAX);
        assert_eq!(seq.next_id(), u16::MAX);
        assert_eq!(seq.next_id(), 0);
    }

    #[test]
    fn full_cycle_returns_to_first() {
        let mut seq = Sequencer::new();
        let first = seq.next_id();
        let mut seen = HashSet::from([first]);
        for _ in 1..65536 {
            assert!(seen.insert(seq.next_id()));
        }
        assert_eq!(seq.next_id(), first);
    }
}
