//! Outbound message queue.
//!
//! Holds application messages submitted before the handshake completes.
//! FIFO and unbounded; drained exactly once when the connection opens.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use crate::protocol::Envelope;

// ============================================================================
// OutboundQueue
// ============================================================================

/// Pending envelopes in submission order.
#[derive(Debug, Clone, Default)]
pub struct OutboundQueue {
    pending: VecDeque<Envelope>,
}

impl OutboundQueue {
    /// Creates an empty queue.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an envelope.
    pub fn push(&mut self, envelope: Envelope) {
        self.pending.push_back(envelope);
    }

    /// Removes and returns every envelope, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = Envelope> + '_ {
        self.pending.drain(..)
    }

    /// Drops every pending envelope.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Returns the number of pending envelopes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is pending.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_drain_empties_queue() {
        let mut queue = OutboundQueue::new();
        queue.push(Envelope::msg(json!(1)));
        queue.push(Envelope::msg(json!(2)));

        let drained: Vec<_> = queue.drain().collect();

        assert_eq!(drained, vec![Envelope::msg(json!(1)), Envelope::msg(json!(2))]);
        assert!(queue.is_empty());
    }

    proptest! {
        #[test]
        fn prop_drain_preserves_submission_order(bodies in prop::collection::vec(any::<i64>(), 0..64)) {
            let mut queue = OutboundQueue::new();
            for body in &bodies {
                queue.push(Envelope::msg(json!(body)));
            }
            prop_assert_eq!(queue.len(), bodies.len());

            let drained: Vec<_> = queue.drain().collect();
            let expected: Vec<_> = bodies.iter().map(|body| Envelope::msg(json!(body))).collect();

            prop_assert_eq!(drained, expected);
            prop_assert!(queue.is_empty());
        }
    }
}
