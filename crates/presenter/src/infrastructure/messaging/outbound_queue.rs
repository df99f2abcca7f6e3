//! FIFO of envelopes published while the channel was down.

use std::collections::VecDeque;

use whiskers_protocol::{Envelope, OutboundMessage};

/// Unbounded; the channel never drops application output on its own.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    pending: VecDeque<Envelope<OutboundMessage>>,
}

impl OutboundQueue {
    pub fn push(&mut self, envelope: Envelope<OutboundMessage>) {
        self.pending.push_back(envelope);
    }

    /// Puts an envelope back at the head after a failed flush.
    pub fn requeue(&mut self, envelope: Envelope<OutboundMessage>) {
        self.pending.push_front(envelope);
    }

    pub fn pop(&mut self) -> Option<Envelope<OutboundMessage>> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn envelope(index: usize) -> Envelope<OutboundMessage> {
        let at = Utc
            .with_ymd_and_hms(2024, 1, 15, 10, 30, 0)
            .single()
            .expect("valid time");
        Envelope::new(
            OutboundMessage::ChoiceSelected {
                choice_index: index,
                choice_text: format!("choice {index}"),
            },
            at,
        )
    }

    #[test]
    fn pops_in_push_order_with_requeue_at_head() {
        let mut queue = OutboundQueue::default();
        queue.push(envelope(0));
        queue.push(envelope(1));

        let first = queue.pop().expect("first");
        queue.requeue(first);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop(), Some(envelope(0)));
        assert_eq!(queue.pop(), Some(envelope(1)));
        assert!(queue.is_empty());
    }
}
