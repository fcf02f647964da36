use std::collections::HashSet;

use courier_core::Message;

/// Computes the acknowledgment an honest `target` returns for `addressed`.
pub fn expected_acknowledgment(addressed: &Message, target: &str) -> Message {
    addressed.acknowledgment_from(target)
}

/// Distinct remote messages observed so far, used for ack membership tests.
///
/// The set is never drained: a late acknowledgment may belong to any frame
/// still suspended on the stack.
#[derive(Debug, Default, Clone)]
pub struct AckSet {
    seen: HashSet<Message>,
}

impl AckSet {
    /// Records an inbound remote message. Returns `false` for a duplicate.
    pub fn observe(&mut self, message: Message) -> bool {
        self.seen.insert(message)
    }

    /// Whether `template` has been observed.
    pub fn contains(&self, template: &Message) -> bool {
        self.seen.contains(template)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
