use std::collections::VecDeque;

use courier_core::Message;

/// FIFO holding area for local submissions that arrived while an ordered
/// send was in flight.
#[derive(Debug, Default, Clone)]
pub struct OrderingQueue {
    pending: VecDeque<Message>,
}

impl OrderingQueue {
    pub fn defer(&mut self, message: Message) {
        self.pending.push_back(message);
    }

    /// Pops the oldest deferred message.
    pub fn release(&mut self) -> Option<Message> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
