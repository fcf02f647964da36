use std::collections::HashMap;

use courier_core::{Message, Payload};

/// Remote endpoint that records every wire observation and echoes each one
/// back as its acknowledgment.
///
/// Observations are keyed by type and payload; the receiver applies no
/// deduplication of its own.
#[derive(Debug, Clone)]
pub struct EchoReceiver {
    id: String,
    observations: HashMap<(String, Payload), usize>,
    arrival_order: Vec<Message>,
}

impl EchoReceiver {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            observations: HashMap::new(),
            arrival_order: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Records one delivered copy and returns the acknowledgment to send back.
    pub fn deliver(&mut self, message: Message) -> Message {
        *self
            .observations
            .entry((message.kind.clone(), message.payload.clone()))
            .or_insert(0) += 1;
        let ack = message.clone();
        self.arrival_order.push(message);
        ack
    }

    /// How many copies of `message` (by type and payload) arrived.
    pub fn observations(&self, message: &Message) -> usize {
        self.observations
            .get(&(message.kind.clone(), message.payload.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Every delivered copy, in arrival order.
    pub fn arrivals(&self) -> &[Message] {
        &self.arrival_order
    }
}
