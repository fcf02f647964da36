use std::time::Duration;

use courier_core::Message;

/// Coarse per-transport health counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportHealthSnapshot {
    pub remote_send_ok: u64,
    pub remote_send_err: u64,
    pub remote_received: u64,
    pub local_received: u64,
    pub local_send_ok: u64,
    pub inbound_dropped: u64,
    pub last_error: Option<String>,
}

/// One inbound event on the multiplexed return channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Submitted by the local producer over the loopback channel.
    Local(Message),
    /// Arrived from the remote side (acknowledgment echoes).
    Remote(Message),
}

impl Inbound {
    pub fn message(&self) -> &Message {
        match self {
            Inbound::Local(msg) | Inbound::Remote(msg) => msg,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Inbound::Local(_))
    }
}

/// Boundary contract the delivery engine drives.
///
/// Implementations must hand every inbound event to a single consumer; the
/// engine never calls these methods concurrently.
pub trait RelayTransport {
    /// Transport-specific failure.
    type Error: std::error::Error;

    /// Best-effort send of `message` to `destination`. May drop or duplicate.
    fn send(&mut self, message: &Message, destination: &str) -> Result<(), Self::Error>;

    /// Returns the next local or remote event within `timeout`, or `None`.
    fn receive(&mut self, timeout: Duration) -> Result<Option<Inbound>, Self::Error>;

    /// Blocks for the next local producer message. `None` once the producer
    /// side is closed.
    fn receive_local(&mut self) -> Result<Option<Message>, Self::Error>;

    /// Delivers a message to the local producer side.
    fn send_local(&mut self, message: &Message) -> Result<(), Self::Error>;

    /// Best-effort transport health counters for logging.
    fn health_snapshot(&self) -> TransportHealthSnapshot {
        TransportHealthSnapshot::default()
    }
}
