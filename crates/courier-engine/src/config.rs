use std::time::Duration;

/// Default bounded wait for an acknowledgment before resending.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Bounded wait for the next inbound event before a resend.
    pub ack_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ack_timeout: DEFAULT_ACK_TIMEOUT,
        }
    }
}

impl EngineConfig {
    pub fn with_ack_timeout(ack_timeout: Duration) -> Self {
        Self { ack_timeout }
    }
}
