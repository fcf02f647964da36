use std::fmt;
use std::str::FromStr;

use crate::error::CourierError;

/// Wire tag for best-effort delivery.
pub const TAG_AT_MOST_ONCE: &str = "INFO-1";
/// Wire tag for retry-until-acknowledged delivery.
pub const TAG_AT_LEAST_ONCE: &str = "INFO-2";
/// Wire tag for retried delivery applied idempotently by the receiver.
pub const TAG_EXACTLY_ONCE: &str = "INFO-3";
/// Wire tag for exactly-once delivery released in submission order.
pub const TAG_EXACTLY_ONCE_ORDERED: &str = "INFO-4";

/// Delivery guarantee selected per message by its type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Guarantee {
    /// Single unacknowledged send.
    AtMostOnce,
    /// Resend until the matching acknowledgment is observed.
    AtLeastOnce,
    /// Same sender mechanism as `AtLeastOnce`; the receiver deduplicates.
    ExactlyOnce,
    /// Retried like `ExactlyOnce`, with local releases kept in order.
    ExactlyOnceOrdered,
}

impl Guarantee {
    pub const ALL: [Guarantee; 4] = [
        Guarantee::AtMostOnce,
        Guarantee::AtLeastOnce,
        Guarantee::ExactlyOnce,
        Guarantee::ExactlyOnceOrdered,
    ];

    /// Returns the wire tag for this level.
    pub fn tag(self) -> &'static str {
        match self {
            Guarantee::AtMostOnce => TAG_AT_MOST_ONCE,
            Guarantee::AtLeastOnce => TAG_AT_LEAST_ONCE,
            Guarantee::ExactlyOnce => TAG_EXACTLY_ONCE,
            Guarantee::ExactlyOnceOrdered => TAG_EXACTLY_ONCE_ORDERED,
        }
    }

    /// Whether this level resends until acknowledged.
    pub fn requires_ack(self) -> bool {
        !matches!(self, Guarantee::AtMostOnce)
    }

    /// Whether local input arriving during this level's wait must be deferred.
    pub fn is_ordered(self) -> bool {
        matches!(self, Guarantee::ExactlyOnceOrdered)
    }
}

impl fmt::Display for Guarantee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Guarantee {
    type Err = CourierError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Guarantee::ALL
            .into_iter()
            .find(|level| level.tag() == tag)
            .ok_or_else(|| CourierError::UnknownGuarantee(tag.to_string()))
    }
}
