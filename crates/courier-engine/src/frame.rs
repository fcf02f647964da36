use courier_core::{Guarantee, Message};

use crate::ack::{expected_acknowledgment, AckSet};

/// Protocol state of one in-flight retry-until-acknowledged send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Next loop turn sends the first attempt.
    Sending,
    /// An attempt is on the wire and the engine is waiting for an event.
    Waiting,
    /// The wait ended without the expected acknowledgment.
    Resend,
    /// Terminal: the expected acknowledgment was observed.
    Matched,
}

/// One suspended protocol instance on the engine's explicit stack.
#[derive(Debug, Clone)]
pub struct RetryFrame {
    /// Message as submitted by the producer.
    pub submitted: Message,
    /// Submitted message addressed to the target; sent on every attempt.
    pub wire: Message,
    /// Acknowledgment that completes this frame.
    pub template: Message,
    pub guarantee: Guarantee,
    pub attempts: u32,
    pub state: FrameState,
}

impl RetryFrame {
    pub fn new(submitted: Message, guarantee: Guarantee, target: &str) -> Self {
        let wire = submitted.with_destination(target);
        let template = expected_acknowledgment(&wire, target);
        Self {
            submitted,
            wire,
            template,
            guarantee,
            attempts: 0,
            state: FrameState::Sending,
        }
    }

    /// Records one more attempt going on the wire.
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.state = FrameState::Waiting;
        self.attempts
    }

    /// Ends a wait: `Matched` once the template is in `acks`, else `Resend`.
    pub fn observe(&mut self, acks: &AckSet) -> FrameState {
        self.state = if acks.contains(&self.template) {
            FrameState::Matched
        } else {
            FrameState::Resend
        };
        self.state
    }

    /// Frames that have not sent yet are never settled.
    pub fn has_sent(&self) -> bool {
        self.attempts > 0
    }
}
