use std::collections::VecDeque;
use std::time::Duration;

use courier_core::Message;
use thiserror::Error;

use crate::adapter::{Inbound, RelayTransport, TransportHealthSnapshot};

/// One scripted outcome of a `receive` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// The call returns this event.
    Deliver(Inbound),
    /// The call times out.
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptedTransportError {
    /// `receive` was called after every scripted step was consumed.
    #[error("receive script exhausted after {0} steps")]
    ScriptExhausted(usize),
}

/// In-memory transport for tests: inbound traffic is scripted up front and
/// every send is captured.
#[derive(Debug, Default, Clone)]
pub struct ScriptedTransport {
    script: VecDeque<ScriptStep>,
    local_input: VecDeque<Message>,
    outbound: Vec<(String, Message)>,
    local_outbound: Vec<Message>,
    receive_timeouts: Vec<Duration>,
    drop_outbound: bool,
    consumed: usize,
    health: TransportHealthSnapshot,
}

impl ScriptedTransport {
    /// Queues a message for `receive_local`.
    pub fn push_local_input(&mut self, message: Message) {
        self.local_input.push_back(message);
    }

    /// Appends one scripted `receive` outcome.
    pub fn push_step(&mut self, step: ScriptStep) {
        self.script.push_back(step);
    }

    /// Scripts a local event for the next free `receive` slot.
    pub fn push_local_event(&mut self, message: Message) {
        self.push_step(ScriptStep::Deliver(Inbound::Local(message)));
    }

    /// Scripts a remote event for the next free `receive` slot.
    pub fn push_remote_event(&mut self, message: Message) {
        self.push_step(ScriptStep::Deliver(Inbound::Remote(message)));
    }

    /// Scripts `count` consecutive receive timeouts.
    pub fn push_timeouts(&mut self, count: usize) {
        for _ in 0..count {
            self.push_step(ScriptStep::Timeout);
        }
    }

    /// If enabled, remote sends are dropped (best-effort loss simulation).
    pub fn set_drop_outbound(&mut self, drop_outbound: bool) {
        self.drop_outbound = drop_outbound;
    }

    /// Remote sends captured so far.
    pub fn outbound(&self) -> &[(String, Message)] {
        &self.outbound
    }

    /// Local notifications captured so far.
    pub fn local_outbound(&self) -> &[Message] {
        &self.local_outbound
    }

    /// Timeouts passed to each `receive` call, in call order.
    pub fn receive_timeouts(&self) -> &[Duration] {
        &self.receive_timeouts
    }

    /// Scripted steps not consumed yet.
    pub fn remaining_steps(&self) -> usize {
        self.script.len()
    }
}

impl RelayTransport for ScriptedTransport {
    type Error = ScriptedTransportError;

    fn send(&mut self, message: &Message, destination: &str) -> Result<(), Self::Error> {
        if self.drop_outbound {
            self.health.remote_send_err += 1;
            return Ok(());
        }
        self.outbound.push((destination.to_string(), message.clone()));
        self.health.remote_send_ok += 1;
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<Inbound>, Self::Error> {
        self.receive_timeouts.push(timeout);
        let step = self
            .script
            .pop_front()
            .ok_or(ScriptedTransportError::ScriptExhausted(self.consumed))?;
        self.consumed += 1;
        match step {
            ScriptStep::Timeout => Ok(None),
            ScriptStep::Deliver(inbound) => {
                match &inbound {
                    Inbound::Local(_) => self.health.local_received += 1,
                    Inbound::Remote(_) => self.health.remote_received += 1,
                }
                Ok(Some(inbound))
            }
        }
    }

    fn receive_local(&mut self) -> Result<Option<Message>, Self::Error> {
        let msg = self.local_input.pop_front();
        if msg.is_some() {
            self.health.local_received += 1;
        }
        Ok(msg)
    }

    fn send_local(&mut self, message: &Message) -> Result<(), Self::Error> {
        self.local_outbound.push(message.clone());
        self.health.local_send_ok += 1;
        Ok(())
    }

    fn health_snapshot(&self) -> TransportHealthSnapshot {
        self.health.clone()
    }
}
