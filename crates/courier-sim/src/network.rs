use std::collections::VecDeque;
use std::time::Duration;

use courier_core::Message;
use courier_transport::{Inbound, RelayTransport, TransportHealthSnapshot};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::trace;

use crate::link::LinkProfile;
use crate::receiver::EchoReceiver;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// The relay kept waiting past the configured receive budget.
    #[error("simulation stalled after {0} receive calls")]
    Stalled(u64),
    #[error("unknown destination: {0}")]
    UnknownDestination(String),
}

/// `RelayTransport` over a seeded lossy link to one `EchoReceiver`.
#[derive(Debug)]
pub struct SimTransport {
    relay_id: String,
    receiver: EchoReceiver,
    forward: LinkProfile,
    backward: LinkProfile,
    rng: StdRng,
    inbound: VecDeque<Message>,
    local_input: VecDeque<Message>,
    mid_wait_local: VecDeque<Message>,
    local_outbound: Vec<Message>,
    wire_sends: Vec<Message>,
    receive_calls: u64,
    receive_budget: u64,
    simulated_wait: Duration,
    health: TransportHealthSnapshot,
}

impl SimTransport {
    pub fn new(
        relay_id: impl Into<String>,
        receiver: EchoReceiver,
        forward: LinkProfile,
        backward: LinkProfile,
        seed: u64,
    ) -> Self {
        Self {
            relay_id: relay_id.into(),
            receiver,
            forward,
            backward,
            rng: StdRng::seed_from_u64(seed),
            inbound: VecDeque::new(),
            local_input: VecDeque::new(),
            mid_wait_local: VecDeque::new(),
            local_outbound: Vec::new(),
            wire_sends: Vec::new(),
            receive_calls: 0,
            receive_budget: 100_000,
            simulated_wait: Duration::ZERO,
            health: TransportHealthSnapshot::default(),
        }
    }

    /// Caps how many `receive` calls may happen before `SimError::Stalled`.
    pub fn set_receive_budget(&mut self, budget: u64) {
        self.receive_budget = budget;
    }

    /// Queues producer input for `receive_local`.
    pub fn push_local_input(&mut self, message: Message) {
        self.local_input.push_back(message);
    }

    /// Queues producer input that shows up on the multiplexed `receive`
    /// channel, i.e. while a retry is waiting. One is handed out per call.
    pub fn push_local_during_wait(&mut self, message: Message) {
        self.mid_wait_local.push_back(message);
    }

    pub fn receiver(&self) -> &EchoReceiver {
        &self.receiver
    }

    /// Every message the relay handed to the link, including dropped ones.
    pub fn wire_sends(&self) -> &[Message] {
        &self.wire_sends
    }

    pub fn local_outbound(&self) -> &[Message] {
        &self.local_outbound
    }

    /// Sum of all timeouts that elapsed without an event.
    pub fn simulated_wait(&self) -> Duration {
        self.simulated_wait
    }

    fn enqueue_inbound(&mut self, ack: Message) {
        if !self.inbound.is_empty() && self.backward.overtakes(&mut self.rng) {
            let at = self.rng.gen_range(0..self.inbound.len());
            self.inbound.insert(at, ack);
        } else {
            self.inbound.push_back(ack);
        }
    }
}

impl RelayTransport for SimTransport {
    type Error = SimError;

    fn send(&mut self, message: &Message, destination: &str) -> Result<(), Self::Error> {
        if destination != self.receiver.id() {
            return Err(SimError::UnknownDestination(destination.to_string()));
        }
        let stamped = message.with_origin(self.relay_id.clone());
        self.wire_sends.push(stamped.clone());
        self.health.remote_send_ok += 1;

        let copies = self.forward.copies(&mut self.rng);
        trace!(kind = %message.kind, copies, "forward link");
        for _ in 0..copies {
            let echo = self.receiver.deliver(stamped.clone());
            let ack = echo.with_origin(self.receiver.id().to_string());
            for _ in 0..self.backward.copies(&mut self.rng) {
                self.enqueue_inbound(ack.clone());
            }
        }
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<Inbound>, Self::Error> {
        self.receive_calls += 1;
        if self.receive_calls > self.receive_budget {
            return Err(SimError::Stalled(self.receive_budget));
        }
        if let Some(local) = self.mid_wait_local.pop_front() {
            self.health.local_received += 1;
            return Ok(Some(Inbound::Local(local)));
        }
        match self.inbound.pop_front() {
            Some(ack) => {
                self.health.remote_received += 1;
                Ok(Some(Inbound::Remote(ack)))
            }
            None => {
                self.simulated_wait += timeout;
                Ok(None)
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
