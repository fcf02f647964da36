use courier_core::{CourierError, Guarantee, Message};
use courier_transport::{Inbound, RelayTransport};
use tracing::{debug, info, warn};

use crate::ack::AckSet;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::frame::{FrameState, RetryFrame};
use crate::ordering::OrderingQueue;

/// Terminal result for one message settled by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Best-effort message handed to the transport once.
    Sent { message: Message },
    /// Expected acknowledgment observed after `attempts` sends.
    Acknowledged {
        message: Message,
        guarantee: Guarantee,
        attempts: u32,
    },
    /// Unrecognized guarantee tag; the producer was notified.
    Rejected {
        message: Message,
        error: CourierError,
    },
}

impl Outcome {
    pub fn message(&self) -> &Message {
        match self {
            Outcome::Sent { message }
            | Outcome::Acknowledged { message, .. }
            | Outcome::Rejected { message, .. } => message,
        }
    }
}

/// Every outcome settled during one `submit`, in settlement order.
///
/// Nested submissions handled while a retry was waiting settle before the
/// message that was waiting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitReport {
    pub outcomes: Vec<Outcome>,
}

/// Cumulative engine counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub remote_sends: u64,
    pub send_failures: u64,
    pub resends: u64,
    pub timeouts: u64,
    pub acks_observed: u64,
    pub duplicate_acks: u64,
    pub best_effort_sent: u64,
    pub at_least_once_acked: u64,
    pub exactly_once_acked: u64,
    pub ordered_acked: u64,
    pub rejected: u64,
    pub deferred: u64,
    pub released: u64,
    pub max_nesting_depth: usize,
}

/// Single-threaded delivery-guarantee engine over one relay transport.
pub struct DeliveryEngine<T: RelayTransport> {
    transport: T,
    target: String,
    config: EngineConfig,
    acks: AckSet,
    ordering: OrderingQueue,
    frames: Vec<RetryFrame>,
    stats: EngineStats,
}

impl<T> DeliveryEngine<T>
where
    T: RelayTransport,
    T::Error: 'static,
{
    pub fn new(transport: T, target: impl Into<String>, config: EngineConfig) -> Self {
        Self {
            transport,
            target: target.into(),
            config,
            acks: AckSet::default(),
            ordering: OrderingQueue::default(),
            frames: Vec::new(),
            stats: EngineStats::default(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn acks(&self) -> &AckSet {
        &self.acks
    }

    /// Local submissions deferred behind an ordered send, not yet released.
    pub fn ordering_backlog(&self) -> usize {
        self.ordering.len()
    }

    /// Number of retry frames currently suspended on the stack.
    pub fn nesting_depth(&self) -> usize {
        self.frames.len()
    }

    /// Applies the protocol for `message`'s declared guarantee and returns
    /// once it and every nested submission handled meanwhile are settled.
    pub fn submit(&mut self, message: Message) -> Result<SubmitReport, EngineError<T::Error>> {
        let mut report = SubmitReport::default();
        self.dispatch(message, &mut report);
        self.drive(&mut report)?;
        Ok(report)
    }

    /// Handles the next local message: deferred ordered submissions first,
    /// then fresh producer input. Returns `None` once the producer closed.
    pub fn step(&mut self) -> Result<Option<SubmitReport>, EngineError<T::Error>> {
        let next = match self.ordering.release() {
            Some(message) => {
                self.stats.released += 1;
                debug!(
                    kind = %message.kind,
                    backlog = self.ordering.len(),
                    "releasing deferred message"
                );
                Some(message)
            }
            None => self
                .transport
                .receive_local()
                .map_err(EngineError::Transport)?,
        };
        match next {
            Some(message) => self.submit(message).map(Some),
            None => Ok(None),
        }
    }

    /// Runs until the local producer closes.
    pub fn run(&mut self) -> Result<EngineStats, EngineError<T::Error>> {
        info!(
            target_addr = %self.target,
            ack_timeout = ?self.config.ack_timeout,
            "delivery engine started"
        );
        while self.step()?.is_some() {}
        info!(stats = ?self.stats, "local producer closed; delivery engine stopped");
        Ok(self.stats.clone())
    }

    fn dispatch(&mut self, message: Message, report: &mut SubmitReport) {
        match message.guarantee() {
            Ok(guarantee) if !guarantee.requires_ack() => {
                self.send_remote(&message);
                self.stats.best_effort_sent += 1;
                report.outcomes.push(Outcome::Sent { message });
            }
            Ok(guarantee) => {
                let frame = RetryFrame::new(message, guarantee, &self.target);
                self.frames.push(frame);
                self.stats.max_nesting_depth =
                    self.stats.max_nesting_depth.max(self.frames.len());
            }
            Err(error) => {
                warn!(kind = %message.kind, "rejecting message with unknown guarantee");
                let note = Message::error_notification(&error);
                if let Err(err) = self.transport.send_local(&note) {
                    warn!(error = %err, "failed to notify local producer");
                }
                self.stats.rejected += 1;
                report.outcomes.push(Outcome::Rejected { message, error });
            }
        }
    }

    /// Drives the frame stack until every frame is matched.
    fn drive(&mut self, report: &mut SubmitReport) -> Result<(), EngineError<T::Error>> {
        while let Some(frame) = self.frames.last_mut() {
            if frame.state == FrameState::Resend {
                self.stats.resends += 1;
            }
            let attempt = frame.begin_attempt();
            let wire = frame.wire.clone();
            let ordered = frame.guarantee.is_ordered();
            debug!(kind = %wire.kind, attempt, depth = self.frames.len(), "sending");
            self.send_remote(&wire);

            let event = self
                .transport
                .receive(self.config.ack_timeout)
                .map_err(EngineError::Transport)?;
            match event {
                None => self.stats.timeouts += 1,
                // Behind an ordered send, or behind an unreleased backlog.
                Some(Inbound::Local(message)) if ordered || !self.ordering.is_empty() => {
                    debug!(
                        kind = %message.kind,
                        backlog = self.ordering.len(),
                        "deferring local message"
                    );
                    self.stats.deferred += 1;
                    self.ordering.defer(message);
                }
                Some(Inbound::Local(message)) => self.dispatch(message, report),
                Some(Inbound::Remote(message)) => self.observe_remote(message),
            }

            self.settle(report);
        }
        Ok(())
    }

    fn observe_remote(&mut self, message: Message) {
        if self.acks.observe(message) {
            self.stats.acks_observed += 1;
        } else {
            self.stats.duplicate_acks += 1;
        }
    }

    /// Pops every matched frame from the top of the stack; frames below
    /// resume their own wait once the frame above them settles.
    fn settle(&mut self, report: &mut SubmitReport) {
        while let Some(frame) = self.frames.last_mut() {
            if !frame.has_sent() {
                return;
            }
            if frame.observe(&self.acks) == FrameState::Resend {
                return;
            }
            let Some(frame) = self.frames.pop() else {
                return;
            };
            match frame.guarantee {
                Guarantee::AtLeastOnce => self.stats.at_least_once_acked += 1,
                Guarantee::ExactlyOnce => self.stats.exactly_once_acked += 1,
                Guarantee::ExactlyOnceOrdered => self.stats.ordered_acked += 1,
                Guarantee::AtMostOnce => {}
            }
            info!(
                kind = %frame.submitted.kind,
                attempts = frame.attempts,
                "delivery acknowledged"
            );
            report.outcomes.push(Outcome::Acknowledged {
                message: frame.submitted,
                guarantee: frame.guarantee,
                attempts: frame.attempts,
            });
        }
    }

    fn send_remote(&mut self, message: &Message) {
        self.stats.remote_sends += 1;
        if let Err(err) = self.transport.send(message, &self.target) {
            self.stats.send_failures += 1;
            warn!(kind = %message.kind, error = %err, "send failed; treating as dropped");
        }
    }
}
