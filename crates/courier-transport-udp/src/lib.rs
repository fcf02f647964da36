//! UDP transport adapter for COURIER.
//!
//! One socket faces the remote receiver and a second loopback socket faces the
//! local producer. A worker thread owns both sockets and funnels every decoded
//! datagram into a single channel consumed by the engine thread.

use std::collections::{HashMap, VecDeque};
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use courier_codec::error::CodecError;
use courier_codec::message::{decode_message_cbor, encode_message_cbor};
use courier_core::Message;
use courier_transport::{Inbound, RelayTransport, TransportHealthSnapshot};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc as tokio_mpsc, oneshot};
use tracing::{debug, warn};

/// Largest UDP payload over IPv4.
pub const MAX_UDP_PAYLOAD: usize = 65_507;

#[derive(Debug, Clone)]
pub struct UdpTransportConfig {
    /// Bind address of the socket that talks to the remote receiver.
    pub remote_bind: String,
    /// Bind address of the loopback socket the local producer talks to.
    pub local_bind: String,
    pub inbound_queue_capacity: usize,
    pub outbound_queue_capacity: usize,
    pub max_datagram: usize,
    /// How often a blocked `receive_local` checks the shutdown flag.
    pub shutdown_poll: Duration,
}

impl UdpTransportConfig {
    pub fn new(remote_bind: impl Into<String>, local_bind: impl Into<String>) -> Self {
        Self {
            remote_bind: remote_bind.into(),
            local_bind: local_bind.into(),
            inbound_queue_capacity: 4096,
            outbound_queue_capacity: 1024,
            max_datagram: MAX_UDP_PAYLOAD,
            shutdown_poll: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Error)]
pub enum UdpTransportError {
    #[error("bind failed for {addr}: {reason}")]
    Bind { addr: String, reason: String },
    #[error("transport is closed")]
    Closed,
    #[error("outbound queue is full")]
    QueueFull,
    #[error("payload of {len} bytes exceeds max datagram ({max} bytes)")]
    PayloadTooLarge { len: usize, max: usize },
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Resolves `host:port` to the socket address used as a peer identity.
pub fn resolve_addr(addr: &str) -> Result<SocketAddr, UdpTransportError> {
    if let Ok(parsed) = addr.parse::<SocketAddr>() {
        return Ok(parsed);
    }
    addr.to_socket_addrs()
        .map_err(|err| UdpTransportError::InvalidAddress(format!("{addr}: {err}")))?
        .next()
        .ok_or_else(|| UdpTransportError::InvalidAddress(addr.to_string()))
}

#[derive(Debug)]
enum Outbound {
    Remote { bytes: Vec<u8>, dest: SocketAddr },
    Local { bytes: Vec<u8> },
}

#[derive(Debug, Default)]
struct UdpTransportMetricsInner {
    remote_send_ok: AtomicU64,
    remote_send_err: AtomicU64,
    remote_received: AtomicU64,
    local_received: AtomicU64,
    local_send_ok: AtomicU64,
    inbound_dropped: AtomicU64,
}

pub struct UdpTransport {
    identity: String,
    remote_addr: SocketAddr,
    local_addr: SocketAddr,
    max_datagram: usize,
    shutdown_poll: Duration,
    stash_capacity: usize,
    outbound_tx: tokio_mpsc::Sender<Outbound>,
    inbound_rx: mpsc::Receiver<Inbound>,
    stashed: VecDeque<Inbound>,
    resolved: HashMap<String, SocketAddr>,
    stop: Arc<AtomicBool>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    worker: Option<JoinHandle<()>>,
    metrics: Arc<UdpTransportMetricsInner>,
}

impl UdpTransport {
    /// Binds both sockets and starts the worker thread.
    pub fn bind(config: UdpTransportConfig) -> Result<Self, UdpTransportError> {
        let remote = bind_std(&config.remote_bind)?;
        let local = bind_std(&config.local_bind)?;
        let remote_addr = local_addr_of(&remote, &config.remote_bind)?;
        let local_addr = local_addr_of(&local, &config.local_bind)?;

        let (outbound_tx, outbound_rx) =
            tokio_mpsc::channel::<Outbound>(config.outbound_queue_capacity);
        let (inbound_tx, inbound_rx) = mpsc::sync_channel::<Inbound>(config.inbound_queue_capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let metrics = Arc::new(UdpTransportMetricsInner::default());

        let worker_metrics = Arc::clone(&metrics);
        let max_datagram = config.max_datagram;
        let worker = thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(err) => {
                    warn!(error = %err, "failed to start udp worker runtime");
                    return;
                }
            };
            runtime.block_on(async move {
                let sockets = UdpSocket::from_std(remote)
                    .and_then(|remote| UdpSocket::from_std(local).map(|local| (remote, local)));
                match sockets {
                    Ok((remote, local)) => {
                        run_udp_worker(
                            UdpSockets { remote, local },
                            max_datagram,
                            worker_metrics,
                            outbound_rx,
                            inbound_tx,
                            shutdown_rx,
                        )
                        .await
                    }
                    Err(err) => warn!(error = %err, "failed to register udp sockets"),
                }
            });
        });

        Ok(Self {
            identity: remote_addr.to_string(),
            remote_addr,
            local_addr,
            max_datagram,
            shutdown_poll: config.shutdown_poll,
            stash_capacity: config.inbound_queue_capacity,
            outbound_tx,
            inbound_rx,
            stashed: VecDeque::new(),
            resolved: HashMap::new(),
            stop: Arc::new(AtomicBool::new(false)),
            shutdown_tx: Some(shutdown_tx),
            worker: Some(worker),
            metrics,
        })
    }

    /// Identity stamped as `origin` on outbound remote messages.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Bound address of the remote-facing socket.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Bound address the local producer sends to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Flag that makes a blocked `receive_local` report a closed producer.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    fn resolve(&mut self, destination: &str) -> Result<SocketAddr, UdpTransportError> {
        if let Some(addr) = self.resolved.get(destination) {
            return Ok(*addr);
        }
        let addr = resolve_addr(destination)?;
        self.resolved.insert(destination.to_string(), addr);
        Ok(addr)
    }

    fn enqueue(&self, outbound: Outbound) -> Result<(), UdpTransportError> {
        self.outbound_tx
            .try_send(outbound)
            .map_err(|err| match err {
                tokio_mpsc::error::TrySendError::Full(_) => UdpTransportError::QueueFull,
                tokio_mpsc::error::TrySendError::Closed(_) => UdpTransportError::Closed,
            })
    }

    fn encode(&self, message: &Message) -> Result<Vec<u8>, UdpTransportError> {
        let bytes = encode_message_cbor(message)?;
        if bytes.len() > self.max_datagram {
            return Err(UdpTransportError::PayloadTooLarge {
                len: bytes.len(),
                max: self.max_datagram,
            });
        }
        Ok(bytes)
    }

    fn stash(&mut self, event: Inbound) {
        if self.stashed.len() >= self.stash_capacity {
            self.stashed.pop_front();
            self.metrics.inbound_dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.stashed.push_back(event);
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl RelayTransport for UdpTransport {
    type Error = UdpTransportError;

    fn send(&mut self, message: &Message, destination: &str) -> Result<(), Self::Error> {
        let dest = self.resolve(destination)?;
        let bytes = self.encode(&message.with_origin(self.identity.clone()))?;
        self.enqueue(Outbound::Remote { bytes, dest })
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<Inbound>, Self::Error> {
        if let Some(event) = self.stashed.pop_front() {
            return Ok(Some(event));
        }
        match self.inbound_rx.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(UdpTransportError::Closed),
        }
    }

    fn receive_local(&mut self) -> Result<Option<Message>, Self::Error> {
        loop {
            if self.stop.load(Ordering::Relaxed) {
                return Ok(None);
            }
            match self.inbound_rx.recv_timeout(self.shutdown_poll) {
                Ok(Inbound::Local(message)) => return Ok(Some(message)),
                Ok(remote) => self.stash(remote),
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => return Err(UdpTransportError::Closed),
            }
        }
    }

    fn send_local(&mut self, message: &Message) -> Result<(), Self::Error> {
        let bytes = self.encode(message)?;
        self.enqueue(Outbound::Local { bytes })
    }

    fn health_snapshot(&self) -> TransportHealthSnapshot {
        TransportHealthSnapshot {
            remote_send_ok: self.metrics.remote_send_ok.load(Ordering::Relaxed),
            remote_send_err: self.metrics.remote_send_err.load(Ordering::Relaxed),
            remote_received: self.metrics.remote_received.load(Ordering::Relaxed),
            local_received: self.metrics.local_received.load(Ordering::Relaxed),
            local_send_ok: self.metrics.local_send_ok.load(Ordering::Relaxed),
            inbound_dropped: self.metrics.inbound_dropped.load(Ordering::Relaxed),
            last_error: None,
        }
    }
}

fn bind_std(addr: &str) -> Result<std::net::UdpSocket, UdpTransportError> {
    let bind_err = |err: std::io::Error| UdpTransportError::Bind {
        addr: addr.to_string(),
        reason: err.to_string(),
    };
    let socket = std::net::UdpSocket::bind(addr).map_err(bind_err)?;
    socket.set_nonblocking(true).map_err(bind_err)?;
    Ok(socket)
}

fn local_addr_of(
    socket: &std::net::UdpSocket,
    addr: &str,
) -> Result<SocketAddr, UdpTransportError> {
    socket.local_addr().map_err(|err| UdpTransportError::Bind {
        addr: addr.to_string(),
        reason: err.to_string(),
    })
}

struct UdpSockets {
    remote: UdpSocket,
    local: UdpSocket,
}

async fn run_udp_worker(
    sockets: UdpSockets,
    max_datagram: usize,
    metrics: Arc<UdpTransportMetricsInner>,
    mut outbound_rx: tokio_mpsc::Receiver<Outbound>,
    inbound_tx: mpsc::SyncSender<Inbound>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let UdpSockets { remote, local } = sockets;
    let mut remote_buf = vec![0_u8; max_datagram];
    let mut local_buf = vec![0_u8; max_datagram];
    let mut local_peer: Option<SocketAddr> = None;

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => break,
            outbound = outbound_rx.recv() => {
                let Some(outbound) = outbound else {
                    break;
                };
                match outbound {
                    Outbound::Remote { bytes, dest } => match remote.send_to(&bytes, dest).await {
                        Ok(_) => {
                            metrics.remote_send_ok.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(err) => {
                            metrics.remote_send_err.fetch_add(1, Ordering::Relaxed);
                            debug!(%dest, error = %err, "remote send failed");
                        }
                    },
                    Outbound::Local { bytes } => {
                        let Some(peer) = local_peer else {
                            warn!("no local producer has connected; dropping notification");
                            continue;
                        };
                        match local.send_to(&bytes, peer).await {
                            Ok(_) => {
                                metrics.local_send_ok.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(err) => warn!(%peer, error = %err, "local send failed"),
                        }
                    }
                }
            }
            received = remote.recv_from(&mut remote_buf) => match received {
                Ok((len, src)) => match decode_message_cbor(&remote_buf[..len]) {
                    Ok(message) => {
                        metrics.remote_received.fetch_add(1, Ordering::Relaxed);
                        let event = Inbound::Remote(message.with_origin(src.to_string()));
                        if !forward(&inbound_tx, event, &metrics) {
                            break;
                        }
                    }
                    Err(err) => {
                        metrics.inbound_dropped.fetch_add(1, Ordering::Relaxed);
                        warn!(%src, error = %err, "dropping undecodable remote datagram");
                    }
                },
                Err(err) => debug!(error = %err, "remote receive failed"),
            },
            received = local.recv_from(&mut local_buf) => match received {
                Ok((len, src)) => match decode_message_cbor(&local_buf[..len]) {
                    Ok(message) => {
                        local_peer = Some(src);
                        metrics.local_received.fetch_add(1, Ordering::Relaxed);
                        let event = Inbound::Local(message.with_origin(src.to_string()));
                        if !forward(&inbound_tx, event, &metrics) {
                            break;
                        }
                    }
                    Err(err) => {
                        metrics.inbound_dropped.fetch_add(1, Ordering::Relaxed);
                        warn!(%src, error = %err, "dropping undecodable local datagram");
                    }
                },
                Err(err) => debug!(error = %err, "local receive failed"),
            },
        }
    }
}

/// Hands one event to the engine thread. Returns `false` once it is gone.
///
/// Producer messages wait for room in the queue; only remote traffic is
/// dropped when the engine falls behind. Blocking here stalls just the
/// worker thread, which owns its own runtime.
fn forward(
    inbound_tx: &mpsc::SyncSender<Inbound>,
    event: Inbound,
    metrics: &UdpTransportMetricsInner,
) -> bool {
    if event.is_local() {
        return inbound_tx.send(event).is_ok();
    }
    match inbound_tx.try_send(event) {
        Ok(()) => true,
        Err(mpsc::TrySendError::Full(dropped)) => {
            metrics.inbound_dropped.fetch_add(1, Ordering::Relaxed);
            warn!(
                kind = %dropped.message().kind,
                "inbound queue full; dropping remote datagram"
            );
            true
        }
        Err(mpsc::TrySendError::Disconnected(_)) => false,
    }
}
