use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use courier_engine::{DeliveryEngine, EngineConfig};
use courier_transport::RelayTransport;
use courier_transport_udp::{resolve_addr, UdpTransport, UdpTransportConfig};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;
use tracing::{error, info, warn};

mod config;

use crate::config::SenderConfig;

/// Relays local producer messages to a remote receiver with per-message
/// delivery guarantees.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (TOML, or .env)
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// Receiver address
    #[arg(short = 'r', value_name = "host:port")]
    recv_addr: Option<String>,
    /// Print debugging info
    #[arg(short = 'd')]
    debug: bool,
}

fn log_filter(debug: bool) -> String {
    std::env::var("COURIER_LOG").unwrap_or_else(|_| {
        if debug {
            "debug".to_string()
        } else {
            "warn".to_string()
        }
    })
}

fn main() {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.debug))
        .init();

    let mut config = match SenderConfig::new(cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to load config: {err}");
            std::process::exit(1);
        }
    };
    if let Some(addr) = cli.recv_addr {
        config.receiver_addr = addr;
    }

    // Acks are matched on the resolved address the datagrams come from.
    let target = match resolve_addr(&config.receiver_addr) {
        Ok(addr) => addr.to_string(),
        Err(err) => {
            error!("invalid receiver address {}: {err}", config.receiver_addr);
            std::process::exit(1);
        }
    };

    let transport = match UdpTransport::bind(UdpTransportConfig {
        remote_bind: config.remote_bind.clone(),
        local_bind: config.local_bind.clone(),
        inbound_queue_capacity: config.inbound_queue_capacity,
        outbound_queue_capacity: config.outbound_queue_capacity,
        shutdown_poll: config.shutdown_poll,
        ..UdpTransportConfig::new(&config.remote_bind, &config.local_bind)
    }) {
        Ok(transport) => transport,
        Err(err) => {
            error!("failed to bind udp transport: {err}");
            std::process::exit(1);
        }
    };

    // First signal stops once idle; a second one exits even mid-retry.
    let shutdown = transport.shutdown_flag();
    for signal in [SIGINT, SIGTERM] {
        if let Err(err) = flag::register_conditional_shutdown(signal, 1, Arc::clone(&shutdown)) {
            warn!("failed to register shutdown handler: {err}");
        }
        if let Err(err) = flag::register(signal, Arc::clone(&shutdown)) {
            warn!("failed to register signal flag: {err}");
        }
    }

    info!(
        "{}: relaying to {target} (local producer on {}, remote socket {})",
        config.name,
        transport.local_addr(),
        transport.remote_addr()
    );

    let mut engine = DeliveryEngine::new(
        transport,
        target,
        EngineConfig::with_ack_timeout(config.ack_timeout),
    );
    match engine.run() {
        Ok(stats) => {
            let health = engine.transport().health_snapshot();
            info!("{} stopped: {stats:?} transport={health:?}", config.name);
        }
        Err(err) => {
            error!("delivery engine stopped: {err}");
            std::process::exit(1);
        }
    }
}
