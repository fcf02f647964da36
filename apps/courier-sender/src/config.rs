use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct SenderConfig {
    pub name: String,
    pub receiver_addr: String,
    pub remote_bind: String,
    pub local_bind: String,
    #[serde(with = "humantime_serde")]
    pub ack_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub shutdown_poll: Duration,
    pub inbound_queue_capacity: usize,
    pub outbound_queue_capacity: usize,
}

impl SenderConfig {
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("name", "sender")?
            .set_default("receiver_addr", "127.0.0.1:9701")?
            .set_default("remote_bind", "0.0.0.0:0")?
            .set_default("local_bind", "127.0.0.1:9700")?
            .set_default("ack_timeout", "1s")?
            .set_default("shutdown_poll", "200ms")?
            .set_default("inbound_queue_capacity", 4096)?
            .set_default("outbound_queue_capacity", 1024)?;

        if let Some(path) = config_path {
            if path.extension().and_then(|ext| ext.to_str()) == Some("env") {
                // Loaded into the process environment so the COURIER_ source picks it up.
                match dotenvy::from_path(&path) {
                    Ok(_) => tracing::info!("loaded environment from {}", path.display()),
                    Err(err) => {
                        tracing::warn!("failed to load .env from {}: {}", path.display(), err)
                    }
                }
            } else {
                builder = builder.add_source(File::from(path));
            }
        }

        builder = builder.add_source(Environment::with_prefix("COURIER").try_parsing(true));

        builder.build()?.try_deserialize()
    }
}
