//! COURIER delivery-guarantee engine.
//!
//! Upgrades a lossy, duplicating transport into per-message delivery
//! guarantees. Acknowledged sends retry on an explicit frame stack until the
//! receiver's echo is observed.

pub mod ack;
pub mod config;
pub mod engine;
pub mod error;
pub mod frame;
pub mod ordering;

pub use config::EngineConfig;
pub use engine::{DeliveryEngine, EngineStats, Outcome, SubmitReport};
pub use error::EngineError;
