//! Core COURIER primitives shared across crates.
//!
//! Includes the relayed message value type, guarantee-level tags, and base errors.

pub mod error;
pub mod guarantee;
pub mod message;

pub use error::CourierError;
pub use guarantee::Guarantee;
pub use message::{Message, Payload, ERROR_KIND};
