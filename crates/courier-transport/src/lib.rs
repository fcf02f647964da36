//! Transport abstractions for COURIER.
//!
//! The delivery engine only depends on the relay transport trait defined in
//! this crate.

pub mod adapter;
pub mod scripted;

pub use adapter::{Inbound, RelayTransport, TransportHealthSnapshot};
pub use scripted::{ScriptStep, ScriptedTransport, ScriptedTransportError};
