//! In-process lossy network for exercising the delivery engine.
//!
//! A seeded link model perturbs traffic in both directions between the relay
//! and an echoing remote.

pub mod link;
pub mod network;
pub mod receiver;

pub use link::LinkProfile;
pub use network::{SimError, SimTransport};
pub use receiver::EchoReceiver;
