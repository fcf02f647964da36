//! COURIER wire codec primitives.
//!
//! Defines the versioned message envelope and its CBOR encode/decode helpers.

pub mod error;
pub mod message;
