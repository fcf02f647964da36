use courier_core::Message;
use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Envelope schema version for `WireMessageV1`.
pub const MESSAGE_V1_VERSION: u16 = 1;

/// Versioned on-the-wire envelope around one `Message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessageV1 {
    /// Wire version.
    pub version: u16,
    /// Relayed message.
    pub message: Message,
}

impl WireMessageV1 {
    pub fn new(message: Message) -> Self {
        Self {
            version: MESSAGE_V1_VERSION,
            message,
        }
    }

    /// Validates envelope schema.
    pub fn validate(&self) -> Result<(), CodecError> {
        if self.version != MESSAGE_V1_VERSION {
            return Err(CodecError::InvalidMessage("unsupported message version"));
        }
        if self.message.kind.is_empty() {
            return Err(CodecError::InvalidMessage("message kind must not be empty"));
        }
        Ok(())
    }
}

/// Encodes a message as a CBOR `WireMessageV1` envelope.
pub fn encode_message_cbor(message: &Message) -> Result<Vec<u8>, CodecError> {
    let envelope = WireMessageV1::new(message.clone());
    envelope.validate()?;
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(&envelope, &mut bytes)
        .map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(bytes)
}

/// Decodes and validates a CBOR `WireMessageV1` envelope.
pub fn decode_message_cbor(bytes: &[u8]) -> Result<Message, CodecError> {
    let envelope: WireMessageV1 =
        ciborium::de::from_reader(bytes).map_err(|e| CodecError::Decode(e.to_string()))?;
    envelope.validate()?;
    Ok(envelope.message)
}
