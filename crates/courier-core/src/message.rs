use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CourierError;
use crate::guarantee::Guarantee;

/// Type tag of local error notifications.
pub const ERROR_KIND: &str = "ERROR";

/// Opaque message content, encoded as a byte string on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Payload(pub Vec<u8>);

impl Payload {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self(text.into_bytes())
    }
}

impl Serialize for Payload {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PayloadVisitor;

        impl<'de> serde::de::Visitor<'de> for PayloadVisitor {
            type Value = Payload;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a byte string")
            }

            fn visit_bytes<E>(self, value: &[u8]) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Payload(value.to_vec()))
            }

            fn visit_byte_buf<E>(self, value: Vec<u8>) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Payload(value))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(byte) = seq.next_element::<u8>()? {
                    bytes.push(byte);
                }
                Ok(Payload(bytes))
            }
        }

        deserializer.deserialize_byte_buf(PayloadVisitor)
    }
}

/// Unit of transfer between producer, relay, and receiver.
///
/// Messages are immutable values compared structurally over all four fields,
/// so a resent copy of a message is equal to the original.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    /// Guarantee-level tag (or `ERROR` for local notifications).
    pub kind: String,
    /// Opaque content.
    pub payload: Payload,
    /// Identity of the last sender, stamped by the transport.
    pub origin: Option<String>,
    /// Identity of the intended receiver.
    pub destination: Option<String>,
}

impl Message {
    pub fn new(kind: impl Into<String>, payload: impl Into<Payload>) -> Self {
        Self {
            kind: kind.into(),
            payload: payload.into(),
            origin: None,
            destination: None,
        }
    }

    /// Builds the local notification reported for an unrecognized type tag.
    pub fn error_notification(err: &CourierError) -> Self {
        Self::new(ERROR_KIND, err.to_string())
    }

    /// Resolves the declared guarantee level from the type tag.
    pub fn guarantee(&self) -> Result<Guarantee, CourierError> {
        self.kind.parse()
    }

    /// Returns a copy with `origin` replaced.
    pub fn with_origin(&self, origin: impl Into<String>) -> Self {
        Self {
            origin: Some(origin.into()),
            ..self.clone()
        }
    }

    /// Returns a copy with `destination` replaced.
    pub fn with_destination(&self, destination: impl Into<String>) -> Self {
        Self {
            destination: Some(destination.into()),
            ..self.clone()
        }
    }

    /// Acknowledgment `responder` returns for this message: the same message
    /// echoed back with `origin` set to the responder.
    pub fn acknowledgment_from(&self, responder: impl Into<String>) -> Self {
        self.with_origin(responder)
    }

    pub fn is_error(&self) -> bool {
        self.kind == ERROR_KIND
    }
}
