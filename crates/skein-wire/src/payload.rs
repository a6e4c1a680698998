//! The contract message bodies implement.

use bytes::{BufMut, Bytes, BytesMut};

use crate::header::{MessageType, CURRENT_VERSION};

/// A message body that can be carried in an [`crate::Envelope`].
///
/// `encode` must append exactly `encoded_len` bytes; the envelope checks this
/// and fails with [`crate::WireError::SizeMismatch`] otherwise.
pub trait Payload {
    /// Type written into the header.
    fn message_type(&self) -> MessageType;

    /// Payload layout version written into the header.
    fn version(&self) -> u16 {
        CURRENT_VERSION
    }

    /// Number of bytes `encode` appends.
    fn encoded_len(&self) -> usize;

    /// Appends the body to `buf`.
    fn encode(&self, buf: &mut BytesMut);
}

/// An opaque body with an explicit type and version.
///
/// Used to relay frames without understanding them and by tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPayload {
    message_type: MessageType,
    version: u16,
    body: Bytes,
}

impl RawPayload {
    /// Creates a raw payload.
    pub fn new(message_type: MessageType, version: u16, body: impl Into<Bytes>) -> Self {
        Self { message_type, version, body: body.into() }
    }

    /// The body bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

impl Payload for RawPayload {
    fn message_type(&self) -> MessageType {
        self.message_type
    }

    fn version(&self) -> u16 {
        self.version
    }

    fn encoded_len(&self) -> usize {
        self.body.len()
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.body);
    }
}
