// Copyright 2025 The Skein Authors
// SPDX-License-Identifier: AGPL-3.0-only

//! Request and response envelopes.

use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::error::{Result, WireError};
use crate::header::Header;
use crate::payload::Payload;

/// A payload wrapped with the header fields every message shares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope<P> {
    correlation_id: u32,
    client_id: String,
    payload: P,
}

impl<P: Payload> Envelope<P> {
    /// Wraps `payload`.
    pub fn new(correlation_id: u32, client_id: impl Into<String>, payload: P) -> Self {
        Self { correlation_id, client_id: client_id.into(), payload }
    }

    /// Correlation id.
    #[must_use]
    pub fn correlation_id(&self) -> u32 {
        self.correlation_id
    }

    /// Client id.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The wrapped payload.
    #[must_use]
    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Unwraps the payload.
    pub fn into_payload(self) -> P {
        self.payload
    }

    /// Header this envelope writes.
    #[must_use]
    pub fn header(&self) -> Header {
        Header {
            message_type: self.payload.message_type(),
            version: self.payload.version(),
            correlation_id: self.correlation_id,
            client_id: self.client_id.clone(),
        }
    }

    /// Size of the encoded frame, known before anything is allocated.
    #[must_use]
    pub fn size_in_bytes(&self) -> u64 {
        self.encoded_len() as u64
    }

    fn encoded_len(&self) -> usize {
        crate::header::FIXED_HEADER_LEN + self.client_id.len() + self.payload.encoded_len()
    }

    /// Encodes the envelope into an immutable buffer.
    ///
    /// Exactly [`Self::size_in_bytes`] bytes are allocated up front.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::SizeMismatch`] if the payload wrote a different
    /// number of bytes than it declared, and [`WireError::InvalidClientId`] if
    /// the client id does not fit the length field.
    pub fn encode(&self) -> Result<Bytes> {
        let len = self.encoded_len();
        let size = self.size_in_bytes();
        let mut buf = BytesMut::with_capacity(len);

        let header = self.header();
        header.write(size, &mut buf)?;
        self.payload.encode(&mut buf);

        if buf.len() != len {
            return Err(WireError::SizeMismatch { declared: size, actual: buf.len() as u64 });
        }

        trace!(
            message_type = %header.message_type,
            version = header.version,
            correlation_id = self.correlation_id,
            size,
            "Encoded envelope"
        );
        Ok(buf.freeze())
    }
}

#[cfg(test)]
mod tests {
    use bytes::BufMut;

    use super::*;
    use crate::header::{MessageType, FIXED_HEADER_LEN};
    use crate::payload::RawPayload;

    /// A payload that writes one byte more than it declares.
    struct Overlong;

    impl Payload for Overlong {
        fn message_type(&self) -> MessageType {
            MessageType::PutRequest
        }

        fn encoded_len(&self) -> usize {
            2
        }

        fn encode(&self, buf: &mut BytesMut) {
            buf.put_slice(&[1, 2, 3]);
        }
    }

    /// A payload that writes fewer bytes than it declares.
    struct Short;

    impl Payload for Short {
        fn message_type(&self) -> MessageType {
            MessageType::GetResponse
        }

        fn encoded_len(&self) -> usize {
            4
        }

        fn encode(&self, buf: &mut BytesMut) {
            buf.put_u8(9);
        }
    }

    #[test]
    fn test_size_in_bytes() {
        let empty = Envelope::new(1, "", RawPayload::new(MessageType::GetRequest, 1, Bytes::new()));
        assert_eq!(empty.size_in_bytes(), FIXED_HEADER_LEN as u64);

        let envelope =
            Envelope::new(1, "client", RawPayload::new(MessageType::GetRequest, 1, vec![0u8; 10]));
        assert_eq!(envelope.size_in_bytes(), 20 + 6 + 10);
        assert_eq!(envelope.encode().unwrap().len(), 36);
    }

    #[test]
    fn test_encode_writes_header_then_payload() {
        let envelope = Envelope::new(
            42,
            "c1",
            RawPayload::new(MessageType::DeleteResponse, 3, Bytes::from_static(b"xyz")),
        );
        let bytes = envelope.encode().unwrap();

        assert_eq!(&bytes[0..8], &25u64.to_be_bytes());
        assert_eq!(&bytes[8..10], &5u16.to_be_bytes());
        assert_eq!(&bytes[10..12], &3u16.to_be_bytes());
        assert_eq!(&bytes[12..16], &42u32.to_be_bytes());
        assert_eq!(&bytes[16..20], &2u32.to_be_bytes());
        assert_eq!(&bytes[20..22], b"c1");
        assert_eq!(&bytes[22..], b"xyz");
    }

    #[test]
    fn test_payload_overrun_is_rejected() {
        let envelope = Envelope::new(1, "c", Overlong);
        let err = envelope.encode().unwrap_err();
        assert!(matches!(err, WireError::SizeMismatch { declared: 23, actual: 24 }));
    }

    #[test]
    fn test_payload_underrun_is_rejected() {
        let envelope = Envelope::new(1, "c", Short);
        assert_eq!(envelope.size_in_bytes(), 25);
        let err = envelope.encode().unwrap_err();
        assert!(matches!(err, WireError::SizeMismatch { declared: 25, actual: 22 }));
        assert!(err.to_string().contains("declared 25 bytes, found 22"));
    }

    #[test]
    fn test_header_uses_payload_version() {
        let envelope =
            Envelope::new(9, "c", RawPayload::new(MessageType::TtlRequest, 4, Bytes::new()));
        let header = envelope.header();
        assert_eq!(header.version, 4);
        assert_eq!(header.message_type, MessageType::TtlRequest);
        assert_eq!(header.correlation_id, 9);
    }
}
