//! Decoding received frames.

use bytes::{Buf, Bytes};

use crate::error::{Result, WireError};
use crate::header::{Header, MessageType, FIXED_HEADER_LEN};

/// A decoded frame: header fields plus the undecoded payload.
///
/// The payload shares the receive buffer; decoding copies only the client id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    header: Header,
    total_size: u64,
    payload: Bytes,
}

impl Frame {
    /// Decodes one complete frame.
    ///
    /// # Errors
    ///
    /// - [`WireError::Truncated`] if the buffer is shorter than the fixed
    ///   header or the client id runs past the end
    /// - [`WireError::SizeMismatch`] if the declared size is not the buffer
    ///   length
    /// - [`WireError::InvalidClientId`] if the client id is not UTF-8
    /// - [`WireError::UnknownMessageType`] for an unknown type code
    pub fn decode(mut bytes: Bytes) -> Result<Self> {
        let available = bytes.len();
        if available < FIXED_HEADER_LEN {
            return Err(WireError::Truncated { needed: FIXED_HEADER_LEN, available });
        }

        let total_size = bytes.get_u64();
        if total_size != available as u64 {
            return Err(WireError::SizeMismatch { declared: total_size, actual: available as u64 });
        }

        let code = bytes.get_u16();
        let version = bytes.get_u16();
        let correlation_id = bytes.get_u32();
        let client_id_len = bytes.get_u32() as usize;
        if client_id_len > bytes.remaining() {
            return Err(WireError::Truncated {
                needed: FIXED_HEADER_LEN.saturating_add(client_id_len),
                available,
            });
        }

        let client_id = String::from_utf8(bytes.split_to(client_id_len).to_vec())
            .map_err(|e| WireError::InvalidClientId(e.to_string()))?;
        let message_type = MessageType::try_from(code)?;

        Ok(Self {
            header: Header { message_type, version, correlation_id, client_id },
            total_size,
            payload: bytes,
        })
    }

    /// Header fields.
    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Message type.
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        self.header.message_type
    }

    /// Payload version.
    #[must_use]
    pub fn version(&self) -> u16 {
        self.header.version
    }

    /// Correlation id.
    #[must_use]
    pub fn correlation_id(&self) -> u32 {
        self.header.correlation_id
    }

    /// Client id.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.header.client_id
    }

    /// Size declared in the header, equal to the decoded buffer length.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Payload bytes following the header.
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Takes the payload bytes.
    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}
