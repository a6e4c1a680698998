// Copyright 2025 The Skein Authors
// SPDX-License-Identifier: AGPL-3.0-only

//! The fixed envelope header.
//!
//! Every frame starts with the same big-endian layout:
//!
//! ```text
//! [total_size:u64][type:u16][version:u16][correlation_id:u32][client_id_len:u32][client_id]
//! ```
//!
//! `total_size` counts the whole frame including itself. `client_id_len` is
//! the UTF-8 byte length of the client id. The meaning of these fields never
//! changes between versions; only payload layouts are versioned.

use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::error::{Result, WireError};

/// Bytes taken by the fixed header fields, excluding the client id.
#[allow(clippy::cast_possible_truncation)]
pub const FIXED_HEADER_LEN: usize = skein_core::FIXED_HEADER_BYTES as usize;

/// Payload version written by this build.
pub const CURRENT_VERSION: u16 = 1;

/// Kind of message carried by a frame.
///
/// The codes are stable on the wire; new kinds are only ever appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageType {
    /// Request to store a blob.
    PutRequest,
    /// Request to fetch a blob.
    GetRequest,
    /// Reply to a put.
    PutResponse,
    /// Reply to a get.
    GetResponse,
    /// Request to delete a blob.
    DeleteRequest,
    /// Reply to a delete.
    DeleteResponse,
    /// Request to change a blob's time to live.
    TtlRequest,
    /// Reply to a TTL change.
    TtlResponse,
}

impl MessageType {
    /// Every message type in code order.
    pub const ALL: [Self; 8] = [
        Self::PutRequest,
        Self::GetRequest,
        Self::PutResponse,
        Self::GetResponse,
        Self::DeleteRequest,
        Self::DeleteResponse,
        Self::TtlRequest,
        Self::TtlResponse,
    ];

    /// Wire code.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::PutRequest => 0,
            Self::GetRequest => 1,
            Self::PutResponse => 2,
            Self::GetResponse => 3,
            Self::DeleteRequest => 4,
            Self::DeleteResponse => 5,
            Self::TtlRequest => 6,
            Self::TtlResponse => 7,
        }
    }

    /// Parses a wire code; `None` for unknown codes.
    #[must_use]
    pub const fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::PutRequest),
            1 => Some(Self::GetRequest),
            2 => Some(Self::PutResponse),
            3 => Some(Self::GetResponse),
            4 => Some(Self::DeleteRequest),
            5 => Some(Self::DeleteResponse),
            6 => Some(Self::TtlRequest),
            7 => Some(Self::TtlResponse),
            _ => None,
        }
    }

    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PutRequest => "put_request",
            Self::GetRequest => "get_request",
            Self::PutResponse => "put_response",
            Self::GetResponse => "get_response",
            Self::DeleteRequest => "delete_request",
            Self::DeleteResponse => "delete_response",
            Self::TtlRequest => "ttl_request",
            Self::TtlResponse => "ttl_response",
        }
    }
}

impl TryFrom<u16> for MessageType {
    type Error = WireError;

    fn try_from(code: u16) -> Result<Self> {
        Self::from_code(code).ok_or(WireError::UnknownMessageType(code))
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header fields of one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Message type.
    pub message_type: MessageType,
    /// Payload version.
    pub version: u16,
    /// Opaque id echoed by the peer to match replies to requests.
    pub correlation_id: u32,
    /// Name of the sending client.
    pub client_id: String,
}

impl Header {
    /// Encoded length of the header, including the client id bytes.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        FIXED_HEADER_LEN + self.client_id.len()
    }

    /// Appends the header to `buf`, declaring a frame of `total_size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::InvalidClientId`] if the client id is longer than
    /// the length field can express.
    pub fn write(&self, total_size: u64, buf: &mut BytesMut) -> Result<()> {
        let client_id_len = u32::try_from(self.client_id.len()).map_err(|_| {
            WireError::InvalidClientId(format!("{} bytes long", self.client_id.len()))
        })?;

        buf.reserve(self.encoded_len());
        buf.put_u64(total_size);
        buf.put_u16(self.message_type.code());
        buf.put_u16(self.version);
        buf.put_u32(self.correlation_id);
        buf.put_u32(client_id_len);
        buf.put_slice(self.client_id.as_bytes());
        Ok(())
    }
}
