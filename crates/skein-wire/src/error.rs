//! Error types for the wire layer.

use thiserror::Error;

use crate::header::MessageType;

/// A specialized `Result` type for wire operations.
pub type Result<T> = std::result::Result<T, WireError>;

/// Errors raised while encoding, decoding or transmitting frames.
#[derive(Debug, Error)]
pub enum WireError {
    /// The buffer ends before a field it must contain.
    #[error("frame truncated: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required to read the field.
        needed: usize,
        /// Bytes available.
        available: usize,
    },

    /// The declared total size disagrees with the bytes actually present.
    #[error("frame size mismatch: declared {declared} bytes, found {actual}")]
    SizeMismatch {
        /// Size written in (or computed for) the header.
        declared: u64,
        /// Size of the buffer.
        actual: u64,
    },

    /// The type code does not name a known message type.
    #[error("unknown message type code {0}")]
    UnknownMessageType(u16),

    /// No decoder is registered for this type and version.
    #[error("unsupported version {version} of {message_type}")]
    UnsupportedVersion {
        /// Message type of the frame.
        message_type: MessageType,
        /// Version of the frame.
        version: u16,
    },

    /// The client id is not valid UTF-8 or does not fit the length field.
    #[error("invalid client id: {0}")]
    InvalidClientId(String),

    /// The frame exceeds the configured maximum.
    #[error("frame of {size} bytes exceeds limit of {limit} bytes")]
    FrameTooLarge {
        /// Declared frame size.
        size: u64,
        /// Configured limit.
        limit: u64,
    },

    /// The underlying byte stream failed.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}

impl WireError {
    /// Returns true if the error describes malformed bytes rather than a
    /// failing transport.
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        !matches!(self, Self::Transport(_) | Self::UnsupportedVersion { .. })
    }
}
