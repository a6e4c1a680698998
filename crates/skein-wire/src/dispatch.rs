//! Routing decoded frames to typed decoders by message type and version.

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use tracing::debug;

use crate::error::{Result, WireError};
use crate::frame::Frame;
use crate::header::MessageType;

/// Turns a frame into a typed message.
pub type DecodeFn<T> = fn(&Frame) -> Result<T>;

/// Registry of decoders keyed by `(message type, version)`.
///
/// `T` is usually an enum with one variant per supported message, chosen by
/// the caller:
///
/// ```
/// use skein_wire::{Dispatcher, Envelope, Frame, MessageType, RawPayload, WireError};
///
/// enum Message {
///     Ping(u32),
/// }
///
/// fn decode_ping(frame: &Frame) -> Result<Message, WireError> {
///     Ok(Message::Ping(frame.correlation_id()))
/// }
///
/// let mut dispatcher = Dispatcher::new();
/// dispatcher.register(MessageType::GetRequest, 1, decode_ping);
///
/// let bytes = Envelope::new(5, "c", RawPayload::new(MessageType::GetRequest, 1, &b""[..]))
///     .encode()
///     .unwrap();
/// assert!(matches!(dispatcher.decode(bytes), Ok(Message::Ping(5))));
/// ```
pub struct Dispatcher<T> {
    decoders: HashMap<(MessageType, u16), DecodeFn<T>>,
}

impl<T> Dispatcher<T> {
    /// An empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self { decoders: HashMap::new() }
    }

    /// Registers `decoder` for one type and version, replacing any previous one.
    pub fn register(&mut self, message_type: MessageType, version: u16, decoder: DecodeFn<T>) -> &mut Self {
        self.decoders.insert((message_type, version), decoder);
        self
    }

    /// Returns true if a decoder is registered for the pair.
    #[must_use]
    pub fn supports(&self, message_type: MessageType, version: u16) -> bool {
        self.decoders.contains_key(&(message_type, version))
    }

    /// Decodes an already parsed frame.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnsupportedVersion`] if nothing is registered for
    /// the frame's type and version, or whatever the decoder returns.
    pub fn decode_frame(&self, frame: &Frame) -> Result<T> {
        let key = (frame.message_type(), frame.version());
        let Some(decoder) = self.decoders.get(&key) else {
            debug!(
                message_type = %frame.message_type(),
                version = frame.version(),
                correlation_id = frame.correlation_id(),
                "No decoder registered"
            );
            return Err(WireError::UnsupportedVersion {
                message_type: frame.message_type(),
                version: frame.version(),
            });
        };
        decoder(frame)
    }

    /// Parses `bytes` as a frame and decodes it.
    ///
    /// # Errors
    ///
    /// Returns any [`Frame::decode`] error, then as [`Self::decode_frame`].
    pub fn decode(&self, bytes: Bytes) -> Result<T> {
        self.decode_frame(&Frame::decode(bytes)?)
    }
}

impl<T> Default for Dispatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Dispatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut registered: Vec<_> = self.decoders.keys().collect();
        registered.sort();
        f.debug_struct("Dispatcher").field("registered", &registered).finish()
    }
}
