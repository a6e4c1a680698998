//! Binary envelope framing for Skein inter-node messages.
//!
//! Every request and response travels as one frame:
//!
//! ```text
//! +------------+--------+---------+----------------+---------------+-----------+---------+
//! | total: u64 | type:  | version | correlation id | client id len | client id | payload |
//! |            | u16    | u16     | u32            | u32           | UTF-8     |         |
//! +------------+--------+---------+----------------+---------------+-----------+---------+
//! ```
//!
//! All integers are big-endian and `total` counts the whole frame.
//!
//! - [`Envelope`] wraps a [`Payload`] and encodes it into an immutable buffer
//! - [`Frame`] decodes received bytes without copying the payload
//! - [`Dispatcher`] routes frames to decoders by message type and version
//! - [`Transmission`], [`ByteSink`] and [`read_frame`] move frames over streams

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod frame;
pub mod header;
pub mod payload;
pub mod transport;

pub use dispatch::{DecodeFn, Dispatcher};
pub use envelope::Envelope;
pub use error::{Result, WireError};
pub use frame::Frame;
pub use header::{Header, MessageType, CURRENT_VERSION, FIXED_HEADER_LEN};
pub use payload::{Payload, RawPayload};
pub use transport::{read_frame, send_envelope, ByteSink, StreamSink, Transmission};
