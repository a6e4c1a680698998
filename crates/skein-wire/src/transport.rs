// Copyright 2025 The Skein Authors
// SPDX-License-Identifier: AGPL-3.0-only

//! Moving encoded frames over byte streams.
//!
//! The wire layer never retries: a failing sink surfaces
//! [`WireError::Transport`] to the caller, which decides what to do with the
//! request.

use std::io::{self, Write};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use metrics::counter;
use skein_core::WireConfig;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::envelope::Envelope;
use crate::error::{Result, WireError};
use crate::frame::Frame;
use crate::header::FIXED_HEADER_LEN;
use crate::payload::Payload;

/// One encoded message being written, possibly over several partial writes.
#[derive(Debug, Clone)]
pub struct Transmission {
    bytes: Bytes,
    written: usize,
}

impl Transmission {
    /// Starts transmitting already encoded bytes.
    #[must_use]
    pub fn new(bytes: Bytes) -> Self {
        Self { bytes, written: 0 }
    }

    /// Encodes `envelope` and starts transmitting it.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Envelope::encode`].
    pub fn from_envelope<P: Payload>(envelope: &Envelope<P>) -> Result<Self> {
        Ok(Self::new(envelope.encode()?))
    }

    /// Performs one write of the unsent bytes and returns how many were taken.
    ///
    /// Returns `Ok(0)` once the transmission is complete.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Transport`] if the writer fails, accepts no
    /// bytes while some remain, or claims more bytes than it was given.
    /// Interrupted writes are retried.
    pub fn write_to<W: Write + ?Sized>(&mut self, writer: &mut W) -> Result<usize> {
        if self.is_complete() {
            return Ok(0);
        }
        let unsent = &self.bytes[self.written..];
        let n = loop {
            match writer.write(unsent) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };
        if n == 0 {
            return Err(WireError::Transport(io::Error::new(
                io::ErrorKind::WriteZero,
                "sink accepted no bytes",
            )));
        }
        if n > unsent.len() {
            return Err(WireError::Transport(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("sink reported {n} bytes written of {}", unsent.len()),
            )));
        }
        self.written += n;
        Ok(n)
    }

    /// Returns true once every byte has been written.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.written == self.bytes.len()
    }

    /// Bytes still to be written.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.written
    }

    /// Total size of the message.
    #[must_use]
    pub fn size_in_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Destination for encoded frames.
#[async_trait]
pub trait ByteSink: Send + Sync {
    /// Delivers one complete frame.
    async fn send(&self, bytes: Bytes) -> Result<()>;
}

/// A [`ByteSink`] over any tokio writer. Frames are written whole and in
/// order; concurrent senders queue on an internal lock.
#[derive(Debug)]
pub struct StreamSink<W> {
    writer: Mutex<W>,
}

impl<W> StreamSink<W> {
    /// Wraps a writer.
    pub fn new(writer: W) -> Self {
        Self { writer: Mutex::new(writer) }
    }

    /// Unwraps the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> ByteSink for StreamSink<W> {
    async fn send(&self, bytes: Bytes) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(&bytes).await?;
        writer.flush().await?;
        Ok(())
    }
}

/// Encodes `envelope` and hands it to `sink`.
///
/// # Errors
///
/// Returns an encoding error before anything is sent, or the sink's
/// [`WireError::Transport`] error.
pub async fn send_envelope<P: Payload>(sink: &dyn ByteSink, envelope: &Envelope<P>) -> Result<()> {
    let bytes = envelope.encode()?;
    let message_type = envelope.payload().message_type();
    let size = bytes.len();

    if let Err(e) = sink.send(bytes).await {
        warn!(
            message_type = %message_type,
            correlation_id = envelope.correlation_id(),
            error = %e,
            "Failed to send envelope"
        );
        return Err(e);
    }

    counter!("skein_wire_frames_sent_total", "type" => message_type.as_str()).increment(1);
    counter!("skein_wire_bytes_sent_total").increment(size as u64);
    debug!(
        message_type = %message_type,
        correlation_id = envelope.correlation_id(),
        size,
        "Sent envelope"
    );
    Ok(())
}

/// Reads and decodes one frame from `reader`.
///
/// # Errors
///
/// Returns [`WireError::FrameTooLarge`] if the declared size exceeds
/// `config.max_frame_bytes`, [`WireError::Truncated`] if it is smaller than the fixed
/// header, [`WireError::Transport`] if the stream fails or ends early, and any
/// [`Frame::decode`] error.
pub async fn read_frame<R: AsyncRead + Unpin + ?Sized>(
    reader: &mut R,
    config: &WireConfig,
) -> Result<Frame> {
    let max_frame_bytes = config.max_frame_bytes;
    let mut size_bytes = [0u8; 8];
    reader.read_exact(&mut size_bytes).await?;
    let size = u64::from_be_bytes(size_bytes);

    if size < FIXED_HEADER_LEN as u64 {
        return Err(WireError::Truncated { needed: FIXED_HEADER_LEN, available: size as usize });
    }
    if size > max_frame_bytes {
        return Err(WireError::FrameTooLarge { size, limit: max_frame_bytes });
    }
    let len = usize::try_from(size).map_err(|_| WireError::FrameTooLarge { size, limit: max_frame_bytes })?;

    let mut buf = BytesMut::with_capacity(len);
    buf.extend_from_slice(&size_bytes);
    buf.resize(len, 0);
    reader.read_exact(&mut buf[size_bytes.len()..]).await?;

    let frame = Frame::decode(buf.freeze())?;
    counter!("skein_wire_frames_received_total", "type" => frame.message_type().as_str())
        .increment(1);
    Ok(frame)
}
