//! Read-Drive Loop
//!
//! Couples the accumulation buffer to the frame decoder. The driver knows
//! nothing about the transport: the blocking and async connections both feed
//! it the chunks they read, so ordering and error semantics are identical in
//! either execution mode.
//!
//! ## States
//! ```text
//!              ┌──────── NotEnough ────────┐
//!              ▼                           │
//!        AwaitingData ── chunk ──▶ decode ─┼── Ok ──────▶ FrameComplete
//!                                          └── fatal ───▶ FatalError
//! ```
//!
//! Any fatal outcome discards the whole accumulation buffer: the stream can
//! no longer be trusted to be aligned on a frame boundary.

use bytes::{Buf, BytesMut};

use crate::config::Config;
use crate::error::{Result, SkyError};
use crate::protocol::{Element, ParseError, Parser};

/// Outcome of feeding one chunk to the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriveState {
    /// The frame is incomplete; read more
    AwaitingData,

    /// A whole frame was decoded and its bytes consumed
    FrameComplete(Element),
}

/// Per-connection accumulation buffer plus decode policy
#[derive(Debug)]
pub struct ReadDriver {
    /// Bytes received but not yet consumed by a decoded frame
    buffer: BytesMut,

    /// Nesting ceiling handed to the parser
    max_depth: usize,

    /// Largest incomplete frame tolerated
    max_frame_size: usize,
}

impl ReadDriver {
    pub fn new(config: &Config) -> Self {
        Self {
            buffer: BytesMut::with_capacity(config.buffer_capacity),
            max_depth: config.max_depth,
            max_frame_size: config.max_frame_size,
        }
    }

    /// Feed the bytes of one transport read.
    ///
    /// An empty chunk means the peer closed the connection.
    pub fn advance(&mut self, chunk: &[u8]) -> Result<DriveState> {
        if chunk.is_empty() {
            if !self.buffer.is_empty() {
                tracing::debug!(
                    "Peer closed with {} unconsumed bytes buffered",
                    self.buffer.len()
                );
            }
            self.buffer.clear();
            return Err(SkyError::ConnectionReset);
        }

        self.buffer.extend_from_slice(chunk);
        self.try_decode()
    }

    /// Attempt to decode a frame from what is already buffered
    pub fn try_decode(&mut self) -> Result<DriveState> {
        let parsed = Parser::new(&self.buffer)
            .with_max_depth(self.max_depth)
            .parse();

        match parsed {
            Ok((element, consumed)) => {
                tracing::trace!("Decoded {} from {} bytes", element.type_name(), consumed);
                self.buffer.advance(consumed);
                Ok(DriveState::FrameComplete(element))
            }
            Err(ParseError::NotEnough) if self.buffer.len() > self.max_frame_size => {
                tracing::warn!(
                    "Incomplete frame exceeds {} bytes, discarding buffer",
                    self.max_frame_size
                );
                self.buffer.clear();
                Err(SkyError::Parse(ParseError::BadPacket))
            }
            Err(ParseError::NotEnough) => {
                tracing::trace!("Frame incomplete with {} bytes buffered", self.buffer.len());
                Ok(DriveState::AwaitingData)
            }
            Err(e) => {
                tracing::debug!(
                    "Fatal parse error ({}), discarding {} buffered bytes",
                    e,
                    self.buffer.len()
                );
                self.buffer.clear();
                Err(SkyError::Parse(e))
            }
        }
    }

    /// Number of buffered, unconsumed bytes
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drop everything buffered
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}
