//! Raw data connection reader
//!
//! Pulls bytes off the data connection, accumulates them in a pending
//! buffer and cuts complete frames out with [`FrameDecoder`]. Receives may
//! return any number of bytes; frame boundaries are recovered from the
//! fixed geometry alone.

use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace};

use crate::config::MAX_RECEIVE_FRAMES;
use crate::types::{FrameGeometry, TraceBatch};
use crate::wire::FrameDecoder;
use crate::{AcquisitionError, Result};

/// Owns the data connection and the bytes not yet assembled into a frame.
#[derive(Debug)]
pub struct StreamReader<R> {
    stream: R,
    decoder: FrameDecoder,
    /// Received but unassembled bytes; shorter than one frame between cycles
    pending: Vec<u8>,
    scratch: Vec<u8>,
    frames_decoded: u64,
    closed: bool,
}

impl<R> StreamReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(stream: R, geometry: FrameGeometry) -> Self {
        let frame_size = geometry.frame_size_bytes();
        Self {
            stream,
            decoder: FrameDecoder::new(geometry),
            pending: Vec::with_capacity(frame_size * 2),
            scratch: vec![0u8; frame_size],
            frames_decoded: 0,
            closed: false,
        }
    }

    /// Allow a single receive to cover up to `frames` frames.
    ///
    /// With the default of one frame a cycle completes at most one frame;
    /// larger receives let frames that arrived together share one batch.
    /// `frames` is clamped to `1..=MAX_RECEIVE_FRAMES`.
    pub fn with_receive_frames(mut self, frames: usize) -> Self {
        let frames = frames.clamp(1, MAX_RECEIVE_FRAMES);
        let frame_size = self.decoder.geometry().frame_size_bytes();
        self.scratch = vec![0u8; frame_size.saturating_mul(frames)];
        self
    }

    /// Upper bound of a single receive, in bytes.
    pub fn receive_size(&self) -> usize {
        self.scratch.len()
    }

    /// Run one receive/decode cycle.
    ///
    /// Performs a single receive of up to the receive size (one frame unless
    /// raised with [`with_receive_frames`](Self::with_receive_frames)). Returns
    /// `Ok(Some(batch))` when the cycle completed at least one frame and
    /// `Ok(None)` when more bytes are needed. A zero-byte receive or a reset
    /// connection ends the reader for good with
    /// [`ConnectionClosed`](AcquisitionError::ConnectionClosed).
    ///
    /// Cancel-safe: the receive is the only suspension point and no bytes are
    /// consumed unless it completes.
    pub async fn read_cycle(&mut self) -> Result<Option<TraceBatch>> {
        if self.closed {
            return Err(self.connection_closed());
        }

        let received = match self.stream.read(&mut self.scratch).await {
            Ok(0) => {
                self.closed = true;
                debug!(pending = self.pending.len(), "Data connection reached end of stream");
                return Err(self.connection_closed());
            }
            Ok(received) => received,
            Err(e) if is_disconnect(e.kind()) => {
                self.closed = true;
                debug!("Data connection dropped: {}", e);
                return Err(self.connection_closed());
            }
            Err(e) => return Err(AcquisitionError::network_with_source("data channel receive", e)),
        };

        self.pending.extend_from_slice(&self.scratch[..received]);

        let (frames, remainder) = self.decoder.extract(&self.pending)?;
        let consumed = self.pending.len() - remainder.len();
        self.pending.drain(..consumed);

        trace!(received, frames = frames.len(), pending = self.pending.len(), "Read cycle");

        if frames.is_empty() {
            return Ok(None);
        }

        self.frames_decoded += frames.len() as u64;
        Ok(Some(TraceBatch::new(frames)))
    }

    pub fn geometry(&self) -> &FrameGeometry {
        self.decoder.geometry()
    }

    /// Number of received bytes waiting for the rest of their frame.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.stream
    }

    pub fn into_inner(self) -> R {
        self.stream
    }

    fn connection_closed(&self) -> AcquisitionError {
        AcquisitionError::ConnectionClosed { pending_bytes: self.pending.len() }
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::NotConnected
    )
}
