//! One-way frame transport over a connected TCP stream.
//!
//! [`FrameSink`] owns the connection for the lifetime of a pipeline
//! run: connect once at start (fatal on failure — there is no pipeline
//! without a sink), then push length-framed payloads one frame at a
//! time. Send failures are reported per frame; whether to abort or
//! skip-and-continue is the orchestrator's policy, not the sink's.

use bytes::Bytes;
use futures::SinkExt;
use tokio::net::TcpStream;
use tokio_util::codec::FramedWrite;
use tracing::debug;

use crate::codec::WireCodec;
use crate::error::StreamError;

// ── FrameSink ────────────────────────────────────────────────────

/// Length-prefixed frame sender over a connected byte stream.
pub struct FrameSink {
    writer: FramedWrite<TcpStream, WireCodec>,
    /// Total payload bytes accepted for sending since connect.
    bytes_sent: u64,
    /// Total frames accepted for sending since connect.
    frames_sent: u64,
}

impl FrameSink {
    /// Connect to `host:port`.
    ///
    /// Failure here is fatal to the pipeline start; it is surfaced as
    /// [`StreamError::Connection`] to the caller of `start` and the
    /// pipeline never enters the running state.
    pub async fn connect(host: &str, port: u16) -> Result<Self, StreamError> {
        let stream = TcpStream::connect((host, port)).await?;
        debug!("connected to {host}:{port}");
        Ok(Self::new(stream))
    }

    /// Wrap an already-connected stream (used by tests).
    pub fn new(stream: TcpStream) -> Self {
        Self {
            writer: FramedWrite::new(stream, WireCodec),
            bytes_sent: 0,
            frames_sent: 0,
        }
    }

    /// Send one payload as a length-prefixed wire frame and flush.
    ///
    /// No acknowledgement is read back; delivery is best-effort on top
    /// of the stream's own reliability. An error affects this frame
    /// only — the connection may or may not still be usable, and the
    /// caller decides whether to keep going.
    pub async fn send(&mut self, payload: Bytes) -> Result<(), StreamError> {
        let len = payload.len() as u64;
        self.writer.send(payload).await?;
        self.bytes_sent += len;
        self.frames_sent += 1;
        Ok(())
    }

    /// Total payload bytes sent since connect.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// Total frames sent since connect.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Release the connection. Buffered data is not guaranteed to be
    /// flushed if the connection already failed.
    pub async fn close(mut self) {
        let _ = self.writer.close().await;
    }
}

// ── Tests ────────────────────────────────────────────────────────
