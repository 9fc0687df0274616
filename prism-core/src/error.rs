//! Domain-specific error types for the streaming pipeline.
//!
//! All fallible operations return `Result<T, StreamError>`.
//! No panics on invalid input — every error is typed and recoverable
//! (or explicitly fatal, in which case it is surfaced to the caller
//! of `start` / construction rather than crashing the worker).

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the streaming pipeline.
#[derive(Debug, Error)]
pub enum StreamError {
    // ── Capture Errors ───────────────────────────────────────────
    /// No new frame was produced within the capture deadline.
    #[error("capture timed out after {0:?}")]
    CaptureTimeout(Duration),

    /// The capture provider failed to deliver a frame.
    #[error("capture failed: {0}")]
    Capture(String),

    // ── Conversion Errors ────────────────────────────────────────
    /// Frame geometry violates the converter's preconditions
    /// (odd dimensions, zero size, or undersized stride).
    #[error("invalid frame geometry: {width}x{height}, stride {stride}")]
    InvalidGeometry { width: u32, height: u32, stride: u32 },

    /// The color conversion routine itself failed.
    #[error("color conversion failed: {0}")]
    ConversionFailed(String),

    // ── Encoder Errors ───────────────────────────────────────────
    /// The encoder process or context could not be started.
    #[error("encoder failed to start: {0}")]
    EncoderInit(String),

    /// The encoder failed after a successful start.
    #[error("encoder error: {0}")]
    Encoder(String),

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    // ── Framing Errors ───────────────────────────────────────────
    /// A wire frame exceeds the codec limit.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for StreamError {
    fn from(s: String) -> Self {
        StreamError::Other(s)
    }
}

impl From<&str> for StreamError {
    fn from(s: &str) -> Self {
        StreamError::Other(s.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for StreamError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        StreamError::ChannelClosed
    }
}
