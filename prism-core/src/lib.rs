//! # prism-core
//!
//! Screen-to-wire streaming pipeline: capture full-screen BGRA frames,
//! convert them to planar I420+alpha, push them through an external
//! H.264 encoder, repair the elementary bitstream so every key frame
//! is self-decodable, and ship the result over a length-framed TCP
//! connection at a target frame rate.
//!
//! This crate contains:
//! - **Types**: `CapturedFrame`, `PlanarFrame`, `PixelFormat`
//! - **Capture**: `FrameSource` seam and the DXGI desktop-duplication capturer
//! - **Convert**: `ColorConverter` — BGRA → I420A with stride-preserving planes
//! - **NAL handling**: `NalUnit`, `AnnexBSplitter`, `BitstreamRepairer`
//! - **Encoder**: `VideoEncoder` seam and the piped-ffmpeg implementation
//! - **Wire**: `WireCodec` framing and the `FrameSink` sender
//! - **Service**: `ScreenStreamer` — the paced orchestrator
//! - **Error**: `StreamError` — typed, `thiserror`-based error hierarchy

pub mod capture;
pub mod codec;
pub mod convert;
pub mod encoder;
pub mod error;
pub mod nal;
pub mod repair;
pub mod service;
pub mod transport;
pub mod types;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use capture::{DxgiCapturer, FrameSource};
pub use codec::{LENGTH_PREFIX_SIZE, MAX_WIRE_FRAME_SIZE, WireCodec};
pub use convert::ColorConverter;
pub use encoder::{FfmpegEncoder, VideoEncoder};
pub use error::StreamError;
pub use nal::{AnnexBSplitter, NAL_TYPE_IDR, NAL_TYPE_PPS, NAL_TYPE_SPS, NalUnit, START_CODE};
pub use repair::BitstreamRepairer;
pub use service::{FrameObserver, ScreenStreamer, StreamConfig};
pub use transport::FrameSink;
pub use types::{CapturedFrame, PixelFormat, PlanarFrame};
