//! # prism-streamer — Screen Streaming Service
//!
//! Foreground service that captures the local display via DXGI Desktop
//! Duplication, converts frames to I420+alpha, optionally encodes them
//! to H.264 through a piped ffmpeg process, repairs the bitstream so
//! every key frame is self-decodable, and streams the result to a
//! receiver over length-framed TCP.

pub mod config;
