//! Shared frame types used between pipeline stages.
//!
//! A [`CapturedFrame`] is what the capture provider hands over: one
//! interleaved BGRA bitmap, exclusively owned by the pipeline for the
//! duration of a single iteration. A [`PlanarFrame`] is the converted
//! I420+alpha representation handed to the encoder.

use std::time::Instant;

// ── PixelFormat ──────────────────────────────────────────────────

/// Pixel layout for raw captured frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 4 bytes per pixel: Blue, Green, Red, Alpha (DXGI default).
    Bgra8,
}

impl PixelFormat {
    /// Bytes consumed by a single pixel in this format.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Bgra8 => 4,
        }
    }
}

// ── CapturedFrame ────────────────────────────────────────────────

/// A raw, uncompressed screen capture obtained from the OS.
///
/// The `data` buffer holds `height` rows of `stride` bytes each.
/// `stride` may exceed `width * 4` due to GPU row-alignment
/// requirements (DXGI may pad rows to 256-byte boundaries).
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Row pitch in **bytes** (may exceed `width * 4`).
    pub stride: u32,
    /// Pixel layout.
    pub format: PixelFormat,
    /// Raw pixel data — `stride * height` bytes.
    pub data: Vec<u8>,
    /// Monotonic capture timestamp.
    pub timestamp: Instant,
}

impl CapturedFrame {
    /// Total byte size the raw bitmap occupies.
    pub fn byte_len(&self) -> usize {
        self.stride as usize * self.height as usize
    }

    /// Returns a row slice (including possible padding bytes).
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride as usize;
        &self.data[start..start + self.stride as usize]
    }
}

// ── PlanarFrame ──────────────────────────────────────────────────

/// An I420 frame with a full-resolution alpha plane.
///
/// Plane geometry is fixed by the converter contract:
///
/// - `y` and `a` rows are **`stride`** bytes long (the source capture
///   stride, preserved so downstream code can address pixels by the
///   original geometry); each plane is `stride * height` bytes.
/// - `u` and `v` rows are `width / 2` bytes long; each plane is
///   `(width / 2) * (height / 2)` bytes.
#[derive(Debug, Clone)]
pub struct PlanarFrame {
    /// Frame width in pixels (even).
    pub width: u32,
    /// Frame height in pixels (even).
    pub height: u32,
    /// Row pitch of the `y` and `a` planes, in bytes.
    pub stride: u32,
    /// Luma plane, `stride * height` bytes.
    pub y: Vec<u8>,
    /// Chroma U plane, `(width/2) * (height/2)` bytes.
    pub u: Vec<u8>,
    /// Chroma V plane, `(width/2) * (height/2)` bytes.
    pub v: Vec<u8>,
    /// Alpha plane, `stride * height` bytes, copied verbatim from the
    /// source's alpha channel.
    pub a: Vec<u8>,
    /// Monotonic timestamp carried over from the captured frame.
    pub timestamp: Instant,
}

impl PlanarFrame {
    /// Row pitch of the `u` and `v` planes, in bytes.
    pub fn chroma_stride(&self) -> usize {
        self.width as usize / 2
    }

    /// Alpha byte at pixel `(x, y)`, addressed by the source stride.
    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        self.a[y as usize * self.stride as usize + x as usize]
    }

    /// Serialize the frame as `Y ++ U ++ V ++ A` for the raw deployment
    /// mode (one wire frame per captured frame, no encoder involved).
    pub fn to_packed_bytes(&self) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(self.y.len() + self.u.len() + self.v.len() + self.a.len());
        out.extend_from_slice(&self.y);
        out.extend_from_slice(&self.u);
        out.extend_from_slice(&self.v);
        out.extend_from_slice(&self.a);
        out
    }
}

// ── Tests ────────────────────────────────────────────────────────
