//! BGRA → I420+alpha color conversion.
//!
//! Produces the four planes the encoder consumes: BT.601 luma/chroma
//! with 4:2:0 subsampling plus a verbatim copy of the source alpha
//! channel. The `y` and `a` planes keep the **source stride** as their
//! row pitch so downstream code can keep addressing pixels by the
//! original capture geometry; `u` and `v` are tightly packed at half
//! resolution.

use crate::error::StreamError;
use crate::types::{CapturedFrame, PlanarFrame};

// ── ColorConverter ───────────────────────────────────────────────

/// Stateless BGRA → I420A converter.
///
/// Holds no state between frames; every call returns a freshly
/// allocated [`PlanarFrame`] owned by the caller.
pub struct ColorConverter;

impl ColorConverter {
    pub fn new() -> Self {
        Self
    }

    /// Convert one captured BGRA frame into planar I420+alpha.
    ///
    /// Preconditions, checked before any allocation:
    /// - `width > 0`, `height > 0`, both **even** (4:2:0 requirement);
    /// - `stride >= width * 4`.
    ///
    /// Violations return [`StreamError::InvalidGeometry`]. A pixel
    /// buffer shorter than `stride * height` fails the conversion
    /// itself with [`StreamError::ConversionFailed`]; no partial frame
    /// is ever returned.
    pub fn convert(&self, frame: &CapturedFrame) -> Result<PlanarFrame, StreamError> {
        let (width, height, stride) = (frame.width, frame.height, frame.stride);

        if width == 0
            || height == 0
            || width % 2 != 0
            || height % 2 != 0
            || stride < width * 4
        {
            return Err(StreamError::InvalidGeometry {
                width,
                height,
                stride,
            });
        }

        let w = width as usize;
        let h = height as usize;
        let src_stride = stride as usize;

        if frame.data.len() < src_stride * h {
            return Err(StreamError::ConversionFailed(format!(
                "pixel buffer too small: {} bytes for {}x{} stride {}",
                frame.data.len(),
                width,
                height,
                stride,
            )));
        }

        let luma_size = src_stride * h;
        let chroma_size = (w / 2) * (h / 2);

        let mut y_plane = vec![0u8; luma_size];
        let mut u_plane = vec![0u8; chroma_size];
        let mut v_plane = vec![0u8; chroma_size];
        let mut a_plane = vec![0u8; luma_size];

        // Luma and alpha, full resolution, stride-addressed on both sides.
        for row in 0..h {
            let src_row = &frame.data[row * src_stride..row * src_stride + w * 4];
            let y_row = &mut y_plane[row * src_stride..row * src_stride + w];
            let a_row = &mut a_plane[row * src_stride..row * src_stride + w];
            for x in 0..w {
                let px = &src_row[x * 4..x * 4 + 4];
                let (b, g, r) = (px[0] as i32, px[1] as i32, px[2] as i32);
                y_row[x] = (((66 * r + 129 * g + 25 * b + 128) >> 8) + 16) as u8;
                a_row[x] = px[3];
            }
        }

        // Chroma, one sample per 2x2 block, averaged before the transform.
        let chroma_w = w / 2;
        for cy in 0..h / 2 {
            for cx in 0..chroma_w {
                let (mut b, mut g, mut r) = (0i32, 0i32, 0i32);
                for dy in 0..2 {
                    let row = (cy * 2 + dy) * src_stride;
                    for dx in 0..2 {
                        let px = row + (cx * 2 + dx) * 4;
                        b += frame.data[px] as i32;
                        g += frame.data[px + 1] as i32;
                        r += frame.data[px + 2] as i32;
                    }
                }
                let (b, g, r) = ((b + 2) / 4, (g + 2) / 4, (r + 2) / 4);
                u_plane[cy * chroma_w + cx] =
                    (((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128) as u8;
                v_plane[cy * chroma_w + cx] =
                    (((112 * r - 94 * g - 18 * b + 128) >> 8) + 128) as u8;
            }
        }

        Ok(PlanarFrame {
            width,
            height,
            stride,
            y: y_plane,
            u: u_plane,
            v: v_plane,
            a: a_plane,
            timestamp: frame.timestamp,
        })
    }
}

impl Default for ColorConverter {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PixelFormat;
    use std::time::Instant;

    fn bgra_frame(w: u32, h: u32, stride: u32) -> CapturedFrame {
        CapturedFrame {
            width: w,
            height: h,
            stride,
            format: PixelFormat::Bgra8,
            data: vec![0u8; (stride * h) as usize],
            timestamp: Instant::now(),
        }
    }

    #[test]
    fn plane_sizes_follow_geometry() {
        let conv = ColorConverter::new();
        let frame = bgra_frame(640, 480, 2688); // padded stride
        let planar = conv.convert(&frame).unwrap();

        assert_eq!(planar.y.len(), 2688 * 480);
        assert_eq!(planar.a.len(), 2688 * 480);
        assert_eq!(planar.u.len(), 320 * 240);
        assert_eq!(planar.v.len(), 320 * 240);
        assert_eq!(planar.chroma_stride(), 320);
    }

    #[test]
    fn odd_dimensions_rejected() {
        let conv = ColorConverter::new();
        assert!(matches!(
            conv.convert(&bgra_frame(641, 480, 2564)),
            Err(StreamError::InvalidGeometry { .. })
        ));
        assert!(matches!(
            conv.convert(&bgra_frame(640, 481, 2560)),
            Err(StreamError::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn undersized_stride_rejected() {
        let conv = ColorConverter::new();
        assert!(matches!(
            conv.convert(&bgra_frame(640, 480, 2559)),
            Err(StreamError::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn short_buffer_fails_conversion() {
        let conv = ColorConverter::new();
        let mut frame = bgra_frame(640, 480, 2560);
        frame.data.truncate(100);
        assert!(matches!(
            conv.convert(&frame),
            Err(StreamError::ConversionFailed(_))
        ));
    }

    #[test]
    fn alpha_copied_verbatim_through_stride() {
        let conv = ColorConverter::new();
        let mut frame = bgra_frame(4, 4, 24); // 8 bytes of padding per row
        // Distinct alpha per pixel: a = y*16 + x.
        for y in 0..4u32 {
            for x in 0..4u32 {
                frame.data[(y * 24 + x * 4 + 3) as usize] = (y * 16 + x) as u8;
            }
        }
        let planar = conv.convert(&frame).unwrap();
        for y in 0..4u32 {
            for x in 0..4u32 {
                assert_eq!(planar.alpha_at(x, y), (y * 16 + x) as u8);
            }
        }
    }

    #[test]
    fn white_pixel_luma() {
        let conv = ColorConverter::new();
        let mut frame = bgra_frame(2, 2, 8);
        for px in frame.data.chunks_mut(4) {
            px.copy_from_slice(&[255, 255, 255, 255]);
        }
        let planar = conv.convert(&frame).unwrap();
        // BT.601 studio swing puts white at 235, mid chroma at 128.
        assert_eq!(planar.y[0], 235);
        assert_eq!(planar.u[0], 128);
        assert_eq!(planar.v[0], 128);
    }

    #[test]
    fn black_pixel_luma() {
        let conv = ColorConverter::new();
        let mut frame = bgra_frame(2, 2, 8);
        for px in frame.data.chunks_mut(4) {
            px.copy_from_slice(&[0, 0, 0, 255]);
        }
        let planar = conv.convert(&frame).unwrap();
        assert_eq!(planar.y[0], 16);
        assert_eq!(planar.u[0], 128);
        assert_eq!(planar.v[0], 128);
    }
}
