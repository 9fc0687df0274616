//! Length-prefixed wire framing.
//!
//! Every message on the wire is a `WireFrame`:
//!
//! ```text
//! length:  u32  little-endian  (4 bytes)
//! payload: [u8] exactly `length` bytes
//! ```
//!
//! No handshake, no acknowledgements — the sender drives, reliability
//! rides on the underlying TCP stream. The decoder half exists for the
//! receiving end of the link and for the integration tests.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::StreamError;

/// Length prefix size on the wire.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Upper bound for a single wire frame. Even an unencoded 4K planar
/// frame stays well under this; anything past it is a corrupt prefix,
/// not data.
pub const MAX_WIRE_FRAME_SIZE: usize = 128 * 1024 * 1024;

/// Codec for `u32`-LE length-prefixed frames.
pub struct WireCodec;

impl Encoder<Bytes> for WireCodec {
    type Error = StreamError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() > MAX_WIRE_FRAME_SIZE {
            return Err(StreamError::FrameTooLarge {
                size: item.len(),
                max: MAX_WIRE_FRAME_SIZE,
            });
        }
        dst.reserve(LENGTH_PREFIX_SIZE + item.len());
        dst.put_u32_le(item.len() as u32);
        dst.put_slice(&item);
        Ok(())
    }
}

impl Decoder for WireCodec {
    type Item = Bytes;
    type Error = StreamError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }

        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        prefix.copy_from_slice(&src[..LENGTH_PREFIX_SIZE]);
        let len = u32::from_le_bytes(prefix) as usize;

        if len > MAX_WIRE_FRAME_SIZE {
            return Err(StreamError::FrameTooLarge {
                size: len,
                max: MAX_WIRE_FRAME_SIZE,
            });
        }
        if src.len() < LENGTH_PREFIX_SIZE + len {
            // Reserve so the next read can complete the frame.
            src.reserve(LENGTH_PREFIX_SIZE + len - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX_SIZE);
        Ok(Some(src.split_to(len).freeze()))
    }
}

// ── Tests ────────────────────────────────────────────────────────
