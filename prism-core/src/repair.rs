//! Bitstream repair: parameter-set caching and re-injection.
//!
//! Receivers that join mid-stream (or decode only from a key frame)
//! need SPS/PPS immediately before every IDR. The repairer absorbs
//! standalone SPS/PPS units into a cache and re-emits them, freshest
//! copy first, in front of every key frame, making the stream
//! self-sufficient from any IDR onward without renegotiation.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::nal::{NAL_TYPE_IDR, NAL_TYPE_PPS, NAL_TYPE_SPS, NalUnit, START_CODE};

// ── BitstreamRepairer ────────────────────────────────────────────

/// Stateful NAL-unit classifier/rewriter.
///
/// One instance is bound to one logical stream: the cached parameter
/// sets describe that stream only and must not be shared. Both cache
/// slots start empty and are only ever overwritten, never cleared.
pub struct BitstreamRepairer {
    /// Most recent SPS, start code stripped (header + body).
    sps: Option<Bytes>,
    /// Most recent PPS, start code stripped (header + body).
    pps: Option<Bytes>,
}

impl BitstreamRepairer {
    pub fn new() -> Self {
        Self {
            sps: None,
            pps: None,
        }
    }

    /// Process one NAL unit and return the bytes to put on the wire,
    /// or `None` when nothing should be emitted for it.
    ///
    /// - Units under 5 bytes are malformed and dropped.
    /// - SPS and PPS are absorbed into the cache (most recent wins)
    ///   and never forwarded standalone.
    /// - An IDR is prepended with the cached SPS and PPS when both are
    ///   present; otherwise it passes through bare.
    /// - Every other type passes through byte-identical.
    pub fn repair(&mut self, unit: &NalUnit) -> Option<Bytes> {
        let nal_type = match unit.nal_type() {
            Some(t) => t,
            None => {
                trace!(len = unit.len(), "dropping malformed NAL unit");
                return None;
            }
        };

        match nal_type {
            NAL_TYPE_SPS => {
                self.sps = Some(Bytes::copy_from_slice(unit.payload()));
                trace!(len = unit.len(), "cached SPS");
                None
            }
            NAL_TYPE_PPS => {
                self.pps = Some(Bytes::copy_from_slice(unit.payload()));
                trace!(len = unit.len(), "cached PPS");
                None
            }
            NAL_TYPE_IDR => Some(self.emit_key_frame(unit)),
            _ => Some(Bytes::copy_from_slice(unit.as_bytes())),
        }
    }

    /// Whether both parameter-set slots are populated.
    pub fn has_parameter_sets(&self) -> bool {
        self.sps.is_some() && self.pps.is_some()
    }

    // ── Internal ─────────────────────────────────────────────────

    /// `[startcode SPS][startcode PPS][IDR]` when the cache is full,
    /// the bare IDR otherwise.
    fn emit_key_frame(&self, idr: &NalUnit) -> Bytes {
        match (&self.sps, &self.pps) {
            (Some(sps), Some(pps)) => {
                let mut out = BytesMut::with_capacity(
                    2 * START_CODE.len() + sps.len() + pps.len() + idr.len(),
                );
                out.put_slice(&START_CODE);
                out.put_slice(sps);
                out.put_slice(&START_CODE);
                out.put_slice(pps);
                out.put_slice(idr.as_bytes());
                out.freeze()
            }
            _ => Bytes::copy_from_slice(idr.as_bytes()),
        }
    }
}

impl Default for BitstreamRepairer {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn nal(ty: u8, body: &[u8]) -> NalUnit {
        let mut payload = vec![ty & 0x1F];
        payload.extend_from_slice(body);
        NalUnit::from_payload(&payload)
    }

    #[test]
    fn sps_pps_absorbed_then_prepended_to_idr() {
        let mut rep = BitstreamRepairer::new();

        assert!(rep.repair(&nal(NAL_TYPE_SPS, &[0x10, 0x11])).is_none());
        assert!(rep.repair(&nal(NAL_TYPE_PPS, &[0x20])).is_none());
        assert!(rep.has_parameter_sets());

        let idr = nal(NAL_TYPE_IDR, &[0x30, 0x31, 0x32]);
        let out = rep.repair(&idr).unwrap();

        // Exactly [SC sps][SC pps][SC idr], concatenated.
        let mut expected = Vec::new();
        expected.extend_from_slice(&START_CODE);
        expected.extend_from_slice(&[NAL_TYPE_SPS, 0x10, 0x11]);
        expected.extend_from_slice(&START_CODE);
        expected.extend_from_slice(&[NAL_TYPE_PPS, 0x20]);
        expected.extend_from_slice(idr.as_bytes());
        assert_eq!(&out[..], &expected[..]);
    }

    #[test]
    fn later_sps_replaces_earlier() {
        let mut rep = BitstreamRepairer::new();
        rep.repair(&nal(NAL_TYPE_SPS, &[0xAA]));
        rep.repair(&nal(NAL_TYPE_PPS, &[0xBB]));
        rep.repair(&nal(NAL_TYPE_SPS, &[0xCC])); // newer SPS before the IDR

        let out = rep.repair(&nal(NAL_TYPE_IDR, &[0x01])).unwrap();
        // The emitted SPS payload is the new one.
        assert_eq!(out[4], NAL_TYPE_SPS);
        assert_eq!(out[5], 0xCC);
        assert!(!out.windows(1).any(|w| w == [0xAA]));
    }

    #[test]
    fn idr_without_parameter_sets_passes_bare() {
        let mut rep = BitstreamRepairer::new();
        let idr = nal(NAL_TYPE_IDR, &[0x42; 8]);
        let out = rep.repair(&idr).unwrap();
        assert_eq!(&out[..], idr.as_bytes());
    }

    #[test]
    fn idr_with_only_sps_passes_bare() {
        let mut rep = BitstreamRepairer::new();
        rep.repair(&nal(NAL_TYPE_SPS, &[0xAA]));
        let idr = nal(NAL_TYPE_IDR, &[0x42]);
        let out = rep.repair(&idr).unwrap();
        assert_eq!(&out[..], idr.as_bytes());
    }

    #[test]
    fn non_parameter_units_pass_through_identical() {
        let mut rep = BitstreamRepairer::new();
        for ty in [1u8, 2, 6, 9] {
            let unit = nal(ty, &[0x55, 0x66, 0x77]);
            let out = rep.repair(&unit).unwrap();
            assert_eq!(&out[..], unit.as_bytes());
        }
    }

    #[test]
    fn undersized_unit_dropped() {
        let mut rep = BitstreamRepairer::new();
        let short = NalUnit::new(Bytes::from_static(&[0, 0, 0, 1]));
        assert!(rep.repair(&short).is_none());
    }

    #[test]
    fn parameter_sets_survive_across_key_frames() {
        let mut rep = BitstreamRepairer::new();
        rep.repair(&nal(NAL_TYPE_SPS, &[0x01]));
        rep.repair(&nal(NAL_TYPE_PPS, &[0x02]));

        let first = rep.repair(&nal(NAL_TYPE_IDR, &[0x03])).unwrap();
        let second = rep.repair(&nal(NAL_TYPE_IDR, &[0x03])).unwrap();
        // Cache is never cleared: both IDRs get the same prefix.
        assert_eq!(first, second);
    }
}
