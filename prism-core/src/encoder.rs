//! Video encoder seam and the out-of-process ffmpeg implementation.
//!
//! The pipeline feeds planar frames in and receives already-split
//! [`NalUnit`]s back. [`FfmpegEncoder`] realises the seam with a piped
//! `ffmpeg` child process: raw `yuva420p` frames go down stdin, the
//! Annex-B elementary stream comes back on stdout and is demultiplexed
//! by a dedicated reader task feeding an mpsc channel, so encoded
//! output arrives asynchronously relative to submitted frames.

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::StreamError;
use crate::nal::{AnnexBSplitter, NalUnit};
use crate::types::PlanarFrame;

// ── VideoEncoder ─────────────────────────────────────────────────

/// An H.264 encoder consuming planar frames and emitting NAL units.
///
/// Output is asynchronous: units ready at any given moment are drained
/// with [`poll_units`](Self::poll_units), which never blocks. A frame
/// submitted now may surface as output several polls later.
#[async_trait]
pub trait VideoEncoder: Send {
    /// Feed one planar frame to the encoder.
    async fn submit(&mut self, frame: &PlanarFrame) -> Result<(), StreamError>;

    /// Drain every NAL unit the encoder has produced so far.
    fn poll_units(&mut self) -> Vec<NalUnit>;

    /// Stop the encoder and release its resources.
    async fn shutdown(&mut self);
}

// ── FfmpegEncoder ────────────────────────────────────────────────

/// Out-of-process encoder piping frames through `ffmpeg`/libx264.
pub struct FfmpegEncoder {
    stdin: Option<ChildStdin>,
    child: Child,
    units_rx: mpsc::Receiver<NalUnit>,
    width: u32,
    height: u32,
}

impl FfmpegEncoder {
    /// Spawn the encoder process for a fixed resolution and frame rate.
    ///
    /// Fatal on failure: a pipeline configured for encoded output
    /// cannot run without its encoder, so spawn errors surface as
    /// [`StreamError::EncoderInit`] at construction.
    pub fn spawn(
        ffmpeg_path: &str,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<Self, StreamError> {
        let size = format!("{width}x{height}");
        let rate = fps.to_string();
        let mut child = Command::new(ffmpeg_path)
            .args([
                "-hide_banner",
                "-loglevel",
                "error",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "yuva420p",
                "-s",
                &size,
                "-r",
                &rate,
                "-i",
                "-",
                "-c:v",
                "libx264",
                "-preset",
                "ultrafast",
                "-tune",
                "zerolatency",
                "-f",
                "h264",
                "-",
            ])
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| StreamError::EncoderInit(format!("spawn {ffmpeg_path}: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| StreamError::EncoderInit("encoder stdin not piped".into()))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| StreamError::EncoderInit("encoder stdout not piped".into()))?;

        // Reader task: stdout bytes → splitter → unit channel.
        let (units_tx, units_rx) = mpsc::channel::<NalUnit>(256);
        tokio::spawn(async move {
            let mut splitter = AnnexBSplitter::new();
            let mut buf = vec![0u8; 64 * 1024];
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        splitter.push(&buf[..n]);
                        while let Some(unit) = splitter.next_unit() {
                            if units_tx.send(unit).await.is_err() {
                                return; // encoder handle dropped
                            }
                        }
                    }
                    Err(e) => {
                        warn!("encoder stdout read error: {e}");
                        break;
                    }
                }
            }
            if let Some(unit) = splitter.flush() {
                let _ = units_tx.send(unit).await;
            }
            debug!("encoder output stream ended");
        });

        Ok(Self {
            stdin: Some(stdin),
            child,
            units_rx,
            width,
            height,
        })
    }
}

#[async_trait]
impl VideoEncoder for FfmpegEncoder {
    async fn submit(&mut self, frame: &PlanarFrame) -> Result<(), StreamError> {
        if frame.width != self.width || frame.height != self.height {
            return Err(StreamError::Encoder(format!(
                "frame geometry {}x{} does not match encoder {}x{}",
                frame.width, frame.height, self.width, self.height,
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| StreamError::Encoder("encoder already shut down".into()))?;

        // ffmpeg expects tightly packed planes; the stride-addressed
        // luma and alpha rows are repacked on the way out.
        let w = frame.width as usize;
        let h = frame.height as usize;
        let mut packed = Vec::with_capacity(w * h * 5 / 2);
        pack_rows(&frame.y, frame.stride as usize, w, h, &mut packed);
        packed.extend_from_slice(&frame.u);
        packed.extend_from_slice(&frame.v);
        pack_rows(&frame.a, frame.stride as usize, w, h, &mut packed);

        stdin
            .write_all(&packed)
            .await
            .map_err(|e| StreamError::Encoder(format!("write frame: {e}")))?;
        stdin
            .flush()
            .await
            .map_err(|e| StreamError::Encoder(format!("flush frame: {e}")))?;
        Ok(())
    }

    fn poll_units(&mut self) -> Vec<NalUnit> {
        let mut units = Vec::new();
        while let Ok(unit) = self.units_rx.try_recv() {
            units.push(unit);
        }
        units
    }

    async fn shutdown(&mut self) {
        // Dropping stdin sends EOF so ffmpeg can exit on its own.
        self.stdin.take();
        if let Err(e) = self.child.wait().await {
            warn!("encoder process wait failed: {e}");
        }
    }
}

/// Copy `rows` rows of `row_len` bytes out of a stride-addressed plane.
fn pack_rows(plane: &[u8], stride: usize, row_len: usize, rows: usize, out: &mut Vec<u8>) {
    for row in 0..rows {
        let start = row * stride;
        out.extend_from_slice(&plane[start..start + row_len]);
    }
}

// ── Tests ────────────────────────────────────────────────────────
