//! Pipeline orchestrator: capture → convert → encode → repair → send.
//!
//! [`ScreenStreamer`] owns the single worker task and the connection,
//! sequences the stages, and applies the per-stage error policy:
//! transient stage failures drop the affected frame or unit and the
//! loop keeps running; only connect and encoder construction are
//! fatal. Frame-rate pacing brackets the **whole** iteration — the
//! time spent capturing, converting, and sending counts against the
//! frame interval, so an over-budget cycle simply shortens (or
//! eliminates) the following sleep.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::capture::FrameSource;
use crate::convert::ColorConverter;
use crate::encoder::VideoEncoder;
use crate::error::StreamError;
use crate::repair::BitstreamRepairer;
use crate::transport::FrameSink;
use crate::types::PlanarFrame;

// ── StreamConfig ─────────────────────────────────────────────────

/// Pipeline configuration, fixed at construction.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Destination host for the wire connection.
    pub host: String,
    /// Destination port.
    pub port: u16,
    /// Target frames per second (>= 1).
    pub fps: u32,
    /// Bounded wait for one capture call.
    pub capture_timeout: Duration,
}

impl StreamConfig {
    /// Target interval between iterations.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(1000 / self.fps.max(1) as u64)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 12345,
            fps: 30,
            capture_timeout: Duration::from_millis(500),
        }
    }
}

// ── FrameObserver ────────────────────────────────────────────────

/// Frame-ready notification, invoked synchronously on the worker task
/// after conversion.
///
/// The borrowed frame is only valid for the duration of the call; the
/// observer must copy whatever it needs and must not block the worker
/// longer than the frame budget allows.
pub trait FrameObserver: Send {
    fn frame_ready(&mut self, frame: &PlanarFrame);
}

// ── ScreenStreamer ───────────────────────────────────────────────

/// The pipeline orchestrator.
///
/// State machine: `Idle → Running → Idle`. [`start`](Self::start) is a
/// no-op while running and fatal-errors out (without entering Running)
/// if the sink cannot connect. [`stop`](Self::stop) signals the worker
/// cooperatively and waits for it to finish its current iteration.
///
/// Exactly one worker task exists per instance; the orchestrator
/// exclusively owns its join handle and the connection.
pub struct ScreenStreamer {
    config: StreamConfig,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<PipelineWorker>>,
    idle: Option<PipelineWorker>,
}

impl ScreenStreamer {
    /// Build a raw-mode streamer: converted frames go to the wire
    /// without an encoder.
    pub fn new(source: Box<dyn FrameSource>, config: StreamConfig) -> Self {
        let running = Arc::new(AtomicBool::new(false));
        Self {
            worker: None,
            idle: Some(PipelineWorker {
                source,
                converter: ColorConverter::new(),
                encoder: None,
                repairer: BitstreamRepairer::new(),
                observer: None,
                config: config.clone(),
                running: Arc::clone(&running),
            }),
            config,
            running,
        }
    }

    /// Switch to encoded mode: frames are submitted to `encoder` and
    /// the repaired NAL output is what reaches the wire.
    pub fn with_encoder(mut self, encoder: Box<dyn VideoEncoder>) -> Self {
        if let Some(worker) = self.idle.as_mut() {
            worker.encoder = Some(encoder);
        }
        self
    }

    /// Register a frame-ready observer.
    pub fn with_observer(mut self, observer: Box<dyn FrameObserver>) -> Self {
        if let Some(worker) = self.idle.as_mut() {
            worker.observer = Some(observer);
        }
        self
    }

    /// Whether the worker is currently running.
    pub fn is_running(&self) -> bool {
        self.worker.is_some() && self.running.load(Ordering::SeqCst)
    }

    /// Connect the sink and start the worker.
    ///
    /// No-op when already running. A connect failure is fatal to this
    /// start attempt: the error propagates and the pipeline stays Idle.
    pub async fn start(&mut self) -> Result<(), StreamError> {
        if self.worker.is_some() {
            return Ok(());
        }
        let sink = FrameSink::connect(&self.config.host, self.config.port).await?;

        let mut worker = self
            .idle
            .take()
            .ok_or_else(|| StreamError::Other("pipeline worker state lost".into()))?;
        self.running.store(true, Ordering::SeqCst);
        self.worker = Some(tokio::spawn(async move {
            worker.run(sink).await;
            worker
        }));
        info!(
            "pipeline started → {}:{} at {} fps",
            self.config.host, self.config.port, self.config.fps
        );
        Ok(())
    }

    /// Signal the worker to stop and wait for it to join.
    ///
    /// The worker observes the flag at the top of each iteration; an
    /// iteration already in flight runs to completion first.
    pub async fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            match handle.await {
                Ok(worker) => self.idle = Some(worker),
                Err(e) => warn!("worker task join failed: {e}"),
            }
            info!("pipeline stopped");
        }
    }

    /// Stop the worker and shut the encoder down for good.
    ///
    /// After this the instance cannot be restarted in encoded mode;
    /// use [`stop`](Self::stop) for a restartable pause.
    pub async fn shutdown(&mut self) {
        self.stop().await;
        if let Some(worker) = self.idle.as_mut() {
            if let Some(encoder) = worker.encoder.as_mut() {
                encoder.shutdown().await;
            }
        }
    }
}

impl Drop for ScreenStreamer {
    /// Defensive stop signal. Dropping cannot wait for the worker to
    /// join; deterministic shutdown is `stop()` / `shutdown()`.
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

// ── PipelineWorker ───────────────────────────────────────────────

/// The per-run pipeline state, moved into the worker task on start and
/// handed back through the join handle on stop.
struct PipelineWorker {
    source: Box<dyn FrameSource>,
    converter: ColorConverter,
    encoder: Option<Box<dyn VideoEncoder>>,
    repairer: BitstreamRepairer,
    observer: Option<Box<dyn FrameObserver>>,
    config: StreamConfig,
    running: Arc<AtomicBool>,
}

impl PipelineWorker {
    async fn run(&mut self, mut sink: FrameSink) {
        let interval = self.config.frame_interval();
        let mut last_report = Instant::now();

        while self.running.load(Ordering::SeqCst) {
            let loop_start = Instant::now();

            // 1. Capture, bounded wait. A miss retries immediately on
            // the next iteration — no pacing delay.
            let captured = match self.source.capture_frame(self.config.capture_timeout) {
                Ok(f) => f,
                Err(StreamError::CaptureTimeout(_)) => {
                    tokio::task::yield_now().await;
                    continue;
                }
                Err(e) => {
                    warn!("capture failed: {e}");
                    tokio::task::yield_now().await;
                    continue;
                }
            };

            // 2. Convert. A bad frame is dropped; the cycle still paces.
            let planar = match self.converter.convert(&captured) {
                Ok(p) => p,
                Err(e) => {
                    warn!("dropping frame: {e}");
                    drop(captured);
                    pace(loop_start, interval).await;
                    continue;
                }
            };
            // The capture buffer's single-owner window ends here.
            drop(captured);

            if let Some(observer) = self.observer.as_mut() {
                observer.frame_ready(&planar);
            }

            // 3. Encode + repair + send, or send raw. Transport errors
            // are per-frame: log and keep capturing.
            match self.encoder.as_mut() {
                Some(encoder) => {
                    match encoder.submit(&planar).await {
                        Ok(()) => {
                            for unit in encoder.poll_units() {
                                if let Some(payload) = self.repairer.repair(&unit) {
                                    if let Err(e) = sink.send(payload).await {
                                        warn!("send failed, frame dropped: {e}");
                                    }
                                }
                            }
                        }
                        Err(e) => warn!("encoder rejected frame: {e}"),
                    }
                }
                None => {
                    let payload = Bytes::from(planar.to_packed_bytes());
                    if let Err(e) = sink.send(payload).await {
                        warn!("send failed, frame dropped: {e}");
                    }
                }
            }
            drop(planar);

            if last_report.elapsed() > Duration::from_secs(5) {
                info!(
                    frames = sink.frames_sent(),
                    bytes = sink.bytes_sent(),
                    "pipeline stats"
                );
                last_report = Instant::now();
            }

            // 4. Pace the whole iteration against the frame interval.
            pace(loop_start, interval).await;
        }

        // Drain whatever the encoder already produced for sent frames.
        if let Some(encoder) = self.encoder.as_mut() {
            for unit in encoder.poll_units() {
                if let Some(payload) = self.repairer.repair(&unit) {
                    let _ = sink.send(payload).await;
                }
            }
        }
        sink.close().await;
    }
}

/// Sleep out the remainder of the frame interval, if any.
async fn pace(loop_start: Instant, interval: Duration) {
    let elapsed = loop_start.elapsed();
    if elapsed < interval {
        tokio::time::sleep(interval - elapsed).await;
    }
}

// ── Tests ────────────────────────────────────────────────────────
