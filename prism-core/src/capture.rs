//! Screen capture provider seam and the DXGI implementation.
//!
//! The pipeline pulls frames through the [`FrameSource`] trait: one
//! owned BGRA buffer per call, blocking up to a bounded timeout.
//! [`DxgiCapturer`] implements it on Windows via the Direct3D 11
//! Desktop Duplication API; on other platforms construction fails at
//! runtime and tests substitute their own sources.

use std::time::Duration;

use crate::error::StreamError;
use crate::types::CapturedFrame;

// ── FrameSource ──────────────────────────────────────────────────

/// A provider of raw screen frames.
///
/// `capture_frame` blocks for up to `timeout` waiting for a new frame
/// and transfers ownership of the pixel buffer to the caller. The
/// buffer is valid for one pipeline iteration; the provider must not
/// retain any reference to it.
pub trait FrameSource: Send {
    /// Capture the next frame, blocking up to `timeout`.
    ///
    /// Returns [`StreamError::CaptureTimeout`] when no new frame was
    /// produced within the deadline and [`StreamError::Capture`] on
    /// provider failure. Both are transient: the orchestrator retries
    /// on the next iteration.
    fn capture_frame(&mut self, timeout: Duration) -> Result<CapturedFrame, StreamError>;

    /// Native width of the captured display, in pixels.
    fn width(&self) -> u32;

    /// Native height of the captured display, in pixels.
    fn height(&self) -> u32;
}

// ── DxgiCapturer ─────────────────────────────────────────────────

/// DXGI Desktop Duplication capturer.
///
/// Owns the full duplication pipeline as an explicit resource object
/// (device, context, duplication, staging texture) so several
/// independent instances can coexist; nothing is process-global.
/// Dropping the capturer releases the OS duplication session.
pub struct DxgiCapturer {
    width: u32,
    height: u32,

    #[cfg(target_os = "windows")]
    context: windows::Win32::Graphics::Direct3D11::ID3D11DeviceContext,
    #[cfg(target_os = "windows")]
    duplication: windows::Win32::Graphics::Dxgi::IDXGIOutputDuplication,
    #[cfg(target_os = "windows")]
    staging: windows::Win32::Graphics::Direct3D11::ID3D11Texture2D,
}

// ── Windows implementation ───────────────────────────────────────

#[cfg(target_os = "windows")]
mod platform {
    use std::time::Instant;

    use super::*;
    use crate::types::PixelFormat;
    use windows::{
        core::Interface,
        Win32::Graphics::{
            Direct3D::D3D_DRIVER_TYPE_HARDWARE,
            Direct3D11::*,
            Dxgi::{Common::*, *},
        },
    };

    fn dxgi_err(ctx: &str, e: impl std::fmt::Display) -> StreamError {
        StreamError::Capture(format!("{ctx}: {e}"))
    }

    impl DxgiCapturer {
        /// Initialise the capturer for the primary monitor.
        ///
        /// Fatal on failure: without a capture session there is no
        /// pipeline, so errors propagate to the constructor's caller.
        pub fn new() -> Result<Self, StreamError> {
            let mut device = None;
            let mut context = None;
            unsafe {
                D3D11CreateDevice(
                    None,
                    D3D_DRIVER_TYPE_HARDWARE,
                    None,
                    D3D11_CREATE_DEVICE_BGRA_SUPPORT,
                    None,
                    D3D11_SDK_VERSION,
                    Some(&mut device),
                    None,
                    Some(&mut context),
                )
                .map_err(|e| dxgi_err("D3D11CreateDevice", e))?;
            }
            let device = device.ok_or_else(|| StreamError::Capture("D3D11 device is None".into()))?;
            let context =
                context.ok_or_else(|| StreamError::Capture("D3D11 context is None".into()))?;

            // Device → adapter → primary output → duplication.
            let dxgi_device: IDXGIDevice =
                device.cast().map_err(|e| dxgi_err("cast IDXGIDevice", e))?;
            let adapter = unsafe { dxgi_device.GetAdapter() }
                .map_err(|e| dxgi_err("GetAdapter", e))?;
            let output: IDXGIOutput = unsafe { adapter.EnumOutputs(0) }
                .map_err(|e| dxgi_err("EnumOutputs(0)", e))?;
            let output1: IDXGIOutput1 =
                output.cast().map_err(|e| dxgi_err("cast IDXGIOutput1", e))?;
            let duplication = unsafe { output1.DuplicateOutput(&device) }
                .map_err(|e| dxgi_err("DuplicateOutput", e))?;

            let desc = unsafe { duplication.GetDesc() };
            let width = desc.ModeDesc.Width;
            let height = desc.ModeDesc.Height;

            // CPU-readable staging texture for the map/copy path.
            let staging_desc = D3D11_TEXTURE2D_DESC {
                Width: width,
                Height: height,
                MipLevels: 1,
                ArraySize: 1,
                Format: DXGI_FORMAT_B8G8R8A8_UNORM,
                SampleDesc: DXGI_SAMPLE_DESC {
                    Count: 1,
                    Quality: 0,
                },
                Usage: D3D11_USAGE_STAGING,
                BindFlags: 0,
                CPUAccessFlags: D3D11_CPU_ACCESS_READ.0 as u32,
                MiscFlags: 0,
            };
            let mut staging = None;
            unsafe {
                device
                    .CreateTexture2D(&staging_desc, None, Some(&mut staging))
                    .map_err(|e| dxgi_err("CreateTexture2D", e))?;
            }
            let staging =
                staging.ok_or_else(|| StreamError::Capture("staging texture is None".into()))?;

            Ok(Self {
                width,
                height,
                context,
                duplication,
                staging,
            })
        }
    }

    impl FrameSource for DxgiCapturer {
        fn capture_frame(&mut self, timeout: Duration) -> Result<CapturedFrame, StreamError> {
            let timeout_ms = timeout.as_millis() as u32;
            let mut frame_info = DXGI_OUTDUPL_FRAME_INFO::default();
            let mut resource = None;

            match unsafe {
                self.duplication
                    .AcquireNextFrame(timeout_ms, &mut frame_info, &mut resource)
            } {
                Ok(()) => {}
                Err(e) if e.code() == DXGI_ERROR_WAIT_TIMEOUT => {
                    return Err(StreamError::CaptureTimeout(timeout));
                }
                Err(e) => return Err(dxgi_err("AcquireNextFrame", e)),
            }

            let resource =
                resource.ok_or_else(|| StreamError::Capture("acquired resource is None".into()))?;
            let texture: ID3D11Texture2D = resource.cast().map_err(|e| {
                let _ = unsafe { self.duplication.ReleaseFrame() };
                dxgi_err("cast ID3D11Texture2D", e)
            })?;

            unsafe { self.context.CopyResource(&self.staging, &texture) };
            // Release the DXGI frame as early as possible.
            let _ = unsafe { self.duplication.ReleaseFrame() };

            let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
            unsafe {
                self.context
                    .Map(&self.staging, 0, D3D11_MAP_READ, 0, Some(&mut mapped))
                    .map_err(|e| dxgi_err("Map", e))?;
            }

            let stride = mapped.RowPitch;
            let total = stride as usize * self.height as usize;
            let data = unsafe {
                std::slice::from_raw_parts(mapped.pData as *const u8, total).to_vec()
            };
            unsafe { self.context.Unmap(&self.staging, 0) };

            Ok(CapturedFrame {
                width: self.width,
                height: self.height,
                stride,
                format: PixelFormat::Bgra8,
                data,
                timestamp: Instant::now(),
            })
        }

        fn width(&self) -> u32 {
            self.width
        }

        fn height(&self) -> u32 {
            self.height
        }
    }
}

// ── Non-Windows stub ─────────────────────────────────────────────

#[cfg(not(target_os = "windows"))]
impl DxgiCapturer {
    /// DXGI Desktop Duplication is only available on Windows.
    pub fn new() -> Result<Self, StreamError> {
        Err(StreamError::Capture(
            "DXGI desktop duplication is only available on Windows".into(),
        ))
    }
}

#[cfg(not(target_os = "windows"))]
impl FrameSource for DxgiCapturer {
    fn capture_frame(&mut self, _timeout: Duration) -> Result<CapturedFrame, StreamError> {
        Err(StreamError::Capture("not supported on this platform".into()))
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}
