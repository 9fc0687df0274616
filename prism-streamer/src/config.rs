//! Configuration for the streaming service.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use prism_core::StreamConfig;

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamerConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Screen capture settings.
    pub capture: CaptureConfig,
    /// Encoder settings.
    pub encoder: EncoderConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Destination host to stream to.
    pub host: String,
    /// Destination TCP port.
    pub port: u16,
}

/// Screen capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Target frames per second.
    pub fps: u32,
    /// Bounded wait for one capture call, in milliseconds.
    pub capture_timeout_ms: u64,
}

/// Encoder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Deployment mode: "h264" pipes frames through ffmpeg, "raw"
    /// sends converted frames directly.
    pub mode: String,
    /// Path or name of the ffmpeg binary.
    pub ffmpeg_path: String,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            capture: CaptureConfig::default(),
            encoder: EncoderConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 12345,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            capture_timeout_ms: 500,
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            mode: "h264".into(),
            ffmpeg_path: "ffmpeg".into(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl StreamerConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Whether the encoded (ffmpeg) deployment mode is selected.
    pub fn encoded_mode(&self) -> bool {
        !self.encoder.mode.eq_ignore_ascii_case("raw")
    }

    /// Convert into the core pipeline configuration, clamping values
    /// into their valid ranges.
    pub fn to_stream_config(&self) -> StreamConfig {
        StreamConfig {
            host: self.network.host.clone(),
            port: self.network.port,
            fps: self.capture.fps.clamp(1, 60),
            capture_timeout: Duration::from_millis(self.capture.capture_timeout_ms.max(1)),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let cfg = StreamerConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("host"));
        assert!(text.contains("fps"));
        assert!(text.contains("ffmpeg_path"));
    }

    #[test]
    fn roundtrip_config() {
        let cfg = StreamerConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: StreamerConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.network.port, 12345);
        assert_eq!(parsed.capture.fps, 30);
    }

    #[test]
    fn to_stream_config_clamps() {
        let mut cfg = StreamerConfig::default();
        cfg.capture.fps = 240; // beyond max
        let sc = cfg.to_stream_config();
        assert_eq!(sc.fps, 60);

        cfg.capture.fps = 0;
        let sc = cfg.to_stream_config();
        assert_eq!(sc.fps, 1);
    }

    #[test]
    fn mode_selection() {
        let mut cfg = StreamerConfig::default();
        assert!(cfg.encoded_mode());
        cfg.encoder.mode = "RAW".into();
        assert!(!cfg.encoded_mode());
    }
}
