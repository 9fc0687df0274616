//! Screen streamer — entry point.
//!
//! ```text
//! prism-streamer                    Stream with the default config
//! prism-streamer --config <path>    Load a custom config TOML
//! prism-streamer --gen-config       Write the default config to stdout
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use prism_core::{DxgiCapturer, FfmpegEncoder, FrameSource, ScreenStreamer};
use prism_streamer::config::StreamerConfig;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "prism-streamer", about = "Screen capture and streaming service")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "prism-streamer.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&StreamerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // Load config.
    let config = StreamerConfig::load(&cli.config);

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("prism-streamer v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "destination: {}:{}",
        config.network.host, config.network.port
    );
    info!("target FPS: {}", config.capture.fps);
    info!("mode: {}", config.encoder.mode);

    let stream_config = config.to_stream_config();

    // Fatal if the capture session cannot be acquired.
    let capturer = DxgiCapturer::new()?;
    let (width, height) = (capturer.width(), capturer.height());
    info!("capturing {width}x{height}");

    let mut streamer = ScreenStreamer::new(Box::new(capturer), stream_config.clone());
    if config.encoded_mode() {
        // Fatal if the encoder process cannot be spawned.
        let encoder = FfmpegEncoder::spawn(
            &config.encoder.ffmpeg_path,
            width,
            height,
            stream_config.fps,
        )?;
        streamer = streamer.with_encoder(Box::new(encoder));
    }

    // Fatal if the sink cannot connect.
    streamer.start().await?;

    tokio::signal::ctrl_c().await.ok();
    info!("Ctrl-C received — shutting down");
    streamer.shutdown().await;

    Ok(())
}
