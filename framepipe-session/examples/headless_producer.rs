//! Headless producer example - pump frames through a stub compressor.
//!
//! Usage:
//!   cargo run --example headless_producer
//!
//! This example demonstrates:
//! - Creating a session configuration
//! - Initializing a session against an injected encoder backend
//! - The acquire/fill/submit loop
//! - Graceful teardown

use framepipe_session::{
    Config, DisplayTarget, FrameEncoder, FrameLayout, FrameMetadata, PixelFormat, ProducerSession,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Stand-in for the real compressor: accepts local displays, asks for
/// top-down BGRA frames, and logs what it is handed.
struct StubEncoder;

impl FrameEncoder for StubEncoder {
    fn probe(&self, target: &DisplayTarget) -> anyhow::Result<()> {
        if target.display.starts_with(':') {
            Ok(())
        } else {
            anyhow::bail!("{} is not a local display", target.display)
        }
    }

    fn frame_layout(&self, _width: u32, _height: u32) -> FrameLayout {
        FrameLayout::top_down(PixelFormat::Bgra)
    }

    fn encode(&self, pixels: &[u8], metadata: &FrameMetadata) -> anyhow::Result<()> {
        debug!(
            "encoding {}x{} {} frame, {} bytes",
            metadata.width,
            metadata.height,
            metadata.format,
            pixels.len()
        );
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::builder().pool_capacity(2).build()?;
    let session = ProducerSession::init(
        DisplayTarget::new(":0", 0x2a0_0007),
        Arc::new(StubEncoder),
        config,
    )?;

    let (width, height) = (640, 480);
    for frame_no in 0u32..10 {
        let mut frame = session.acquire(width, height)?;
        let bpp = frame.layout().format.bytes_per_pixel();

        // Fill a moving vertical bar so each frame differs
        let bar = (frame_no * width / 10) as usize;
        for y in 0..height {
            let row = frame.row_mut(y);
            row.fill(0);
            for px in row.chunks_exact_mut(bpp).skip(bar).take(width as usize / 10) {
                px.fill(0xff);
            }
        }

        let meta = frame.metadata();
        session.submit(frame, meta)?;
        info!("submitted frame {}", frame_no);
    }

    session.close()?;
    info!("session closed; last error: {:?}", session.last_error());

    Ok(())
}
