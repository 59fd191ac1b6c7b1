// Example: Live input level meter
//
// Opens the default input device without writing any files and redraws a
// textual dB bar ten times a second. Useful for checking which device is
// actually receiving audio.
//
// Usage: cargo run --example live_level

use anyhow::Result;
use micrec::audio::{db_level, draw_db_bar, CaptureStream, LevelMeter};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let level = Arc::new(LevelMeter::new());
    let level_cb = Arc::clone(&level);

    let capture = CaptureStream::open(None, 1, move |buffer| {
        level_cb.store(db_level(&buffer));
    })?;

    info!(
        "Metering {} at {} Hz. Press Ctrl+C to stop",
        capture.info().device_name,
        capture.info().sample_rate
    );

    let mut interval = tokio::time::interval(Duration::from_millis(100));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = interval.tick() => {
                print!("\rAudio Level: {}", draw_db_bar(level.load(), 50));
                let _ = std::io::stdout().flush();
            }
        }
    }
    println!();

    capture.close();
    Ok(())
}
