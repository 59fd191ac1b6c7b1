// Example: Record microphone audio in chunks
//
// This example demonstrates the complete capture pipeline:
// 1. Open the default (or selected) input device
// 2. Accumulate gain-adjusted buffers until the chunk threshold
// 3. Save each chunk on a background task (WAV/FLAC/MP3)
// 4. Append session/chunk records to the JSONL journal
//
// Usage: cargo run --example record_chunks -- --duration 30

use anyhow::Result;
use clap::Parser;
use micrec::{RecordingSession, SessionConfig, SessionJournal};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "record_chunks")]
#[command(about = "Record microphone audio in chunks")]
struct Args {
    /// Duration to record in seconds
    #[arg(short, long, default_value = "30")]
    duration: u64,

    /// Input device (name or index); omit for default
    #[arg(long)]
    device: Option<String>,

    /// Output directory
    #[arg(short, long, default_value = "recordings")]
    output_dir: PathBuf,

    /// Frames per chunk (160000 = 10s at 16 kHz)
    #[arg(short, long, default_value = "160000")]
    chunk_frames: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let args = Args::parse();

    info!("micrec - Chunked Recording Example");
    info!("Recording for {} seconds", args.duration);
    info!("Output directory: {}", args.output_dir.display());

    let config = SessionConfig {
        output_dir: args.output_dir.clone(),
        chunk_frames: args.chunk_frames,
        device: args.device,
        ..SessionConfig::default()
    };

    let journal = Arc::new(SessionJournal::new(
        args.output_dir.join("recordings.jsonl"),
    )?);

    let session = RecordingSession::new(config, Some(journal), None)?;
    session.start().await?;

    info!(
        "Recording started (session {}). Press Ctrl+C to stop early",
        session.session_id()
    );

    tokio::select! {
        _ = sleep(Duration::from_secs(args.duration)) => {}
        _ = tokio::signal::ctrl_c() => info!("Interrupted, stopping early"),
    }

    session.stop().await?;

    info!(
        "Recording complete: {} chunk(s) saved under {}",
        session.chunk_count(),
        args.output_dir.display()
    );

    Ok(())
}
