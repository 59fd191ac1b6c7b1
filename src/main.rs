use anyhow::Result;
use clap::{Parser, Subcommand};
use micrec::audio::{detect_driver, draw_db_bar, list_input_devices};
use micrec::upload::{S3Uploader, Uploader};
use micrec::{Config, RecordingSession, SessionJournal};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "micrec")]
#[command(about = "Chunked audio recording and management CLI")]
struct Cli {
    /// Config file basename (YAML); defaults apply when the file is absent
    #[arg(long, global = true, default_value = "micrec")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new audio recording
    Record {
        /// Recording duration in seconds; omit for continuous recording
        #[arg(long)]
        duration: Option<u64>,

        /// Output directory for recordings
        #[arg(long)]
        output: Option<PathBuf>,

        /// Input device (name or enumeration index); omit for default
        #[arg(long)]
        device: Option<String>,

        /// Audio format: wav, flac, or mp3 (16 kHz mono)
        #[arg(long)]
        format: Option<String>,

        /// Input gain factor (1.0 = no change, 2.0 = +6 dB)
        #[arg(long)]
        gain: Option<f32>,

        /// Frames per saved chunk file
        #[arg(long)]
        chunk_frames: Option<usize>,

        /// Conversation label used to group uploads
        #[arg(long)]
        conversation_id: Option<String>,

        /// Bypass object-storage upload for this recording
        #[arg(long)]
        no_upload: bool,

        /// Override the journal filename (relative to the output directory)
        #[arg(long)]
        log_file: Option<String>,

        /// Session id template; placeholders: {ts}, {device_id}
        #[arg(long)]
        timestamp_format: Option<String>,

        /// strftime pattern for the {ts} placeholder
        #[arg(long)]
        datetime_format: Option<String>,
    },

    /// List available input devices
    Devices {
        /// Filter by driver kind: pulse, alsa, jack, usb, default
        #[arg(long)]
        driver: Option<String>,
    },

    /// Show device and object-storage status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    match cli.command {
        Commands::Record {
            duration,
            output,
            device,
            format,
            gain,
            chunk_frames,
            conversation_id,
            no_upload,
            log_file,
            timestamp_format,
            datetime_format,
        } => {
            let mut session_config = cfg.session_config();
            if let Some(output) = output {
                session_config.output_dir = output;
            }
            if let Some(format) = format {
                session_config.format = format.parse()?;
            }
            if let Some(gain) = gain {
                session_config.gain = gain;
            }
            if let Some(chunk_frames) = chunk_frames {
                session_config.chunk_frames = chunk_frames;
            }
            if let Some(timestamp_format) = timestamp_format {
                session_config.timestamp_format = timestamp_format;
            }
            if let Some(datetime_format) = datetime_format {
                session_config.datetime_format = datetime_format;
            }
            session_config.device = device;
            session_config.conversation_id = conversation_id;

            let journal_path = match log_file {
                Some(file) => session_config.output_dir.join(file),
                None => session_config.output_dir.join(&cfg.log.file),
            };
            let journal = Arc::new(SessionJournal::new(&journal_path)?);
            info!("Recording log: {}", journal_path.display());

            let uploader: Option<Arc<dyn Uploader>> = if no_upload {
                info!("Upload mode: bypassed for this run");
                None
            } else {
                match &cfg.s3 {
                    Some(s3) => match S3Uploader::new(s3.clone()) {
                        Ok(uploader) => {
                            info!("Upload mode: enabled (use --no-upload to bypass)");
                            Some(Arc::new(uploader))
                        }
                        Err(e) => {
                            warn!("S3 upload disabled: {e}");
                            None
                        }
                    },
                    None => {
                        warn!("S3 upload disabled: no `s3` section in config");
                        None
                    }
                }
            };

            let session = RecordingSession::new(session_config, Some(journal), uploader)?;
            session.start().await?;

            if let Some(duration) = duration {
                info!("Recording for {duration} seconds...");
                run_level_meter(&session, Some(Duration::from_secs(duration))).await;
            } else {
                info!("Recording continuously... Press Ctrl+C to stop");
                run_level_meter(&session, None).await;
            }
            println!();

            session.stop().await?;
            println!(
                "Recording completed: session {} ({} chunks)",
                session.session_id(),
                session.chunk_count()
            );
        }

        Commands::Devices { driver } => {
            let devices = list_input_devices(driver.as_deref())?;
            if devices.is_empty() {
                println!("No input devices found");
                return Ok(());
            }
            println!("Available input devices:");
            for device in devices {
                let default = if device.is_default { " [DEFAULT]" } else { "" };
                println!("{}: {}", device.id, device.name);
                println!(
                    "   Driver: {} | Channels: {} | Sample Rate: {} Hz{}",
                    detect_driver(&device.name).to_uppercase(),
                    device.channels,
                    device.default_sample_rate,
                    default
                );
            }
        }

        Commands::Status => {
            match list_input_devices(None) {
                Ok(devices) => {
                    println!("Input devices: {}", devices.len());
                    for device in devices {
                        let default = if device.is_default { " [DEFAULT]" } else { "" };
                        println!("  {}: {}{}", device.id, device.name, default);
                    }
                }
                Err(e) => println!("Error listing devices: {e}"),
            }

            match &cfg.s3 {
                None => println!("S3 storage not configured"),
                Some(s3) => match S3Uploader::new(s3.clone()) {
                    Ok(uploader) => {
                        if uploader.check_reachable().await {
                            println!("S3 storage available: bucket {}", uploader.bucket());
                        } else {
                            println!("S3 storage not reachable (bucket: {})", uploader.bucket());
                        }
                    }
                    Err(e) => println!("Failed to initialize S3 client: {e}"),
                },
            }
        }
    }

    Ok(())
}

/// Poll the session's level meter every 100 ms and redraw a textual bar
/// until the duration elapses or Ctrl+C arrives.
async fn run_level_meter(session: &RecordingSession, duration: Option<Duration>) {
    let mut interval = tokio::time::interval(Duration::from_millis(100));
    let deadline = duration.map(|d| tokio::time::Instant::now() + d);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            tick = interval.tick() => {
                if let Some(deadline) = deadline {
                    if tick >= deadline {
                        break;
                    }
                }
                let bar = draw_db_bar(session.current_db_level(), 50);
                print!("\rAudio Level: {bar}");
                let _ = std::io::stdout().flush();
            }
        }
    }
}
