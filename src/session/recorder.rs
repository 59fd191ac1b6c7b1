//! Session orchestration
//!
//! `RecordingSession` wires capture, metering, accumulation, chunk saving,
//! upload, and the journal together and owns the session lifecycle:
//! idle → running → stopping → stopped.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Local;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use super::config::SessionConfig;
use crate::audio::{apply_gain, db_level, CaptureStream, LevelMeter};
use crate::errors::RecorderError;
use crate::journal::{local_timestamp, SessionJournal};
use crate::recording::{validate_format, ChunkSaver, FrameAccumulator, SaverConfig};
use crate::upload::Uploader;

/// How long `stop` waits for in-flight chunk-save tasks before abandoning
/// them. An abandoned task keeps running and may still write its record;
/// session-end is not delayed past this deadline.
pub const STOP_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// A microphone recording session.
///
/// The capture callback runs on the device's real-time thread and only
/// converts, meters, and appends; everything that blocks happens on
/// per-chunk background tasks. `current_db_level` can be polled from any
/// thread without blocking.
pub struct RecordingSession {
    config: SessionConfig,
    session_id: String,
    journal: Option<Arc<SessionJournal>>,
    uploader: Option<Arc<dyn Uploader>>,
    accumulator: Arc<FrameAccumulator>,
    level: Arc<LevelMeter>,
    state: Mutex<SessionState>,
    capture: Mutex<Option<CaptureStream>>,
    saver: Mutex<Option<Arc<ChunkSaver>>>,
}

impl std::fmt::Debug for RecordingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingSession")
            .field("session_id", &self.session_id)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl RecordingSession {
    /// Create a session. Format requirements are validated here, before any
    /// device is opened; the session id is fixed from the configured
    /// templates at this point, independent of when `start` is called.
    pub fn new(
        config: SessionConfig,
        journal: Option<Arc<SessionJournal>>,
        uploader: Option<Arc<dyn Uploader>>,
    ) -> Result<Self, RecorderError> {
        validate_format(config.format, config.sample_rate, config.channels)?;
        if config.chunk_frames == 0 {
            return Err(RecorderError::Config(
                "chunk_frames must be greater than zero".into(),
            ));
        }

        std::fs::create_dir_all(&config.output_dir)?;

        let session_id = config.build_session_id(Local::now());
        let accumulator = Arc::new(FrameAccumulator::new(config.chunk_frames, config.channels));

        Ok(Self {
            config,
            session_id,
            journal,
            uploader,
            accumulator,
            level: Arc::new(LevelMeter::new()),
            state: Mutex::new(SessionState::Idle),
            capture: Mutex::new(None),
            saver: Mutex::new(None),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Latest dB level published by the capture callback. Never blocks.
    pub fn current_db_level(&self) -> f32 {
        self.level.load()
    }

    pub fn is_recording(&self) -> bool {
        *self.state.lock().expect("state lock poisoned") == SessionState::Running
    }

    /// Chunks handed off so far (including any still being saved).
    pub fn chunk_count(&self) -> u32 {
        self.accumulator.chunk_count()
    }

    /// Open the capture device and start recording.
    ///
    /// The device's native sample rate becomes authoritative for the rest
    /// of the session. Starting an already-running session is a no-op.
    pub async fn start(&self) -> Result<(), RecorderError> {
        {
            let state = self.state.lock().expect("state lock poisoned");
            match *state {
                SessionState::Idle => {}
                SessionState::Running | SessionState::Stopping => {
                    warn!("Recording already started");
                    return Ok(());
                }
                SessionState::Stopped => {
                    return Err(RecorderError::Device(
                        "session already stopped; create a new session to record again".into(),
                    ))
                }
            }
        }

        let runtime = Handle::current();
        let started_at = local_timestamp();

        // Negotiate before building the saver: chunk durations and encodes
        // use the device's native rate, not the requested one.
        let probed = CaptureStream::probe(self.config.device.as_deref(), self.config.channels)?;

        let saver = ChunkSaver::new(
            SaverConfig {
                session_id: self.session_id.clone(),
                output_dir: self.config.output_dir.clone(),
                format: self.config.format,
                sample_rate: probed.sample_rate,
                channels: self.config.channels,
                conversation_id: self.config.conversation_id.clone(),
            },
            self.journal.clone(),
            self.uploader.clone(),
            runtime,
        );

        let accumulator = Arc::clone(&self.accumulator);
        let level = Arc::clone(&self.level);
        let saver_cb = Arc::clone(&saver);
        let gain = self.config.gain;

        let capture = CaptureStream::open(
            self.config.device.as_deref(),
            self.config.channels,
            move |mut buffer: Vec<i16>| {
                apply_gain(&mut buffer, gain);
                level.store(db_level(&buffer));
                if let Some(chunk) = accumulator.push(buffer) {
                    saver_cb.dispatch(chunk);
                }
            },
        )?;

        let info = capture.info().clone();
        info!(
            "Recording started. Session ID: {} | Device: {} | {} Hz | output: {}",
            self.session_id,
            info.device_name,
            info.sample_rate,
            self.config.output_dir.display()
        );

        if let Some(journal) = &self.journal {
            journal.write_session_start(
                &self.session_id,
                self.config.conversation_id.as_deref(),
                self.config.device.as_deref(),
                &info.device_name,
                info.sample_rate,
                info.channels,
                self.config.format.extension(),
                &started_at,
            )?;
        }

        *self.capture.lock().expect("capture lock poisoned") = Some(capture);
        *self.saver.lock().expect("saver lock poisoned") = Some(saver);
        *self.state.lock().expect("state lock poisoned") = SessionState::Running;

        Ok(())
    }

    /// Close the capture source, flush the partial buffer as a final short
    /// chunk, wait (bounded) for in-flight saves, and write session-end.
    ///
    /// Idempotent: stopping a session that is not running is a no-op.
    pub async fn stop(&self) -> Result<(), RecorderError> {
        {
            let mut state = self.state.lock().expect("state lock poisoned");
            match *state {
                SessionState::Running => *state = SessionState::Stopping,
                _ => {
                    debug!("stop called on a session that is not running; nothing to do");
                    return Ok(());
                }
            }
        }

        // Closing the stream joins the capture thread; no further buffers
        // arrive after this returns.
        let capture = self.capture.lock().expect("capture lock poisoned").take();
        if let Some(capture) = capture {
            capture.close();
        }

        let saver = self.saver.lock().expect("saver lock poisoned").take();
        if let Some(saver) = &saver {
            if let Some(chunk) = self.accumulator.drain() {
                saver.dispatch(chunk);
            }
            saver.drain(STOP_DRAIN_TIMEOUT).await;
        }

        let total_duration = saver.as_ref().map(|s| s.total_duration_sec()).unwrap_or(0.0);
        let chunk_count = self.accumulator.chunk_count();

        if let Some(journal) = &self.journal {
            journal.write_session_end(
                &self.session_id,
                &local_timestamp(),
                total_duration,
                chunk_count,
            )?;
        }

        *self.state.lock().expect("state lock poisoned") = SessionState::Stopped;
        info!(
            "Recording stopped. Session ID: {} | {} chunk(s), {:.1}s",
            self.session_id, chunk_count, total_duration
        );
        Ok(())
    }
}
