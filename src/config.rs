//! Application configuration
//!
//! Merges defaults with an optional YAML file (`micrec.yml` by default).
//! The `recording:` section covers the capture/chunking parameters, `s3:`
//! configures the optional uploader, and `log:` overrides the journal
//! filename.

use serde::Deserialize;
use std::path::PathBuf;

use crate::errors::RecorderError;
use crate::journal::DEFAULT_JOURNAL_FILE;
use crate::recording::ChunkFormat;
use crate::session::SessionConfig;
use crate::upload::S3Config;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub recording: RecordingConfig,
    #[serde(default)]
    pub s3: Option<S3Config>,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub chunk_frames: usize,
    pub format: ChunkFormat,
    pub output_dir: PathBuf,
    pub gain: f32,
    pub timestamp_format: String,
    pub datetime_format: String,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        let defaults = SessionConfig::default();
        Self {
            sample_rate: defaults.sample_rate,
            channels: defaults.channels,
            chunk_frames: defaults.chunk_frames,
            format: defaults.format,
            output_dir: defaults.output_dir,
            gain: defaults.gain,
            timestamp_format: defaults.timestamp_format,
            datetime_format: defaults.datetime_format,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Journal filename, placed inside the output directory
    pub file: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: DEFAULT_JOURNAL_FILE.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path` (extension inferred). A missing file
    /// yields the defaults.
    pub fn load(path: &str) -> Result<Self, RecorderError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .build()
            .map_err(|e| RecorderError::Config(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| RecorderError::Config(e.to_string()))
    }

    /// Journal path: the configured log filename inside the output dir.
    pub fn journal_path(&self) -> PathBuf {
        self.recording.output_dir.join(&self.log.file)
    }

    /// Session configuration seeded from the `recording:` section. Device
    /// and conversation selectors are per-run and stay `None` here.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            sample_rate: self.recording.sample_rate,
            channels: self.recording.channels,
            chunk_frames: self.recording.chunk_frames,
            output_dir: self.recording.output_dir.clone(),
            format: self.recording.format,
            gain: self.recording.gain,
            device: None,
            conversation_id: None,
            timestamp_format: self.recording.timestamp_format.clone(),
            datetime_format: self.recording.datetime_format.clone(),
        }
    }
}
