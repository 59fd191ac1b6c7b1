use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::recording::ChunkFormat;

/// Configuration for a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Requested sample rate in Hz. The device's native rate wins and
    /// becomes authoritative once capture starts.
    pub sample_rate: u32,

    /// Number of input channels (1 = mono, 2 = stereo)
    pub channels: u16,

    /// Frames accumulated before a chunk is flushed to disk
    pub chunk_frames: usize,

    /// Directory chunk files and the journal are written to
    pub output_dir: PathBuf,

    /// On-disk format for saved chunks
    pub format: ChunkFormat,

    /// Input gain factor (1.0 = no change, 2.0 = +6 dB)
    pub gain: f32,

    /// Input device selector (name or enumeration index); `None` = default
    pub device: Option<String>,

    /// Optional conversation label used to group uploads
    pub conversation_id: Option<String>,

    /// Template for the session id. Placeholders: `{ts}` (datetime string),
    /// `{device_id}` (device selector, or `default`).
    pub timestamp_format: String,

    /// strftime pattern applied to the `{ts}` placeholder
    pub datetime_format: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
            chunk_frames: 1_920_000, // 120 seconds at 16 kHz
            output_dir: PathBuf::from("audio"),
            format: ChunkFormat::Flac,
            gain: 1.0,
            device: None,
            conversation_id: None,
            timestamp_format: "{ts}".to_string(),
            datetime_format: "%y%m%d%H%M%S".to_string(),
        }
    }
}

impl SessionConfig {
    /// Build the session id from the configured templates.
    ///
    /// Evaluated once at session construction; chunk filenames reuse the
    /// result for the whole session.
    pub fn build_session_id(&self, now: DateTime<Local>) -> String {
        let ts = now.format(&self.datetime_format).to_string();
        let device = self.device.as_deref().unwrap_or("default");
        self.timestamp_format
            .replace("{ts}", &ts)
            .replace("{device_id}", device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2023, 10, 15, 14, 30, 22).unwrap()
    }

    #[test]
    fn default_template_is_datetime_only() {
        let config = SessionConfig::default();
        assert_eq!(config.build_session_id(fixed_now()), "231015143022");
    }

    #[test]
    fn device_placeholder_uses_selector_or_default() {
        let mut config = SessionConfig {
            timestamp_format: "{ts}_dev{device_id}".to_string(),
            ..SessionConfig::default()
        };
        assert_eq!(config.build_session_id(fixed_now()), "231015143022_devdefault");

        config.device = Some("3".to_string());
        assert_eq!(config.build_session_id(fixed_now()), "231015143022_dev3");
    }

    #[test]
    fn datetime_format_shapes_the_ts_placeholder() {
        let config = SessionConfig {
            timestamp_format: "{ts}_dev{device_id}".to_string(),
            datetime_format: "%Y-%m-%dT%H%M%S".to_string(),
            device: Some("3".to_string()),
            ..SessionConfig::default()
        };
        assert_eq!(config.build_session_id(fixed_now()), "2023-10-15T143022_dev3");
    }
}
