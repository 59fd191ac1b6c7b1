pub mod audio;
pub mod config;
pub mod errors;
pub mod journal;
pub mod recording;
pub mod session;
pub mod upload;

pub use audio::{
    apply_gain, db_level, draw_db_bar, list_input_devices, AudioDeviceInfo, CaptureStream,
    LevelMeter, StreamInfo,
};
pub use config::Config;
pub use errors::RecorderError;
pub use journal::SessionJournal;
pub use recording::{ChunkFormat, ChunkSaver, FrameAccumulator, PendingChunk, SaverConfig};
pub use session::{RecordingSession, SessionConfig, STOP_DRAIN_TIMEOUT};
pub use upload::{build_object_key, S3Config, S3Uploader, Uploader};
