use thiserror::Error;

/// Error type for the recording pipeline.
///
/// Only `Config` and `Device` errors halt a session; `Encode` and `Upload`
/// errors are caught at the chunk-save task boundary and turned into log
/// state so capture keeps running.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// Invalid configuration, detected before any device is opened.
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device open/read failure. Fatal to the session.
    #[error("audio device error: {0}")]
    Device(String),

    /// Chunk encoding failure. Local to one chunk.
    #[error("encode error: {0}")]
    Encode(String),

    /// Object storage upload failure. Local to one chunk.
    #[error("upload error: {0}")]
    Upload(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
