//! Recording session management
//!
//! This module provides the `RecordingSession` abstraction that manages:
//! - Microphone capture and gain/level processing
//! - Chunk accumulation, flushing, and background saving
//! - Optional object-storage upload of saved chunks
//! - The JSONL session journal and lifecycle state

mod config;
mod recorder;

pub use config::SessionConfig;
pub use recorder::{RecordingSession, STOP_DRAIN_TIMEOUT};
