//! JSONL session journal
//!
//! Appends one JSON object per line to a log file alongside the audio
//! chunks: a session-start record, one record per saved chunk, and a
//! session-end record. Records are never mutated or deleted once written.
//! A single mutex serializes writes across the orchestrator and all
//! concurrent chunk-save tasks; because those tasks finish in arbitrary
//! order, chunk records are sequenced by `chunk_index`, not file position.

use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::errors::RecorderError;

/// Default journal filename, placed in the output directory.
pub const DEFAULT_JOURNAL_FILE: &str = "recordings.jsonl";

/// Second-precision local timestamp in ISO-8601 form.
pub fn local_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[derive(Debug, Serialize)]
struct SessionStartRecord<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    event: &'static str,
    session_id: &'a str,
    conversation_id: Option<&'a str>,
    device_id: Option<&'a str>,
    device_name: &'a str,
    sample_rate: u32,
    channels: u16,
    format: &'a str,
    started_at: &'a str,
}

#[derive(Debug, Serialize)]
struct ChunkRecord<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    session_id: &'a str,
    chunk_index: u32,
    file_path: &'a str,
    started_at: &'a str,
    duration_sec: f64,
    s3_object_key: Option<&'a str>,
    s3_uploaded: bool,
}

#[derive(Debug, Serialize)]
struct SessionEndRecord<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    event: &'static str,
    session_id: &'a str,
    ended_at: &'a str,
    total_duration_sec: f64,
    chunk_count: u32,
}

/// Append-only JSONL writer for session and chunk lifecycle records.
pub struct SessionJournal {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SessionJournal {
    /// Create a journal writing to `path`. Parent directories are created
    /// up front; the file itself is created on first append.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, RecorderError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[allow(clippy::too_many_arguments)]
    pub fn write_session_start(
        &self,
        session_id: &str,
        conversation_id: Option<&str>,
        device_id: Option<&str>,
        device_name: &str,
        sample_rate: u32,
        channels: u16,
        format: &str,
        started_at: &str,
    ) -> Result<(), RecorderError> {
        self.append(&SessionStartRecord {
            kind: "session",
            event: "start",
            session_id,
            conversation_id,
            device_id,
            device_name,
            sample_rate,
            channels,
            format,
            started_at,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn write_chunk(
        &self,
        session_id: &str,
        chunk_index: u32,
        file_path: &str,
        started_at: &str,
        duration_sec: f64,
        s3_object_key: Option<&str>,
        s3_uploaded: bool,
    ) -> Result<(), RecorderError> {
        self.append(&ChunkRecord {
            kind: "chunk",
            session_id,
            chunk_index,
            file_path,
            started_at,
            duration_sec: round3(duration_sec),
            s3_object_key,
            s3_uploaded,
        })
    }

    pub fn write_session_end(
        &self,
        session_id: &str,
        ended_at: &str,
        total_duration_sec: f64,
        chunk_count: u32,
    ) -> Result<(), RecorderError> {
        self.append(&SessionEndRecord {
            kind: "session",
            event: "end",
            session_id,
            ended_at,
            total_duration_sec: round3(total_duration_sec),
            chunk_count,
        })
    }

    fn append<T: Serialize>(&self, record: &T) -> Result<(), RecorderError> {
        let line = serde_json::to_string(record)
            .map_err(|e| RecorderError::Io(std::io::Error::other(e)))?;

        let _guard = self.lock.lock().expect("journal lock poisoned");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
