//! Background chunk saving
//!
//! One task is spawned per completed chunk: encode (blocking, on the
//! blocking pool), optionally upload, then append the chunk record to the
//! journal. Per-chunk failures are converted into log state at the task
//! boundary; a failed encode or upload never reaches the capture thread.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::accumulator::PendingChunk;
use super::encoder::{self, ChunkFormat};
use crate::journal::{local_timestamp, SessionJournal};
use crate::upload::Uploader;

/// Parameters shared by every chunk-save task in a session.
#[derive(Debug, Clone)]
pub struct SaverConfig {
    pub session_id: String,
    pub output_dir: PathBuf,
    pub format: ChunkFormat,
    /// Negotiated sample rate; used for the encode and the nominal duration.
    pub sample_rate: u32,
    pub channels: u16,
    pub conversation_id: Option<String>,
}

/// Spawns and tracks chunk-save tasks for one session.
pub struct ChunkSaver {
    config: SaverConfig,
    journal: Option<Arc<SessionJournal>>,
    uploader: Option<Arc<dyn Uploader>>,
    runtime: Handle,
    total_duration: Mutex<f64>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ChunkSaver {
    pub fn new(
        config: SaverConfig,
        journal: Option<Arc<SessionJournal>>,
        uploader: Option<Arc<dyn Uploader>>,
        runtime: Handle,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            journal,
            uploader,
            runtime,
            total_duration: Mutex::new(0.0),
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Hand a chunk to a new background save task. Safe to call from the
    /// capture callback: the spawn itself does no I/O.
    pub fn dispatch(self: &Arc<Self>, chunk: PendingChunk) {
        info!(
            "Saving chunk {} (session: {})",
            chunk.index, self.config.session_id
        );
        let started_at = local_timestamp();
        let task = self
            .runtime
            .spawn(Arc::clone(self).save_chunk(chunk, started_at));
        self.tasks.lock().expect("task list lock poisoned").push(task);
    }

    /// Await all in-flight save tasks, bounded by `timeout`. A task that
    /// exceeds the deadline is abandoned, not killed; if it eventually
    /// finishes it still writes its chunk record.
    pub async fn drain(&self, timeout: Duration) {
        let tasks: Vec<JoinHandle<()>> = {
            let mut guard = self.tasks.lock().expect("task list lock poisoned");
            guard.drain(..).collect()
        };

        let deadline = tokio::time::Instant::now() + timeout;
        for task in tasks {
            match tokio::time::timeout_at(deadline, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Chunk save task panicked: {e}"),
                Err(_) => {
                    warn!("Chunk save task did not finish within the stop deadline; abandoning")
                }
            }
        }
    }

    /// Sum of nominal durations of all successfully saved chunks. Read this
    /// only after [`ChunkSaver::drain`].
    pub fn total_duration_sec(&self) -> f64 {
        *self.total_duration.lock().expect("duration lock poisoned")
    }

    async fn save_chunk(self: Arc<Self>, chunk: PendingChunk, started_at: String) {
        let PendingChunk {
            index,
            buffers,
            frames,
        } = chunk;

        let file_path = self.config.output_dir.join(format!(
            "{}_{:02}.{}",
            self.config.session_id,
            index,
            self.config.format.extension()
        ));

        let samples: Vec<i16> = buffers.concat();
        let sample_rate = self.config.sample_rate;
        let channels = self.config.channels;
        let format = self.config.format;
        let encode_path = file_path.clone();

        let encoded = tokio::task::spawn_blocking(move || {
            encoder::encode_chunk(&samples, sample_rate, channels, format, &encode_path)
        })
        .await;

        match encoded {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                // The chunk file is absent but the session keeps recording.
                warn!("Skipping chunk {index}: {e}");
                return;
            }
            Err(e) => {
                error!("Chunk {index} encode task panicked: {e}");
                return;
            }
        }

        let duration_sec = frames as f64 / sample_rate as f64;
        {
            let mut total = self.total_duration.lock().expect("duration lock poisoned");
            *total += duration_sec;
        }

        let mut s3_object_key: Option<String> = None;
        let mut s3_uploaded = false;
        if let Some(uploader) = &self.uploader {
            match uploader
                .upload(
                    &file_path,
                    &self.config.session_id,
                    self.config.conversation_id.as_deref(),
                )
                .await
            {
                Ok(key) => {
                    info!("Uploaded to s3://{}/{key}", uploader.bucket());
                    s3_object_key = Some(key);
                    s3_uploaded = true;
                }
                Err(e) => warn!("Upload failed for {}: {e}", file_path.display()),
            }
        }

        if let Some(journal) = &self.journal {
            if let Err(e) = journal.write_chunk(
                &self.config.session_id,
                index,
                &file_path.to_string_lossy(),
                &started_at,
                duration_sec,
                s3_object_key.as_deref(),
                s3_uploaded,
            ) {
                warn!("Failed to journal chunk {index}: {e}");
            }
        }

        info!("Saved: {} ({frames} frames)", file_path.display());
    }
}
