//! Best-effort chunk upload to S3-compatible object storage
//!
//! The uploader is a capability: sessions hold an `Option<Arc<dyn Uploader>>`
//! and skip the upload step entirely when it is absent. Upload failures are
//! reported to the caller, logged, and recorded as `s3_uploaded: false`;
//! they never fail the chunk save.

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

use crate::errors::RecorderError;

/// Join non-empty, slash-normalized pieces of one key segment.
fn normalize_segment(value: &str) -> String {
    value
        .replace('\\', "/")
        .split('/')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Build an object key as `[prefix/][conversation_id/]session_id/filename`.
///
/// Only the basename of `filename` is used; empty segments are dropped.
pub fn build_object_key(
    filename: &str,
    session_id: &str,
    conversation_id: Option<&str>,
    prefix: &str,
) -> String {
    let mut parts = Vec::new();

    let normalized_prefix = normalize_segment(prefix);
    if !normalized_prefix.is_empty() {
        parts.push(normalized_prefix);
    }

    if let Some(conversation) = conversation_id {
        let normalized = normalize_segment(conversation);
        if !normalized.is_empty() {
            parts.push(normalized);
        }
    }

    parts.push(normalize_segment(session_id));

    let basename = Path::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());
    parts.push(basename);

    parts.join("/")
}

/// Destination contract consumed by chunk-save tasks.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Configured bucket name, for logging and status reporting.
    fn bucket(&self) -> &str;

    /// Upload a local file; returns the object key it was stored under.
    async fn upload(
        &self,
        local_path: &Path,
        session_id: &str,
        conversation_id: Option<&str>,
    ) -> Result<String, RecorderError>;

    /// Lightweight existence probe against the configured bucket. Returns
    /// a boolean instead of an error so status reporting never fails.
    async fn check_reachable(&self) -> bool;
}

/// Configuration for S3-compatible storage (the `s3:` config section).
#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    pub endpoint_url: String,
    pub access_key: String,
    pub secret_key: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "default_path_style")]
    pub path_style: bool,
}

fn default_path_style() -> bool {
    true
}

/// Uploader backed by an S3-compatible service.
pub struct S3Uploader {
    client: aws_sdk_s3::Client,
    config: S3Config,
}

impl S3Uploader {
    pub fn new(config: S3Config) -> Result<Self, RecorderError> {
        for (field, value) in [
            ("bucket", &config.bucket),
            ("endpoint_url", &config.endpoint_url),
            ("access_key", &config.access_key),
            ("secret_key", &config.secret_key),
        ] {
            if value.is_empty() {
                return Err(RecorderError::Config(format!(
                    "missing required S3 configuration field: {field}"
                )));
            }
        }

        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "micrec",
        );
        let region = config
            .region
            .clone()
            .unwrap_or_else(|| "us-east-1".to_string());

        let sdk_config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region))
            .endpoint_url(&config.endpoint_url)
            .credentials_provider(credentials)
            .force_path_style(config.path_style)
            .build();

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(sdk_config),
            config,
        })
    }
}

#[async_trait]
impl Uploader for S3Uploader {
    fn bucket(&self) -> &str {
        &self.config.bucket
    }

    async fn upload(
        &self,
        local_path: &Path,
        session_id: &str,
        conversation_id: Option<&str>,
    ) -> Result<String, RecorderError> {
        let object_key = build_object_key(
            &local_path.to_string_lossy(),
            session_id,
            conversation_id,
            &self.config.prefix,
        );

        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| RecorderError::Upload(format!("failed to read {}: {e}", local_path.display())))?;

        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&object_key)
            .body(body)
            .send()
            .await
            .map_err(|e| RecorderError::Upload(format!("put_object failed: {e}")))?;

        debug!("Uploaded s3://{}/{object_key}", self.config.bucket);
        Ok(object_key)
    }

    async fn check_reachable(&self) -> bool {
        self.client
            .head_bucket()
            .bucket(&self.config.bucket)
            .send()
            .await
            .is_ok()
    }
}
