// Tests for configuration loading

use anyhow::Result;
use micrec::recording::ChunkFormat;
use micrec::Config;
use tempfile::TempDir;

#[test]
fn defaults_apply_without_a_config_file() -> Result<()> {
    let cfg = Config::load("/nonexistent/micrec")?;

    assert_eq!(cfg.recording.sample_rate, 16_000);
    assert_eq!(cfg.recording.channels, 1);
    assert_eq!(cfg.recording.chunk_frames, 1_920_000);
    assert_eq!(cfg.recording.format, ChunkFormat::Flac);
    assert_eq!(cfg.recording.gain, 1.0);
    assert_eq!(cfg.recording.timestamp_format, "{ts}");
    assert!(cfg.s3.is_none());
    assert_eq!(cfg.log.file, "recordings.jsonl");
    Ok(())
}

#[test]
fn yaml_file_overrides_sections() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("micrec.yml");
    std::fs::write(
        &path,
        r#"
recording:
  sample_rate: 48000
  chunk_frames: 480000
  format: wav
  output_dir: captures
  timestamp_format: "{ts}_dev{device_id}"
s3:
  bucket: recordings
  endpoint_url: "http://localhost:9000"
  access_key: minio
  secret_key: miniosecret
  prefix: conversations
log:
  file: session-log.jsonl
"#,
    )?;

    let basename = dir.path().join("micrec");
    let cfg = Config::load(basename.to_str().unwrap())?;

    assert_eq!(cfg.recording.sample_rate, 48_000);
    assert_eq!(cfg.recording.chunk_frames, 480_000);
    assert_eq!(cfg.recording.format, ChunkFormat::Wav);
    assert_eq!(cfg.recording.output_dir.to_str(), Some("captures"));
    // Unspecified keys keep their defaults.
    assert_eq!(cfg.recording.channels, 1);
    assert_eq!(cfg.recording.gain, 1.0);

    let s3 = cfg.s3.as_ref().expect("s3 section present");
    assert_eq!(s3.bucket, "recordings");
    assert_eq!(s3.prefix, "conversations");
    assert!(s3.path_style, "path-style addressing defaults on");
    assert!(s3.region.is_none());

    assert_eq!(
        cfg.journal_path().to_str(),
        Some("captures/session-log.jsonl")
    );
    Ok(())
}

#[test]
fn session_config_is_seeded_from_the_recording_section() -> Result<()> {
    let cfg = Config::load("/nonexistent/micrec")?;
    let session = cfg.session_config();

    assert_eq!(session.sample_rate, cfg.recording.sample_rate);
    assert_eq!(session.chunk_frames, cfg.recording.chunk_frames);
    assert_eq!(session.format, cfg.recording.format);
    assert!(session.device.is_none(), "device selection is per-run");
    assert!(session.conversation_id.is_none());
    Ok(())
}
