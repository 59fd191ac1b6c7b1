// Tests for the JSONL session journal

use anyhow::Result;
use micrec::SessionJournal;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;

fn read_records(path: &std::path::Path) -> Result<Vec<Value>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line is one JSON object"))
        .collect())
}

#[test]
fn lifecycle_records_have_expected_shapes() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("recordings.jsonl");
    let journal = SessionJournal::new(&path)?;

    journal.write_session_start(
        "260223143022",
        Some("mtg-01"),
        Some("3"),
        "USB PnP Audio Device",
        16_000,
        1,
        "flac",
        "2026-02-23T14:30:22",
    )?;
    journal.write_chunk(
        "260223143022",
        1,
        "audio/260223143022_01.flac",
        "2026-02-23T14:30:22",
        120.00042,
        Some("conversations/mtg-01/260223143022/260223143022_01.flac"),
        true,
    )?;
    journal.write_session_end("260223143022", "2026-02-23T14:32:22", 120.00042, 1)?;

    let records = read_records(&path)?;
    assert_eq!(records.len(), 3);

    let start = &records[0];
    assert_eq!(start["type"], "session");
    assert_eq!(start["event"], "start");
    assert_eq!(start["session_id"], "260223143022");
    assert_eq!(start["conversation_id"], "mtg-01");
    assert_eq!(start["device_id"], "3");
    assert_eq!(start["device_name"], "USB PnP Audio Device");
    assert_eq!(start["sample_rate"], 16_000);
    assert_eq!(start["channels"], 1);
    assert_eq!(start["format"], "flac");

    let chunk = &records[1];
    assert_eq!(chunk["type"], "chunk");
    assert_eq!(chunk["chunk_index"], 1);
    assert_eq!(chunk["file_path"], "audio/260223143022_01.flac");
    assert_eq!(chunk["duration_sec"], 120.0, "durations round to 3 decimals");
    assert_eq!(chunk["s3_uploaded"], true);

    let end = &records[2];
    assert_eq!(end["type"], "session");
    assert_eq!(end["event"], "end");
    assert_eq!(end["total_duration_sec"], 120.0);
    assert_eq!(end["chunk_count"], 1);

    Ok(())
}

#[test]
fn absent_optionals_serialize_as_null() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("recordings.jsonl");
    let journal = SessionJournal::new(&path)?;

    journal.write_session_start("S", None, None, "Mic", 48_000, 2, "wav", "t")?;
    journal.write_chunk("S", 1, "audio/S_01.wav", "t", 1.0, None, false)?;

    let records = read_records(&path)?;
    assert!(records[0]["conversation_id"].is_null());
    assert!(records[0]["device_id"].is_null());
    assert!(records[1]["s3_object_key"].is_null());
    assert_eq!(records[1]["s3_uploaded"], false);
    Ok(())
}

#[test]
fn parent_directories_are_created() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("nested/logs/recordings.jsonl");
    let journal = SessionJournal::new(&path)?;
    journal.write_session_end("S", "t", 0.0, 0)?;
    assert!(path.exists());
    Ok(())
}

#[test]
fn concurrent_appends_stay_line_separated() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("recordings.jsonl");
    let journal = Arc::new(SessionJournal::new(&path)?);

    let handles: Vec<_> = (1..=8u32)
        .map(|index| {
            let journal = Arc::clone(&journal);
            std::thread::spawn(move || {
                for _ in 0..25 {
                    journal
                        .write_chunk("S", index, "audio/S.wav", "t", 1.0, None, false)
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let records = read_records(&path)?;
    assert_eq!(records.len(), 200);
    assert!(records.iter().all(|r| r["type"] == "chunk"));
    Ok(())
}
