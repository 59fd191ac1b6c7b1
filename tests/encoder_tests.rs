// Tests for chunk encoding
//
// WAV output is read back with hound; FLAC output is checked for a valid
// stream header. MP3 strategy-chain mechanics are covered by unit tests in
// the encoder module (they do not need codecs linked).

use anyhow::Result;
use micrec::recording::{encode_chunk, validate_format, ChunkFormat};
use micrec::RecorderError;
use tempfile::TempDir;

#[test]
fn wav_chunk_round_trips() -> Result<()> {
    let dir = TempDir::new()?;
    let dest = dir.path().join("chunk.wav");

    let samples: Vec<i16> = (0..16_000).map(|i| (i % 2000) as i16).collect();
    encode_chunk(&samples, 16_000, 1, ChunkFormat::Wav, &dest)?;

    let reader = hound::WavReader::open(&dest)?;
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 16_000);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);

    let decoded: Vec<i16> = reader.into_samples::<i16>().collect::<Result<_, _>>()?;
    assert_eq!(decoded, samples);
    Ok(())
}

#[test]
fn stereo_wav_preserves_channel_count() -> Result<()> {
    let dir = TempDir::new()?;
    let dest = dir.path().join("stereo.wav");

    encode_chunk(&vec![500i16; 3200], 16_000, 2, ChunkFormat::Wav, &dest)?;

    let reader = hound::WavReader::open(&dest)?;
    assert_eq!(reader.spec().channels, 2);
    assert_eq!(reader.len(), 3200);
    Ok(())
}

#[test]
fn flac_chunk_has_valid_stream_header() -> Result<()> {
    let dir = TempDir::new()?;
    let dest = dir.path().join("chunk.flac");

    let samples: Vec<i16> = (0..16_000)
        .map(|i| ((i as f32 * 0.05).sin() * 8000.0) as i16)
        .collect();
    encode_chunk(&samples, 16_000, 1, ChunkFormat::Flac, &dest)?;

    let bytes = std::fs::read(&dest)?;
    assert!(bytes.len() > 4, "FLAC file should not be empty");
    assert_eq!(&bytes[..4], b"fLaC");
    Ok(())
}

#[test]
fn encode_failure_reports_encode_error() {
    // A destination inside a nonexistent directory cannot be created.
    let err = encode_chunk(
        &[0i16; 100],
        16_000,
        1,
        ChunkFormat::Wav,
        std::path::Path::new("/nonexistent-dir/chunk.wav"),
    )
    .unwrap_err();
    assert!(matches!(err, RecorderError::Encode(_)));
}

#[test]
fn mp3_requirements_are_validated_up_front() {
    let err = validate_format(ChunkFormat::Mp3, 44_100, 1).unwrap_err();
    assert!(matches!(err, RecorderError::Config(_)));
    assert!(err.to_string().contains("16000"));

    let err = validate_format(ChunkFormat::Mp3, 16_000, 2).unwrap_err();
    assert!(matches!(err, RecorderError::Config(_)));
    assert!(err.to_string().contains("mono"));
}
