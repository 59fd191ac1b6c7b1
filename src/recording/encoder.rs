//! Chunk encoding
//!
//! Converts an accumulated buffer set into an on-disk audio file. WAV and
//! FLAC are written directly in-process; MP3 goes through an ordered list
//! of encoder strategies (in-process LAME when the `lame` feature is on,
//! then an ffmpeg subprocess via a temporary WAV) so the fallback policy
//! stays explicit and testable.

use std::fmt;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::RecorderError;

/// MP3 encoding only supports this sample rate.
pub const MP3_REQUIRED_SAMPLE_RATE: u32 = 16_000;
/// MP3 encoding only supports mono input.
pub const MP3_REQUIRED_CHANNELS: u16 = 1;

const MP3_BITRATE_KBPS: u32 = 192;

/// Target on-disk audio format for saved chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkFormat {
    /// Uncompressed PCM container, written directly with hound.
    Wav,
    /// Lossless compression, written in-process.
    Flac,
    /// Lossy compression with fixed rate/channel requirements.
    Mp3,
}

impl ChunkFormat {
    /// File extension used in chunk paths.
    pub fn extension(&self) -> &'static str {
        match self {
            ChunkFormat::Wav => "wav",
            ChunkFormat::Flac => "flac",
            ChunkFormat::Mp3 => "mp3",
        }
    }
}

impl fmt::Display for ChunkFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ChunkFormat {
    type Err = RecorderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wav" => Ok(ChunkFormat::Wav),
            "flac" => Ok(ChunkFormat::Flac),
            "mp3" => Ok(ChunkFormat::Mp3),
            other => Err(RecorderError::Config(format!(
                "unsupported audio format: {other} (expected wav, flac, or mp3)"
            ))),
        }
    }
}

/// Validate format requirements against the configured stream parameters.
///
/// Called before any device is opened so an incompatible MP3 configuration
/// fails the session up front instead of per chunk.
pub fn validate_format(
    format: ChunkFormat,
    sample_rate: u32,
    channels: u16,
) -> Result<(), RecorderError> {
    if format == ChunkFormat::Mp3 {
        if sample_rate != MP3_REQUIRED_SAMPLE_RATE {
            return Err(RecorderError::Config(format!(
                "MP3 format requires {MP3_REQUIRED_SAMPLE_RATE} Hz sample rate, got {sample_rate} Hz"
            )));
        }
        if channels != MP3_REQUIRED_CHANNELS {
            return Err(RecorderError::Config(format!(
                "MP3 format requires {MP3_REQUIRED_CHANNELS} channel (mono), got {channels}"
            )));
        }
    }
    Ok(())
}

/// Encode interleaved i16 samples to `dest` in the requested format.
pub fn encode_chunk(
    samples: &[i16],
    sample_rate: u32,
    channels: u16,
    format: ChunkFormat,
    dest: &Path,
) -> Result<(), RecorderError> {
    match format {
        ChunkFormat::Wav => write_wav(samples, sample_rate, channels, dest),
        ChunkFormat::Flac => write_flac(samples, sample_rate, channels, dest),
        ChunkFormat::Mp3 => encode_with_strategies(
            &mp3_strategies(),
            samples,
            sample_rate,
            channels,
            dest,
        ),
    }
}

fn write_wav(
    samples: &[i16],
    sample_rate: u32,
    channels: u16,
    dest: &Path,
) -> Result<(), RecorderError> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(dest, spec)
        .map_err(|e| RecorderError::Encode(format!("failed to create {}: {e}", dest.display())))?;
    for &sample in samples {
        writer
            .write_sample(sample)
            .map_err(|e| RecorderError::Encode(format!("failed to write sample: {e}")))?;
    }
    writer
        .finalize()
        .map_err(|e| RecorderError::Encode(format!("failed to finalize WAV: {e}")))?;
    Ok(())
}

fn write_flac(
    samples: &[i16],
    sample_rate: u32,
    channels: u16,
    dest: &Path,
) -> Result<(), RecorderError> {
    use flacenc::component::BitRepr;
    use flacenc::error::Verify;

    let widened: Vec<i32> = samples.iter().map(|&s| s as i32).collect();

    let config = flacenc::config::Encoder::default()
        .into_verified()
        .map_err(|e| RecorderError::Encode(format!("invalid FLAC encoder config: {e:?}")))?;
    let source = flacenc::source::MemSource::from_samples(
        &widened,
        channels as usize,
        16,
        sample_rate as usize,
    );
    let stream = flacenc::encode_with_fixed_block_size(&config, source, config.block_size)
        .map_err(|e| RecorderError::Encode(format!("FLAC encoding failed: {e:?}")))?;

    let mut sink = flacenc::bitsink::ByteSink::new();
    stream
        .write(&mut sink)
        .map_err(|e| RecorderError::Encode(format!("FLAC serialization failed: {e:?}")))?;
    fs::write(dest, sink.as_slice())?;
    Ok(())
}

/// One way of producing an encoded file. Strategies are tried in order
/// until one succeeds.
pub trait EncoderStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn encode(
        &self,
        samples: &[i16],
        sample_rate: u32,
        channels: u16,
        dest: &Path,
    ) -> Result<(), RecorderError>;
}

/// Try each strategy in order; the first success wins.
pub fn encode_with_strategies(
    strategies: &[Box<dyn EncoderStrategy>],
    samples: &[i16],
    sample_rate: u32,
    channels: u16,
    dest: &Path,
) -> Result<(), RecorderError> {
    if strategies.is_empty() {
        return Err(RecorderError::Encode("no encoder available".into()));
    }

    let mut last_error = None;
    for strategy in strategies {
        match strategy.encode(samples, sample_rate, channels, dest) {
            Ok(()) => {
                debug!("Encoded {} via {}", dest.display(), strategy.name());
                return Ok(());
            }
            Err(e) => {
                warn!("Encoder {} failed, trying next: {e}", strategy.name());
                last_error = Some(e);
            }
        }
    }

    Err(RecorderError::Encode(format!(
        "no encoder available: all strategies failed (last: {})",
        last_error.expect("at least one strategy ran")
    )))
}

fn mp3_strategies() -> Vec<Box<dyn EncoderStrategy>> {
    let mut strategies: Vec<Box<dyn EncoderStrategy>> = Vec::new();
    #[cfg(feature = "lame")]
    strategies.push(Box::new(LameMp3));
    strategies.push(Box::new(FfmpegMp3));
    strategies
}

/// In-process MP3 encoding through LAME.
#[cfg(feature = "lame")]
struct LameMp3;

#[cfg(feature = "lame")]
impl EncoderStrategy for LameMp3 {
    fn name(&self) -> &'static str {
        "lame"
    }

    fn encode(
        &self,
        samples: &[i16],
        sample_rate: u32,
        _channels: u16,
        dest: &Path,
    ) -> Result<(), RecorderError> {
        use mp3lame_encoder::{Bitrate, Builder, FlushNoGap, MonoPcm, Quality};

        fn lame_err<E: std::fmt::Debug>(stage: &'static str) -> impl FnOnce(E) -> RecorderError {
            move |e| RecorderError::Encode(format!("LAME {stage}: {e:?}"))
        }

        let mut builder =
            Builder::new().ok_or_else(|| RecorderError::Encode("LAME init failed".into()))?;
        builder.set_num_channels(1).map_err(lame_err("channels"))?;
        builder
            .set_sample_rate(sample_rate)
            .map_err(lame_err("sample rate"))?;
        builder.set_brate(Bitrate::Kbps192).map_err(lame_err("bitrate"))?;
        builder.set_quality(Quality::Good).map_err(lame_err("quality"))?;
        let mut encoder = builder.build().map_err(lame_err("build"))?;

        let mut out: Vec<u8> = Vec::new();
        out.reserve(mp3lame_encoder::max_required_buffer_size(samples.len()));

        let written = encoder
            .encode(MonoPcm(samples), out.spare_capacity_mut())
            .map_err(lame_err("encode"))?;
        // SAFETY: encode() initialized `written` bytes of the spare capacity.
        unsafe { out.set_len(out.len() + written) };

        let flushed = encoder
            .flush::<FlushNoGap>(out.spare_capacity_mut())
            .map_err(lame_err("flush"))?;
        // SAFETY: flush() initialized `flushed` bytes of the spare capacity.
        unsafe { out.set_len(out.len() + flushed) };

        fs::write(dest, &out)?;
        Ok(())
    }
}

/// MP3 encoding by shelling out to ffmpeg through a temporary WAV. The
/// intermediate file is removed when the handle drops, success or not.
struct FfmpegMp3;

impl EncoderStrategy for FfmpegMp3 {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn encode(
        &self,
        samples: &[i16],
        sample_rate: u32,
        channels: u16,
        dest: &Path,
    ) -> Result<(), RecorderError> {
        let intermediate = tempfile::Builder::new()
            .prefix("micrec-")
            .suffix(".wav")
            .tempfile()
            .map_err(|e| RecorderError::Encode(format!("failed to create temp WAV: {e}")))?;

        write_wav(samples, sample_rate, channels, intermediate.path())?;

        let output = Command::new("ffmpeg")
            .arg("-i")
            .arg(intermediate.path())
            .args(["-codec:a", "libmp3lame"])
            .args(["-b:a", &format!("{MP3_BITRATE_KBPS}k")])
            .arg("-y")
            .arg(dest)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RecorderError::Encode(
                        "MP3 encoding requires the ffmpeg binary (or the `lame` feature)".into(),
                    )
                } else {
                    RecorderError::Encode(format!("failed to run ffmpeg: {e}"))
                }
            })?;

        if !output.status.success() {
            return Err(RecorderError::Encode(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedStrategy {
        name: &'static str,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl EncoderStrategy for FixedStrategy {
        fn name(&self) -> &'static str {
            self.name
        }

        fn encode(
            &self,
            _samples: &[i16],
            _sample_rate: u32,
            _channels: u16,
            dest: &Path,
        ) -> Result<(), RecorderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(RecorderError::Encode(format!("{} broke", self.name)))
            } else {
                std::fs::write(dest, self.name).unwrap();
                Ok(())
            }
        }
    }

    fn strategy(name: &'static str, fail: bool, calls: &Arc<AtomicUsize>) -> Box<dyn EncoderStrategy> {
        Box::new(FixedStrategy {
            name,
            fail,
            calls: Arc::clone(calls),
        })
    }

    #[test]
    fn first_successful_strategy_wins() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.mp3");

        let strategies = vec![
            strategy("primary", false, &calls),
            strategy("fallback", false, &calls),
        ];
        encode_with_strategies(&strategies, &[0i16; 16], 16_000, 1, &dest).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1, "fallback must not run");
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "primary");
    }

    #[test]
    fn failing_primary_falls_through_to_fallback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.mp3");

        let strategies = vec![
            strategy("primary", true, &calls),
            strategy("fallback", false, &calls),
        ];
        encode_with_strategies(&strategies, &[0i16; 16], 16_000, 1, &dest).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "fallback");
    }

    #[test]
    fn all_strategies_failing_reports_no_encoder() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.mp3");

        let strategies = vec![
            strategy("primary", true, &calls),
            strategy("fallback", true, &calls),
        ];
        let err = encode_with_strategies(&strategies, &[0i16; 16], 16_000, 1, &dest).unwrap_err();
        assert!(err.to_string().contains("no encoder available"));
    }

    #[test]
    fn empty_strategy_list_reports_no_encoder() {
        let dir = tempfile::tempdir().unwrap();
        let none: Vec<Box<dyn EncoderStrategy>> = Vec::new();
        let err = encode_with_strategies(&none, &[0i16; 16], 16_000, 1, &dir.path().join("o"))
            .unwrap_err();
        assert!(err.to_string().contains("no encoder available"));
    }

    #[test]
    fn mp3_validation_rejects_wrong_rate_and_channels() {
        assert!(validate_format(ChunkFormat::Mp3, 44_100, 1).is_err());
        assert!(validate_format(ChunkFormat::Mp3, 16_000, 2).is_err());
        assert!(validate_format(ChunkFormat::Mp3, 16_000, 1).is_ok());
        // Lossless formats carry no rate/channel requirement.
        assert!(validate_format(ChunkFormat::Wav, 44_100, 2).is_ok());
        assert!(validate_format(ChunkFormat::Flac, 48_000, 2).is_ok());
    }

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("FLAC".parse::<ChunkFormat>().unwrap(), ChunkFormat::Flac);
        assert_eq!("wav".parse::<ChunkFormat>().unwrap(), ChunkFormat::Wav);
        assert!("ogg".parse::<ChunkFormat>().is_err());
    }
}
