//! Gain scaling and loudness metering
//!
//! Pure functions applied to each captured buffer before accumulation, plus
//! the shared level cell the capture callback writes and pollers read. All
//! of this is stateless or lock-free so it is safe to call from the
//! real-time capture callback.

use std::sync::atomic::{AtomicU32, Ordering};

/// Full-scale reference for 16-bit samples, matching the dB mapping below.
const FULL_SCALE: f32 = 32768.0;

/// Apply a gain factor to a buffer of 16-bit samples in place.
///
/// Samples are scaled in f32 and clamped to ±32767 to avoid wraparound
/// distortion. A factor of exactly 1.0 is an identity no-op.
pub fn apply_gain(samples: &mut [i16], factor: f32) {
    if factor == 1.0 {
        return;
    }
    for sample in samples.iter_mut() {
        let scaled = (*sample as f32 * factor).clamp(-32767.0, 32767.0);
        *sample = scaled as i16;
    }
}

/// Compute the loudness of a buffer on a 0–120 dB scale.
///
/// 0 corresponds to silence (or a non-finite/non-positive RMS); an RMS equal
/// to full-scale amplitude maps to 120.
pub fn db_level(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    let rms = (sum_sq / samples.len() as f64).sqrt() as f32;

    if !rms.is_finite() || rms <= 0.0 {
        return 0.0;
    }

    (20.0 * (rms / FULL_SCALE).log10() + 120.0).clamp(0.0, 120.0)
}

/// Render a textual bar for a 0–120 dB level.
pub fn draw_db_bar(db: f32, width: usize) -> String {
    let filled = ((db / 120.0) * width as f32) as usize;
    let filled = filled.min(width);
    format!(
        "[{}{}] {:.1} dB",
        "█".repeat(filled),
        "░".repeat(width - filled),
        db
    )
}

/// Last-writer-wins cell holding the most recent dB level.
///
/// The value is stored as f32 bits in a single word so the capture callback
/// can publish and pollers can read without taking a lock.
#[derive(Debug)]
pub struct LevelMeter {
    bits: AtomicU32,
}

impl LevelMeter {
    pub fn new() -> Self {
        Self {
            bits: AtomicU32::new(0f32.to_bits()),
        }
    }

    /// Publish the level for the most recently processed buffer.
    pub fn store(&self, db: f32) {
        self.bits.store(db.to_bits(), Ordering::Relaxed);
    }

    /// Read the most recently published level. Never blocks.
    pub fn load(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new()
    }
}
