//! Audio level metering.
//!
//! The audio callback feeds blocks of samples into a [`LevelMeter`], which
//! keeps a peak-decay smoothed RMS gain in a lock-free cell. The session reads
//! it through a [`MeterSampler`], which only converts gain to decibels.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::params::MeterConfig;

/// Live level reading in decibels
pub trait MeterSampler {
    /// Current level (dB). Always finite.
    fn read(&self) -> f32;
}

/// Smoothed RMS gain shared between the audio thread and the session
#[derive(Clone, Debug)]
pub struct LevelMeter {
    /// f32 bits of the smoothed linear gain
    level: Arc<AtomicU32>,
    smoothing: f32,
}

impl LevelMeter {
    pub fn new(smoothing: f32) -> Self {
        Self {
            level: Arc::new(AtomicU32::new(0.0_f32.to_bits())),
            smoothing,
        }
    }

    /// Analyse one block of mono samples (audio thread)
    ///
    /// The stored level jumps up to a louder block immediately and decays by
    /// `smoothing` per block otherwise.
    pub fn feed(&self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }
        let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
        let rms = (sum_sq / samples.len() as f32).sqrt();
        let previous = self.gain();
        let next = rms.max(previous * self.smoothing);
        self.level.store(next.to_bits(), Ordering::Relaxed);
    }

    /// Drop the level back to silence (transport stopped)
    pub fn reset(&self) {
        self.level.store(0.0_f32.to_bits(), Ordering::Relaxed);
    }

    /// Current smoothed linear gain
    pub fn gain(&self) -> f32 {
        f32::from_bits(self.level.load(Ordering::Relaxed))
    }
}

/// Convert linear gain to decibels (`-inf` for zero)
pub fn gain_to_db(gain: f32) -> f32 {
    20.0 * gain.log10()
}

/// Reads a [`LevelMeter`] in decibels, floored at the silence level
#[derive(Clone, Debug)]
pub struct DecibelSampler {
    meter: LevelMeter,
    silence_floor_db: f32,
}

impl DecibelSampler {
    pub fn new(meter: LevelMeter, config: &MeterConfig) -> Self {
        Self {
            meter,
            silence_floor_db: config.silence_floor_db,
        }
    }
}

impl MeterSampler for DecibelSampler {
    fn read(&self) -> f32 {
        let db = gain_to_db(self.meter.gain());
        if db.is_nan() {
            self.silence_floor_db
        } else {
            db.max(self.silence_floor_db)
        }
    }
}
