//! Audio playback and metering configuration.

/// Level meter configuration
#[derive(Debug, Clone)]
pub struct MeterConfig {
    /// Peak-decay smoothing per analysis block (0 = none, <1 required)
    /// Reference value: 0.8
    pub smoothing: f32,

    /// Lowest level the meter reports (dB), returned for silence
    pub silence_floor_db: f32,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            smoothing: 0.8,
            silence_floor_db: -100.0,
        }
    }
}

impl MeterConfig {
    /// Validate configuration (smoothing must lie in [0, 1))
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(format!(
                "Meter smoothing must be in [0, 1), got {}",
                self.smoothing
            ));
        }
        if !self.silence_floor_db.is_finite() {
            return Err("Silence floor must be finite".to_string());
        }
        Ok(())
    }
}

/// Background track playback
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Track path relative to the asset root (WAV)
    pub track_path: String,

    /// Restart from the beginning when the track ends
    pub looped: bool,

    /// Start the output stream as soon as the track is decoded
    pub autostart: bool,

    /// Skip audio entirely (meter stays at the silence floor)
    pub muted: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            track_path: "sounds/warrpy_beat.wav".to_string(),
            looped: true,
            autostart: true,
            muted: false,
        }
    }
}
