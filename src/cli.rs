//! Command-line argument parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::params::{MeterConfig, SchedulerConfig, SessionConfig};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "beatstage")]
#[command(about = "Audio-reactive 3D stage: dancing robot, flapping flamingos", long_about = None)]
pub struct Args {
    /// Directory holding models/ and sounds/
    #[arg(long, value_name = "DIR", default_value = "assets")]
    pub assets: PathBuf,

    /// Soundtrack WAV, relative to the asset directory
    #[arg(long, value_name = "PATH")]
    pub audio: Option<String>,

    /// Logic update rate (Hz)
    #[arg(long, value_name = "HZ", default_value = "25")]
    pub fixed_step_hz: f64,

    /// Meter smoothing factor per audio block, in [0, 1)
    #[arg(long, value_name = "FACTOR", default_value = "0.8")]
    pub smoothing: f32,

    /// Window width (pixels)
    #[arg(long, value_name = "PIXELS", default_value = "1280")]
    pub width: u32,

    /// Window height (pixels)
    #[arg(long, value_name = "PIXELS", default_value = "720")]
    pub height: u32,

    /// Start immediately instead of waiting for a click or Enter/Space
    #[arg(long)]
    pub autostart: bool,

    /// Run without audio output (the meter stays silent)
    #[arg(long)]
    pub mute: bool,

    /// Run without a window for this many seconds, then print a summary
    #[arg(long, value_name = "SECONDS")]
    pub headless: Option<f32>,
}

impl Args {
    /// Apply the overrides to the default session configuration
    pub fn session_config(&self) -> Result<SessionConfig, String> {
        let mut config = SessionConfig {
            asset_root: self.assets.clone(),
            scheduler: SchedulerConfig::from_rate_hz(self.fixed_step_hz)?,
            meter: MeterConfig {
                smoothing: self.smoothing,
                ..MeterConfig::default()
            },
            ..SessionConfig::default()
        };
        config
            .meter
            .validate()
            .map_err(|e| format!("Invalid meter config: {}", e))?;

        if let Some(track) = &self.audio {
            config.audio.track_path = track.clone();
        }
        config.audio.muted = self.mute;

        if self.width == 0 || self.height == 0 {
            return Err(format!(
                "Window size must be non-zero, got {}x{}",
                self.width, self.height
            ));
        }
        config.render.window_width = self.width;
        config.render.window_height = self.height;

        self.headless_duration()?;

        Ok(config)
    }

    /// `--headless` as a wall-clock duration
    pub fn headless_duration(&self) -> Result<Option<Duration>, String> {
        self.headless
            .map(|seconds| {
                Duration::try_from_secs_f32(seconds).map_err(|e| {
                    format!("Invalid headless duration {}: {}", seconds, e)
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_session_defaults() {
        let args = Args::parse_from(["beatstage"]);
        let config = args.session_config().unwrap();
        assert_eq!(config.asset_root, PathBuf::from("assets"));
        assert_eq!(config.scheduler.fixed_step(), std::time::Duration::from_millis(40));
        assert_eq!(config.meter.smoothing, 0.8);
        assert_eq!(config.audio.track_path, "sounds/warrpy_beat.wav");
        assert!(!config.audio.muted);
        assert!(args.headless.is_none());
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from([
            "beatstage",
            "--assets",
            "/srv/stage",
            "--audio",
            "sounds/other.wav",
            "--fixed-step-hz",
            "50",
            "--mute",
            "--width",
            "640",
            "--height",
            "480",
            "--headless",
            "2.5",
        ]);
        let config = args.session_config().unwrap();
        assert_eq!(config.resolve("x"), PathBuf::from("/srv/stage/x"));
        assert_eq!(config.audio.track_path, "sounds/other.wav");
        assert_eq!(config.scheduler.fixed_step(), std::time::Duration::from_millis(20));
        assert!(config.audio.muted);
        assert_eq!(config.render.aspect_ratio(), 640.0 / 480.0);
        assert_eq!(args.headless, Some(2.5));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let zero_rate = Args::parse_from(["beatstage", "--fixed-step-hz", "0"]);
        assert!(zero_rate.session_config().is_err());

        let bad_smoothing = Args::parse_from(["beatstage", "--smoothing", "1.5"]);
        assert!(bad_smoothing.session_config().is_err());

        let zero_width = Args::parse_from(["beatstage", "--width", "0"]);
        assert!(zero_width.session_config().is_err());
    }

    #[test]
    fn test_headless_duration_out_of_range() {
        let huge = Args::parse_from(["beatstage", "--headless", "1e20"]);
        assert!(huge.session_config().is_err());
        assert!(huge.headless_duration().is_err());

        let negative = Args::parse_from(["beatstage", "--headless=-1"]);
        assert!(negative.session_config().is_err());

        let short = Args::parse_from(["beatstage", "--headless", "0.5"]);
        assert_eq!(
            short.headless_duration().unwrap(),
            Some(Duration::from_millis(500))
        );
    }
}
