//! Scheduler cadence, reactive mapping and the asset manifest.

use std::time::Duration;

/// Fixed-step scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Minimum interval between logic updates (seconds)
    /// Reference value: 1/25 s
    pub fixed_step_s: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fixed_step_s: 1.0 / 25.0,
        }
    }
}

impl SchedulerConfig {
    /// Build from an update rate in Hz
    pub fn from_rate_hz(rate_hz: f64) -> Result<Self, String> {
        if !(rate_hz.is_finite() && rate_hz > 0.0) {
            return Err(format!("Update rate must be a positive number, got {}", rate_hz));
        }
        Ok(Self {
            fixed_step_s: 1.0 / rate_hz,
        })
    }

    pub fn fixed_step(&self) -> Duration {
        Duration::from_secs_f64(self.fixed_step_s)
    }
}

/// World axis a scalar is written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Axis {
    X,
    Y,
    /// Depth axis (towards the default camera)
    #[default]
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Mapping from meter level to the reactive object's position
#[derive(Debug, Clone)]
pub struct ReactiveMapping {
    /// Meter level mapped to `output_min` (dB)
    pub input_min_db: f32,

    /// Meter level mapped to `output_max` (dB)
    pub input_max_db: f32,

    /// Position at `input_min_db` (world units)
    pub output_min: f32,

    /// Position at `input_max_db` (world units)
    pub output_max: f32,

    /// Position component that receives the mapped value
    pub axis: Axis,
}

impl Default for ReactiveMapping {
    fn default() -> Self {
        Self {
            input_min_db: -60.0,
            input_max_db: -12.0,
            output_min: 0.0,
            output_max: 4.0,
            axis: Axis::Z,
        }
    }
}

impl ReactiveMapping {
    /// Apply the mapping to a meter reading (unclamped)
    pub fn apply(&self, level_db: f32) -> f32 {
        crate::mapping::map_linear(
            level_db,
            self.input_min_db,
            self.input_max_db,
            self.output_min,
            self.output_max,
        )
    }
}

/// What an asset does once it is in the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetRole {
    /// Plays its first animation clip on a loop
    Animated,
    /// Static model that becomes the meter-driven object
    Reactive,
}

/// One model placement in the scene
#[derive(Debug, Clone)]
pub struct AssetSpec {
    /// Path relative to the asset root
    pub path: String,

    /// World position of the fragment root (world units)
    pub placement: [f32; 3],

    /// Uniform scale multiplied into the fragment's own scale
    pub scale: f32,

    pub role: AssetRole,
}

/// The models loaded at session start
#[derive(Debug, Clone)]
pub struct AssetManifest {
    pub models: Vec<AssetSpec>,
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self {
            models: vec![
                AssetSpec {
                    path: "models/Flamingo.glb".to_string(),
                    placement: [-10.5, 0.0, -10.0],
                    scale: 0.125,
                    role: AssetRole::Animated,
                },
                AssetSpec {
                    path: "models/Flamingo.glb".to_string(),
                    placement: [10.5, 0.0, -10.0],
                    scale: 0.125,
                    role: AssetRole::Animated,
                },
                AssetSpec {
                    path: "models/robot.gltf".to_string(),
                    placement: [0.0, 0.0, 0.0],
                    scale: 1.125,
                    role: AssetRole::Reactive,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fixed_step_is_25_hz() {
        let config = SchedulerConfig::default();
        assert_eq!(config.fixed_step(), Duration::from_millis(40));
    }

    #[test]
    fn test_rate_must_be_positive() {
        assert!(SchedulerConfig::from_rate_hz(0.0).is_err());
        assert!(SchedulerConfig::from_rate_hz(-5.0).is_err());
        assert!(SchedulerConfig::from_rate_hz(f64::NAN).is_err());
        let config = SchedulerConfig::from_rate_hz(50.0).unwrap();
        assert!((config.fixed_step_s - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_default_manifest_has_one_reactive_asset() {
        let manifest = AssetManifest::default();
        assert_eq!(manifest.models.len(), 3);
        let reactive: Vec<_> = manifest
            .models
            .iter()
            .filter(|m| m.role == AssetRole::Reactive)
            .collect();
        assert_eq!(reactive.len(), 1);
        assert_eq!(reactive[0].placement, [0.0, 0.0, 0.0]);

        // Animated placements mirror each other across X
        let animated: Vec<_> = manifest
            .models
            .iter()
            .filter(|m| m.role == AssetRole::Animated)
            .collect();
        assert_eq!(animated[0].placement[0], -animated[1].placement[0]);
    }

    #[test]
    fn test_mapping_apply_uses_configured_ranges() {
        let mapping = ReactiveMapping::default();
        assert_eq!(mapping.apply(-36.0), 2.0);
        assert_eq!(mapping.axis.index(), 2);
    }
}
