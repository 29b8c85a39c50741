//! Parameter definitions with physical units and documented semantics.
//!
//! Every tunable number of a session lives here:
//! - Units are spelled out (seconds, decibels, world units, pixels)
//! - Defaults reproduce the reference scene
//! - The command line overrides a subset (see `cli`)

mod audio;
mod camera;
mod render;
mod scene;

// Re-export all types
pub use audio::{AudioConfig, MeterConfig};
pub use camera::{CameraConfig, OrbitConfig};
pub use render::{hex_to_rgb, RenderConfig};
pub use scene::{AssetManifest, AssetRole, AssetSpec, Axis, ReactiveMapping, SchedulerConfig};

use std::path::PathBuf;

/// Everything needed to start a session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Directory that asset paths are resolved against
    pub asset_root: PathBuf,

    pub scheduler: SchedulerConfig,
    pub mapping: ReactiveMapping,
    pub meter: MeterConfig,
    pub audio: AudioConfig,
    pub assets: AssetManifest,
    pub camera: CameraConfig,
    pub orbit: OrbitConfig,
    pub render: RenderConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
            scheduler: SchedulerConfig::default(),
            mapping: ReactiveMapping::default(),
            meter: MeterConfig::default(),
            audio: AudioConfig::default(),
            assets: AssetManifest::default(),
            camera: CameraConfig::default(),
            orbit: OrbitConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Resolve an asset-relative path against the asset root
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.asset_root.join(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_joins_asset_root() {
        let config = SessionConfig {
            asset_root: PathBuf::from("/srv/stage"),
            ..SessionConfig::default()
        };
        assert_eq!(
            config.resolve("models/robot.gltf"),
            PathBuf::from("/srv/stage/models/robot.gltf")
        );
    }
}
