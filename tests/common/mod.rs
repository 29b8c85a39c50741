//! Scripted collaborators shared by the integration scenarios.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use glam::Vec3;

use beatstage::animation::{AnimationClip, Channel, ChannelValues, Interpolation};
use beatstage::diagnostics::RecordingSink;
use beatstage::loader::{LoadError, LoadProgress, LoadedModel, ModelLoader};
use beatstage::meter::MeterSampler;
use beatstage::params::{AssetManifest, AssetRole, AssetSpec, SessionConfig};
use beatstage::scene::{FragmentNode, SceneFragment, Transform};
use beatstage::session::{Collaborators, Session};

/// A flamingo-shaped model: a root with one child animated by a translation clip
pub fn animated_model() -> LoadedModel {
    let mut root = FragmentNode::new(Transform::IDENTITY);
    root.children = vec![1];
    let body = FragmentNode::new(Transform::IDENTITY);
    let clip = AnimationClip::new(
        "flap",
        vec![Channel::new(
            1,
            Interpolation::Linear,
            vec![0.0, 1.0],
            ChannelValues::Translation(vec![Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0)]),
        )
        .expect("valid channel")],
    );
    LoadedModel {
        fragment: SceneFragment {
            nodes: vec![root, body],
            root: 0,
            meshes: Vec::new(),
        },
        clips: vec![clip],
    }
}

/// A robot-shaped model: one static node
pub fn static_model() -> LoadedModel {
    LoadedModel {
        fragment: SceneFragment {
            nodes: vec![FragmentNode::new(Transform::IDENTITY)],
            root: 0,
            meshes: Vec::new(),
        },
        clips: Vec::new(),
    }
}

fn scripted_load(path: &Path, progress: &mut dyn FnMut(LoadProgress)) -> Result<LoadedModel, LoadError> {
    progress(LoadProgress {
        loaded_bytes: 0,
        total_bytes: Some(100),
    });
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    if name.contains("broken") {
        return Err(LoadError::Invalid {
            path: path.to_path_buf(),
            message: "404 Not Found".to_string(),
        });
    }
    progress(LoadProgress {
        loaded_bytes: 100,
        total_bytes: Some(100),
    });
    if name.ends_with(".glb") {
        Ok(animated_model())
    } else {
        Ok(static_model())
    }
}

/// `.glb` files are animated, anything else static, names containing "broken" fail
pub struct StubLoader;

impl ModelLoader for StubLoader {
    fn load(
        &self,
        path: &Path,
        progress: &mut dyn FnMut(LoadProgress),
    ) -> Result<LoadedModel, LoadError> {
        scripted_load(path, progress)
    }
}

/// Like [`StubLoader`], but each path blocks until the test releases it
#[derive(Default)]
pub struct GatedLoader {
    released: Mutex<HashSet<PathBuf>>,
    signal: Condvar,
}

impl GatedLoader {
    pub fn release(&self, path: impl Into<PathBuf>) {
        let mut released = self.released.lock().expect("gate lock");
        released.insert(path.into());
        self.signal.notify_all();
    }
}

impl ModelLoader for GatedLoader {
    fn load(
        &self,
        path: &Path,
        progress: &mut dyn FnMut(LoadProgress),
    ) -> Result<LoadedModel, LoadError> {
        let mut released = self.released.lock().expect("gate lock");
        while !released.contains(path) {
            released = self.signal.wait(released).expect("gate lock");
        }
        drop(released);
        scripted_load(path, progress)
    }
}

/// Meter whose reading the test can change while the session owns it
#[derive(Clone, Default)]
pub struct SharedMeter {
    db_bits: Arc<AtomicU32>,
}

impl SharedMeter {
    pub fn new(db: f32) -> Self {
        let meter = Self::default();
        meter.set(db);
        meter
    }

    pub fn set(&self, db: f32) {
        self.db_bits.store(db.to_bits(), Ordering::Relaxed);
    }
}

impl MeterSampler for SharedMeter {
    fn read(&self) -> f32 {
        f32::from_bits(self.db_bits.load(Ordering::Relaxed))
    }
}

pub const LEFT_FLAMINGO: &str = "models/flamingo_left.glb";
pub const RIGHT_FLAMINGO: &str = "models/flamingo_right.glb";
pub const ROBOT: &str = "models/robot.gltf";

/// Two animated assets and one reactive asset under `/stage`
pub fn config_with(paths: [&str; 3]) -> SessionConfig {
    let [left, right, robot] = paths;
    SessionConfig {
        asset_root: PathBuf::from("/stage"),
        assets: AssetManifest {
            models: vec![
                AssetSpec {
                    path: left.to_string(),
                    placement: [-10.5, 0.0, -10.0],
                    scale: 0.125,
                    role: AssetRole::Animated,
                },
                AssetSpec {
                    path: right.to_string(),
                    placement: [10.5, 0.0, -10.0],
                    scale: 0.125,
                    role: AssetRole::Animated,
                },
                AssetSpec {
                    path: robot.to_string(),
                    placement: [0.0, 0.0, 0.0],
                    scale: 1.125,
                    role: AssetRole::Reactive,
                },
            ],
        },
        ..SessionConfig::default()
    }
}

pub fn start(
    config: &SessionConfig,
    loader: Arc<dyn ModelLoader>,
    meter: SharedMeter,
    sink: &RecordingSink,
) -> Session {
    Session::start(
        config,
        Collaborators {
            loader,
            meter: Box::new(meter),
            audio: None,
            diagnostics: Box::new(sink.clone()),
        },
    )
}
