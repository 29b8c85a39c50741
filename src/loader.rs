//! Model loading: the loader seam and its glTF implementation.

mod gltf_model;

pub use gltf_model::GltfLoader;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::animation::AnimationClip;
use crate::scene::SceneFragment;

/// Bytes processed so far for one load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded_bytes: u64,
    pub total_bytes: Option<u64>,
}

/// A parsed model: its primary fragment and the clips that animate it
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub fragment: SceneFragment,
    pub clips: Vec<AnimationClip>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to import glTF {}: {source}", .path.display())]
    Gltf {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    #[error("{} has no scene nodes", .path.display())]
    NoScene { path: PathBuf },

    #[error("{}: {message}", .path.display())]
    Invalid { path: PathBuf, message: String },
}

/// Turns a path into a scene fragment; runs on a worker thread
pub trait ModelLoader: Send + Sync {
    fn load(
        &self,
        path: &Path,
        progress: &mut dyn FnMut(LoadProgress),
    ) -> Result<LoadedModel, LoadError>;
}
