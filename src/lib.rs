//! Beatstage library - audio-reactive 3D stage

pub mod animation;
pub mod audio;
pub mod camera;
pub mod cli;
pub mod diagnostics;
pub mod loader;
pub mod loading;
pub mod mapping;
pub mod meter;
pub mod params;
pub mod rendering;
pub mod scene;
pub mod scheduler;
pub mod session;
pub mod viewport;
