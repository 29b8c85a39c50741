//! Rendering: the renderer seam, a wgpu implementation and a headless one.

mod frame;
mod gpu;

pub use frame::{Lighting, SceneFrame, Vertex};
pub use gpu::WgpuRenderer;

use thiserror::Error;

use crate::camera::Camera;
use crate::scene::SceneGraph;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported formats")]
    NoSurfaceFormat,

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

/// Draws a scene from a camera
pub trait Renderer {
    /// Draw one frame
    fn render(&mut self, scene: &SceneGraph, camera: &Camera) -> Result<(), RenderError>;

    /// Resize the drawing surface (pixels); never called with a zero dimension
    fn set_surface_size(&mut self, width: u32, height: u32);
}

/// Renderer that only flattens the scene and keeps statistics
///
/// Used by `--headless` runs and by tests.
#[derive(Debug, Clone, Default)]
pub struct HeadlessRenderer {
    frames: u64,
    surface_size: (u32, u32),
    last_triangles: usize,
}

impl HeadlessRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            surface_size: (width, height),
            ..Self::default()
        }
    }

    /// Frames rendered so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    /// Triangles in the most recent frame
    pub fn last_triangles(&self) -> usize {
        self.last_triangles
    }
}

impl Renderer for HeadlessRenderer {
    fn render(&mut self, scene: &SceneGraph, _camera: &Camera) -> Result<(), RenderError> {
        let frame = SceneFrame::build(scene);
        self.last_triangles = frame.triangle_count();
        self.frames += 1;
        Ok(())
    }

    fn set_surface_size(&mut self, width: u32, height: u32) {
        self.surface_size = (width, height);
    }
}
