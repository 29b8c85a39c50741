//! Keeps the camera projection and the render surface in step with the window.

use crate::camera::Camera;
use crate::rendering::Renderer;

/// Reacts to window resizes
#[derive(Debug, Default, Clone, Copy)]
pub struct ViewportController {
    size: Option<(u32, u32)>,
}

impl ViewportController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last applied size, if any
    pub fn size(&self) -> Option<(u32, u32)> {
        self.size
    }

    /// Apply a new window size (pixels)
    ///
    /// A zero width or height (minimised window) leaves everything unchanged
    /// and returns `false`.
    pub fn on_resize(
        &mut self,
        width: u32,
        height: u32,
        camera: &mut Camera,
        renderer: &mut dyn Renderer,
    ) -> bool {
        if width == 0 || height == 0 {
            log::debug!("ignoring resize to {}x{}", width, height);
            return false;
        }
        camera.aspect = width as f32 / height as f32;
        camera.update_projection_matrix();
        renderer.set_surface_size(width, height);
        self.size = Some((width, height));
        true
    }
}
