//! Perspective camera and mouse orbit controls.

use glam::{Mat4, Vec2, Vec3};

use crate::params::{CameraConfig, OrbitConfig};

/// Smallest polar angle the orbit may reach; keeps the view off the poles
const POLE_EPSILON: f32 = 1e-3;

/// Perspective camera looking at a target point
#[derive(Debug, Clone)]
pub struct Camera {
    /// Vertical field of view (degrees)
    pub fov_degrees: f32,
    /// Viewport width / height
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,

    /// Cached by [`Camera::update_projection_matrix`]
    projection: Mat4,
}

impl Camera {
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        let mut camera = Self {
            fov_degrees: config.fov_degrees,
            aspect,
            near: config.near_plane,
            far: config.far_plane,
            position: Vec3::from_array(config.position),
            target: Vec3::from_array(config.target),
            projection: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    /// Recompute the projection after changing fov, aspect or clip planes
    pub fn update_projection_matrix(&mut self) {
        self.projection = Mat4::perspective_rh(
            self.fov_degrees.to_radians(),
            self.aspect,
            self.near,
            self.far,
        );
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn view(&self) -> Mat4 {
        // Y is always up (camera never rolls)
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection * self.view()
    }
}

/// Drag to orbit around the camera target, scroll to zoom
#[derive(Debug, Clone)]
pub struct OrbitControls {
    config: OrbitConfig,
    dragging: bool,
    last_cursor: Option<Vec2>,
    /// Accumulated drag since the last update (pixels)
    pending_rotate: Vec2,
    /// Accumulated wheel lines since the last update
    pending_zoom: f32,
}

impl OrbitControls {
    pub fn new(config: OrbitConfig) -> Self {
        Self {
            config,
            dragging: false,
            last_cursor: None,
            pending_rotate: Vec2::ZERO,
            pending_zoom: 0.0,
        }
    }

    pub fn set_dragging(&mut self, dragging: bool) {
        self.dragging = dragging;
    }

    pub fn cursor_moved(&mut self, x: f32, y: f32) {
        let cursor = Vec2::new(x, y);
        if let (true, Some(last)) = (self.dragging, self.last_cursor) {
            self.pending_rotate += cursor - last;
        }
        self.last_cursor = Some(cursor);
    }

    /// Positive lines zoom in
    pub fn scroll(&mut self, lines: f32) {
        if self.config.enable_zoom {
            self.pending_zoom += lines;
        }
    }

    /// Apply pending input to `camera`; returns `true` if it moved
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        if self.pending_rotate == Vec2::ZERO && self.pending_zoom == 0.0 {
            return false;
        }

        let offset = camera.position - camera.target;
        let radius = offset.length();
        if radius <= f32::EPSILON {
            self.pending_rotate = Vec2::ZERO;
            self.pending_zoom = 0.0;
            return false;
        }

        // Spherical coordinates around +Y
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();

        theta -= self.pending_rotate.x * self.config.rotate_speed;
        phi = (phi - self.pending_rotate.y * self.config.rotate_speed)
            .clamp(POLE_EPSILON, std::f32::consts::PI - POLE_EPSILON);

        let zoom = (1.0 - self.config.zoom_speed).powf(self.pending_zoom);
        let radius = (radius * zoom).clamp(self.config.min_distance, self.config.max_distance);

        camera.position = camera.target
            + radius * Vec3::new(phi.sin() * theta.sin(), phi.cos(), phi.sin() * theta.cos());

        self.pending_rotate = Vec2::ZERO;
        self.pending_zoom = 0.0;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::from_config(&CameraConfig::default(), 16.0 / 9.0)
    }

    #[test]
    fn test_view_proj_is_finite() {
        let camera = camera();
        let view_proj = camera.view_proj();
        assert_ne!(view_proj, Mat4::IDENTITY);
        assert!(view_proj.to_cols_array().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_projection_only_changes_on_update() {
        let mut camera = camera();
        let before = camera.projection();
        camera.aspect = 1.0;
        assert_eq!(camera.projection(), before);
        camera.update_projection_matrix();
        assert_ne!(camera.projection(), before);
        assert_eq!(
            camera.projection(),
            Mat4::perspective_rh(75f32.to_radians(), 1.0, 0.1, 1000.0)
        );
    }

    #[test]
    fn test_drag_orbits_at_constant_distance() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(OrbitConfig::default());
        controls.cursor_moved(100.0, 100.0);
        controls.set_dragging(true);
        controls.cursor_moved(200.0, 100.0);

        assert!(controls.update(&mut camera));
        assert!((camera.position.length() - 10.0).abs() < 1e-4);
        assert!(camera.position.x.abs() > 0.1);
        assert!(!controls.update(&mut camera));
    }

    #[test]
    fn test_cursor_motion_without_drag_is_ignored() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(OrbitConfig::default());
        controls.cursor_moved(0.0, 0.0);
        controls.cursor_moved(50.0, 50.0);
        assert!(!controls.update(&mut camera));
        assert_eq!(camera.position, Vec3::new(0.0, 0.0, 10.0));
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut camera = camera();
        let config = OrbitConfig {
            min_distance: 5.0,
            ..OrbitConfig::default()
        };
        let mut controls = OrbitControls::new(config);
        controls.scroll(1.0);
        controls.update(&mut camera);
        assert!((camera.position.length() - 9.0).abs() < 1e-4);

        controls.scroll(100.0);
        controls.update(&mut camera);
        assert!((camera.position.length() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_zoom_disabled() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(OrbitConfig {
            enable_zoom: false,
            ..OrbitConfig::default()
        });
        controls.scroll(3.0);
        assert!(!controls.update(&mut camera));
    }
}
