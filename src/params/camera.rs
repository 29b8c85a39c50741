//! Camera projection and orbit control configuration.

/// Perspective camera parameters
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Vertical field of view (degrees)
    pub fov_degrees: f32,

    /// Near clipping plane (world units)
    pub near_plane: f32,

    /// Far clipping plane (world units)
    pub far_plane: f32,

    /// Camera position (world units)
    pub position: [f32; 3],

    /// Look-at / orbit target (world units)
    pub target: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near_plane: 0.1,
            far_plane: 1000.0,
            position: [0.0, 0.0, 10.0],
            target: [0.0, 0.0, 0.0],
        }
    }
}

/// Mouse orbit controls
#[derive(Debug, Clone)]
pub struct OrbitConfig {
    /// Radians of rotation per pixel of drag
    pub rotate_speed: f32,

    /// Fractional distance change per wheel line
    pub zoom_speed: f32,

    /// Closest allowed distance to the target (world units)
    pub min_distance: f32,

    /// Farthest allowed distance to the target (world units)
    pub max_distance: f32,

    pub enable_zoom: bool,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            rotate_speed: 0.005,
            zoom_speed: 0.1,
            min_distance: 0.5,
            max_distance: 500.0,
            enable_zoom: true,
        }
    }
}
