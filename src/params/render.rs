//! Window, lighting and scene furniture configuration.

/// Rendering configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Window width (pixels)
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,

    /// Clear colour (0xRRGGBB)
    pub background: u32,

    /// Directional light position; the light shines from here towards the origin
    pub light_position: [f32; 3],

    /// Directional light colour (0xRRGGBB)
    pub light_color: u32,

    pub light_intensity: f32,

    /// Ambient light colour (0xRRGGBB)
    pub ambient_color: u32,

    pub ambient_intensity: f32,

    /// Grid helper edge length (world units)
    pub grid_size: f32,

    /// Grid helper cell count per side
    pub grid_divisions: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            background: 0xdedede,
            light_position: [-1.0, 2.0, 4.0],
            light_color: 0xffffff,
            light_intensity: 1.0,
            ambient_color: 0xffffff,
            ambient_intensity: 0.5,
            grid_size: 1000.0,
            grid_divisions: 100,
        }
    }
}

impl RenderConfig {
    pub fn aspect_ratio(&self) -> f32 {
        self.window_width as f32 / self.window_height.max(1) as f32
    }
}

/// Split 0xRRGGBB into linear-ish `[r, g, b]` in 0..1
pub fn hex_to_rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}
