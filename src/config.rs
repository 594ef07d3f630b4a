//! Viewer configuration.
//!
//! There is no config file and nothing is read from the environment: every tunable
//! lives in [`ViewerConfig`], whose `Default` impl describes the stock viewer.

/// Which screen point the per-frame pick ray goes through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PickPointer {
    /// Always cast through the centre of normalized device space.
    #[default]
    Origin,
    /// Cast through the last known cursor position.
    Cursor,
}

/// Colour plus intensity, the way light sources are usually described.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightColour {
    pub colour: [f32; 3],
    pub intensity: f32,
}

impl LightColour {
    pub fn white(intensity: f32) -> Self {
        Self {
            colour: [1.0, 1.0, 1.0],
            intensity,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ViewerConfig {
    /// Directory (native) or URL prefix (web) both asset paths are relative to.
    /// `None` on the web means "the page's base location".
    pub asset_root: Option<String>,
    pub model_path: String,
    pub texture_path: String,

    pub camera_position: [f32; 3],
    pub fovy_degrees: f32,
    pub znear: f32,
    pub zfar: f32,

    pub zoom_speed: f32,
    pub zoom_min: f32,
    pub zoom_max: f32,
    /// Pixels per scrolled line, used when the platform reports wheel input in lines.
    pub wheel_line_height: f32,

    /// Radians of pivot rotation per dragged pixel.
    pub rotate_speed: f32,

    /// Simulated seconds the animation advances per frame.
    pub animation_step: f32,

    pub ambient: LightColour,
    pub directional: LightColour,
    pub directional_position: [f32; 3],

    pub clear_colour: wgpu::Color,
    pub pick_pointer: PickPointer,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            asset_root: None,
            model_path: "disco_hoops/scene.gltf".to_string(),
            texture_path: "disco_hoops/textures/material_1_baseColor.png".to_string(),
            camera_position: [0.0, 0.0, 7.0],
            fovy_degrees: 75.0,
            znear: 0.1,
            zfar: 1000.0,
            zoom_speed: 0.1,
            zoom_min: 1.0,
            zoom_max: 20.0,
            wheel_line_height: 100.0,
            rotate_speed: 0.005,
            animation_step: 0.01,
            ambient: LightColour::white(0.5),
            directional: LightColour::white(0.8),
            directional_position: [1.0, 1.0, 1.0],
            clear_colour: wgpu::Color::TRANSPARENT,
            pick_pointer: PickPointer::Origin,
        }
    }
}
