use std::path::PathBuf;

use vertexshadow_engine::logging::LoggingConfig;
use vertexshadow_engine::window::RuntimeConfig;

/// Range and step of the three light-position sliders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderConfig {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl Default for SliderConfig {
    fn default() -> Self {
        Self {
            min: -10.0,
            max: 10.0,
            step: 0.5,
        }
    }
}

/// Everything the viewer needs before the window opens.
#[derive(Debug, Clone, Default)]
pub struct ViewerConfig {
    /// JSON mesh; the built-in cube when unset.
    pub mesh: Option<PathBuf>,
    /// Texture source; the model stays untextured when unset.
    pub texture: Option<String>,
    pub sliders: SliderConfig,
    pub runtime: RuntimeConfig,
    pub logging: LoggingConfig,
}
