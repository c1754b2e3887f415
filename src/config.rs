//! Editor configuration.
//!
//! Everything that used to live in process-wide statics (default sizes,
//! last-used names, step sizes) is carried here and passed to whoever
//! needs it.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::display::{BlendFn, PixelFormat};

const DEFAULT_TILE_SIZE: u32 = 64;

/// Brush color adjustments applied per mouse-wheel notch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorSteps {
    /// Degrees
    pub hue: f32,
    pub saturation: f32,
    pub value: f32,
    pub alpha: f32,
}

impl Default for ColorSteps {
    fn default() -> Self {
        Self {
            hue: 3.0,
            saturation: 0.05,
            value: 0.05,
            alpha: 0.1,
        }
    }
}

/// Reference grid drawn under sketch elements
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub enabled: bool,
    /// Grid spacing in pixels
    pub spacing: u32,
    pub color: Color,
    pub show_origin: bool,
    pub origin_color: Color,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            spacing: 8,
            color: Color::rgba(128, 128, 128, 64),
            show_origin: false,
            origin_color: Color::rgba(255, 0, 0, 160),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub tile_width: u32,
    pub tile_height: u32,
    pub pixel_format: PixelFormat,
    /// Blend function used when compositing sketches into tiles
    pub sketch_blend: BlendFn,
    /// Maximum hit-test distance (pixels) for selecting sketch elements
    pub select_threshold: f32,
    pub color_steps: ColorSteps,
    pub grid: GridConfig,
    /// Color of selected sketch elements
    pub selection_color: Color,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            tile_width: DEFAULT_TILE_SIZE,
            tile_height: DEFAULT_TILE_SIZE,
            pixel_format: PixelFormat::rgba8888(),
            sketch_blend: BlendFn::OverlayAlpha,
            select_threshold: 4.0,
            color_steps: ColorSteps::default(),
            grid: GridConfig::default(),
            selection_color: Color::rgb(0, 200, 255),
        }
    }
}

impl EditorConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> crate::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: EditorConfig =
            serde_json::from_str(r#"{ "tile_width": 32, "grid": { "enabled": true } }"#).unwrap();
        assert_eq!(cfg.tile_width, 32);
        assert_eq!(cfg.tile_height, DEFAULT_TILE_SIZE);
        assert!(cfg.grid.enabled);
        assert_eq!(cfg.grid.spacing, 8);
        assert_eq!(cfg.color_steps, ColorSteps::default());
    }
}
