//! Named textures used by pattern fills and textured polygons.

use serde::{Deserialize, Serialize};

use crate::arena::Arena;
use crate::color::Color;
use crate::display::Surface;

/// A named surface sampled with wrap-around (tiling) addressing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Texture {
    pub name: String,
    pub surface: Surface,
}

impl Texture {
    pub fn new(name: impl Into<String>, surface: Surface) -> Self {
        Self {
            name: name.into(),
            surface,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.surface.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.surface.height()
    }

    /// Sample at integer texel coordinates, wrapping in both axes.
    /// Works for any size, including negative coordinates.
    #[inline]
    pub fn sample(&self, x: i32, y: i32) -> Color {
        if self.width() == 0 || self.height() == 0 {
            return Color::TRANSPARENT;
        }
        let w = self.width() as i32;
        let h = self.height() as i32;
        self.surface
            .get_color(x.rem_euclid(w) as u32, y.rem_euclid(h) as u32)
    }

    /// Generate a checkerboard pattern
    pub fn checkerboard(name: impl Into<String>, size: u32, tile_size: u32, c1: Color, c2: Color) -> Self {
        let mut surface = Surface::rgba(size, size);
        let tile_size = tile_size.max(1);
        for y in 0..size {
            for x in 0..size {
                let c = if ((x / tile_size) + (y / tile_size)) % 2 == 0 {
                    c1
                } else {
                    c2
                };
                let v = surface.map(c);
                surface.put_pixel(x as i32, y as i32, v);
            }
        }
        Self::new(name, surface)
    }
}

/// Find a texture by name
pub fn lookup<'a>(textures: &'a Arena<Texture>, name: &str) -> Option<&'a Texture> {
    textures.iter().map(|(_, t)| t).find(|t| t.name == name)
}
