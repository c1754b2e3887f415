//! Software rasterizer and editing core for 2D tilesets.
//!
//! A [`Tileset`] owns textures, pixmaps (with undoable pixel editing and
//! brushes), vector sketches, rendering features and tiles. Tiles are
//! regenerated on demand by compositing their ordered elements into a
//! surface of any packed pixel format.

pub mod arena;
pub mod color;
pub mod config;
pub mod display;
pub mod error;
pub mod feature;
pub mod geometry;
pub mod input;
pub mod pixmap;
pub mod sketch;
pub mod texture;
pub mod tileset;
pub mod undo;

pub use error::{Result, TilesetError};
pub use tileset::{Tile, TileElement, Tileset};
