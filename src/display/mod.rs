//! Pixel surfaces, drawing primitives and (with the `viewer` feature) an
//! SDL2 window to show them in.

mod prim;
mod surface;
#[cfg(feature = "viewer")]
mod window;

pub use prim::{wu_coverage, BlendFn};
pub use surface::{PixelFormat, Surface};
#[cfg(feature = "viewer")]
pub use window::{Display, RenderTarget, WindowEvent};
