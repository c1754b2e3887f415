//! Fill features: solid colors, linear and circular gradients, patterns.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::RenderContext;
use crate::color::Color;
use crate::display::{BlendFn, PixelFormat, Surface};

/// Which coordinate drives a `VGradient`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GradientAxis {
    /// Factor from the column, scaled by the tile width (left to right)
    #[default]
    Orthogonal,
    /// Factor from the column but scaled by the tile height, as older
    /// tilesets rendered it. Identical to `Orthogonal` on square tiles.
    Literal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Fill {
    Solid(Color),
    /// Top row is `top`, bottom row is `bottom`
    HGradient { top: Color, bottom: Color },
    /// Left column is `left`, right column is `right`
    VGradient {
        left: Color,
        right: Color,
        #[serde(default)]
        axis: GradientAxis,
    },
    /// Concentric rings from `inner` at the tile centre to `outer`
    CGradient { inner: Color, outer: Color },
    /// Named texture tiled across the surface
    Pattern {
        texture: String,
        #[serde(default)]
        offset_x: i32,
        #[serde(default)]
        offset_y: i32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillFeature {
    pub fill: Fill,
    /// 255 writes pixels directly, anything lower blends
    #[serde(default = "opaque")]
    pub alpha: u8,
    #[serde(default)]
    pub blend: BlendFn,
}

fn opaque() -> u8 {
    255
}

/// Interpolation weight for position `i` of `n`: 255 at the first
/// position, 0 at the last and beyond.
#[inline]
pub fn gradient_factor(i: u32, n: u32) -> u8 {
    if n <= 1 {
        return 255;
    }
    let last = n - 1;
    (last.saturating_sub(i) * 255 / last) as u8
}

impl FillFeature {
    pub fn new(fill: Fill) -> Self {
        Self {
            fill,
            alpha: 255,
            blend: BlendFn::OverlayAlpha,
        }
    }

    pub fn with_alpha(mut self, alpha: u8) -> Self {
        self.alpha = alpha;
        self
    }

    /// Render into `surface`. Applying twice gives the same pixels when
    /// the feature is opaque.
    pub fn apply(&self, surface: &mut Surface, ctx: &RenderContext<'_>) {
        let w = surface.width();
        let h = surface.height();
        if w == 0 || h == 0 {
            return;
        }

        match &self.fill {
            Fill::Solid(c) => {
                if self.alpha == 255 {
                    surface.fill_rect(0, 0, w, h, *c);
                } else {
                    let c = c.with_alpha(self.alpha);
                    for y in 0..h as i32 {
                        surface.hline_blend(0, w as i32 - 1, y, c, self.blend);
                    }
                }
            }
            Fill::HGradient { top, bottom } => {
                for y in 0..h {
                    let c = top.interpolate(*bottom, gradient_factor(y, h));
                    if self.alpha == 255 {
                        let v = surface.map(c);
                        surface.hline(0, w as i32 - 1, y as i32, v);
                    } else {
                        surface.hline_blend(0, w as i32 - 1, y as i32, c.with_alpha(self.alpha), self.blend);
                    }
                }
            }
            Fill::VGradient { left, right, axis } => {
                let span = match axis {
                    GradientAxis::Orthogonal => w,
                    GradientAxis::Literal => h,
                };
                for y in 0..h {
                    for x in 0..w {
                        let c = left.interpolate(*right, gradient_factor(x, span));
                        self.plot(surface, x as i32, y as i32, c);
                    }
                }
            }
            Fill::CGradient { inner, outer } => self.apply_rings(surface, *inner, *outer),
            Fill::Pattern {
                texture,
                offset_x,
                offset_y,
            } => {
                let Some(tex) = ctx.texture(texture) else {
                    debug!(texture = %texture, "pattern fill: no such texture, skipping");
                    return;
                };
                for y in 0..h as i32 {
                    for x in 0..w as i32 {
                        let mut c = tex.sample(x + offset_x, y + offset_y);
                        c.a = ((u32::from(c.a) * u32::from(self.alpha)) / 255) as u8;
                        if c.a > 0 {
                            surface.blend_pixel(x, y, c, self.blend);
                        }
                    }
                }
            }
        }
    }

    #[inline]
    fn plot(&self, surface: &mut Surface, x: i32, y: i32, c: Color) {
        if self.alpha == 255 {
            let v = surface.map(c);
            surface.put_pixel(x, y, v);
        } else {
            surface.blend_pixel(x, y, c.with_alpha(self.alpha), self.blend);
        }
    }

    fn apply_rings(&self, surface: &mut Surface, inner: Color, outer: Color) {
        let w = surface.width();
        let h = surface.height();
        let r = w.max(h) as i32;
        let (cx, cy) = ((w / 2) as i32, (h / 2) as i32);

        let draw = |s: &mut Surface| {
            for i in 0..=r {
                let a = ((r - i) * 255 / r) as u8;
                s.circle(cx, cy, i, inner.interpolate(outer, a));
            }
        };

        if self.alpha == 255 {
            draw(surface);
        } else {
            // Rings overwrite each other, so build them opaque first
            let mut scratch = Surface::new(w, h, PixelFormat::rgba8888());
            draw(&mut scratch);
            surface.composite(&scratch, 0, 0, self.alpha, self.blend);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::sketch::Sketch;
    use crate::texture::Texture;

    const RED: Color = Color::rgb(255, 0, 0);
    const BLUE: Color = Color::rgb(0, 0, 255);

    fn render(feature: &FillFeature, w: u32, h: u32) -> Surface {
        let textures = Arena::new();
        let sketches = Arena::new();
        let ctx = RenderContext::new(&textures, &sketches);
        let mut s = Surface::rgba(w, h);
        feature.apply(&mut s, &ctx);
        s
    }

    #[test]
    fn test_gradient_factor_endpoints() {
        assert_eq!(gradient_factor(0, 100), 255);
        assert_eq!(gradient_factor(99, 100), 0);
        assert_eq!(gradient_factor(49, 100), 128);
        assert_eq!(gradient_factor(0, 1), 255);
        assert_eq!(gradient_factor(30, 10), 0);
    }

    #[test]
    fn test_solid_fill_is_idempotent() {
        let f = FillFeature::new(Fill::Solid(Color::rgb(1, 2, 3)));
        let a = render(&f, 8, 8);
        let mut b = a.clone();
        let textures = Arena::new();
        let sketches = Arena::new();
        f.apply(&mut b, &RenderContext::new(&textures, &sketches));
        assert_eq!(a, b);
        assert_eq!(a.get_color(7, 7), Color::rgb(1, 2, 3));
    }

    #[test]
    fn test_translucent_solid_blends() {
        let f = FillFeature::new(Fill::Solid(Color::WHITE)).with_alpha(128);
        let s = render(&f, 2, 2);
        let c = s.get_color(0, 0);
        assert_eq!((c.r, c.a), (127, 128));
    }

    #[test]
    fn test_hgradient_endpoints() {
        let f = FillFeature::new(Fill::HGradient { top: RED, bottom: BLUE });
        let s = render(&f, 4, 16);
        assert_eq!(s.get_color(0, 0), RED);
        assert_eq!(s.get_color(3, 15), BLUE);
    }

    #[test]
    fn test_vgradient_axes() {
        let ortho = FillFeature::new(Fill::VGradient {
            left: RED,
            right: BLUE,
            axis: GradientAxis::Orthogonal,
        });
        let s = render(&ortho, 10, 20);
        for y in [0, 19] {
            assert_eq!(s.get_color(0, y), RED);
            assert_eq!(s.get_color(9, y), BLUE);
        }

        let literal = FillFeature::new(Fill::VGradient {
            left: RED,
            right: BLUE,
            axis: GradientAxis::Literal,
        });
        let s = render(&literal, 10, 20);
        assert_eq!(s.get_color(0, 0), RED);
        // Scaled by the height, so the right edge stops short of `right`
        assert_ne!(s.get_color(9, 0), BLUE);
        assert_eq!(s.get_color(9, 0), RED.interpolate(BLUE, gradient_factor(9, 20)));

        // Square tiles render the same either way
        assert_eq!(render(&ortho, 12, 12), render(&literal, 12, 12));
    }

    #[test]
    fn test_cgradient_rings() {
        let f = FillFeature::new(Fill::CGradient { inner: RED, outer: BLUE });
        let s = render(&f, 16, 16);
        assert_eq!(s.get_color(8, 8), RED);
        // Only ring 4 touches the pole at (cx + 4, cy)
        let a = ((16 - 4) * 255 / 16) as u8;
        assert_eq!(s.get_color(12, 8), RED.interpolate(BLUE, a));
    }

    #[test]
    fn test_pattern_tiles_texture() {
        let mut textures = Arena::new();
        textures.insert(Texture::checkerboard("check", 4, 2, Color::WHITE, Color::BLACK));
        let sketches: Arena<Sketch> = Arena::new();
        let ctx = RenderContext::new(&textures, &sketches);

        let f = FillFeature::new(Fill::Pattern {
            texture: "check".into(),
            offset_x: 0,
            offset_y: 0,
        });
        let mut s = Surface::rgba(8, 8);
        f.apply(&mut s, &ctx);
        // Blended over an empty surface: one LSB short of full intensity
        assert_eq!(s.get_color(0, 0).r, 254);
        assert_eq!(s.get_color(2, 0).r, 0);
        assert_eq!(s.get_color(4, 4), s.get_color(0, 0));
    }

    #[test]
    fn test_missing_pattern_is_a_noop() {
        let f = FillFeature::new(Fill::Pattern {
            texture: "nope".into(),
            offset_x: 0,
            offset_y: 0,
        });
        let s = render(&f, 4, 4);
        assert_eq!(s, Surface::rgba(4, 4));
    }
}
