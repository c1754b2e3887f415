//! Color values and HSV conversions

use serde::{Deserialize, Serialize};

/// 8-bit RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Same color with a different alpha
    #[inline]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Integer interpolation between `self` and `other`.
    ///
    /// `a = 255` yields exactly `self`, `a = 0` yields exactly `other`:
    /// `c = (c1 - c2) * a / 255 + c2` per channel.
    #[inline]
    pub fn interpolate(self, other: Color, a: u8) -> Color {
        Color {
            r: lerp_channel(self.r, other.r, a),
            g: lerp_channel(self.g, other.g, a),
            b: lerp_channel(self.b, other.b, a),
            a: lerp_channel(self.a, other.a, a),
        }
    }
}

/// Integer channel interpolation in the 0..=255 domain.
///
/// Floor division keeps negative differences rounding toward negative
/// infinity, so the result never leaves `[min(c1,c2), max(c1,c2)]`.
#[inline]
pub fn lerp_channel(c1: u8, c2: u8, a: u8) -> u8 {
    let d = i32::from(c1) - i32::from(c2);
    let v = (d * i32::from(a)).div_euclid(255) + i32::from(c2);
    v.clamp(0, 255) as u8
}

/// Brush color in HSV space plus alpha.
///
/// h: 0-360 (wraps), s/v/a: 0-1 (clamped)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsva {
    pub h: f32,
    pub s: f32,
    pub v: f32,
    pub a: f32,
}

impl Hsva {
    pub fn new(h: f32, s: f32, v: f32, a: f32) -> Self {
        let mut c = Self { h: 0.0, s, v, a };
        c.set_hue(h);
        c.s = s.clamp(0.0, 1.0);
        c.v = v.clamp(0.0, 1.0);
        c.a = a.clamp(0.0, 1.0);
        c
    }

    pub fn from_color(c: Color) -> Self {
        let (h, s, v) = rgb_to_hsv(c.r, c.g, c.b);
        Self {
            h,
            s,
            v,
            a: f32::from(c.a) / 255.0,
        }
    }

    pub fn to_color(&self) -> Color {
        let (r, g, b) = hsv_to_rgb(self.h, self.s, self.v);
        Color::rgba(r, g, b, (self.a * 255.0).round() as u8)
    }

    /// Set hue, wrapping into [0, 360)
    pub fn set_hue(&mut self, h: f32) {
        self.h = h.rem_euclid(360.0);
    }

    pub fn shift_hue(&mut self, dh: f32) {
        self.set_hue(self.h + dh);
    }

    pub fn shift_saturation(&mut self, ds: f32) {
        self.s = (self.s + ds).clamp(0.0, 1.0);
    }

    pub fn shift_value(&mut self, dv: f32) {
        self.v = (self.v + dv).clamp(0.0, 1.0);
    }

    pub fn shift_alpha(&mut self, da: f32) {
        self.a = (self.a + da).clamp(0.0, 1.0);
    }
}

impl Default for Hsva {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }
}

/// HSV to RGB color conversion
/// h: 0-360, s: 0-1, v: 0-1
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (u8, u8, u8) {
    let c = v * s;
    let h_prime = h.rem_euclid(360.0) / 60.0;
    let x = c * (1.0 - ((h_prime % 2.0) - 1.0).abs());
    let m = v - c;

    let (r1, g1, b1) = match h_prime as i32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    (
        ((r1 + m) * 255.0).round() as u8,
        ((g1 + m) * 255.0).round() as u8,
        ((b1 + m) * 255.0).round() as u8,
    )
}

/// RGB to HSV color conversion, inverse of `hsv_to_rgb`
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = f32::from(r) / 255.0;
    let g = f32::from(g) / 255.0;
    let b = f32::from(b) / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta <= f32::EPSILON {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let s = if max <= f32::EPSILON { 0.0 } else { delta / max };

    (h, s, max)
}
