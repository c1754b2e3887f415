//! Primitive rasterizer: lines, circles, spans and pixel blending.
//!
//! Everything here is stateless beyond the target surface. None of these
//! routines fail; coordinates are the caller's concern except where a
//! routine says it clips.

use serde::{Deserialize, Serialize};

use super::surface::Surface;
use crate::color::Color;

/// How `blend_pixel` derives the destination alpha
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendFn {
    /// Alpha accumulates: min(255, dA + sA)
    #[default]
    OverlayAlpha,
    /// dA * sA / 2, saturated
    AverageAlpha,
    /// Keep the source alpha
    SrcAlpha,
    /// Keep the destination alpha
    DstAlpha,
}

impl BlendFn {
    #[inline]
    pub fn alpha(self, da: u8, sa: u8) -> u8 {
        let (da, sa) = (u32::from(da), u32::from(sa));
        match self {
            BlendFn::OverlayAlpha => (da + sa).min(255) as u8,
            BlendFn::AverageAlpha => (da * sa / 2).min(255) as u8,
            BlendFn::SrcAlpha => sa as u8,
            BlendFn::DstAlpha => da as u8,
        }
    }
}

/// RGB mix of one channel: d + (s - d) * sA / 256
#[inline]
fn mix_channel(s: u8, d: u8, sa: u8) -> u8 {
    let (s, d, sa) = (i32::from(s), i32::from(d), i32::from(sa));
    (d + (((s - d) * sa) >> 8)).clamp(0, 255) as u8
}

/// Fractional part that stays positive for negative inputs
#[inline]
fn fpart(v: f32) -> f32 {
    v - v.floor()
}

/// Wu coverage weights for a sample at fractional offset `frac`.
///
/// Returns `(1 - frac, frac)`, the weights of the two pixels straddling
/// the ideal line, before focus correction.
#[inline]
pub fn wu_coverage(frac: f32) -> (f32, f32) {
    (1.0 - frac, frac)
}

/// Boost both weights when they are close, so near-diagonal lines don't
/// look thinner than axis-aligned ones.
#[inline]
fn focus(l1: f32, l2: f32) -> (f32, f32) {
    let f = 1.0 - (l1 - l2).abs();
    ((l1 + 0.3 * f).min(1.0), (l2 + 0.3 * f).min(1.0))
}

impl Surface {
    /// Unconditional write of a packed value.
    ///
    /// Caller guarantees `0 <= x < width` and `0 <= y < height`; there is no
    /// clipping (use `put_pixel_clipped` for that).
    #[inline]
    pub fn put_pixel(&mut self, x: i32, y: i32, value: u32) {
        debug_assert!(self.in_bounds(x, y), "put_pixel out of bounds: ({}, {})", x, y);
        let idx = self.pixel_index(x as u32, y as u32);
        self.write_packed_at(idx, value);
    }

    /// Write a packed value, ignoring out-of-bounds coordinates
    #[inline]
    pub fn put_pixel_clipped(&mut self, x: i32, y: i32, value: u32) {
        if self.in_bounds(x, y) {
            let idx = self.pixel_index(x as u32, y as u32);
            self.write_packed_at(idx, value);
        }
    }

    /// Alpha-blend `c` over the pixel at (x, y) (bounds checked).
    ///
    /// A destination equal to the surface colorkey counts as empty and is
    /// replaced by `c` outright.
    pub fn blend_pixel(&mut self, x: i32, y: i32, c: Color, func: BlendFn) {
        if !self.in_bounds(x, y) {
            return;
        }
        let idx = self.pixel_index(x as u32, y as u32);
        let dst = self.get_pixel(x as u32, y as u32);
        if self.format().is_colorkey(dst) {
            let v = self.map(c);
            self.write_packed_at(idx, v);
            return;
        }
        let d = self.format().get_rgba(dst);
        let out = Color {
            r: mix_channel(c.r, d.r, c.a),
            g: mix_channel(c.g, d.g, c.a),
            b: mix_channel(c.b, d.b, c.a),
            a: func.alpha(d.a, c.a),
        };
        let v = self.map(out);
        self.write_packed_at(idx, v);
    }

    /// Horizontal run fill clamped to the surface; swaps reversed endpoints
    pub fn hline(&mut self, x1: i32, x2: i32, y: i32, value: u32) {
        if y < 0 || y >= self.height() as i32 {
            return;
        }
        let (x1, x2) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
        let start = x1.max(0);
        let end = x2.min(self.width() as i32 - 1);
        if start > end {
            return;
        }

        // Compute starting index once, then step by the pixel width
        let bpp = self.format().bytes_per_pixel as usize;
        let mut idx = self.pixel_index(start as u32, y as u32);
        for _ in start..=end {
            self.write_packed_at(idx, value);
            idx += bpp;
        }
    }

    /// Horizontal run blended pixel by pixel
    pub fn hline_blend(&mut self, x1: i32, x2: i32, y: i32, c: Color, func: BlendFn) {
        let (x1, x2) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
        let start = x1.max(0);
        let end = x2.min(self.width() as i32 - 1);
        for x in start..=end {
            self.blend_pixel(x, y, c, func);
        }
    }

    /// Bresenham line, one pixel per major-axis step, both endpoints once.
    /// Pixels outside the surface are dropped, and only the steps whose
    /// major coordinate lands on the surface are visited.
    pub fn line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, c: Color) {
        let value = self.map(c);
        let (w, h) = (i64::from(self.width()), i64::from(self.height()));
        let (x1, y1, x2, y2) = (i64::from(x1), i64::from(y1), i64::from(x2), i64::from(y2));

        if (x2 - x1).abs() >= (y2 - y1).abs() {
            for (x, y) in bresenham_steps((x1, y1), (x2, y2), w) {
                self.put_pixel_clipped(x, y, value);
            }
        } else {
            for (y, x) in bresenham_steps((y1, x1), (y2, x2), h) {
                self.put_pixel_clipped(x, y, value);
            }
        }
    }

    /// Anti-aliased line using Xiaolin Wu's algorithm.
    ///
    /// Two pixels per step along the major axis, weighted by coverage with
    /// focus correction, blended with `OverlayAlpha`. Endpoints get a
    /// fractional gap weight.
    pub fn line_aa(&mut self, mut x0: f32, mut y0: f32, mut x1: f32, mut y1: f32, c: Color) {
        let steep = (y1 - y0).abs() > (x1 - x0).abs();
        if steep {
            std::mem::swap(&mut x0, &mut y0);
            std::mem::swap(&mut x1, &mut y1);
        }
        if x0 > x1 {
            std::mem::swap(&mut x0, &mut x1);
            std::mem::swap(&mut y0, &mut y1);
        }

        let dx = x1 - x0;
        let dy = y1 - y0;
        let gradient = if dx.abs() < 0.001 { 1.0 } else { dy / dx };

        // End point 1
        let xend = x0.round();
        let yend = y0 + gradient * (xend - x0);
        let xgap = 1.0 - fpart(x0 + 0.5);
        let xpxl1 = xend as i32;
        let ypxl1 = yend.floor() as i32;
        let (l1, l2) = wu_coverage(fpart(yend));
        self.plot_aa(steep, xpxl1, ypxl1, l1 * xgap, c);
        self.plot_aa(steep, xpxl1, ypxl1 + 1, l2 * xgap, c);
        let mut intery = yend + gradient;

        // End point 2
        let xend = x1.round();
        let yend = y1 + gradient * (xend - x1);
        let xgap = fpart(x1 + 0.5);
        let xpxl2 = xend as i32;
        let ypxl2 = yend.floor() as i32;
        let (l1, l2) = wu_coverage(fpart(yend));
        if xpxl2 != xpxl1 {
            self.plot_aa(steep, xpxl2, ypxl2, l1 * xgap, c);
            self.plot_aa(steep, xpxl2, ypxl2 + 1, l2 * xgap, c);
        }

        for x in (xpxl1 + 1)..xpxl2 {
            let (l1, l2) = focus_pair(fpart(intery));
            let ipart = intery.floor() as i32;
            self.plot_aa(steep, x, ipart, l1, c);
            self.plot_aa(steep, x, ipart + 1, l2, c);
            intery += gradient;
        }
    }

    #[inline]
    fn plot_aa(&mut self, steep: bool, major: i32, minor: i32, lum: f32, c: Color) {
        let alpha = (lum.clamp(0.0, 1.0) * f32::from(c.a)).round() as u8;
        if alpha == 0 {
            return;
        }
        let (x, y) = if steep { (minor, major) } else { (major, minor) };
        self.blend_pixel(x, y, c.with_alpha(alpha), BlendFn::OverlayAlpha);
    }

    /// Midpoint circle outline: 8-way symmetric pairs plus the two poles.
    ///
    /// Only octant steps that can land on the surface are visited, so huge
    /// radii and far-off centres cost no more than a surface-sized circle.
    pub fn circle(&mut self, cx: i32, cy: i32, radius: i32, c: Color) {
        let value = self.map(c);
        if radius <= 0 {
            if radius == 0 {
                self.put_pixel_clipped(cx, cy, value);
            }
            return;
        }

        let (w, h) = (i64::from(self.width()), i64::from(self.height()));
        let (cx, cy, r) = (i64::from(cx), i64::from(cy), i64::from(radius));
        let plot = |s: &mut Surface, x: i64, y: i64| {
            if (0..w).contains(&x) && (0..h).contains(&y) {
                s.put_pixel(x as i32, y as i32, value);
            }
        };

        // Steps where one of the eight mirrored points shares a column or
        // row with the surface
        let windows = [(-cx, w - 1 - cx), (cx - (w - 1), cx), (-cy, h - 1 - cy), (cy - (h - 1), cy)];
        for (lo, hi) in windows {
            for x in lo.max(0)..=hi.min(r) {
                let Some(y) = midpoint_y(r, x) else {
                    continue;
                };
                if x > y {
                    continue;
                }
                plot(self, cx + x, cy + y);
                plot(self, cx - x, cy + y);
                plot(self, cx + x, cy - y);
                plot(self, cx - x, cy - y);
                plot(self, cx + y, cy + x);
                plot(self, cx - y, cy + x);
                plot(self, cx + y, cy - x);
                plot(self, cx - y, cy - x);
            }
        }

        plot(self, cx - r, cy);
        plot(self, cx + r, cy);
    }

    /// Composite `src` at (x, y) through `blend_pixel`.
    ///
    /// Colorkey and fully transparent source pixels are skipped; source
    /// alpha is scaled by `alpha`.
    pub fn composite(&mut self, src: &Surface, x: i32, y: i32, alpha: u8, func: BlendFn) {
        for sy in 0..src.height() {
            let dy = y + sy as i32;
            if dy < 0 || dy >= self.height() as i32 {
                continue;
            }
            for sx in 0..src.width() {
                let dx = x + sx as i32;
                if dx < 0 || dx >= self.width() as i32 {
                    continue;
                }
                let p = src.get_pixel(sx, sy);
                if src.format().is_colorkey(p) {
                    continue;
                }
                let mut c = src.format().get_rgba(p);
                c.a = ((u32::from(c.a) * u32::from(alpha)) / 255) as u8;
                if c.a == 0 {
                    continue;
                }
                self.blend_pixel(dx, dy, c, func);
            }
        }
    }
}

#[inline]
fn focus_pair(frac: f32) -> (f32, f32) {
    let (l1, l2) = wu_coverage(frac);
    focus(l1, l2)
}

/// Pixels of a Bresenham walk along major axis `a`, restricted to the steps
/// whose major coordinate falls in `0..limit`.
///
/// Step `k` sits at minor offset `(2*k*db + da) / (2*da)`, the closed form of
/// the error-term recurrence (ties step the minor axis), so the walk can
/// start and stop anywhere along the segment.
fn bresenham_steps(
    (a1, b1): (i64, i64),
    (a2, b2): (i64, i64),
    limit: i64,
) -> impl Iterator<Item = (i32, i32)> {
    let da = (a2 - a1).abs();
    let db = (b2 - b1).abs();
    let sa = if a2 >= a1 { 1 } else { -1 };
    let sb = if b2 >= b1 { 1 } else { -1 };
    let (first, last) = if sa > 0 {
        (-a1, limit - 1 - a1)
    } else {
        (a1 - (limit - 1), a1)
    };

    (first.max(0)..=last.min(da)).map(move |k| {
        let off = if da == 0 {
            0
        } else {
            ((2 * i128::from(k) * i128::from(db) + i128::from(da)) / (2 * i128::from(da))) as i64
        };
        ((a1 + sa * k) as i32, (b1 + sb * off) as i32)
    })
}

/// Row the midpoint circle algorithm picks at column `x`: the largest `y`
/// with `x^2 + (y - 1/2)^2 < r^2`, or `None` past the radius.
fn midpoint_y(r: i64, x: i64) -> Option<i64> {
    let t = 4 * (i128::from(r) * i128::from(r) - i128::from(x) * i128::from(x));
    if t <= 0 {
        return None;
    }
    let s = isqrt(t as u128 - 1);
    Some(((s + 1) / 2) as i64)
}

/// Largest `s` with `s * s <= n`
fn isqrt(n: u128) -> u128 {
    let mut s = (n as f64).sqrt() as u128;
    while s * s > n {
        s -= 1;
    }
    while (s + 1) * (s + 1) <= n {
        s += 1;
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::PixelFormat;
    use std::collections::HashSet;

    fn lit_pixels(s: &Surface) -> HashSet<(i32, i32)> {
        let mut set = HashSet::new();
        for y in 0..s.height() {
            for x in 0..s.width() {
                if s.get_pixel(x, y) != 0 {
                    set.insert((x as i32, y as i32));
                }
            }
        }
        set
    }

    #[test]
    fn test_bresenham_length_endpoints_connectivity() {
        let cases = [
            (2, 3, 40, 17),
            (40, 17, 2, 3),
            (5, 5, 5, 30),
            (30, 5, 1, 6),
            (10, 40, 25, 2),
            (7, 7, 7, 7),
            (0, 0, 47, 47),
        ];
        for (x1, y1, x2, y2) in cases {
            let mut s = Surface::rgba(48, 48);
            s.line(x1, y1, x2, y2, Color::WHITE);
            let px = lit_pixels(&s);
            let expected = (x2 - x1).abs().max((y2 - y1).abs()) + 1;
            assert_eq!(px.len() as i32, expected, "line {:?}", (x1, y1, x2, y2));
            assert!(px.contains(&(x1, y1)));
            assert!(px.contains(&(x2, y2)));
            // One pixel per major-axis step, each an 8-neighbour of the previous
            let x_major = (x2 - x1).abs() >= (y2 - y1).abs();
            let mut walk: Vec<(i32, i32)> = px.into_iter().collect();
            walk.sort_unstable_by_key(|&(x, y)| if x_major { (x, y) } else { (y, x) });
            for pair in walk.windows(2) {
                let ((ax, ay), (bx, by)) = (pair[0], pair[1]);
                let (major, minor) = if x_major { (bx - ax, by - ay) } else { (by - ay, bx - ax) };
                assert_eq!(major, 1, "gap or repeat at {:?} in {:?}", pair, (x1, y1, x2, y2));
                assert!(minor.abs() <= 1, "jump at {:?} in {:?}", pair, (x1, y1, x2, y2));
            }
        }
    }

    #[test]
    fn test_line_matches_error_term_walk() {
        // Reference: the plain incremental Bresenham recurrence
        fn walk(x1: i32, y1: i32, x2: i32, y2: i32) -> HashSet<(i32, i32)> {
            let (dx, dy) = ((x2 - x1).abs(), (y2 - y1).abs());
            let (sx, sy) = (if x2 >= x1 { 1 } else { -1 }, if y2 >= y1 { 1 } else { -1 });
            let (mut x, mut y) = (x1, y1);
            let mut out = HashSet::new();
            if dx >= dy {
                let mut d = 2 * dy - dx;
                for _ in 0..=dx {
                    out.insert((x, y));
                    if d < 0 {
                        d += 2 * dy;
                    } else {
                        d += 2 * (dy - dx);
                        y += sy;
                    }
                    x += sx;
                }
            } else {
                let mut d = 2 * dx - dy;
                for _ in 0..=dy {
                    out.insert((x, y));
                    if d < 0 {
                        d += 2 * dx;
                    } else {
                        d += 2 * (dx - dy);
                        x += sx;
                    }
                    y += sy;
                }
            }
            out
        }

        for (x1, y1, x2, y2) in [(0, 0, 31, 9), (31, 2, 0, 20), (3, 30, 9, 0), (5, 5, 25, 25), (0, 7, 31, 8)] {
            let mut s = Surface::rgba(32, 32);
            s.line(x1, y1, x2, y2, Color::WHITE);
            assert_eq!(lit_pixels(&s), walk(x1, y1, x2, y2), "line {:?}", (x1, y1, x2, y2));
        }
    }

    #[test]
    fn test_line_with_extreme_endpoints() {
        let mut s = Surface::rgba(8, 8);
        s.line(i32::MIN, 3, i32::MAX, 3, Color::WHITE);
        assert_eq!(lit_pixels(&s), (0..8).map(|x| (x, 3)).collect::<HashSet<_>>());

        let mut s = Surface::rgba(8, 8);
        s.line(4, i32::MIN, 4, i32::MAX, Color::WHITE);
        assert_eq!(lit_pixels(&s), (0..8).map(|y| (4, y)).collect::<HashSet<_>>());

        // Nearly flat across the whole i32 range: stays on one or two rows
        let mut s = Surface::rgba(8, 8);
        s.line(i32::MIN, 2, i32::MAX, 3, Color::WHITE);
        let lit = lit_pixels(&s);
        assert_eq!(lit.len(), 8);
        assert!(lit.iter().all(|&(_, y)| y == 2 || y == 3));

        // Diagonal that misses the surface entirely
        let mut s = Surface::rgba(8, 8);
        s.line(i32::MIN, i32::MIN, -1, i32::MAX, Color::WHITE);
        assert!(lit_pixels(&s).is_empty());
    }

    #[test]
    fn test_line_clips_silently() {
        let mut s = Surface::rgba(8, 8);
        s.line(-10, 4, 20, 4, Color::WHITE);
        assert_eq!(lit_pixels(&s).len(), 8);
    }

    #[test]
    fn test_wu_weights_sum_to_one() {
        for i in 0..=100 {
            let frac = i as f32 / 100.0;
            let (l1, l2) = wu_coverage(frac);
            assert!((l1 + l2 - 1.0).abs() < 1e-6);
        }
        // Horizontal line sits exactly on pixel centres: full weight on one pixel
        assert_eq!(wu_coverage(fpart(5.0)), (1.0, 0.0));
    }

    #[test]
    fn test_focus_boosts_balanced_weights() {
        let (l1, l2) = focus(0.5, 0.5);
        assert!((l1 - 0.8).abs() < 1e-6 && (l2 - 0.8).abs() < 1e-6);
        assert_eq!(focus(1.0, 0.0), (1.0, 0.0));
    }

    #[test]
    fn test_line_aa_horizontal_is_solid() {
        let mut s = Surface::rgba(16, 4);
        s.line_aa(2.0, 1.0, 12.0, 1.0, Color::rgb(255, 0, 0));
        for x in 3..12 {
            let c = s.get_color(x, 1);
            // d + (s - d) * 255 / 256 lands one LSB short of full intensity
            assert_eq!((c.r, c.a), (254, 255), "x={}", x);
            assert_eq!(s.get_pixel(x, 2), 0);
        }
    }

    #[test]
    fn test_line_aa_diagonal_touches_two_pixels() {
        let mut s = Surface::rgba(16, 16);
        s.line_aa(0.0, 0.0, 10.0, 5.0, Color::WHITE);
        let lit = lit_pixels(&s);
        assert!(lit.len() > 11);
        assert!(lit.iter().all(|&(_, y)| y <= 6));
    }

    #[test]
    fn test_circle_points_near_radius() {
        for radius in [1, 3, 7, 12, 20] {
            let mut s = Surface::rgba(64, 64);
            s.circle(32, 32, radius, Color::WHITE);
            let px = lit_pixels(&s);
            assert!(px.contains(&(32 - radius, 32)));
            assert!(px.contains(&(32 + radius, 32)));
            for (x, y) in px {
                let d = (((x - 32).pow(2) + (y - 32).pow(2)) as f32).sqrt();
                assert!((d - radius as f32).abs() <= 1.0, "r={} ({}, {})", radius, x, y);
            }
        }
    }

    #[test]
    fn test_circle_matches_midpoint_recurrence() {
        for radius in [1, 2, 5, 9, 15, 30] {
            let mut s = Surface::rgba(64, 64);
            s.circle(32, 32, radius, Color::WHITE);

            let mut expected = HashSet::new();
            let (mut x, mut y, mut d) = (0, radius, 1 - radius);
            while x <= y {
                for (px, py) in [(x, y), (-x, y), (x, -y), (-x, -y), (y, x), (-y, x), (y, -x), (-y, -x)] {
                    expected.insert((32 + px, 32 + py));
                }
                if d < 0 {
                    d += 2 * x + 3;
                } else {
                    d += 2 * (x - y) + 5;
                    y -= 1;
                }
                x += 1;
            }
            assert_eq!(lit_pixels(&s), expected, "r={}", radius);
        }
    }

    #[test]
    fn test_circle_with_extreme_radius() {
        // Ring passes through the surface: a near-vertical arc at x = 0
        let mut s = Surface::rgba(8, 8);
        s.circle(i32::MIN / 2, 4, 1 << 30, Color::WHITE);
        let lit = lit_pixels(&s);
        assert!(lit.contains(&(0, 4)));
        assert!(lit.iter().all(|&(x, _)| x <= 1));

        // Surface strictly inside the ring
        let mut s = Surface::rgba(8, 8);
        s.circle(4, 4, i32::MAX, Color::WHITE);
        assert!(lit_pixels(&s).is_empty());

        // Centre far away
        let mut s = Surface::rgba(8, 8);
        s.circle(i32::MAX, i32::MIN, 100, Color::WHITE);
        assert!(lit_pixels(&s).is_empty());
    }

    #[test]
    fn test_blend_src_alpha_reads_back() {
        let mut s = Surface::rgba(2, 2);
        s.clear(Color::rgba(0, 100, 200, 40));
        s.blend_pixel(1, 1, Color::rgba(250, 0, 0, 173), BlendFn::SrcAlpha);
        assert_eq!(s.get_color(1, 1).a, 173);
    }

    #[test]
    fn test_blend_alpha_policies() {
        assert_eq!(BlendFn::OverlayAlpha.alpha(200, 100), 255);
        assert_eq!(BlendFn::OverlayAlpha.alpha(20, 100), 120);
        assert_eq!(BlendFn::AverageAlpha.alpha(2, 100), 100);
        assert_eq!(BlendFn::AverageAlpha.alpha(255, 255), 255);
        assert_eq!(BlendFn::SrcAlpha.alpha(9, 77), 77);
        assert_eq!(BlendFn::DstAlpha.alpha(9, 77), 9);
    }

    #[test]
    fn test_blend_rgb_mix() {
        let mut s = Surface::rgba(1, 1);
        s.clear(Color::rgba(0, 0, 0, 255));
        s.blend_pixel(0, 0, Color::rgba(255, 128, 0, 128), BlendFn::DstAlpha);
        let c = s.get_color(0, 0);
        assert_eq!((c.r, c.g, c.b, c.a), (127, 64, 0, 255));
    }

    #[test]
    fn test_blend_onto_colorkey_replaces() {
        let mut s = Surface::new(1, 1, PixelFormat::rgba8888().with_colorkey(0));
        s.blend_pixel(0, 0, Color::rgba(10, 20, 30, 50), BlendFn::OverlayAlpha);
        assert_eq!(s.get_color(0, 0), Color::rgba(10, 20, 30, 50));
    }

    #[test]
    fn test_hline_swaps_and_clamps_all_widths() {
        for fmt in [
            PixelFormat::rgb332(),
            PixelFormat::rgb565(),
            PixelFormat::rgb888(),
            PixelFormat::rgba8888(),
        ] {
            let mut s = Surface::new(10, 3, fmt);
            let v = s.map(Color::WHITE);
            s.hline(20, -5, 1, v);
            for x in 0..10 {
                assert_eq!(s.get_pixel(x, 1), v);
                assert_eq!(s.get_pixel(x, 0), 0);
            }
            s.hline(0, 9, 7, v);
            assert!((0..10).all(|x| s.get_pixel(x, 2) == 0));
        }
    }
}
