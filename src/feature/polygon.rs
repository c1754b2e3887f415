//! Scan-conversion polygon fill and the polygon feature.
//!
//! Intersections are computed in 16.16 fixed point and spans are paired with
//! the even-odd rule, so self-intersecting outlines leave doubly covered
//! regions empty.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::RenderContext;
use crate::color::Color;
use crate::display::Surface;
use crate::sketch::Element;
use crate::texture::Texture;

/// Walk the even-odd spans of a closed polygon over the scanlines in `rows`.
///
/// Calls `span(xa, xb, y)` with inclusive endpoints for every filled run.
/// Edges are sampled half-open (`y1 <= y < y2`) except on the polygon's
/// last scanline, which takes edges ending there so the bottom row isn't
/// lost. Scanlines outside `rows` are never visited.
pub fn scan_polygon(points: &[(i32, i32)], rows: Range<i32>, mut span: impl FnMut(i32, i32, i32)) {
    let n = points.len();
    if n < 3 || rows.is_empty() {
        return;
    }

    let mut min_y = i32::MAX;
    let mut max_y = i32::MIN;
    for &(_, y) in points {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }

    let first = min_y.max(rows.start);
    let last = max_y.min(rows.end.saturating_sub(1));

    // Reused per scanline
    let mut ints: Vec<i64> = Vec::with_capacity(n);

    for y in first..=last {
        ints.clear();
        for i in 0..n {
            let (ind1, ind2) = if i == 0 { (n - 1, 0) } else { (i - 1, i) };
            let (mut x1, mut y1) = points[ind1];
            let (mut x2, mut y2) = points[ind2];
            if y1 > y2 {
                std::mem::swap(&mut x1, &mut x2);
                std::mem::swap(&mut y1, &mut y2);
            } else if y1 == y2 {
                continue;
            }
            if (y >= y1 && y < y2) || (y == max_y && y > y1 && y <= y2) {
                let (x1, y1, x2, y2, yy) = (
                    i64::from(x1),
                    i64::from(y1),
                    i64::from(x2),
                    i64::from(y2),
                    i64::from(y),
                );
                ints.push((((yy - y1) << 16) / (y2 - y1)) * (x2 - x1) + (x1 << 16));
            }
        }

        ints.sort_unstable();
        for pair in ints.chunks_exact(2) {
            // Nudge one fixed-point unit inward before rounding
            let xa = pair[0] + 1;
            let xa = (xa >> 16) + ((xa & 0x8000) >> 15);
            let xb = pair[1] - 1;
            let xb = (xb >> 16) + ((xb & 0x8000) >> 15);
            span(xa as i32, xb as i32, y);
        }
    }
}

/// Solid even-odd fill
pub fn fill_polygon(surface: &mut Surface, points: &[(i32, i32)], c: Color) {
    let value = surface.map(c);
    let rows = 0..surface.height() as i32;
    scan_polygon(points, rows, |xa, xb, y| surface.hline(xa, xb, y, value));
}

/// Even-odd fill sampling `texture` with wrap-around addressing
pub fn texture_polygon(surface: &mut Surface, points: &[(i32, i32)], texture: &Texture) {
    let rows = 0..surface.height() as i32;
    scan_polygon(points, rows, |xa, xb, y| {
        let start = xa.max(0);
        let end = xb.min(surface.width() as i32 - 1);
        for x in start..=end {
            let v = surface.map(texture.sample(x, y));
            surface.put_pixel(x, y, v);
        }
    });
}

/// Closed line loop through the points (outline preview, degenerate input)
pub fn outline_polygon(surface: &mut Surface, points: &[(i32, i32)], c: Color) {
    match points.len() {
        0 => {}
        1 => {
            let v = surface.map(c);
            surface.put_pixel_clipped(points[0].0, points[0].1, v);
        }
        n => {
            for i in 0..n {
                let (x1, y1) = points[i];
                let (x2, y2) = points[(i + 1) % n];
                surface.line(x1, y1, x2, y2, c);
            }
        }
    }
}

/// Which polygons of the referenced sketch a feature renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PolygonSource {
    #[default]
    All,
    SelectedOnly,
}

/// Renders the polygon elements of a named sketch into a tile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonFeature {
    pub sketch: String,
    #[serde(default)]
    pub source: PolygonSource,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
}

impl PolygonFeature {
    pub fn new(sketch: impl Into<String>) -> Self {
        Self {
            sketch: sketch.into(),
            source: PolygonSource::All,
            x: 0,
            y: 0,
        }
    }

    pub fn apply(&self, surface: &mut Surface, ctx: &RenderContext<'_>) {
        let Some(sketch) = ctx.sketch(&self.sketch) else {
            debug!(sketch = %self.sketch, "polygon feature: no such sketch, skipping");
            return;
        };
        for (i, element) in sketch.elements().iter().enumerate() {
            let Element::Polygon(poly) = element else {
                continue;
            };
            if self.source == PolygonSource::SelectedOnly && !sketch.is_selected(i) {
                continue;
            }
            poly.draw(surface, self.x, self.y, ctx.textures, None);
        }
    }
}
