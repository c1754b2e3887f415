//! Projection of a sketch's outlines onto a tile with anti-aliased lines.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::RenderContext;
use crate::color::Color;
use crate::display::Surface;
use crate::geometry::Point;
use crate::sketch::Element;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchProjection {
    pub sketch: String,
    /// Overrides each element's own color
    #[serde(default)]
    pub color: Option<Color>,
    #[serde(default = "opaque")]
    pub alpha: u8,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
}

fn opaque() -> u8 {
    255
}

impl SketchProjection {
    pub fn new(sketch: impl Into<String>) -> Self {
        Self {
            sketch: sketch.into(),
            color: None,
            alpha: 255,
            x: 0,
            y: 0,
        }
    }

    pub fn apply(&self, surface: &mut Surface, ctx: &RenderContext<'_>) {
        let Some(sketch) = ctx.sketch(&self.sketch) else {
            debug!(sketch = %self.sketch, "sketch projection: no such sketch, skipping");
            return;
        };
        let (ox, oy) = (self.x as f32, self.y as f32);

        for element in sketch.elements() {
            let mut c = self.color.unwrap_or_else(|| element.color());
            c.a = ((u32::from(c.a) * u32::from(self.alpha)) / 255) as u8;
            if c.a == 0 {
                continue;
            }
            match element {
                Element::Line(line) => stroke(surface, &line.vertices, false, ox, oy, c),
                Element::Polygon(poly) => stroke(surface, &poly.vertices, true, ox, oy, c),
                Element::Circle(circle) => {
                    let verts = circle_outline(circle.center, circle.radius);
                    stroke(surface, &verts, true, ox, oy, c);
                }
            }
        }
    }
}

fn stroke(surface: &mut Surface, verts: &[Point], closed: bool, ox: f32, oy: f32, c: Color) {
    let n = verts.len();
    if n < 2 {
        return;
    }
    let segments = if closed { n } else { n - 1 };
    for i in 0..segments {
        let a = verts[i];
        let b = verts[(i + 1) % n];
        surface.line_aa(a.x + ox, a.y + oy, b.x + ox, b.y + oy, c);
    }
}

/// Polygonal approximation, roughly one segment per four pixels of arc
fn circle_outline(center: Point, radius: f32) -> Vec<Point> {
    let n = ((TAU * radius) / 4.0).ceil().clamp(12.0, 128.0) as usize;
    (0..n)
        .map(|i| {
            let t = TAU * i as f32 / n as f32;
            Point::new(center.x + radius * t.cos(), center.y + radius * t.sin())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::sketch::{Line, Sketch};

    #[test]
    fn test_projects_line_at_offset() {
        let mut sketch = Sketch::new("s", 32, 32);
        sketch.push_element(Element::Line(Line::new(
            vec![Point::new(0.0, 2.0), Point::new(10.0, 2.0)],
            Color::WHITE,
        )));
        let mut sketches = Arena::new();
        sketches.insert(sketch);
        let textures = Arena::new();
        let ctx = RenderContext::new(&textures, &sketches);

        let mut proj = SketchProjection::new("s");
        proj.x = 5;
        proj.y = 3;
        let mut s = Surface::rgba(32, 32);
        proj.apply(&mut s, &ctx);
        assert!(s.get_color(10, 5).a > 0);
        assert_eq!(s.get_color(2, 2).a, 0);
    }

    #[test]
    fn test_missing_sketch_is_skipped() {
        let textures = Arena::new();
        let sketches = Arena::new();
        let ctx = RenderContext::new(&textures, &sketches);
        let mut s = Surface::rgba(4, 4);
        SketchProjection::new("ghost").apply(&mut s, &ctx);
        assert_eq!(s, Surface::rgba(4, 4));
    }

    #[test]
    fn test_circle_outline_stays_on_radius() {
        for p in circle_outline(Point::new(10.0, 10.0), 8.0) {
            assert!((p.distance_to(&Point::new(10.0, 10.0)) - 8.0).abs() < 1e-3);
        }
    }
}
