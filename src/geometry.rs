//! Geometry utilities for hit-testing vector elements

use serde::{Deserialize, Serialize};

/// A point in sketch space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f32 {
        length(self.x - other.x, self.y - other.y)
    }

    /// Nearest integer pixel
    #[inline]
    pub fn to_pixel(self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }
}

/// Calculate the length of a 2D vector
#[inline]
pub fn length(x: f32, y: f32) -> f32 {
    (x * x + y * y).sqrt()
}

/// Calculate squared distance between two points (avoids sqrt)
#[inline]
pub fn distance_squared(a: Point, b: Point) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dx * dx + dy * dy
}

/// Distance from `p` to the segment `a`-`b`
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let len_sq = distance_squared(a, b);
    if len_sq <= f32::EPSILON {
        return p.distance_to(&a);
    }
    let t = (((p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y)) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y));
    p.distance_to(&proj)
}

/// Even-odd point-in-polygon test (ray casting)
pub fn point_in_polygon(p: Point, vertices: &[Point]) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;

    for i in 0..n {
        let vi = vertices[i];
        let vj = vertices[j];

        // Skip horizontal edges (avoid division by zero)
        let dy = vj.y - vi.y;
        if dy.abs() > f32::EPSILON && ((vi.y > p.y) != (vj.y > p.y)) {
            let x_intersect = (vj.x - vi.x) * (p.y - vi.y) / dy + vi.x;
            if p.x < x_intersect {
                inside = !inside;
            }
        }
        j = i;
    }

    inside
}

/// Minimum distance from `p` to the edges of a closed polygon
pub fn distance_to_outline(p: Point, vertices: &[Point], closed: bool) -> f32 {
    match vertices.len() {
        0 => f32::INFINITY,
        1 => p.distance_to(&vertices[0]),
        n => {
            let segments = if closed { n } else { n - 1 };
            (0..segments)
                .map(|i| distance_to_segment(p, vertices[i], vertices[(i + 1) % n]))
                .fold(f32::INFINITY, f32::min)
        }
    }
}
