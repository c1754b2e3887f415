//! Vector elements a sketch is made of.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::arena::Arena;
use crate::color::Color;
use crate::display::Surface;
use crate::feature::{fill_polygon, outline_polygon, texture_polygon};
use crate::geometry::{distance_to_outline, point_in_polygon, Point};
use crate::texture::{self, Texture};

/// Open polyline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub vertices: Vec<Point>,
    pub color: Color,
}

impl Line {
    pub fn new(vertices: Vec<Point>, color: Color) -> Self {
        Self { vertices, color }
    }

    pub fn intersect(&self, p: Point) -> f32 {
        distance_to_outline(p, &self.vertices, false)
    }

    fn draw(&self, surface: &mut Surface, dx: i32, dy: i32, c: Color) {
        match self.vertices.as_slice() {
            [] => {}
            [v] => {
                let (x, y) = v.to_pixel();
                let value = surface.map(c);
                surface.put_pixel_clipped(x.saturating_add(dx), y.saturating_add(dy), value);
            }
            verts => {
                for pair in verts.windows(2) {
                    let (x1, y1) = pair[0].to_pixel();
                    let (x2, y2) = pair[1].to_pixel();
                    surface.line(
                        x1.saturating_add(dx),
                        y1.saturating_add(dy),
                        x2.saturating_add(dx),
                        y2.saturating_add(dy),
                        c,
                    );
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point,
    pub radius: f32,
    pub color: Color,
}

impl Circle {
    pub fn new(center: Point, radius: f32, color: Color) -> Self {
        Self {
            center,
            radius,
            color,
        }
    }

    /// Distance to the circumference
    pub fn intersect(&self, p: Point) -> f32 {
        (p.distance_to(&self.center) - self.radius).abs()
    }

    fn draw(&self, surface: &mut Surface, dx: i32, dy: i32, c: Color) {
        let (cx, cy) = self.center.to_pixel();
        surface.circle(cx.saturating_add(dx), cy.saturating_add(dy), self.radius.round() as i32, c);
    }
}

/// How a finished polygon is filled
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PolygonStyle {
    /// Outline only
    None,
    #[default]
    Solid,
    /// Fill from the named texture
    Textured(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub vertices: Vec<Point>,
    /// Drawn as a line loop while it is being constructed
    pub outline: bool,
    #[serde(default)]
    pub style: PolygonStyle,
    pub color: Color,
}

impl Polygon {
    pub fn new(vertices: Vec<Point>, color: Color) -> Self {
        Self {
            vertices,
            outline: false,
            style: PolygonStyle::Solid,
            color,
        }
    }

    /// Device coordinates, offset by (dx, dy)
    pub fn points(&self, dx: i32, dy: i32) -> Vec<(i32, i32)> {
        self.vertices
            .iter()
            .map(|v| {
                let (x, y) = v.to_pixel();
                (x.saturating_add(dx), y.saturating_add(dy))
            })
            .collect()
    }

    /// Zero inside a filled polygon, otherwise distance to the nearest edge
    pub fn intersect(&self, p: Point) -> f32 {
        if !self.outline && point_in_polygon(p, &self.vertices) {
            return 0.0;
        }
        distance_to_outline(p, &self.vertices, true)
    }

    /// Rasterize at offset (dx, dy). `highlight` outlines the polygon on
    /// top of its fill.
    pub fn draw(
        &self,
        surface: &mut Surface,
        dx: i32,
        dy: i32,
        textures: &Arena<Texture>,
        highlight: Option<Color>,
    ) {
        let pts = self.points(dx, dy);
        if self.outline || pts.len() < 3 {
            outline_polygon(surface, &pts, highlight.unwrap_or(self.color));
            return;
        }

        match &self.style {
            PolygonStyle::None => outline_polygon(surface, &pts, self.color),
            PolygonStyle::Solid => fill_polygon(surface, &pts, self.color),
            PolygonStyle::Textured(name) => match texture::lookup(textures, name) {
                Some(tex) => texture_polygon(surface, &pts, tex),
                None => debug!(texture = %name, "polygon: no such texture, skipping"),
            },
        }
        if let Some(c) = highlight {
            outline_polygon(surface, &pts, c);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Element {
    Line(Line),
    Circle(Circle),
    Polygon(Polygon),
}

impl Element {
    pub fn color(&self) -> Color {
        match self {
            Element::Line(l) => l.color,
            Element::Circle(c) => c.color,
            Element::Polygon(p) => p.color,
        }
    }

    pub fn set_color(&mut self, color: Color) {
        match self {
            Element::Line(l) => l.color = color,
            Element::Circle(c) => c.color = color,
            Element::Polygon(p) => p.color = color,
        }
    }

    /// Hit-test distance from `p`; smaller is closer
    pub fn intersect(&self, p: Point) -> f32 {
        match self {
            Element::Line(l) => l.intersect(p),
            Element::Circle(c) => c.intersect(p),
            Element::Polygon(poly) => poly.intersect(p),
        }
    }

    pub fn draw(
        &self,
        surface: &mut Surface,
        dx: i32,
        dy: i32,
        textures: &Arena<Texture>,
        highlight: Option<Color>,
    ) {
        match self {
            Element::Line(l) => l.draw(surface, dx, dy, highlight.unwrap_or(l.color)),
            Element::Circle(c) => c.draw(surface, dx, dy, highlight.unwrap_or(c.color)),
            Element::Polygon(poly) => poly.draw(surface, dx, dy, textures, highlight),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Polygon {
        Polygon::new(
            vec![
                Point::new(2.0, 2.0),
                Point::new(12.0, 2.0),
                Point::new(12.0, 12.0),
                Point::new(2.0, 12.0),
            ],
            Color::WHITE,
        )
    }

    #[test]
    fn test_intersect_distances() {
        let line = Line::new(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)], Color::WHITE);
        assert_eq!(line.intersect(Point::new(5.0, 2.0)), 2.0);

        let circle = Circle::new(Point::new(0.0, 0.0), 5.0, Color::WHITE);
        assert_eq!(circle.intersect(Point::new(3.0, 0.0)), 2.0);
        assert_eq!(circle.intersect(Point::new(8.0, 0.0)), 3.0);

        let mut poly = square();
        assert_eq!(poly.intersect(Point::new(7.0, 7.0)), 0.0);
        assert_eq!(poly.intersect(Point::new(15.0, 7.0)), 3.0);
        poly.outline = true;
        assert_eq!(poly.intersect(Point::new(7.0, 7.0)), 5.0);
    }

    #[test]
    fn test_polygon_styles() {
        let textures = Arena::new();
        let mut poly = square();

        let mut s = Surface::rgba(16, 16);
        poly.draw(&mut s, 0, 0, &textures, None);
        assert_ne!(s.get_pixel(7, 7), 0);

        poly.style = PolygonStyle::None;
        let mut s = Surface::rgba(16, 16);
        poly.draw(&mut s, 0, 0, &textures, None);
        assert_eq!(s.get_pixel(7, 7), 0);
        assert_ne!(s.get_pixel(2, 7), 0);

        // Unknown texture draws nothing
        poly.style = PolygonStyle::Textured("missing".into());
        let mut s = Surface::rgba(16, 16);
        poly.draw(&mut s, 0, 0, &textures, None);
        assert_eq!(s, Surface::rgba(16, 16));
    }

    #[test]
    fn test_highlight_recolors_line() {
        let textures = Arena::new();
        let e = Element::Line(Line::new(
            vec![Point::new(0.0, 1.0), Point::new(5.0, 1.0)],
            Color::WHITE,
        ));
        let mut s = Surface::rgba(8, 4);
        e.draw(&mut s, 1, 1, &textures, Some(Color::rgb(0, 255, 0)));
        assert_eq!(s.get_color(3, 2), Color::rgb(0, 255, 0));
    }

    #[test]
    fn test_far_off_elements_draw_clipped() {
        let textures = Arena::new();
        let elements = [
            Element::Line(Line::new(
                vec![Point::new(-3.0e9, 0.0), Point::new(3.0e9, 1.0)],
                Color::WHITE,
            )),
            Element::Circle(Circle::new(Point::new(4.0, 4.0), 3.0e9, Color::WHITE)),
            Element::Polygon(Polygon::new(
                vec![
                    Point::new(-3.0e9, -3.0e9),
                    Point::new(3.0e9, -3.0e9),
                    Point::new(0.0, 3.0e9),
                ],
                Color::WHITE,
            )),
        ];
        for e in &elements {
            let mut s = Surface::rgba(8, 8);
            e.draw(&mut s, 5, -5, &textures, None);
            e.draw(&mut s, -5, 5, &textures, None);
        }

        let mut s = Surface::rgba(8, 8);
        elements[0].draw(&mut s, 0, 2, &textures, None);
        assert!((0..8).all(|x| s.get_pixel(x, 2) != 0 || s.get_pixel(x, 3) != 0));

        let mut s = Surface::rgba(8, 8);
        elements[2].draw(&mut s, 0, 0, &textures, None);
        assert_ne!(s.get_pixel(4, 4), 0);
    }
}
