//! Interactive element construction.
//!
//! Each tool is a small state machine fed discrete mouse events. While a
//! tool is mid-construction the element it builds is the last one in the
//! sketch and an undo block is open; finishing or cancelling commits it.

use super::element::{Circle, Element, Line, Polygon, PolygonStyle};
use super::Sketch;
use crate::geometry::Point;
use crate::input::MouseButton;

/// What a second left click does with the line tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineMode {
    /// Two-point segments: the second click ends the line
    #[default]
    Segment,
    /// Keep appending vertices until a non-left click
    Strip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineState {
    Begin,
    Continue { element: usize },
}

#[derive(Debug, Clone)]
pub struct LineTool {
    state: LineState,
    pub mode: LineMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CircleState {
    Begin,
    SetRadius { element: usize },
}

#[derive(Debug, Clone)]
pub struct CircleTool {
    state: CircleState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PolygonState {
    Begin,
    Continue { element: usize },
}

#[derive(Debug, Clone)]
pub struct PolygonTool {
    state: PolygonState,
    /// Show the fill while vertices are being placed
    pub preview_fill: bool,
    pub style: PolygonStyle,
}

#[derive(Debug, Clone, Default)]
pub enum Tool {
    /// No construction; clicks select elements
    #[default]
    Select,
    Line(LineTool),
    Circle(CircleTool),
    Polygon(PolygonTool),
}

impl Tool {
    pub fn line(mode: LineMode) -> Self {
        Tool::Line(LineTool {
            state: LineState::Begin,
            mode,
        })
    }

    pub fn circle() -> Self {
        Tool::Circle(CircleTool {
            state: CircleState::Begin,
        })
    }

    pub fn polygon() -> Self {
        Tool::Polygon(PolygonTool {
            state: PolygonState::Begin,
            preview_fill: false,
            style: PolygonStyle::Solid,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tool::Select => "select",
            Tool::Line(_) => "line",
            Tool::Circle(_) => "circle",
            Tool::Polygon(_) => "polygon",
        }
    }

    /// True while an element is under construction
    pub fn is_active(&self) -> bool {
        match self {
            Tool::Select => false,
            Tool::Line(t) => t.state != LineState::Begin,
            Tool::Circle(t) => t.state != CircleState::Begin,
            Tool::Polygon(t) => t.state != PolygonState::Begin,
        }
    }

    /// Returns true if the click was consumed
    pub fn mouse_down(&mut self, sketch: &mut Sketch, p: Point, button: MouseButton) -> bool {
        match self {
            Tool::Select => false,
            Tool::Line(t) => t.mouse_down(sketch, p, button),
            Tool::Circle(t) => t.mouse_down(sketch, p, button),
            Tool::Polygon(t) => t.mouse_down(sketch, p, button),
        }
    }

    pub fn mouse_motion(&mut self, sketch: &mut Sketch, p: Point) -> bool {
        match self {
            Tool::Select => false,
            Tool::Line(t) => t.mouse_motion(sketch, p),
            Tool::Circle(t) => t.mouse_motion(sketch, p),
            Tool::Polygon(t) => t.mouse_motion(sketch, p),
        }
    }

    /// Throw away the element under construction, if any
    pub fn cancel(&mut self, sketch: &mut Sketch) {
        let element = match self {
            Tool::Select => None,
            Tool::Line(t) => match std::mem::replace(&mut t.state, LineState::Begin) {
                LineState::Continue { element } => Some(element),
                LineState::Begin => None,
            },
            Tool::Circle(t) => match std::mem::replace(&mut t.state, CircleState::Begin) {
                CircleState::SetRadius { element } => Some(element),
                CircleState::Begin => None,
            },
            Tool::Polygon(t) => match std::mem::replace(&mut t.state, PolygonState::Begin) {
                PolygonState::Continue { element } => Some(element),
                PolygonState::Begin => None,
            },
        };
        if let Some(idx) = element {
            sketch.remove_element(idx);
            sketch.commit_undo_block();
        }
    }
}

fn line_mut(sketch: &mut Sketch, idx: usize) -> Option<&mut Line> {
    match sketch.element_mut(idx) {
        Some(Element::Line(l)) => Some(l),
        _ => None,
    }
}

fn circle_mut(sketch: &mut Sketch, idx: usize) -> Option<&mut Circle> {
    match sketch.element_mut(idx) {
        Some(Element::Circle(c)) => Some(c),
        _ => None,
    }
}

fn polygon_mut(sketch: &mut Sketch, idx: usize) -> Option<&mut Polygon> {
    match sketch.element_mut(idx) {
        Some(Element::Polygon(p)) => Some(p),
        _ => None,
    }
}

impl LineTool {
    fn mouse_down(&mut self, sketch: &mut Sketch, p: Point, button: MouseButton) -> bool {
        match self.state {
            LineState::Begin => {
                if button != MouseButton::Left {
                    return false;
                }
                sketch.begin_undo_block();
                let color = sketch.hsva.to_color();
                let element = sketch.push_element(Element::Line(Line::new(vec![p, p], color)));
                self.state = LineState::Continue { element };
            }
            LineState::Continue { element } => {
                if button == MouseButton::Left {
                    let Some(line) = line_mut(sketch, element) else {
                        self.state = LineState::Begin;
                        return true;
                    };
                    if let Some(last) = line.vertices.last_mut() {
                        *last = p;
                    }
                    match self.mode {
                        LineMode::Segment => {
                            sketch.commit_undo_block();
                            self.state = LineState::Begin;
                        }
                        // New tracking vertex
                        LineMode::Strip => line.vertices.push(p),
                    }
                } else {
                    self.finish(sketch, element);
                }
            }
        }
        true
    }

    fn finish(&mut self, sketch: &mut Sketch, element: usize) {
        self.state = LineState::Begin;
        let keep = match self.mode {
            LineMode::Segment => false,
            LineMode::Strip => match line_mut(sketch, element) {
                Some(line) => {
                    line.vertices.pop();
                    line.vertices.len() >= 2
                }
                None => true,
            },
        };
        if !keep {
            sketch.remove_element(element);
        }
        sketch.commit_undo_block();
    }

    fn mouse_motion(&mut self, sketch: &mut Sketch, p: Point) -> bool {
        let LineState::Continue { element } = self.state else {
            return false;
        };
        if let Some(last) = line_mut(sketch, element).and_then(|l| l.vertices.last_mut()) {
            *last = p;
        }
        true
    }
}

impl CircleTool {
    fn mouse_down(&mut self, sketch: &mut Sketch, p: Point, button: MouseButton) -> bool {
        match self.state {
            CircleState::Begin => {
                if button != MouseButton::Left {
                    return false;
                }
                sketch.begin_undo_block();
                let color = sketch.hsva.to_color();
                let element = sketch.push_element(Element::Circle(Circle::new(p, 0.0, color)));
                self.state = CircleState::SetRadius { element };
            }
            CircleState::SetRadius { element } => {
                self.state = CircleState::Begin;
                if button == MouseButton::Right {
                    sketch.remove_element(element);
                } else if let Some(c) = circle_mut(sketch, element) {
                    c.radius = c.center.distance_to(&p);
                }
                sketch.commit_undo_block();
            }
        }
        true
    }

    fn mouse_motion(&mut self, sketch: &mut Sketch, p: Point) -> bool {
        let CircleState::SetRadius { element } = self.state else {
            return false;
        };
        if let Some(c) = circle_mut(sketch, element) {
            c.radius = c.center.distance_to(&p);
        }
        true
    }
}

impl PolygonTool {
    fn mouse_down(&mut self, sketch: &mut Sketch, p: Point, button: MouseButton) -> bool {
        match self.state {
            PolygonState::Begin => {
                if button != MouseButton::Left {
                    return false;
                }
                sketch.begin_undo_block();
                let mut poly = Polygon::new(vec![p, p], sketch.hsva.to_color());
                poly.outline = !self.preview_fill;
                poly.style = self.style.clone();
                let element = sketch.push_element(Element::Polygon(poly));
                self.state = PolygonState::Continue { element };
            }
            PolygonState::Continue { element } => {
                if button == MouseButton::Left {
                    if let Some(poly) = polygon_mut(sketch, element) {
                        if let Some(last) = poly.vertices.last_mut() {
                            *last = p;
                        }
                        poly.vertices.push(p);
                    }
                } else {
                    self.finish(sketch, element);
                }
            }
        }
        true
    }

    /// Drop the tracking vertex; fewer than three real vertices discards
    /// the polygon.
    fn finish(&mut self, sketch: &mut Sketch, element: usize) {
        self.state = PolygonState::Begin;
        let keep = match polygon_mut(sketch, element) {
            Some(poly) if poly.vertices.len() > 3 => {
                poly.vertices.pop();
                poly.outline = false;
                true
            }
            _ => false,
        };
        if !keep {
            sketch.remove_element(element);
        }
        sketch.commit_undo_block();
    }

    fn mouse_motion(&mut self, sketch: &mut Sketch, p: Point) -> bool {
        let PolygonState::Continue { element } = self.state else {
            return false;
        };
        if let Some(last) = polygon_mut(sketch, element).and_then(|poly| poly.vertices.last_mut()) {
            *last = p;
        }
        true
    }
}
