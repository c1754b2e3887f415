//! Sketches: small vector documents rasterized into a cached surface.

mod element;
mod tools;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use element::{Circle, Element, Line, Polygon, PolygonStyle};
pub use tools::{CircleTool, LineMode, LineTool, PolygonTool, Tool};

use crate::arena::Arena;
use crate::color::{Color, Hsva};
use crate::config::{EditorConfig, GridConfig};
use crate::display::{BlendFn, Surface};
use crate::geometry::Point;
use crate::input::{self, InputEvent, Key, MouseButton};
use crate::texture::Texture;
use crate::undo::History;

/// Element list before and after one user action
#[derive(Debug, Clone, Default)]
pub struct SketchBlock {
    before: Vec<Element>,
    after: Vec<Element>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sketch {
    pub name: String,
    width: u32,
    height: u32,
    /// Color given to newly drawn elements
    pub hsva: Hsva,
    /// Background of the cached surface
    #[serde(default = "transparent")]
    pub fill_color: Color,
    elements: Vec<Element>,

    #[serde(skip)]
    selection: BTreeSet<usize>,
    #[serde(skip)]
    history: History<SketchBlock>,
    /// An undo block is open and waiting for `commit_undo_block`
    #[serde(skip)]
    pending: bool,
    #[serde(skip)]
    surface: Option<Surface>,
    /// Tile elements referencing this sketch
    #[serde(skip)]
    pub(crate) nrefs: u32,
}

fn transparent() -> Color {
    Color::TRANSPARENT
}

impl Sketch {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            hsva: Hsva::default(),
            fill_color: Color::TRANSPARENT,
            elements: Vec::new(),
            selection: BTreeSet::new(),
            history: History::new(),
            pending: false,
            surface: None,
            nrefs: 0,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn nrefs(&self) -> u32 {
        self.nrefs
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn element(&self, idx: usize) -> Option<&Element> {
        self.elements.get(idx)
    }

    pub fn element_mut(&mut self, idx: usize) -> Option<&mut Element> {
        self.elements.get_mut(idx)
    }

    /// Append an element, returning its index. Wrap in an undo block to
    /// make it undoable.
    pub fn push_element(&mut self, element: Element) -> usize {
        self.elements.push(element);
        self.elements.len() - 1
    }

    /// Remove an element, shifting later selection indices down
    pub fn remove_element(&mut self, idx: usize) -> Option<Element> {
        if idx >= self.elements.len() {
            return None;
        }
        let removed = self.elements.remove(idx);
        self.selection = self
            .selection
            .iter()
            .filter(|&&i| i != idx)
            .map(|&i| if i > idx { i - 1 } else { i })
            .collect();
        Some(removed)
    }

    // Selection

    pub fn is_selected(&self, idx: usize) -> bool {
        self.selection.contains(&idx)
    }

    pub fn selection(&self) -> impl Iterator<Item = usize> + '_ {
        self.selection.iter().copied()
    }

    pub fn select(&mut self, idx: usize) {
        if idx < self.elements.len() {
            self.selection.insert(idx);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Closest element to `p` within `threshold`
    pub fn nearest_element(&self, p: Point, threshold: f32) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (i, e) in self.elements.iter().enumerate() {
            let d = e.intersect(p);
            if d <= threshold && best.map_or(true, |(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Click selection. `additive` toggles the hit element and keeps the
    /// rest; otherwise the hit element becomes the whole selection.
    pub fn select_at(&mut self, p: Point, additive: bool, threshold: f32) -> Option<usize> {
        let hit = self.nearest_element(p, threshold);
        if !additive {
            self.selection.clear();
        }
        if let Some(idx) = hit {
            if additive && self.selection.contains(&idx) {
                self.selection.remove(&idx);
            } else {
                self.selection.insert(idx);
            }
        }
        hit
    }

    /// Remove every selected element as one undoable action
    pub fn delete_selected(&mut self) -> bool {
        if self.selection.is_empty() {
            return false;
        }
        self.begin_undo_block();
        let doomed: Vec<usize> = self.selection.iter().rev().copied().collect();
        for idx in doomed {
            self.elements.remove(idx);
        }
        self.selection.clear();
        self.commit_undo_block();
        true
    }

    // Undo

    /// Snapshot the element list ahead of a change
    pub fn begin_undo_block(&mut self) {
        if self.pending {
            self.commit_undo_block();
        }
        let before = self.elements.clone();
        self.history.begin_block().before = before;
        self.pending = true;
    }

    /// Record the result of the change; a change that left the element
    /// list as it was leaves no undo step.
    pub fn commit_undo_block(&mut self) {
        if !self.pending {
            return;
        }
        self.pending = false;
        let after = self.elements.clone();
        self.history.current_mut().after = after;
        self.history.discard_current_if(|b| b.before == b.after);
    }

    pub fn can_undo(&self) -> bool {
        self.pending || self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        !self.pending && self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        self.commit_undo_block();
        let Some(block) = self.history.undo() else {
            return false;
        };
        self.elements = block.before.clone();
        self.selection.clear();
        debug!(sketch = %self.name, cursor = self.history.cursor(), "sketch undo");
        true
    }

    pub fn redo(&mut self) -> bool {
        self.commit_undo_block();
        let Some(block) = self.history.redo() else {
            return false;
        };
        self.elements = block.after.clone();
        self.selection.clear();
        debug!(sketch = %self.name, cursor = self.history.cursor(), "sketch redo");
        true
    }

    // Rendering

    /// Last generated raster, if any
    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    /// Rasterize every element, in order, into the cached surface
    pub fn generate(&mut self, textures: &Arena<Texture>, cfg: &EditorConfig) {
        let mut surface = match self.surface.take() {
            Some(s) if s.width() == self.width && s.height() == self.height => s,
            _ => Surface::new(self.width, self.height, cfg.pixel_format),
        };
        surface.clear(self.fill_color);
        if cfg.grid.enabled {
            draw_grid(&mut surface, &cfg.grid);
        }
        for (i, element) in self.elements.iter().enumerate() {
            let highlight = self.selection.contains(&i).then_some(cfg.selection_color);
            element.draw(&mut surface, 0, 0, textures, highlight);
        }
        self.surface = Some(surface);
    }

    /// Composite the cached raster into `dst` at (x, y)
    pub fn composite_into(&self, dst: &mut Surface, x: i32, y: i32, alpha: u8, blend: BlendFn) {
        if let Some(src) = &self.surface {
            dst.composite(src, x, y, alpha, blend);
        }
    }

    // Input

    /// Feed an event through the active tool, falling back to selection
    /// for clicks the tool doesn't claim. Returns true if the sketch needs
    /// regenerating.
    pub fn handle_event(&mut self, tool: &mut Tool, event: &InputEvent, cfg: &EditorConfig) -> bool {
        match event {
            InputEvent::KeyDown { key: Key::Z, mods } if mods.ctrl => {
                tool.cancel(self);
                self.undo()
            }
            InputEvent::KeyDown { key: Key::R, mods } if mods.ctrl => {
                tool.cancel(self);
                self.redo()
            }
            InputEvent::KeyDown { key: Key::Escape, .. } => {
                if tool.is_active() {
                    tool.cancel(self);
                } else {
                    self.clear_selection();
                }
                true
            }
            InputEvent::KeyDown { key: Key::Delete, .. } => !tool.is_active() && self.delete_selected(),
            InputEvent::MouseDown { x, y, button, mods } => {
                let p = Point::new(*x as f32, *y as f32);
                if tool.mouse_down(self, p, *button) {
                    return true;
                }
                if *button == MouseButton::Left {
                    self.select_at(p, mods.ctrl, cfg.select_threshold);
                    return true;
                }
                false
            }
            InputEvent::MouseMotion { x, y, .. } => tool.mouse_motion(self, Point::new(*x as f32, *y as f32)),
            InputEvent::MouseWheel { direction, mods } => {
                input::apply_wheel(&mut self.hsva, *direction, *mods, &cfg.color_steps)
            }
            _ => false,
        }
    }
}

fn draw_grid(surface: &mut Surface, grid: &GridConfig) {
    let w = surface.width() as i32;
    let h = surface.height() as i32;
    let step = grid.spacing.max(1) as usize;

    for y in (0..h).step_by(step) {
        surface.hline_blend(0, w - 1, y, grid.color, BlendFn::OverlayAlpha);
    }
    for x in (0..w).step_by(step) {
        for y in 0..h {
            // Crossings were already blended by the row pass
            if y as usize % step != 0 {
                surface.blend_pixel(x, y, grid.color, BlendFn::OverlayAlpha);
            }
        }
    }
    if grid.show_origin {
        surface.hline_blend(0, w - 1, 0, grid.origin_color, BlendFn::OverlayAlpha);
        for y in 1..h {
            surface.blend_pixel(0, y, grid.origin_color, BlendFn::OverlayAlpha);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Modifiers, WheelDirection};

    fn down(x: i32, y: i32, button: MouseButton, mods: Modifiers) -> InputEvent {
        InputEvent::MouseDown { x, y, button, mods }
    }

    fn key(key: Key, mods: Modifiers) -> InputEvent {
        InputEvent::KeyDown { key, mods }
    }

    fn two_lines() -> Sketch {
        let mut s = Sketch::new("s", 32, 32);
        s.push_element(Element::Line(Line::new(
            vec![Point::new(0.0, 5.0), Point::new(30.0, 5.0)],
            Color::WHITE,
        )));
        s.push_element(Element::Line(Line::new(
            vec![Point::new(0.0, 20.0), Point::new(30.0, 20.0)],
            Color::WHITE,
        )));
        s
    }

    #[test]
    fn test_selection_by_distance() {
        let mut s = two_lines();
        assert_eq!(s.select_at(Point::new(10.0, 7.0), false, 4.0), Some(0));
        assert!(s.is_selected(0));
        assert_eq!(s.select_at(Point::new(10.0, 19.0), false, 4.0), Some(1));
        assert!(!s.is_selected(0));
        // Too far from anything clears the selection
        assert_eq!(s.select_at(Point::new(10.0, 12.0), false, 4.0), None);
        assert_eq!(s.selection().count(), 0);
    }

    #[test]
    fn test_ctrl_click_toggles() {
        let mut s = two_lines();
        let cfg = EditorConfig::default();
        let mut tool = Tool::Select;
        s.handle_event(&mut tool, &down(10, 6, MouseButton::Left, Modifiers::NONE), &cfg);
        s.handle_event(&mut tool, &down(10, 21, MouseButton::Left, Modifiers::CTRL), &cfg);
        assert_eq!(s.selection().collect::<Vec<_>>(), vec![0, 1]);
        s.handle_event(&mut tool, &down(10, 6, MouseButton::Left, Modifiers::CTRL), &cfg);
        assert_eq!(s.selection().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_remove_element_shifts_selection() {
        let mut s = two_lines();
        s.push_element(Element::Circle(Circle::new(Point::new(5.0, 5.0), 2.0, Color::WHITE)));
        s.select(0);
        s.select(2);
        s.remove_element(1);
        assert_eq!(s.selection().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_undo_redo_tool_actions() {
        let cfg = EditorConfig::default();
        let mut s = Sketch::new("s", 32, 32);
        let mut tool = Tool::line(LineMode::Segment);
        s.handle_event(&mut tool, &down(1, 1, MouseButton::Left, Modifiers::NONE), &cfg);
        s.handle_event(&mut tool, &down(9, 1, MouseButton::Left, Modifiers::NONE), &cfg);
        s.handle_event(&mut tool, &down(1, 5, MouseButton::Left, Modifiers::NONE), &cfg);
        s.handle_event(&mut tool, &down(9, 5, MouseButton::Left, Modifiers::NONE), &cfg);
        assert_eq!(s.elements().len(), 2);

        assert!(s.handle_event(&mut tool, &key(Key::Z, Modifiers::CTRL), &cfg));
        assert_eq!(s.elements().len(), 1);
        assert!(s.undo());
        assert!(s.elements().is_empty());
        assert!(!s.undo());

        assert!(s.handle_event(&mut tool, &key(Key::R, Modifiers::CTRL), &cfg));
        assert_eq!(s.elements().len(), 1);
        assert!(s.redo());
        assert_eq!(s.elements().len(), 2);
        assert!(!s.redo());
    }

    #[test]
    fn test_undo_mid_construction_cancels_first() {
        let cfg = EditorConfig::default();
        let mut s = Sketch::new("s", 32, 32);
        let mut tool = Tool::polygon();
        s.handle_event(&mut tool, &down(0, 0, MouseButton::Left, Modifiers::NONE), &cfg);
        s.handle_event(&mut tool, &down(10, 0, MouseButton::Left, Modifiers::NONE), &cfg);
        // The cancelled polygon leaves nothing to undo
        assert!(!s.handle_event(&mut tool, &key(Key::Z, Modifiers::CTRL), &cfg));
        assert!(s.elements().is_empty());
        assert!(!tool.is_active());
    }

    #[test]
    fn test_delete_selected_is_undoable() {
        let cfg = EditorConfig::default();
        let mut s = two_lines();
        let mut tool = Tool::Select;
        s.select(0);
        assert!(s.handle_event(&mut tool, &key(Key::Delete, Modifiers::NONE), &cfg));
        assert_eq!(s.elements().len(), 1);
        assert!(s.undo());
        assert_eq!(s.elements().len(), 2);
    }

    #[test]
    fn test_generate_draws_in_order_with_highlight() {
        let mut cfg = EditorConfig::default();
        cfg.selection_color = Color::rgb(0, 255, 0);
        let textures = Arena::new();
        let mut s = two_lines();
        s.fill_color = Color::BLACK;
        s.select(1);
        s.generate(&textures, &cfg);

        let surf = s.surface().unwrap();
        assert_eq!(surf.get_color(10, 5), Color::WHITE);
        assert_eq!(surf.get_color(10, 20), Color::rgb(0, 255, 0));
        assert_eq!(surf.get_color(10, 10), Color::BLACK);
    }

    #[test]
    fn test_grid_overlay() {
        let mut cfg = EditorConfig::default();
        cfg.grid.enabled = true;
        cfg.grid.spacing = 4;
        cfg.grid.color = Color::rgba(255, 255, 255, 100);
        let textures = Arena::new();
        let mut s = Sketch::new("s", 16, 16);
        s.generate(&textures, &cfg);

        let surf = s.surface().unwrap();
        assert_eq!(surf.get_color(4, 1).a, 100);
        assert_eq!(surf.get_color(1, 4).a, 100);
        assert_eq!(surf.get_color(4, 4).a, 100);
        assert_eq!(surf.get_color(1, 1).a, 0);
    }

    #[test]
    fn test_wheel_adjusts_drawing_color() {
        let cfg = EditorConfig::default();
        let mut s = Sketch::new("s", 8, 8);
        let mut tool = Tool::Select;
        s.hsva = Hsva::new(10.0, 1.0, 1.0, 1.0);
        let ev = InputEvent::MouseWheel {
            direction: WheelDirection::Down,
            mods: Modifiers::CTRL,
        };
        assert!(s.handle_event(&mut tool, &ev, &cfg));
        assert!((s.hsva.h - 7.0).abs() < 1e-4);
    }
}
