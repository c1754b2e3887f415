//! Tiles: a surface assembled from an ordered list of elements.

use tracing::debug;

use crate::arena::{Arena, Handle};
use crate::color::Color;
use crate::display::{BlendFn, PixelFormat, Surface};
use crate::feature::{Feature, RenderContext};
use crate::pixmap::Pixmap;
use crate::sketch::Sketch;

/// One layer of a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileElement {
    Feature {
        feature: Handle<Feature>,
        visible: bool,
    },
    Pixmap {
        pixmap: Handle<Pixmap>,
        x: i32,
        y: i32,
        alpha: u8,
        visible: bool,
    },
    Sketch {
        sketch: Handle<Sketch>,
        x: i32,
        y: i32,
        alpha: u8,
        blend: BlendFn,
        visible: bool,
    },
}

impl TileElement {
    pub fn feature(feature: Handle<Feature>) -> Self {
        TileElement::Feature {
            feature,
            visible: true,
        }
    }

    pub fn pixmap(pixmap: Handle<Pixmap>, x: i32, y: i32) -> Self {
        TileElement::Pixmap {
            pixmap,
            x,
            y,
            alpha: 255,
            visible: true,
        }
    }

    pub fn sketch(sketch: Handle<Sketch>, x: i32, y: i32, blend: BlendFn) -> Self {
        TileElement::Sketch {
            sketch,
            x,
            y,
            alpha: 255,
            blend,
            visible: true,
        }
    }

    pub fn is_visible(&self) -> bool {
        match *self {
            TileElement::Feature { visible, .. }
            | TileElement::Pixmap { visible, .. }
            | TileElement::Sketch { visible, .. } => visible,
        }
    }

    pub fn set_visible(&mut self, v: bool) {
        match self {
            TileElement::Feature { visible, .. }
            | TileElement::Pixmap { visible, .. }
            | TileElement::Sketch { visible, .. } => *visible = v,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tile {
    pub name: String,
    surface: Surface,
    elements: Vec<TileElement>,
    dirty: bool,
}

impl Tile {
    pub fn new(name: impl Into<String>, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            name: name.into(),
            surface: Surface::new(width, height, format),
            elements: Vec::new(),
            dirty: true,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.surface.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.surface.height()
    }

    /// Last rendered pixels
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn elements(&self) -> &[TileElement] {
        &self.elements
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn references(&self, pred: impl Fn(&TileElement) -> bool) -> bool {
        self.elements.iter().any(pred)
    }

    pub(crate) fn push_element(&mut self, element: TileElement) -> usize {
        self.elements.push(element);
        self.dirty = true;
        self.elements.len() - 1
    }

    pub(crate) fn remove_element(&mut self, idx: usize) -> Option<TileElement> {
        if idx >= self.elements.len() {
            return None;
        }
        self.dirty = true;
        Some(self.elements.remove(idx))
    }

    pub(crate) fn take_elements(&mut self) -> Vec<TileElement> {
        std::mem::take(&mut self.elements)
    }

    pub(crate) fn element_mut(&mut self, idx: usize) -> Option<&mut TileElement> {
        self.dirty = true;
        self.elements.get_mut(idx)
    }

    /// Clear and composite every visible element in order. Sketch caches
    /// must be generated beforehand.
    pub(crate) fn render(&mut self, features: &Arena<Feature>, pixmaps: &Arena<Pixmap>, ctx: &RenderContext<'_>) {
        match self.surface.format().colorkey {
            Some(key) => self.surface.fill(key),
            None => self.surface.clear(Color::TRANSPARENT),
        }

        for element in &self.elements {
            if !element.is_visible() {
                continue;
            }
            match *element {
                TileElement::Feature { feature, .. } => match features.get(feature) {
                    Some(f) => f.apply(&mut self.surface, ctx),
                    None => debug!(tile = %self.name, "stale feature reference, skipping"),
                },
                TileElement::Pixmap {
                    pixmap, x, y, alpha, ..
                } => match pixmaps.get(pixmap) {
                    Some(p) => self
                        .surface
                        .composite(p.surface(), x, y, alpha, BlendFn::OverlayAlpha),
                    None => debug!(tile = %self.name, "stale pixmap reference, skipping"),
                },
                TileElement::Sketch {
                    sketch,
                    x,
                    y,
                    alpha,
                    blend,
                    ..
                } => match ctx.sketches.get(sketch) {
                    Some(s) => s.composite_into(&mut self.surface, x, y, alpha, blend),
                    None => debug!(tile = %self.name, "stale sketch reference, skipping"),
                },
            }
        }
        self.dirty = false;
    }
}
