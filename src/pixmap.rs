//! Pixmaps: directly edited raster layers with brushes and undo.
//!
//! Every discrete action (a click-and-drag stroke, say) opens one undo
//! block. Within a block only the first write to a pixel is recorded and
//! applied, so a stroke never stacks on itself and undo restores the value
//! from before the stroke.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::arena::Handle;
use crate::color::Hsva;
use crate::config::ColorSteps;
use crate::display::{BlendFn, Surface};
use crate::input::{self, InputEvent, Key, MouseButton};
use crate::undo::History;

/// How painted pixels combine with what is already there
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PixmapBlend {
    /// Overwrite the raw packed value
    #[default]
    NoBlending,
    SrcAlpha,
    DstAlpha,
    MixAlpha,
}

impl PixmapBlend {
    fn blend_fn(self) -> Option<BlendFn> {
        match self {
            PixmapBlend::NoBlending => None,
            PixmapBlend::SrcAlpha => Some(BlendFn::SrcAlpha),
            PixmapBlend::DstAlpha => Some(BlendFn::DstAlpha),
            PixmapBlend::MixAlpha => Some(BlendFn::AverageAlpha),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BrushKind {
    /// Source pixels become the current brush color
    #[default]
    Mono,
    /// Source pixels are copied with their own color
    Rgb,
}

/// Stamp whose shape comes from another pixmap.
///
/// The brush doesn't own its source; the tileset keeps the source's
/// reference count up to date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Brush {
    pub name: String,
    pub kind: BrushKind,
    pub source: Handle<Pixmap>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelMod {
    pub x: u32,
    pub y: u32,
    /// Packed value before the block touched the pixel
    pub prev: u32,
    /// Packed value the block left behind
    pub new: u32,
}

#[derive(Debug, Clone, Default)]
pub struct PixelBlock {
    mods: Vec<PixelMod>,
    touched: HashSet<(u32, u32)>,
}

impl PixelBlock {
    pub fn mods(&self) -> &[PixelMod] {
        &self.mods
    }

    pub fn is_empty(&self) -> bool {
        self.mods.is_empty()
    }
}

/// What a view needs to redraw after an edit
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Damage {
    #[default]
    None,
    /// Only these pixels changed
    Pixels(Vec<(u32, u32)>),
    /// Regenerate everything
    Full,
}

impl Damage {
    fn add_pixel(&mut self, x: u32, y: u32) {
        match self {
            Damage::None => *self = Damage::Pixels(vec![(x, y)]),
            Damage::Pixels(px) => px.push((x, y)),
            Damage::Full => {}
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Damage::None)
    }
}

#[derive(Debug, Clone)]
pub struct Pixmap {
    pub name: String,
    surface: Surface,
    pub blend: PixmapBlend,
    pub hsva: Hsva,
    brushes: Vec<Brush>,
    cur_brush: Option<usize>,
    history: History<PixelBlock>,
    /// A stroke is in progress (left button went down on this pixmap)
    painting: bool,
    damage: Damage,
    /// Brushes and tile elements referencing this pixmap
    pub(crate) nrefs: u32,
}

impl Pixmap {
    pub fn new(name: impl Into<String>, surface: Surface) -> Self {
        Self {
            name: name.into(),
            surface,
            blend: PixmapBlend::NoBlending,
            hsva: Hsva::default(),
            brushes: Vec::new(),
            cur_brush: None,
            history: History::new(),
            painting: false,
            damage: Damage::None,
            nrefs: 0,
        }
    }

    #[inline]
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.surface.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.surface.height()
    }

    #[inline]
    pub fn nrefs(&self) -> u32 {
        self.nrefs
    }

    pub fn history(&self) -> &History<PixelBlock> {
        &self.history
    }

    /// Take the accumulated damage, leaving `Damage::None`
    pub fn take_damage(&mut self) -> Damage {
        std::mem::take(&mut self.damage)
    }

    // Brushes

    pub fn brushes(&self) -> &[Brush] {
        &self.brushes
    }

    pub fn brush(&self, name: &str) -> Option<&Brush> {
        self.brushes.iter().find(|b| b.name == name)
    }

    pub fn current_brush(&self) -> Option<&Brush> {
        self.cur_brush.and_then(|i| self.brushes.get(i))
    }

    /// Select a brush by name, or plain pixels with `None`
    pub fn select_brush(&mut self, name: Option<&str>) -> bool {
        match name {
            None => {
                self.cur_brush = None;
                true
            }
            Some(name) => match self.brushes.iter().position(|b| b.name == name) {
                Some(i) => {
                    self.cur_brush = Some(i);
                    true
                }
                None => false,
            },
        }
    }

    pub(crate) fn push_brush(&mut self, brush: Brush) {
        self.brushes.push(brush);
    }

    pub(crate) fn take_brush(&mut self, name: &str) -> Option<Brush> {
        let i = self.brushes.iter().position(|b| b.name == name)?;
        self.cur_brush = match self.cur_brush {
            Some(c) if c == i => None,
            Some(c) if c > i => Some(c - 1),
            other => other,
        };
        Some(self.brushes.remove(i))
    }

    pub(crate) fn take_all_brushes(&mut self) -> Vec<Brush> {
        self.cur_brush = None;
        std::mem::take(&mut self.brushes)
    }

    // Editing

    /// Open a new undo block, discarding anything that could be redone
    pub fn begin_undo_block(&mut self) {
        self.history.begin_block();
    }

    /// Write a packed value through the pixmap's blend mode, recording the
    /// old value in the current undo block. A pixel already written in
    /// this block is left alone. Out-of-bounds coordinates are ignored.
    pub fn put_pixel(&mut self, x: i32, y: i32, value: u32) {
        if !self.surface.in_bounds(x, y) {
            return;
        }
        // The sentinel block never records
        if self.history.cursor() == 0 {
            self.history.begin_block();
        }
        let (ux, uy) = (x as u32, y as u32);
        if self.history.current().touched.contains(&(ux, uy)) {
            return;
        }

        let prev = self.surface.get_pixel(ux, uy);
        match self.blend.blend_fn() {
            None => {
                self.surface.put_pixel(x, y, value);
                self.damage.add_pixel(ux, uy);
            }
            Some(func) => {
                let c = self.surface.format().get_rgba(value);
                self.surface.blend_pixel(x, y, c, func);
                self.damage = Damage::Full;
            }
        }
        let new = self.surface.get_pixel(ux, uy);

        let block = self.history.current_mut();
        block.touched.insert((ux, uy));
        block.mods.push(PixelMod {
            x: ux,
            y: uy,
            prev,
            new,
        });
    }

    /// Stamp `source` with its top-left corner at (x0, y0).
    ///
    /// Transparent and colorkeyed source pixels are skipped. A mono brush
    /// paints `fill` wherever the source is set; an RGB brush copies the
    /// source colors.
    pub fn apply_brush(&mut self, source: &Surface, kind: BrushKind, x0: i32, y0: i32, fill: u32) {
        for sy in 0..source.height() {
            let y = y0 + sy as i32;
            if y < 0 || y >= self.height() as i32 {
                continue;
            }
            for sx in 0..source.width() {
                let x = x0 + sx as i32;
                if x < 0 || x >= self.width() as i32 {
                    continue;
                }
                let p = source.get_pixel(sx, sy);
                if source.format().is_colorkey(p) {
                    continue;
                }
                let c = source.format().get_rgba(p);
                if c.a == 0 {
                    continue;
                }
                let value = match kind {
                    BrushKind::Mono => fill,
                    BrushKind::Rgb => self.surface.map(c),
                };
                self.put_pixel(x, y, value);
            }
        }
    }

    /// Revert the current block. Returns false when there is nothing left
    /// to undo.
    pub fn undo(&mut self) -> bool {
        self.painting = false;
        let Some(block) = self.history.undo() else {
            return false;
        };
        // One record per pixel, so order doesn't matter
        for m in &block.mods {
            self.surface.put_pixel(m.x as i32, m.y as i32, m.prev);
        }
        debug!(pixmap = %self.name, pixels = block.mods.len(), "pixmap undo");
        self.damage = Damage::Full;
        true
    }

    /// Re-apply the block after the cursor
    pub fn redo(&mut self) -> bool {
        self.painting = false;
        let Some(block) = self.history.redo() else {
            return false;
        };
        for m in &block.mods {
            self.surface.put_pixel(m.x as i32, m.y as i32, m.new);
        }
        debug!(pixmap = %self.name, pixels = block.mods.len(), "pixmap redo");
        self.damage = Damage::Full;
        true
    }

    /// One stamp of the current brush (or a single pixel) centred at (x, y)
    fn paint_at(&mut self, x: i32, y: i32, brush: Option<(&Surface, BrushKind)>) {
        let fill = self.surface.map(self.hsva.to_color());
        match brush {
            Some((src, kind)) => {
                let x0 = x - (src.width() / 2) as i32;
                let y0 = y - (src.height() / 2) as i32;
                self.apply_brush(src, kind, x0, y0, fill);
            }
            None => self.put_pixel(x, y, fill),
        }
    }

    /// Drive the pixmap from input.
    ///
    /// `brush_source` is the surface of the current brush's source pixmap,
    /// resolved by the caller. Returns true if the event was consumed.
    pub fn handle_event(&mut self, event: &InputEvent, brush_source: Option<&Surface>, steps: &ColorSteps) -> bool {
        let brush = match (self.current_brush(), brush_source) {
            (Some(b), Some(src)) => Some((src, b.kind)),
            _ => None,
        };

        match event {
            InputEvent::MouseDown {
                x,
                y,
                button: MouseButton::Left,
                ..
            } => {
                self.begin_undo_block();
                self.painting = true;
                self.paint_at(*x, *y, brush);
                true
            }
            InputEvent::MouseMotion { x, y, buttons, .. } if buttons.left && self.painting => {
                self.paint_at(*x, *y, brush);
                true
            }
            InputEvent::MouseUp {
                button: MouseButton::Left,
                ..
            } => {
                if self.painting {
                    self.painting = false;
                    self.history.discard_current_if(PixelBlock::is_empty);
                }
                true
            }
            InputEvent::MouseWheel { direction, mods } => input::apply_wheel(&mut self.hsva, *direction, *mods, steps),
            InputEvent::KeyDown { key: Key::Z, mods } if mods.ctrl => self.undo(),
            InputEvent::KeyDown { key: Key::R, mods } if mods.ctrl => self.redo(),
            _ => false,
        }
    }
}
