//! Tileset: owner of every texture, pixmap, sketch, feature and tile.
//!
//! Cross references between items are arena handles (brush sources and
//! tile elements, which are reference counted) or names (features and
//! polygon styles, which are resolved at render time).

mod persist;
mod tile;

use tracing::{debug, info};

pub use tile::{Tile, TileElement};

use crate::arena::{Arena, Handle};
use crate::config::EditorConfig;
use crate::display::Surface;
use crate::error::{Result, TilesetError};
use crate::feature::{Feature, RenderContext};
use crate::input::InputEvent;
use crate::pixmap::{Brush, BrushKind, Damage, Pixmap};
use crate::sketch::{Sketch, Tool};
use crate::texture::Texture;

pub struct Tileset {
    pub name: String,
    pub config: EditorConfig,
    textures: Arena<Texture>,
    pixmaps: Arena<Pixmap>,
    sketches: Arena<Sketch>,
    features: Arena<Feature>,
    tiles: Arena<Tile>,
}

fn duplicate(kind: &'static str, name: &str) -> TilesetError {
    TilesetError::DuplicateName {
        kind,
        name: name.to_string(),
    }
}

impl Tileset {
    pub fn new(name: impl Into<String>, config: EditorConfig) -> Self {
        Self {
            name: name.into(),
            config,
            textures: Arena::new(),
            pixmaps: Arena::new(),
            sketches: Arena::new(),
            features: Arena::new(),
            tiles: Arena::new(),
        }
    }

    pub fn textures(&self) -> &Arena<Texture> {
        &self.textures
    }

    pub fn pixmaps(&self) -> &Arena<Pixmap> {
        &self.pixmaps
    }

    pub fn sketches(&self) -> &Arena<Sketch> {
        &self.sketches
    }

    pub fn features(&self) -> &Arena<Feature> {
        &self.features
    }

    pub fn tiles(&self) -> &Arena<Tile> {
        &self.tiles
    }

    pub fn render_context(&self) -> RenderContext<'_> {
        RenderContext::new(&self.textures, &self.sketches)
    }

    // Textures

    pub fn insert_texture(&mut self, texture: Texture) -> Result<Handle<Texture>> {
        if self.find_texture(&texture.name).is_some() {
            return Err(duplicate("texture", &texture.name));
        }
        Ok(self.textures.insert(texture))
    }

    /// Textures are referenced by name only; removing one leaves those
    /// references dangling and they render nothing.
    pub fn remove_texture(&mut self, h: Handle<Texture>) -> Result<Texture> {
        let texture = self.textures.remove(h).ok_or(TilesetError::NoSuchItem("texture"))?;
        self.invalidate_all();
        Ok(texture)
    }

    pub fn find_texture(&self, name: &str) -> Option<Handle<Texture>> {
        self.textures.find(|t| t.name == name)
    }

    // Pixmaps

    /// New pixmap in the configured pixel format
    pub fn insert_pixmap(&mut self, name: &str, width: u32, height: u32) -> Result<Handle<Pixmap>> {
        let surface = Surface::new(width, height, self.config.pixel_format);
        self.insert_pixmap_surface(name, surface)
    }

    pub fn insert_pixmap_surface(&mut self, name: &str, surface: Surface) -> Result<Handle<Pixmap>> {
        if self.find_pixmap(name).is_some() {
            return Err(duplicate("pixmap", name));
        }
        Ok(self.pixmaps.insert(Pixmap::new(name, surface)))
    }

    pub fn pixmap(&self, h: Handle<Pixmap>) -> Option<&Pixmap> {
        self.pixmaps.get(h)
    }

    pub fn pixmap_mut(&mut self, h: Handle<Pixmap>) -> Option<&mut Pixmap> {
        self.pixmaps.get_mut(h)
    }

    pub fn find_pixmap(&self, name: &str) -> Option<Handle<Pixmap>> {
        self.pixmaps.find(|p| p.name == name)
    }

    /// Fails while brushes or tiles still reference the pixmap. The
    /// pixmap's own brushes release their sources.
    pub fn remove_pixmap(&mut self, h: Handle<Pixmap>) -> Result<Pixmap> {
        let pixmap = self.pixmaps.get(h).ok_or(TilesetError::NoSuchItem("pixmap"))?;
        let self_refs = pixmap.brushes().iter().filter(|b| b.source == h).count() as u32;
        if pixmap.nrefs > self_refs {
            return Err(TilesetError::InUse {
                kind: "pixmap",
                name: pixmap.name.clone(),
                nrefs: pixmap.nrefs - self_refs,
            });
        }

        let mut pixmap = self.pixmaps.remove(h).ok_or(TilesetError::NoSuchItem("pixmap"))?;
        for brush in pixmap.take_all_brushes() {
            if let Some(src) = self.pixmaps.get_mut(brush.source) {
                src.nrefs = src.nrefs.saturating_sub(1);
            }
        }
        info!(pixmap = %pixmap.name, "removed pixmap");
        Ok(pixmap)
    }

    /// Give `pixmap` a brush stamping with `source`
    pub fn add_brush(&mut self, pixmap: Handle<Pixmap>, name: &str, kind: BrushKind, source: Handle<Pixmap>) -> Result<()> {
        if !self.pixmaps.contains(source) {
            return Err(TilesetError::NoSuchItem("pixmap"));
        }
        let target = self.pixmaps.get_mut(pixmap).ok_or(TilesetError::NoSuchItem("pixmap"))?;
        if target.brush(name).is_some() {
            return Err(duplicate("brush", name));
        }
        target.push_brush(Brush {
            name: name.to_string(),
            kind,
            source,
        });
        if let Some(src) = self.pixmaps.get_mut(source) {
            src.nrefs += 1;
        }
        Ok(())
    }

    pub fn remove_brush(&mut self, pixmap: Handle<Pixmap>, name: &str) -> Result<Brush> {
        let target = self.pixmaps.get_mut(pixmap).ok_or(TilesetError::NoSuchItem("pixmap"))?;
        let brush = target.take_brush(name).ok_or(TilesetError::NoSuchItem("brush"))?;
        if let Some(src) = self.pixmaps.get_mut(brush.source) {
            src.nrefs = src.nrefs.saturating_sub(1);
        }
        Ok(brush)
    }

    /// Feed an event to a pixmap, resolving its current brush. Tiles
    /// showing the pixmap are marked dirty when pixels change.
    pub fn pixmap_event(&mut self, h: Handle<Pixmap>, event: &InputEvent) -> Result<Damage> {
        let pixmap = self.pixmaps.get(h).ok_or(TilesetError::NoSuchItem("pixmap"))?;
        // Cloned: a pixmap may be its own brush source
        let source = pixmap
            .current_brush()
            .and_then(|b| self.pixmaps.get(b.source))
            .map(|p| p.surface().clone());

        let steps = self.config.color_steps;
        let pixmap = self.pixmaps.get_mut(h).ok_or(TilesetError::NoSuchItem("pixmap"))?;
        pixmap.handle_event(event, source.as_ref(), &steps);
        let damage = pixmap.take_damage();
        if !damage.is_none() {
            self.invalidate_tiles(|e| matches!(e, TileElement::Pixmap { pixmap, .. } if *pixmap == h));
        }
        Ok(damage)
    }

    // Sketches

    pub fn insert_sketch(&mut self, name: &str, width: u32, height: u32) -> Result<Handle<Sketch>> {
        self.insert_sketch_value(Sketch::new(name, width, height))
    }

    pub fn insert_sketch_value(&mut self, sketch: Sketch) -> Result<Handle<Sketch>> {
        if self.find_sketch(&sketch.name).is_some() {
            return Err(duplicate("sketch", &sketch.name));
        }
        Ok(self.sketches.insert(sketch))
    }

    pub fn sketch(&self, h: Handle<Sketch>) -> Option<&Sketch> {
        self.sketches.get(h)
    }

    pub fn sketch_mut(&mut self, h: Handle<Sketch>) -> Option<&mut Sketch> {
        self.sketches.get_mut(h)
    }

    pub fn find_sketch(&self, name: &str) -> Option<Handle<Sketch>> {
        self.sketches.find(|s| s.name == name)
    }

    pub fn remove_sketch(&mut self, h: Handle<Sketch>) -> Result<Sketch> {
        let sketch = self.sketches.get(h).ok_or(TilesetError::NoSuchItem("sketch"))?;
        if sketch.nrefs > 0 {
            return Err(TilesetError::InUse {
                kind: "sketch",
                name: sketch.name.clone(),
                nrefs: sketch.nrefs,
            });
        }
        let sketch = self.sketches.remove(h).ok_or(TilesetError::NoSuchItem("sketch"))?;
        // Features may still name it
        self.invalidate_all();
        info!(sketch = %sketch.name, "removed sketch");
        Ok(sketch)
    }

    /// Feed an event to a sketch through `tool`. Regenerates the sketch's
    /// raster and dirties every tile when the sketch changed, since
    /// features reference sketches by name.
    pub fn sketch_event(&mut self, h: Handle<Sketch>, tool: &mut Tool, event: &InputEvent) -> Result<bool> {
        let sketch = self.sketches.get_mut(h).ok_or(TilesetError::NoSuchItem("sketch"))?;
        let changed = sketch.handle_event(tool, event, &self.config);
        if changed {
            sketch.generate(&self.textures, &self.config);
            self.invalidate_all();
        }
        Ok(changed)
    }

    /// Rebuild a sketch's cached raster, e.g. before showing it alone
    pub fn generate_sketch(&mut self, h: Handle<Sketch>) -> Result<()> {
        let sketch = self.sketches.get_mut(h).ok_or(TilesetError::NoSuchItem("sketch"))?;
        sketch.generate(&self.textures, &self.config);
        Ok(())
    }

    // Features

    pub fn insert_feature(&mut self, feature: Feature) -> Result<Handle<Feature>> {
        if self.find_feature(&feature.name).is_some() {
            return Err(duplicate("feature", &feature.name));
        }
        Ok(self.features.insert(feature))
    }

    pub fn feature(&self, h: Handle<Feature>) -> Option<&Feature> {
        self.features.get(h)
    }

    /// Tiles using the feature are marked dirty
    pub fn feature_mut(&mut self, h: Handle<Feature>) -> Option<&mut Feature> {
        self.invalidate_tiles(|e| matches!(e, TileElement::Feature { feature, .. } if *feature == h));
        self.features.get_mut(h)
    }

    pub fn find_feature(&self, name: &str) -> Option<Handle<Feature>> {
        self.features.find(|f| f.name == name)
    }

    pub fn remove_feature(&mut self, h: Handle<Feature>) -> Result<Feature> {
        let feature = self.features.get(h).ok_or(TilesetError::NoSuchItem("feature"))?;
        if feature.nrefs > 0 {
            return Err(TilesetError::InUse {
                kind: "feature",
                name: feature.name.clone(),
                nrefs: feature.nrefs,
            });
        }
        self.features.remove(h).ok_or(TilesetError::NoSuchItem("feature"))
    }

    // Tiles

    /// New tile using the configured pixel format
    pub fn insert_tile(&mut self, name: &str, width: u32, height: u32) -> Result<Handle<Tile>> {
        if self.find_tile(name).is_some() {
            return Err(duplicate("tile", name));
        }
        let tile = Tile::new(name, width, height, self.config.pixel_format);
        Ok(self.tiles.insert(tile))
    }

    pub fn tile(&self, h: Handle<Tile>) -> Option<&Tile> {
        self.tiles.get(h)
    }

    pub fn find_tile(&self, name: &str) -> Option<Handle<Tile>> {
        self.tiles.find(|t| t.name == name)
    }

    /// Remove a tile, releasing everything its elements reference
    pub fn remove_tile(&mut self, h: Handle<Tile>) -> Result<Tile> {
        let mut tile = self.tiles.remove(h).ok_or(TilesetError::NoSuchItem("tile"))?;
        for element in tile.take_elements() {
            self.release(&element);
        }
        Ok(tile)
    }

    /// Append a layer to a tile; the referenced item gains a reference
    pub fn add_tile_element(&mut self, h: Handle<Tile>, element: TileElement) -> Result<usize> {
        if !self.tiles.contains(h) {
            return Err(TilesetError::NoSuchItem("tile"));
        }
        self.retain(&element)?;
        let tile = self.tiles.get_mut(h).ok_or(TilesetError::NoSuchItem("tile"))?;
        Ok(tile.push_element(element))
    }

    pub fn remove_tile_element(&mut self, h: Handle<Tile>, idx: usize) -> Result<TileElement> {
        let tile = self.tiles.get_mut(h).ok_or(TilesetError::NoSuchItem("tile element"))?;
        let element = tile.remove_element(idx).ok_or(TilesetError::NoSuchItem("tile element"))?;
        self.release(&element);
        Ok(element)
    }

    pub fn set_tile_element_visible(&mut self, h: Handle<Tile>, idx: usize, visible: bool) -> Result<()> {
        let tile = self.tiles.get_mut(h).ok_or(TilesetError::NoSuchItem("tile"))?;
        let element = tile.element_mut(idx).ok_or(TilesetError::NoSuchItem("tile element"))?;
        element.set_visible(visible);
        Ok(())
    }

    fn retain(&mut self, element: &TileElement) -> Result<()> {
        match *element {
            TileElement::Feature { feature, .. } => {
                self.features.get_mut(feature).ok_or(TilesetError::NoSuchItem("feature"))?.nrefs += 1;
            }
            TileElement::Pixmap { pixmap, .. } => {
                self.pixmaps.get_mut(pixmap).ok_or(TilesetError::NoSuchItem("pixmap"))?.nrefs += 1;
            }
            TileElement::Sketch { sketch, .. } => {
                self.sketches.get_mut(sketch).ok_or(TilesetError::NoSuchItem("sketch"))?.nrefs += 1;
            }
        }
        Ok(())
    }

    fn release(&mut self, element: &TileElement) {
        match *element {
            TileElement::Feature { feature, .. } => {
                if let Some(f) = self.features.get_mut(feature) {
                    f.nrefs = f.nrefs.saturating_sub(1);
                }
            }
            TileElement::Pixmap { pixmap, .. } => {
                if let Some(p) = self.pixmaps.get_mut(pixmap) {
                    p.nrefs = p.nrefs.saturating_sub(1);
                }
            }
            TileElement::Sketch { sketch, .. } => {
                if let Some(s) = self.sketches.get_mut(sketch) {
                    s.nrefs = s.nrefs.saturating_sub(1);
                }
            }
        }
    }

    fn invalidate_tiles(&mut self, pred: impl Fn(&TileElement) -> bool) {
        for (_, tile) in self.tiles.iter_mut() {
            if tile.references(&pred) {
                tile.mark_dirty();
            }
        }
    }

    fn invalidate_all(&mut self) {
        for (_, tile) in self.tiles.iter_mut() {
            tile.mark_dirty();
        }
    }

    /// Rebuild a tile: regenerate the sketches it shows, then composite
    /// its elements in order.
    pub fn generate_tile(&mut self, h: Handle<Tile>) -> Result<()> {
        let tile = self.tiles.get(h).ok_or(TilesetError::NoSuchItem("tile"))?;
        let shown: Vec<Handle<Sketch>> = tile
            .elements()
            .iter()
            .filter_map(|e| match *e {
                TileElement::Sketch { sketch, .. } => Some(sketch),
                _ => None,
            })
            .collect();
        for sh in shown {
            if let Some(sketch) = self.sketches.get_mut(sh) {
                sketch.generate(&self.textures, &self.config);
            }
        }

        let ctx = RenderContext::new(&self.textures, &self.sketches);
        let tile = self.tiles.get_mut(h).ok_or(TilesetError::NoSuchItem("tile"))?;
        tile.render(&self.features, &self.pixmaps, &ctx);
        debug!(tile = %tile.name, "generated tile");
        Ok(())
    }

    /// Regenerate every dirty tile, returning how many were rebuilt
    pub fn generate_dirty(&mut self) -> Result<usize> {
        let dirty: Vec<Handle<Tile>> = self
            .tiles
            .iter()
            .filter(|(_, t)| t.is_dirty())
            .map(|(h, _)| h)
            .collect();
        for &h in &dirty {
            self.generate_tile(h)?;
        }
        Ok(dirty.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::feature::{Fill, FillFeature, FeatureKind};
    use crate::input::{Modifiers, MouseButton};

    fn tileset() -> Tileset {
        Tileset::new("test", EditorConfig::default())
    }

    fn solid(name: &str, c: Color) -> Feature {
        Feature::new(name, FeatureKind::Fill(FillFeature::new(Fill::Solid(c))))
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut ts = tileset();
        ts.insert_pixmap("p", 4, 4).unwrap();
        assert!(matches!(
            ts.insert_pixmap("p", 4, 4),
            Err(TilesetError::DuplicateName { kind: "pixmap", .. })
        ));
        ts.insert_feature(solid("f", Color::WHITE)).unwrap();
        assert!(ts.insert_feature(solid("f", Color::BLACK)).is_err());
    }

    #[test]
    fn test_brush_refcount_blocks_removal() {
        let mut ts = tileset();
        let canvas = ts.insert_pixmap("canvas", 16, 16).unwrap();
        let stamp = ts.insert_pixmap("stamp", 3, 3).unwrap();
        ts.add_brush(canvas, "dot", BrushKind::Mono, stamp).unwrap();
        assert_eq!(ts.pixmap(stamp).unwrap().nrefs(), 1);

        assert!(matches!(
            ts.remove_pixmap(stamp),
            Err(TilesetError::InUse { nrefs: 1, .. })
        ));
        ts.remove_brush(canvas, "dot").unwrap();
        assert_eq!(ts.pixmap(stamp).unwrap().nrefs(), 0);
        ts.remove_pixmap(stamp).unwrap();
        assert!(ts.pixmap(stamp).is_none());
    }

    #[test]
    fn test_removing_pixmap_releases_its_brush_sources() {
        let mut ts = tileset();
        let canvas = ts.insert_pixmap("canvas", 16, 16).unwrap();
        let stamp = ts.insert_pixmap("stamp", 3, 3).unwrap();
        ts.add_brush(canvas, "dot", BrushKind::Mono, stamp).unwrap();
        ts.add_brush(canvas, "self", BrushKind::Rgb, canvas).unwrap();
        ts.remove_pixmap(canvas).unwrap();
        assert_eq!(ts.pixmap(stamp).unwrap().nrefs(), 0);
    }

    #[test]
    fn test_tile_elements_hold_references() {
        let mut ts = tileset();
        let f = ts.insert_feature(solid("f", Color::WHITE)).unwrap();
        let s = ts.insert_sketch("s", 8, 8).unwrap();
        let t = ts.insert_tile("t", 8, 8).unwrap();
        ts.add_tile_element(t, TileElement::feature(f)).unwrap();
        ts.add_tile_element(t, TileElement::sketch(s, 0, 0, ts.config.sketch_blend))
            .unwrap();

        assert!(ts.remove_feature(f).is_err());
        assert!(ts.remove_sketch(s).is_err());
        ts.remove_tile_element(t, 0).unwrap();
        ts.remove_feature(f).unwrap();
        ts.remove_tile(t).unwrap();
        ts.remove_sketch(s).unwrap();
    }

    #[test]
    fn test_stale_handles() {
        let mut ts = tileset();
        let f = ts.insert_feature(solid("f", Color::WHITE)).unwrap();
        ts.remove_feature(f).unwrap();
        let t = ts.insert_tile("t", 8, 8).unwrap();
        assert!(matches!(
            ts.add_tile_element(t, TileElement::feature(f)),
            Err(TilesetError::NoSuchItem("feature"))
        ));
        assert!(ts.tile(t).unwrap().elements().is_empty());
    }

    #[test]
    fn test_generate_tile_layers_in_order() {
        let mut ts = tileset();
        let red = ts.insert_feature(solid("red", Color::rgb(255, 0, 0))).unwrap();
        let p = ts.insert_pixmap("p", 2, 2).unwrap();
        {
            let pm = ts.pixmap_mut(p).unwrap();
            pm.begin_undo_block();
            let v = pm.surface().map(Color::rgb(0, 0, 255));
            pm.put_pixel(0, 0, v);
        }
        let t = ts.insert_tile("t", 4, 4).unwrap();
        ts.add_tile_element(t, TileElement::feature(red)).unwrap();
        ts.add_tile_element(t, TileElement::pixmap(p, 1, 1)).unwrap();
        assert_eq!(ts.generate_dirty().unwrap(), 1);

        let tile = ts.tile(t).unwrap();
        assert!(!tile.is_dirty());
        assert_eq!(tile.surface().get_color(0, 0), Color::rgb(255, 0, 0));
        let c = tile.surface().get_color(1, 1);
        assert!(c.b > 250 && c.r < 5, "{:?}", c);
        // Transparent pixmap pixels leave the fill visible
        assert_eq!(tile.surface().get_color(2, 2), Color::rgb(255, 0, 0));

        ts.set_tile_element_visible(t, 0, false).unwrap();
        ts.generate_tile(t).unwrap();
        assert_eq!(ts.tile(t).unwrap().surface().get_color(0, 0).a, 0);
    }

    #[test]
    fn test_pixmap_event_dirties_tiles() {
        let mut ts = tileset();
        let p = ts.insert_pixmap("p", 8, 8).unwrap();
        let t = ts.insert_tile("t", 8, 8).unwrap();
        ts.add_tile_element(t, TileElement::pixmap(p, 0, 0)).unwrap();
        ts.generate_dirty().unwrap();

        let damage = ts
            .pixmap_event(
                p,
                &InputEvent::MouseDown {
                    x: 3,
                    y: 3,
                    button: MouseButton::Left,
                    mods: Modifiers::NONE,
                },
            )
            .unwrap();
        assert_eq!(damage, Damage::Pixels(vec![(3, 3)]));
        assert!(ts.tile(t).unwrap().is_dirty());
    }

    #[test]
    fn test_brush_from_same_pixmap() {
        let mut ts = tileset();
        let p = ts.insert_pixmap("p", 8, 8).unwrap();
        ts.add_brush(p, "self", BrushKind::Rgb, p).unwrap();
        ts.pixmap_mut(p).unwrap().select_brush(Some("self"));
        let damage = ts
            .pixmap_event(
                p,
                &InputEvent::MouseDown {
                    x: 4,
                    y: 4,
                    button: MouseButton::Left,
                    mods: Modifiers::NONE,
                },
            )
            .unwrap();
        // Fully transparent source: nothing to stamp
        assert!(damage.is_none());
    }
}
