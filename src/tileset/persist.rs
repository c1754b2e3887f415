//! JSON save/load.
//!
//! Cross references are written as names. Brush sources are resolved in a
//! second pass once every pixmap is loaded; a brush naming a missing
//! pixmap means the file is corrupt. Tile layers naming a missing item are
//! dropped with a warning.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{Tile, TileElement, Tileset};
use crate::color::Hsva;
use crate::config::EditorConfig;
use crate::display::{BlendFn, PixelFormat, Surface};
use crate::error::{Result, TilesetError};
use crate::feature::Feature;
use crate::pixmap::{BrushKind, PixmapBlend};
use crate::sketch::Sketch;
use crate::texture::Texture;

#[derive(Serialize, Deserialize)]
struct TilesetDoc {
    name: String,
    #[serde(default)]
    config: EditorConfig,
    #[serde(default)]
    textures: Vec<Texture>,
    #[serde(default)]
    pixmaps: Vec<PixmapDoc>,
    #[serde(default)]
    sketches: Vec<Sketch>,
    #[serde(default)]
    features: Vec<Feature>,
    #[serde(default)]
    tiles: Vec<TileDoc>,
}

#[derive(Serialize, Deserialize)]
struct PixmapDoc {
    name: String,
    surface: Surface,
    #[serde(default)]
    blend: PixmapBlend,
    #[serde(default)]
    hsva: Hsva,
    #[serde(default)]
    brushes: Vec<BrushDoc>,
    #[serde(default)]
    cur_brush: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct BrushDoc {
    name: String,
    kind: BrushKind,
    source: String,
}

#[derive(Serialize, Deserialize)]
struct TileDoc {
    name: String,
    width: u32,
    height: u32,
    format: PixelFormat,
    #[serde(default)]
    elements: Vec<TileElementDoc>,
}

#[derive(Serialize, Deserialize)]
enum TileElementDoc {
    Feature {
        feature: String,
        visible: bool,
    },
    Pixmap {
        pixmap: String,
        x: i32,
        y: i32,
        alpha: u8,
        visible: bool,
    },
    Sketch {
        sketch: String,
        x: i32,
        y: i32,
        alpha: u8,
        blend: BlendFn,
        visible: bool,
    },
}

impl Tileset {
    pub fn to_json(&self) -> Result<String> {
        let doc = self.to_doc();
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let doc: TilesetDoc = serde_json::from_str(json)?;
        Self::from_doc(doc)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)?;
        info!(tileset = %self.name, path = %path.display(), "saved tileset");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let ts = Self::from_json(&json)?;
        info!(
            tileset = %ts.name,
            path = %path.display(),
            pixmaps = ts.pixmaps.len(),
            sketches = ts.sketches.len(),
            tiles = ts.tiles.len(),
            "loaded tileset"
        );
        Ok(ts)
    }

    fn to_doc(&self) -> TilesetDoc {
        let pixmap_name = |h| self.pixmaps.get(h).map(|p| p.name.clone());

        let pixmaps = self
            .pixmaps
            .iter()
            .map(|(_, p)| PixmapDoc {
                name: p.name.clone(),
                surface: p.surface().clone(),
                blend: p.blend,
                hsva: p.hsva,
                brushes: p
                    .brushes()
                    .iter()
                    .filter_map(|b| {
                        Some(BrushDoc {
                            name: b.name.clone(),
                            kind: b.kind,
                            source: pixmap_name(b.source)?,
                        })
                    })
                    .collect(),
                cur_brush: p.current_brush().map(|b| b.name.clone()),
            })
            .collect();

        let tiles = self
            .tiles
            .iter()
            .map(|(_, t)| TileDoc {
                name: t.name.clone(),
                width: t.width(),
                height: t.height(),
                format: *t.surface().format(),
                elements: t.elements().iter().filter_map(|e| self.element_doc(e)).collect(),
            })
            .collect();

        TilesetDoc {
            name: self.name.clone(),
            config: self.config.clone(),
            textures: self.textures.iter().map(|(_, t)| t.clone()).collect(),
            pixmaps,
            sketches: self.sketches.iter().map(|(_, s)| s.clone()).collect(),
            features: self.features.iter().map(|(_, f)| f.clone()).collect(),
            tiles,
        }
    }

    fn element_doc(&self, element: &TileElement) -> Option<TileElementDoc> {
        Some(match *element {
            TileElement::Feature { feature, visible } => TileElementDoc::Feature {
                feature: self.features.get(feature)?.name.clone(),
                visible,
            },
            TileElement::Pixmap {
                pixmap,
                x,
                y,
                alpha,
                visible,
            } => TileElementDoc::Pixmap {
                pixmap: self.pixmaps.get(pixmap)?.name.clone(),
                x,
                y,
                alpha,
                visible,
            },
            TileElement::Sketch {
                sketch,
                x,
                y,
                alpha,
                blend,
                visible,
            } => TileElementDoc::Sketch {
                sketch: self.sketches.get(sketch)?.name.clone(),
                x,
                y,
                alpha,
                blend,
                visible,
            },
        })
    }

    fn from_doc(doc: TilesetDoc) -> Result<Self> {
        if !doc.config.pixel_format.is_supported() {
            return Err(TilesetError::InvalidSurface(format!("{} config", doc.name)));
        }
        let mut ts = Tileset::new(doc.name, doc.config);

        for texture in doc.textures {
            if !surface_is_valid(&texture.surface) {
                return Err(TilesetError::InvalidSurface(texture.name));
            }
            ts.insert_texture(texture)?;
        }

        let mut pending_brushes = Vec::new();
        for p in doc.pixmaps {
            if !surface_is_valid(&p.surface) {
                return Err(TilesetError::InvalidSurface(p.name));
            }
            let h = ts.insert_pixmap_surface(&p.name, p.surface)?;
            if let Some(pixmap) = ts.pixmaps.get_mut(h) {
                pixmap.blend = p.blend;
                pixmap.hsva = p.hsva;
            }
            pending_brushes.push((h, p.brushes, p.cur_brush));
        }

        for sketch in doc.sketches {
            ts.insert_sketch_value(sketch)?;
        }
        for feature in doc.features {
            ts.insert_feature(feature)?;
        }

        // Second pass: every pixmap exists now
        for (h, brushes, cur) in pending_brushes {
            for b in brushes {
                let source = ts.find_pixmap(&b.source).ok_or_else(|| TilesetError::UnresolvedBrush {
                    brush: b.name.clone(),
                    pixmap: b.source.clone(),
                })?;
                ts.add_brush(h, &b.name, b.kind, source)?;
            }
            if let Some(pixmap) = ts.pixmaps.get_mut(h) {
                pixmap.select_brush(cur.as_deref());
            }
        }

        for t in doc.tiles {
            if !t.format.is_supported() {
                return Err(TilesetError::InvalidSurface(t.name));
            }
            let h = ts.tiles.insert(Tile::new(&t.name, t.width, t.height, t.format));
            for e in t.elements {
                match ts.resolve_element(&e) {
                    Some(element) => {
                        ts.add_tile_element(h, element)?;
                    }
                    None => warn!(tile = %t.name, "dropping layer with unresolved reference"),
                }
            }
        }

        Ok(ts)
    }

    fn resolve_element(&self, e: &TileElementDoc) -> Option<TileElement> {
        Some(match e {
            TileElementDoc::Feature { feature, visible } => TileElement::Feature {
                feature: self.find_feature(feature)?,
                visible: *visible,
            },
            TileElementDoc::Pixmap {
                pixmap,
                x,
                y,
                alpha,
                visible,
            } => TileElement::Pixmap {
                pixmap: self.find_pixmap(pixmap)?,
                x: *x,
                y: *y,
                alpha: *alpha,
                visible: *visible,
            },
            TileElementDoc::Sketch {
                sketch,
                x,
                y,
                alpha,
                blend,
                visible,
            } => TileElement::Sketch {
                sketch: self.find_sketch(sketch)?,
                x: *x,
                y: *y,
                alpha: *alpha,
                blend: *blend,
                visible: *visible,
            },
        })
    }
}

/// Deserialized surfaces bypass the constructor, so recheck the layout
fn surface_is_valid(s: &Surface) -> bool {
    let bpp = s.format().bytes_per_pixel;
    s.format().is_supported()
        && s.pitch() >= s.width() as usize * bpp as usize
        && s.as_bytes().len() == s.pitch() * s.height() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::feature::{FeatureKind, Fill, FillFeature, PolygonFeature};
    use crate::geometry::Point;
    use crate::sketch::{Element, Polygon};

    fn sample() -> Tileset {
        let mut ts = Tileset::new("sample", EditorConfig::default());
        ts.insert_texture(Texture::checkerboard("check", 4, 2, Color::WHITE, Color::BLACK))
            .unwrap();
        let canvas = ts.insert_pixmap("canvas", 8, 8).unwrap();
        let stamp = ts.insert_pixmap("stamp", 2, 2).unwrap();
        ts.add_brush(canvas, "dot", BrushKind::Mono, stamp).unwrap();
        ts.pixmap_mut(canvas).unwrap().select_brush(Some("dot"));

        let s = ts.insert_sketch("shape", 8, 8).unwrap();
        ts.sketch_mut(s).unwrap().push_element(Element::Polygon(Polygon::new(
            vec![Point::new(0.0, 0.0), Point::new(7.0, 0.0), Point::new(0.0, 7.0)],
            Color::rgb(0, 255, 0),
        )));

        let bg = ts
            .insert_feature(Feature::new(
                "bg",
                FeatureKind::Fill(FillFeature::new(Fill::Solid(Color::rgb(9, 9, 9)))),
            ))
            .unwrap();
        ts.insert_feature(Feature::new("poly", FeatureKind::Polygon(PolygonFeature::new("shape"))))
            .unwrap();

        let t = ts.insert_tile("t", 8, 8).unwrap();
        ts.add_tile_element(t, TileElement::feature(bg)).unwrap();
        ts.add_tile_element(t, TileElement::pixmap(canvas, 0, 0)).unwrap();
        ts.add_tile_element(t, TileElement::sketch(s, 0, 0, BlendFn::OverlayAlpha))
            .unwrap();
        ts
    }

    #[test]
    fn test_round_trip_preserves_structure() {
        let ts = sample();
        let json = ts.to_json().unwrap();
        let mut back = Tileset::from_json(&json).unwrap();

        assert_eq!(back.name, "sample");
        let canvas = back.find_pixmap("canvas").unwrap();
        let stamp = back.find_pixmap("stamp").unwrap();
        let brush = back.pixmap(canvas).unwrap().current_brush().unwrap();
        assert_eq!(brush.name, "dot");
        assert_eq!(brush.source, stamp);
        // One brush and no tile layers reference the stamp
        assert_eq!(back.pixmap(stamp).unwrap().nrefs(), 1);
        assert_eq!(back.pixmap(canvas).unwrap().nrefs(), 1);

        let s = back.find_sketch("shape").unwrap();
        assert_eq!(back.sketch(s).unwrap().elements().len(), 1);
        assert_eq!(back.sketch(s).unwrap().nrefs(), 1);
        assert!(back.find_feature("poly").is_some());
        assert!(back.find_texture("check").is_some());

        let t = back.find_tile("t").unwrap();
        assert_eq!(back.tile(t).unwrap().elements().len(), 3);
        back.generate_tile(t).unwrap();
        assert_eq!(back.tile(t).unwrap().surface().get_color(7, 7), Color::rgb(9, 9, 9));
    }

    #[test]
    fn test_unresolved_brush_is_fatal() {
        let json = sample().to_json().unwrap();
        let broken = json.replace("\"source\": \"stamp\"", "\"source\": \"gone\"");
        assert_ne!(json, broken);
        match Tileset::from_json(&broken) {
            Err(TilesetError::UnresolvedBrush { brush, pixmap }) => {
                assert_eq!(brush, "dot");
                assert_eq!(pixmap, "gone");
            }
            other => panic!("expected UnresolvedBrush, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_unresolved_tile_layer_is_dropped() {
        let json = sample().to_json().unwrap();
        let broken = json.replace("\"feature\": \"bg\"", "\"feature\": \"gone\"");
        assert_ne!(json, broken);
        let ts = Tileset::from_json(&broken).unwrap();
        let t = ts.find_tile("t").unwrap();
        assert_eq!(ts.tile(t).unwrap().elements().len(), 2);
    }

    #[test]
    fn test_invalid_surface_rejected() {
        let json = sample().to_json().unwrap();
        let broken = json.replacen("\"pitch\": 32", "\"pitch\": 4", 1);
        assert_ne!(json, broken);
        assert!(matches!(
            Tileset::from_json(&broken),
            Err(TilesetError::InvalidSurface(_))
        ));
    }

    #[test]
    fn test_unsupported_pixel_format_rejected() {
        let json = sample().to_json().unwrap();
        let mut doc: serde_json::Value = serde_json::from_str(&json).unwrap();
        doc["tiles"][0]["format"]["bytes_per_pixel"] = 0.into();
        match Tileset::from_json(&doc.to_string()) {
            Err(TilesetError::InvalidSurface(name)) => assert_eq!(name, "t"),
            other => panic!("expected InvalidSurface, got {:?}", other.err()),
        }

        let mut doc: serde_json::Value = serde_json::from_str(&json).unwrap();
        doc["config"]["pixel_format"]["bytes_per_pixel"] = 7.into();
        assert!(matches!(
            Tileset::from_json(&doc.to_string()),
            Err(TilesetError::InvalidSurface(_))
        ));

        let everywhere = json.replace("\"bytes_per_pixel\": 4", "\"bytes_per_pixel\": 0");
        assert_ne!(json, everywhere);
        assert!(matches!(
            Tileset::from_json(&everywhere),
            Err(TilesetError::InvalidSurface(_))
        ));
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("tilesmith-{}.json", std::process::id()));
        sample().save(&path).unwrap();
        let back = Tileset::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(back.pixmaps().len(), 2);
        assert_eq!(back.tiles().len(), 1);
    }
}
