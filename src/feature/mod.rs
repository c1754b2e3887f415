//! Tile features: reusable rendering operations referenced by tiles.
//!
//! Features refer to textures and sketches by name. A name that doesn't
//! resolve at render time makes the feature draw nothing.

mod fill;
mod polygon;
mod sketch_proj;

use serde::{Deserialize, Serialize};

pub use fill::{gradient_factor, Fill, FillFeature, GradientAxis};
pub use polygon::{
    fill_polygon, outline_polygon, scan_polygon, texture_polygon, PolygonFeature, PolygonSource,
};
pub use sketch_proj::SketchProjection;

use crate::arena::Arena;
use crate::display::Surface;
use crate::sketch::Sketch;
use crate::texture::{self, Texture};

/// Read-only view of the named resources a feature may reference
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub textures: &'a Arena<Texture>,
    pub sketches: &'a Arena<Sketch>,
}

impl<'a> RenderContext<'a> {
    pub fn new(textures: &'a Arena<Texture>, sketches: &'a Arena<Sketch>) -> Self {
        Self { textures, sketches }
    }

    pub fn texture(&self, name: &str) -> Option<&'a Texture> {
        texture::lookup(self.textures, name)
    }

    pub fn sketch(&self, name: &str) -> Option<&'a Sketch> {
        self.sketches.iter().map(|(_, s)| s).find(|s| s.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureKind {
    Fill(FillFeature),
    Polygon(PolygonFeature),
    SketchProj(SketchProjection),
}

impl FeatureKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            FeatureKind::Fill(_) => "fill",
            FeatureKind::Polygon(_) => "polygon",
            FeatureKind::SketchProj(_) => "sketchproj",
        }
    }
}

/// A named feature owned by a tileset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub kind: FeatureKind,
    /// Tile elements referencing this feature
    #[serde(skip)]
    pub(crate) nrefs: u32,
}

impl Feature {
    pub fn new(name: impl Into<String>, kind: FeatureKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nrefs: 0,
        }
    }

    #[inline]
    pub fn nrefs(&self) -> u32 {
        self.nrefs
    }

    pub fn apply(&self, surface: &mut Surface, ctx: &RenderContext<'_>) {
        match &self.kind {
            FeatureKind::Fill(f) => f.apply(surface, ctx),
            FeatureKind::Polygon(p) => p.apply(surface, ctx),
            FeatureKind::SketchProj(p) => p.apply(surface, ctx),
        }
    }
}
