use std::path::PathBuf;

use sdl2::keyboard::Keycode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tilesmith::arena::Handle;
use tilesmith::color::Color;
use tilesmith::config::EditorConfig;
use tilesmith::display::{BlendFn, Display, RenderTarget, Surface, WindowEvent};
use tilesmith::feature::{Feature, FeatureKind, Fill, FillFeature, PolygonFeature, SketchProjection};
use tilesmith::geometry::Point;
use tilesmith::input::InputEvent;
use tilesmith::pixmap::BrushKind;
use tilesmith::sketch::{Element, LineMode, Polygon, PolygonStyle, Tool};
use tilesmith::texture::Texture;
use tilesmith::{TileElement, Tileset};

const DEFAULT_SCALE: u32 = 8;
const DEFAULT_TILESET: &str = "tileset.json";

/// Which kind of item the window shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Tile,
    Pixmap,
    Sketch,
}

struct Args {
    config: Option<PathBuf>,
    tileset: Option<PathBuf>,
    scale: u32,
}

/// Parse command line arguments
fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args {
        config: None,
        tileset: None,
        scale: DEFAULT_SCALE,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    parsed.config = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            },
            "--tileset" | "-t" => {
                if i + 1 < args.len() {
                    parsed.tileset = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            },
            "--scale" | "-s" => {
                if i + 1 < args.len() {
                    if let Ok(s) = args[i + 1].parse::<u32>() {
                        parsed.scale = s.clamp(1, 32);
                    }
                    i += 1;
                }
            },
            "--help" => {
                println!("Usage: tilesmith [OPTIONS]");
                println!();
                println!("Options:");
                println!("  --config PATH, -c PATH    Editor settings (JSON)");
                println!(
                    "  --tileset PATH, -t PATH   Tileset to open (default: {}, demo if missing)",
                    DEFAULT_TILESET
                );
                println!(
                    "  --scale N, -s N           Window pixels per surface pixel (default: {})",
                    DEFAULT_SCALE
                );
                println!("  --help                    Show this help message");
                std::process::exit(0);
            },
            _ => {},
        }
        i += 1;
    }

    parsed
}

/// A small tileset exercising every element and feature kind
fn demo_tileset(config: EditorConfig) -> tilesmith::Result<Tileset> {
    let (w, h) = (config.tile_width, config.tile_height);
    let mut ts = Tileset::new("demo", config);

    ts.insert_texture(Texture::checkerboard(
        "checker",
        8,
        2,
        Color::rgb(90, 60, 30),
        Color::rgb(120, 80, 40),
    ))?;

    let mut stamp = Surface::rgba(3, 3);
    stamp.clear(Color::WHITE);
    let stamp = ts.insert_pixmap_surface("stamp", stamp)?;
    let canvas = ts.insert_pixmap("canvas", w, h)?;
    ts.add_brush(canvas, "square", BrushKind::Mono, stamp)?;

    let shape = ts.insert_sketch("shape", w, h)?;
    if let Some(sketch) = ts.sketch_mut(shape) {
        let (fw, fh) = (w as f32, h as f32);
        let mut poly = Polygon::new(
            vec![
                Point::new(fw * 0.5, fh * 0.15),
                Point::new(fw * 0.85, fh * 0.85),
                Point::new(fw * 0.15, fh * 0.85),
            ],
            Color::rgb(40, 160, 40),
        );
        poly.style = PolygonStyle::Textured("checker".to_string());
        sketch.push_element(Element::Polygon(poly));
    }

    let sky = ts.insert_feature(Feature::new(
        "sky",
        FeatureKind::Fill(FillFeature::new(Fill::HGradient {
            top: Color::rgb(80, 140, 220),
            bottom: Color::rgb(200, 230, 255),
        })),
    ))?;
    let hill = ts.insert_feature(Feature::new("hill", FeatureKind::Polygon(PolygonFeature::new("shape"))))?;
    let mut outline = SketchProjection::new("shape");
    outline.color = Some(Color::BLACK);
    let outline = ts.insert_feature(Feature::new("outline", FeatureKind::SketchProj(outline)))?;

    let tile = ts.insert_tile("hill", w, h)?;
    for element in [
        TileElement::feature(sky),
        TileElement::feature(hill),
        TileElement::feature(outline),
        TileElement::pixmap(canvas, 0, 0),
    ] {
        ts.add_tile_element(tile, element)?;
    }

    let free = ts.insert_tile("sketch", w, h)?;
    ts.add_tile_element(free, TileElement::sketch(shape, 0, 0, BlendFn::OverlayAlpha))?;
    Ok(ts)
}

fn handles<T>(arena: &tilesmith::arena::Arena<T>) -> Vec<Handle<T>> {
    arena.iter().map(|(h, _)| h).collect()
}

fn main() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = parse_args();

    let config = match &args.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };
    let tileset_path = args.tileset.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_TILESET));
    let mut ts = match Tileset::load(&tileset_path) {
        Ok(ts) => ts,
        Err(e) => {
            warn!(path = %tileset_path.display(), error = %e, "could not load tileset, using demo");
            demo_tileset(config.clone())?
        },
    };
    if args.config.is_some() {
        ts.config = config;
    }

    let (mut display, texture_creator) =
        Display::new("tilesmith", ts.config.tile_width, ts.config.tile_height, args.scale)?;
    let mut target = RenderTarget::with_size(&texture_creator, ts.config.tile_width, ts.config.tile_height)?;

    let mut view = View::Tile;
    let mut index = 0usize;
    let mut tool = Tool::Select;

    println!("=== tilesmith ===");
    println!("Controls:");
    println!("  F1 / F2 / F3  - Show tiles / pixmaps / sketches");
    println!("  Tab           - Next item (Shift+Tab: previous)");
    println!("  Ctrl+S        - Save tileset");
    println!("  Ctrl+Z/Ctrl+R - Undo / redo");
    println!("  Wheel + Ctrl/Shift/Alt - Adjust brush hue / saturation / value");
    println!("  Q             - Quit");
    println!();
    println!("Pixmaps:   left drag paints, B cycles brushes");
    println!("Sketches:  1 select, 2 line, 3 line strip, 4 circle, 5 polygon");

    'main: loop {
        for event in display.poll_events() {
            let (event, keycode) = match event {
                WindowEvent::Quit => break 'main,
                WindowEvent::Input { event, keycode } => (event, keycode),
            };

            let sketch_handles = handles(ts.sketches());
            let pixmap_handles = handles(ts.pixmaps());
            let count = match view {
                View::Tile => ts.tiles().len(),
                View::Pixmap => pixmap_handles.len(),
                View::Sketch => sketch_handles.len(),
            };

            if let (Some(k), InputEvent::KeyDown { mods, .. }) = (keycode, &event) {
                let next_view = match k {
                    Keycode::F1 => Some(View::Tile),
                    Keycode::F2 => Some(View::Pixmap),
                    Keycode::F3 => Some(View::Sketch),
                    _ => None,
                };
                if let Some(v) = next_view {
                    if view == View::Sketch {
                        if let Some(s) = sketch_handles.get(index).and_then(|&h| ts.sketch_mut(h)) {
                            tool.cancel(s);
                        }
                    }
                    view = v;
                    index = 0;
                    tool = Tool::Select;
                    continue;
                }

                match k {
                    Keycode::Q => break 'main,
                    Keycode::Tab if count > 0 => {
                        index = if mods.shift {
                            (index + count - 1) % count
                        } else {
                            (index + 1) % count
                        };
                        tool = Tool::Select;
                        continue;
                    },
                    Keycode::S if mods.ctrl => {
                        if let Err(e) = ts.save(&tileset_path) {
                            warn!(error = %e, "save failed");
                        }
                        continue;
                    },
                    Keycode::B if view == View::Pixmap => {
                        if let Some(p) = pixmap_handles.get(index).and_then(|&h| ts.pixmap_mut(h)) {
                            let names: Vec<String> = p.brushes().iter().map(|b| b.name.clone()).collect();
                            let pos = p.current_brush().and_then(|b| names.iter().position(|n| *n == b.name));
                            let next = match pos {
                                None => names.first(),
                                Some(i) => names.get(i + 1),
                            };
                            p.select_brush(next.map(String::as_str));
                            info!(brush = next.map_or("(pixel)", String::as_str), "brush selected");
                        }
                        continue;
                    },
                    Keycode::Num1 | Keycode::Num2 | Keycode::Num3 | Keycode::Num4 | Keycode::Num5
                        if view == View::Sketch =>
                    {
                        if let Some(s) = sketch_handles.get(index).and_then(|&h| ts.sketch_mut(h)) {
                            tool.cancel(s);
                        }
                        tool = match k {
                            Keycode::Num2 => Tool::line(LineMode::Segment),
                            Keycode::Num3 => Tool::line(LineMode::Strip),
                            Keycode::Num4 => Tool::circle(),
                            Keycode::Num5 => Tool::polygon(),
                            _ => Tool::Select,
                        };
                        info!(tool = tool.name(), "tool selected");
                        continue;
                    },
                    _ => {},
                }
            }

            match view {
                View::Tile => {},
                View::Pixmap => {
                    if let Some(&h) = pixmap_handles.get(index) {
                        ts.pixmap_event(h, &event)?;
                    }
                },
                View::Sketch => {
                    if let Some(&h) = sketch_handles.get(index) {
                        ts.sketch_event(h, &mut tool, &event)?;
                    }
                },
            }
        }

        ts.generate_dirty()?;

        let shown: Option<&Surface> = match view {
            View::Tile => handles(ts.tiles())
                .get(index)
                .and_then(|&h| ts.tile(h))
                .map(|t| t.surface()),
            View::Pixmap => handles(ts.pixmaps())
                .get(index)
                .and_then(|&h| ts.pixmap(h))
                .map(|p| p.surface()),
            View::Sketch => {
                let h = handles(ts.sketches()).get(index).copied();
                if let Some(h) = h {
                    if ts.sketch(h).is_some_and(|s| s.surface().is_none()) {
                        ts.generate_sketch(h)?;
                    }
                }
                h.and_then(|h| ts.sketch(h)).and_then(|s| s.surface())
            },
        };

        if let Some(surface) = shown {
            if !target.fits(surface) {
                target = RenderTarget::with_size(&texture_creator, surface.width(), surface.height())?;
            }
            display.present(&mut target, surface)?;
        }
    }

    Ok(())
}
