use crate::attributes::extract_attributes;
use crate::config::AppConfig;
use crate::session::MapSession;
use crate::surface::{CircleLayer, LayerStore};
use crate::types::Dataset;
use anyhow::{Context, Result};
use image::{ImageBuffer, Rgba, RgbaImage};
use rayon::prelude::*;
use std::f64::consts::PI;
use std::fs;
use std::path::PathBuf;

// Constants for Web Mercator
const TILE_SIZE: f64 = 256.0;

/// Writes one PNG per year plus the legend and the first year's symbols.
pub fn generate_frames(config: &AppConfig, dataset: &Dataset) -> Result<Vec<PathBuf>> {
    let attributes = extract_attributes(dataset, config.input.years())?;
    fs::create_dir_all(&config.output.frame_dir).with_context(|| {
        format!("Failed to create frame directory: {:?}", config.output.frame_dir)
    })?;

    tracing::info!(
        "Rendering {} frames at zoom {} into {:?}...",
        attributes.len(),
        config.map.zoom,
        config.output.frame_dir
    );

    let frames = (0..attributes.len())
        .into_par_iter()
        .map(|index| -> Result<PathBuf> {
            let session = MapSession::initialize_at(dataset.clone(), config, LayerStore::default(), index)?;
            let img = rasterize(session.surface(), config)?;
            let path = config.output.frame_dir.join(format!("{}.png", session.current_year()));
            img.save(&path)
                .with_context(|| format!("Failed to save frame {:?}", path))?;
            Ok(path)
        })
        .collect::<Result<Vec<_>>>()?;

    let session = MapSession::initialize(dataset.clone(), config, LayerStore::default())?;
    let legend_path = config.output.frame_dir.join("legend.svg");
    fs::write(&legend_path, session.legend().to_svg())
        .with_context(|| format!("Failed to write {:?}", legend_path))?;
    let symbols_path = config.output.frame_dir.join("symbols.geojson");
    fs::write(&symbols_path, session.surface().to_feature_collection().to_string())
        .with_context(|| format!("Failed to write {:?}", symbols_path))?;

    Ok(frames)
}

/// Draws the symbol layers onto a canvas centred on the configured map view.
pub fn rasterize(store: &LayerStore, config: &AppConfig) -> Result<RgbaImage> {
    let background = parse_hex_color(&config.output.background)
        .with_context(|| format!("Invalid background colour {}", config.output.background))?;
    let (width, height) = (config.output.width, config.output.height);
    let mut img: RgbaImage = ImageBuffer::from_pixel(width, height, background);

    let [lat, lon] = config.map.center;
    let (cx, cy) = project(lat, lon, config.map.zoom);
    let origin = (cx - width as f64 / 2.0, cy - height as f64 / 2.0);

    // Largest first so small symbols stay visible on top
    let mut layers: Vec<&CircleLayer> = store.layers().map(|(_, layer)| layer).collect();
    layers.sort_by(|a, b| b.radius.total_cmp(&a.radius));

    for layer in layers {
        let (px, py) = project(layer.point.y(), layer.point.x(), config.map.zoom);
        draw_circle(&mut img, px - origin.0, py - origin.1, layer)?;
    }

    Ok(img)
}

fn draw_circle(img: &mut RgbaImage, x: f64, y: f64, layer: &CircleLayer) -> Result<()> {
    let fill = parse_hex_color(&layer.style.fill_color)
        .with_context(|| format!("Invalid fill colour {}", layer.style.fill_color))?;
    let stroke = parse_hex_color(&layer.style.color)
        .with_context(|| format!("Invalid stroke colour {}", layer.style.color))?;
    let r = layer.radius;
    let inner = (r - layer.style.weight).max(0.0);

    let (w, h) = (img.width() as i64, img.height() as i64);
    let x0 = ((x - r).floor() as i64).max(0);
    let x1 = ((x + r).ceil() as i64).min(w - 1);
    let y0 = ((y - r).floor() as i64).max(0);
    let y1 = ((y + r).ceil() as i64).min(h - 1);

    for py in y0..=y1 {
        for px in x0..=x1 {
            let d = ((px as f64 + 0.5 - x).powi(2) + (py as f64 + 0.5 - y).powi(2)).sqrt();
            let (color, alpha) = if d <= inner {
                (fill, layer.style.fill_opacity)
            } else if d <= r {
                (stroke, layer.style.opacity)
            } else {
                continue;
            };
            let pixel = img.get_pixel_mut(px as u32, py as u32);
            *pixel = blend(*pixel, color, alpha);
        }
    }
    Ok(())
}

fn blend(under: Rgba<u8>, over: Rgba<u8>, alpha: f64) -> Rgba<u8> {
    let a = alpha.clamp(0.0, 1.0);
    let mix = |u: u8, o: u8| (o as f64 * a + u as f64 * (1.0 - a)).round() as u8;
    Rgba([
        mix(under[0], over[0]),
        mix(under[1], over[1]),
        mix(under[2], over[2]),
        255,
    ])
}

/// Parses `#rrggbb` into an opaque pixel.
pub fn parse_hex_color(hex: &str) -> Option<Rgba<u8>> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Rgba([r, g, b, 255]))
}

/// Web Mercator world pixel coordinates at `zoom`.
pub fn project(lat: f64, lon: f64, zoom: u8) -> (f64, f64) {
    let n = 2.0_f64.powi(zoom as i32) * TILE_SIZE;
    let x = (lon + 180.0) / 360.0 * n;
    let lat_rad = lat.to_radians();
    let y = (1.0 - (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() / PI) / 2.0 * n;
    (x, y)
}
