use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{bail, Context, Result};

use crate::attributes::YearRange;
use crate::render::parse_hex_color;
use crate::symbols::{PopupTemplate, SymbolStyle};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub popup: PopupTemplate,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub style: StyleConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub source: String, // File path or http(s) URL of the GeoJSON
    #[serde(default = "default_identity_field")]
    pub identity_field: String,
    pub first_year: i32,
    pub last_year: i32,
}

impl InputConfig {
    pub fn years(&self) -> YearRange {
        YearRange::new(self.first_year, self.last_year)
    }
}

fn default_identity_field() -> String {
    "city".to_string()
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub center: [f64; 2], // [lat, lon]
    pub zoom: u8,
    pub max_zoom: u8,
    pub tile_url: String,
    pub attribution: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: [56.1946291535801, 15.245700543391719],
            zoom: 4,
            max_zoom: 16,
            tile_url: "https://server.arcgisonline.com/ArcGIS/rest/services/Canvas/World_Light_Gray_Base/MapServer/tile/{z}/{y}/{x}".to_string(),
            attribution: "Tiles &copy; Esri &mdash; Esri, DeLorme, NAVTEQ".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StyleConfig {
    pub min_radius: f64,
    pub fill_color: String,
    pub color: String,
    pub weight: f64,
    pub opacity: f64,
    pub fill_opacity: f64,
    pub legend_fill: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        let symbol = SymbolStyle::default();
        Self {
            min_radius: crate::radius::DEFAULT_MIN_RADIUS,
            fill_color: symbol.fill_color,
            color: symbol.color,
            weight: symbol.weight,
            opacity: symbol.opacity,
            fill_opacity: symbol.fill_opacity,
            legend_fill: "#756bb1".to_string(),
        }
    }
}

impl StyleConfig {
    pub fn symbol_style(&self) -> SymbolStyle {
        SymbolStyle {
            fill_color: self.fill_color.clone(),
            color: self.color.clone(),
            weight: self.weight,
            opacity: self.opacity,
            fill_opacity: self.fill_opacity,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub frame_dir: PathBuf,
    pub width: u32,
    pub height: u32,
    pub background: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            frame_dir: PathBuf::from("output/frames"),
            width: 1024,
            height: 768,
            background: "#e8e8e8".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            static_dir: PathBuf::from("static"),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.input.years().is_empty() {
            bail!(
                "first_year {} is after last_year {}",
                self.input.first_year,
                self.input.last_year
            );
        }
        if !(self.style.min_radius.is_finite() && self.style.min_radius > 0.0) {
            bail!("style.min_radius must be positive, got {}", self.style.min_radius);
        }
        for (name, color) in [
            ("style.fill_color", &self.style.fill_color),
            ("style.color", &self.style.color),
            ("style.legend_fill", &self.style.legend_fill),
            ("output.background", &self.output.background),
        ] {
            if parse_hex_color(color).is_none() {
                bail!("{} is not a #rrggbb colour: {}", name, color);
            }
        }
        if self.output.width == 0 || self.output.height == 0 {
            bail!("output frame size must be non-zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [input]
        source = "data/cities.geojson"
        first_year = 2008
        last_year = 2019
    "#;

    #[test]
    fn minimal_config_takes_viewer_defaults() {
        let config = AppConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.input.identity_field, "city");
        assert_eq!(config.input.years().len(), 12);
        assert_eq!(config.map.zoom, 4);
        assert_eq!(config.style.fill_color, "#998ec3");
        assert_eq!(config.style.min_radius, 5.0);
        assert_eq!(config.popup.unit, "percent");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn sections_override_defaults() {
        let text = format!(
            "{}\n[style]\nfill_color = \"#112233\"\nmin_radius = 3.0\n[popup]\nunit = \"%\"\n",
            MINIMAL
        );
        let config = AppConfig::from_toml(&text).unwrap();
        assert_eq!(config.style.symbol_style().fill_color, "#112233");
        assert_eq!(config.style.color, "#252525");
        assert_eq!(config.style.min_radius, 3.0);
        assert_eq!(config.popup.unit, "%");
        assert_eq!(config.popup.identity_label, "City");
    }

    #[test]
    fn rejects_inverted_years_and_bad_colours() {
        let inverted = MINIMAL.replace("last_year = 2019", "last_year = 2000");
        assert!(AppConfig::from_toml(&inverted).is_err());

        let bad_colour = format!("{}\n[style]\nfill_color = \"purple\"\n", MINIMAL);
        assert!(AppConfig::from_toml(&bad_colour).is_err());
    }
}
