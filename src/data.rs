use crate::config::InputConfig;
use crate::error::MapError;
use crate::types::{Dataset, Feature};
use geo::Point;
use geojson::{GeoJson, Value};
use serde_json::Value as JsonValue;
use std::path::PathBuf;

/// Where the GeoJSON comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Url(String),
    File(PathBuf),
}

impl DataSource {
    pub fn parse(source: &str) -> Self {
        if source.starts_with("http://") || source.starts_with("https://") {
            DataSource::Url(source.to_string())
        } else {
            DataSource::File(PathBuf::from(source))
        }
    }
}

/// The one asynchronous step of start-up: fetch the file, then parse it.
pub async fn load_dataset(input: &InputConfig) -> Result<Dataset, MapError> {
    let source = DataSource::parse(&input.source);
    tracing::info!("Loading data from {:?}...", source);

    let bytes = fetch_bytes(&source, &input.source).await?;
    let dataset = parse_dataset(&bytes, &input.identity_field)
        .map_err(|e| match e {
            MapError::Fetch { reason, .. } => MapError::fetch(&input.source, reason),
            other => other,
        })?;

    tracing::info!("Loaded {} point features", dataset.len());
    Ok(dataset)
}

async fn fetch_bytes(source: &DataSource, label: &str) -> Result<Vec<u8>, MapError> {
    match source {
        DataSource::Url(url) => {
            let response = reqwest::get(url)
                .await
                .map_err(|e| MapError::fetch(label, e))?;
            let response = response
                .error_for_status()
                .map_err(|e| MapError::fetch(label, e))?;
            let body = response.bytes().await.map_err(|e| MapError::fetch(label, e))?;
            Ok(body.to_vec())
        }
        DataSource::File(path) => tokio::fs::read(path)
            .await
            .map_err(|e| MapError::fetch(label, e)),
    }
}

/// Parses a FeatureCollection, keeping point features only.
pub fn parse_dataset(bytes: &[u8], identity_field: &str) -> Result<Dataset, MapError> {
    let text = std::str::from_utf8(bytes).map_err(|e| MapError::fetch("input", e))?;
    let geojson: GeoJson = text.parse().map_err(|e| MapError::fetch("input", e))?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(MapError::fetch("input", "GeoJSON must be a FeatureCollection")),
    };

    let mut features = Vec::new();

    for (i, feature) in collection.features.into_iter().enumerate() {
        let properties = feature.properties.unwrap_or_default();

        let name = match properties.get(identity_field) {
            Some(JsonValue::String(s)) => s.clone(),
            Some(JsonValue::Number(n)) => n.to_string(),
            _ => format!("feature #{}", i),
        };

        let point = match feature.geometry.map(|g| g.value) {
            Some(Value::Point(coords)) if coords.len() >= 2 => Point::new(coords[0], coords[1]),
            Some(_) => {
                tracing::warn!("Skipping '{}': not a point geometry", name);
                continue;
            }
            None => {
                tracing::warn!("Skipping '{}': no geometry", name);
                continue;
            }
        };

        features.push(Feature {
            name,
            point,
            properties,
        });
    }

    Dataset::new(features)
}
