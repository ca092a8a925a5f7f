use geo::Point;
use geojson::{Feature as GeoFeature, FeatureCollection, Geometry, JsonObject, Value as GeoValue};
use serde_json::json;

use crate::symbols::{LayerHandle, MapSurface, SymbolStyle};

#[derive(Debug, Clone, PartialEq)]
pub struct CircleLayer {
    pub point: Point<f64>,
    pub radius: f64,
    pub style: SymbolStyle,
    pub content: Option<String>,
}

/// In-memory map surface; handles are indices into the layer list.
#[derive(Debug, Clone, Default)]
pub struct LayerStore {
    layers: Vec<CircleLayer>,
}

impl LayerStore {
    pub fn layer(&self, handle: LayerHandle) -> Option<&CircleLayer> {
        self.layers.get(handle)
    }

    pub fn layers(&self) -> impl Iterator<Item = (LayerHandle, &CircleLayer)> {
        self.layers.iter().enumerate()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    fn layer_mut(&mut self, handle: LayerHandle) -> Option<&mut CircleLayer> {
        let layer = self.layers.get_mut(handle);
        if layer.is_none() {
            tracing::warn!("Ignoring update for unknown layer {}", handle);
        }
        layer
    }

    /// Circle layers as GeoJSON points carrying radius, popup and style, for a Leaflet client.
    pub fn to_feature_collection(&self) -> FeatureCollection {
        let features = self
            .layers
            .iter()
            .enumerate()
            .map(|(handle, layer)| {
                let mut properties = JsonObject::new();
                properties.insert("handle".into(), json!(handle));
                properties.insert("radius".into(), json!(layer.radius));
                properties.insert("popup".into(), json!(layer.content));
                properties.insert("style".into(), json!(layer.style));
                GeoFeature {
                    bbox: None,
                    geometry: Some(Geometry::new(GeoValue::Point(vec![
                        layer.point.x(),
                        layer.point.y(),
                    ]))),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

impl MapSurface for LayerStore {
    fn add_circle_marker(&mut self, coord: Point<f64>, style: &SymbolStyle, radius: f64) -> LayerHandle {
        self.layers.push(CircleLayer {
            point: coord,
            radius,
            style: style.clone(),
            content: None,
        });
        self.layers.len() - 1
    }

    fn set_radius(&mut self, handle: LayerHandle, radius: f64) {
        if let Some(layer) = self.layer_mut(handle) {
            layer.radius = radius;
        }
    }

    fn bind_content(&mut self, handle: LayerHandle, html: &str) {
        if let Some(layer) = self.layer_mut(handle) {
            layer.content = Some(html.to_string());
        }
    }

    fn update_content(&mut self, handle: LayerHandle, html: &str) {
        self.bind_content(handle, html);
    }

    fn set_fill_color(&mut self, handle: LayerHandle, color: &str) {
        if let Some(layer) = self.layer_mut(handle) {
            layer.style.fill_color = color.to_string();
        }
    }
}
