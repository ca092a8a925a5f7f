//! Proportional circle symbols and the map collaborator they are drawn on.

use geo::Point;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attributes::AttributeList;
use crate::error::MapError;
use crate::radius::RadiusModel;
use crate::types::{Dataset, Feature};

pub type LayerHandle = usize;

/// The operations the pipeline needs from a map engine.
pub trait MapSurface {
    fn add_circle_marker(&mut self, coord: Point<f64>, style: &SymbolStyle, radius: f64) -> LayerHandle;
    fn set_radius(&mut self, handle: LayerHandle, radius: f64);
    fn bind_content(&mut self, handle: LayerHandle, html: &str);
    fn update_content(&mut self, handle: LayerHandle, html: &str);
    fn set_fill_color(&mut self, handle: LayerHandle, color: &str);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolStyle {
    pub fill_color: String,
    pub color: String,
    pub weight: f64,
    pub opacity: f64,
    pub fill_opacity: f64,
}

impl Default for SymbolStyle {
    fn default() -> Self {
        Self {
            fill_color: "#998ec3".into(),
            color: "#252525".into(),
            weight: 1.0,
            opacity: 1.0,
            fill_opacity: 0.8,
        }
    }
}

/// Labels used to build popup HTML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PopupTemplate {
    pub identity_label: String,
    pub value_label: String,
    pub unit: String,
}

impl Default for PopupTemplate {
    fn default() -> Self {
        Self {
            identity_label: "City".into(),
            value_label: "Elderly dependency ratio".into(),
            unit: "percent".into(),
        }
    }
}

impl PopupTemplate {
    pub fn content(&self, feature: &Feature, attribute: &str) -> String {
        let value = feature
            .properties
            .get(attribute)
            .map(format_value)
            .unwrap_or_default();
        format!(
            "<p><b>{}:</b> {}</p><p><b>{} in {}:</b> {} {}</p>",
            self.identity_label, feature.name, self.value_label, attribute, value, self.unit
        )
    }
}

// Whole floats print without a fraction, matching the legend labels
fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(v) => format!("{}", v),
            None => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// One rendered marker; radius and content are derived from `feature`.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolInstance {
    pub feature: usize,
    pub handle: LayerHandle,
    pub radius: f64,
    pub content: String,
}

/// Radius of `feature` at `attribute`, treating a missing value as a data fault.
pub fn symbol_radius(feature: &Feature, attribute: &str, model: &RadiusModel) -> Result<f64, MapError> {
    let value = feature
        .value(attribute)
        .ok_or_else(|| MapError::MissingAttribute {
            feature: feature.name.clone(),
            attribute: attribute.to_string(),
        })?;
    model.radius(value)
}

/// Places one styled circle per feature, sized for the attribute at `index`.
pub fn render_symbols<S: MapSurface>(
    dataset: &Dataset,
    attributes: &AttributeList,
    index: usize,
    model: &RadiusModel,
    style: &SymbolStyle,
    popup: &PopupTemplate,
    surface: &mut S,
) -> Result<Vec<SymbolInstance>, MapError> {
    let attribute = attributes.get(index).ok_or_else(|| MapError::MissingAttribute {
        feature: dataset.features()[0].name.clone(),
        attribute: format!("#{}", index),
    })?;

    // Size everything first so a bad feature leaves the surface untouched
    let radii = dataset
        .features()
        .iter()
        .map(|feature| symbol_radius(feature, attribute, model))
        .collect::<Result<Vec<_>, _>>()?;

    let symbols = dataset
        .features()
        .iter()
        .zip(radii)
        .enumerate()
        .map(|(i, (feature, radius))| {
            let handle = surface.add_circle_marker(feature.point, style, radius);
            let content = popup.content(feature, attribute);
            surface.bind_content(handle, &content);
            SymbolInstance {
                feature: i,
                handle,
                radius,
                content,
            }
        })
        .collect();

    tracing::debug!("Rendered {} symbols for {}", dataset.len(), attribute);
    Ok(symbols)
}
