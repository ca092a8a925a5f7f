use geo::Point;
use serde_json::{Map, Value};

use crate::error::MapError;

#[derive(Debug, Clone)]
pub struct Feature {
    pub name: String,
    pub point: Point<f64>,
    // Year keys ("2008", ...) plus the identity field, as read from the GeoJSON
    pub properties: Map<String, Value>,
}

impl Feature {
    /// Numeric value stored under `key`, if present and a finite number.
    pub fn value(&self, key: &str) -> Option<f64> {
        self.properties
            .get(key)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
    }
}

/// Read-only collection of point features; never empty.
#[derive(Debug, Clone)]
pub struct Dataset {
    features: Vec<Feature>,
}

impl Dataset {
    pub fn new(features: Vec<Feature>) -> Result<Self, MapError> {
        if features.is_empty() {
            return Err(MapError::EmptyDataset);
        }
        Ok(Self { features })
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
