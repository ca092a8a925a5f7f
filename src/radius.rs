use crate::error::MapError;

pub const DEFAULT_MIN_RADIUS: f64 = 5.0;

// Flannery appearance compensation
const FLANNERY_SCALE: f64 = 1.0083;
const FLANNERY_EXPONENT: f64 = 0.5715;

/// Radius of a proportional circle for `value`, relative to the dataset minimum.
pub fn prop_radius(value: f64, min_value: f64, min_radius: f64) -> Result<f64, MapError> {
    let valid = |v: f64| v.is_finite() && v > 0.0;
    if !valid(value) || !valid(min_value) {
        return Err(MapError::InvalidValue { value, min_value });
    }
    Ok(min_radius * FLANNERY_SCALE * (value / min_value).powf(FLANNERY_EXPONENT))
}

/// Sizing rule bound to one dataset's minimum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusModel {
    min_value: f64,
    min_radius: f64,
}

impl RadiusModel {
    pub fn new(min_value: f64, min_radius: f64) -> Result<Self, MapError> {
        if !(min_value.is_finite() && min_value > 0.0) {
            return Err(MapError::InvalidValue {
                value: min_value,
                min_value,
            });
        }
        Ok(Self {
            min_value,
            min_radius,
        })
    }

    pub fn radius(&self, value: f64) -> Result<f64, MapError> {
        prop_radius(value, self.min_value, self.min_radius)
    }

    pub fn min_value(&self) -> f64 {
        self.min_value
    }

    pub fn min_radius(&self) -> f64 {
        self.min_radius
    }
}
