use std::fmt;

use thiserror::Error;

/// Failures of the symbol pipeline.
///
/// Everything except `Fetch` is a contract violation by the input data and
/// aborts session initialisation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapError {
    #[error("dataset contains no point features")]
    EmptyDataset,
    #[error("feature '{feature}' has no value for year '{key}'")]
    MissingValue { feature: String, key: String },
    #[error("feature '{feature}' lacks numeric attribute '{attribute}'")]
    MissingAttribute { feature: String, attribute: String },
    #[error("cannot size symbol for value {value} against minimum {min_value} (both must be positive)")]
    InvalidValue { value: f64, min_value: f64 },
    // `origin` rather than `source`, which thiserror reserves for the cause
    #[error("failed to load data from {origin}: {reason}")]
    Fetch { origin: String, reason: String },
}

impl MapError {
    pub fn fetch(origin: &str, reason: impl fmt::Display) -> Self {
        MapError::Fetch {
            origin: origin.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the failure came from reaching the data source rather than from its contents.
    pub fn is_fetch(&self) -> bool {
        matches!(self, MapError::Fetch { .. })
    }
}
