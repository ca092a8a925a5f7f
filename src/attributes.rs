use serde::{Deserialize, Serialize};

use crate::error::MapError;
use crate::types::Dataset;

/// Inclusive span of years the dataset carries one value for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct YearRange {
    pub first: i32,
    pub last: i32,
}

impl YearRange {
    pub fn new(first: i32, last: i32) -> Self {
        Self { first, last }
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.first..=self.last).contains(&year)
    }

    pub fn len(&self) -> usize {
        if self.last < self.first {
            0
        } else {
            (self.last - self.first + 1) as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> impl Iterator<Item = String> {
        (self.first..=self.last).map(|year| year.to_string())
    }
}

/// Year attribute keys in chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeList {
    keys: Vec<String>,
}

impl AttributeList {
    #[cfg(test)]
    pub(crate) fn from_range(range: YearRange) -> Self {
        Self {
            keys: range.keys().collect(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.keys.get(index).map(String::as_str)
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.keys.len().saturating_sub(1)
    }
}

/// Derives the attribute list from the first feature's property bag.
///
/// Only keys that read as a year inside `range` are kept; the identity field
/// and anything else in the bag is ignored.
pub fn extract_attributes(dataset: &Dataset, range: YearRange) -> Result<AttributeList, MapError> {
    let first = dataset.features().first().ok_or(MapError::EmptyDataset)?;

    let mut years: Vec<i32> = first
        .properties
        .keys()
        .filter(|key| !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|key| key.parse::<i32>().ok())
        .filter(|year| range.contains(*year))
        .collect();
    years.sort_unstable();
    years.dedup();

    if years.is_empty() {
        return Err(MapError::MissingAttribute {
            feature: first.name.clone(),
            attribute: range.first.to_string(),
        });
    }

    tracing::debug!("Extracted {} year attributes from '{}'", years.len(), first.name);

    Ok(AttributeList {
        keys: years.into_iter().map(|y| y.to_string()).collect(),
    })
}
