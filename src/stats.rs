use serde::Serialize;
use serde_json::Value;

use crate::attributes::YearRange;
use crate::error::MapError;
use crate::types::Dataset;

/// Normalisation statistics over every (feature, year) value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DatasetStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Which statistic a legend entry stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    Max,
    Mean,
    Min,
}

impl Statistic {
    pub fn name(&self) -> &'static str {
        match self {
            Statistic::Max => "max",
            Statistic::Mean => "mean",
            Statistic::Min => "min",
        }
    }
}

impl DatasetStats {
    pub fn get(&self, stat: Statistic) -> f64 {
        match stat {
            Statistic::Max => self.max,
            Statistic::Mean => self.mean,
            Statistic::Min => self.min,
        }
    }
}

pub fn calc_stats(dataset: &Dataset, range: YearRange) -> Result<DatasetStats, MapError> {
    let mut values = Vec::with_capacity(dataset.len() * range.len());

    for feature in dataset.features() {
        for key in range.keys() {
            match feature.properties.get(&key) {
                None => {
                    return Err(MapError::MissingValue {
                        feature: feature.name.clone(),
                        key,
                    })
                }
                Some(Value::Number(n)) => match n.as_f64() {
                    Some(v) if v.is_finite() => values.push(v),
                    _ => tracing::debug!("Skipping non-finite {} for '{}'", key, feature.name),
                },
                Some(other) => {
                    tracing::debug!("Skipping non-numeric {} = {} for '{}'", key, other, feature.name)
                }
            }
        }
    }

    let first = *values.first().ok_or(MapError::EmptyDataset)?;
    let mut min = first;
    let mut max = first;
    let mut sum = 0.0;
    for &v in &values {
        min = min.min(v);
        max = max.max(v);
        sum += v;
    }

    Ok(DatasetStats {
        min,
        max,
        mean: sum / values.len() as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Feature;
    use geo::Point;
    use serde_json::{json, Map};

    fn feature(name: &str, values: &[(&str, Value)]) -> Feature {
        let mut properties = Map::new();
        properties.insert("city".into(), json!(name));
        for (k, v) in values {
            properties.insert((*k).into(), v.clone());
        }
        Feature {
            name: name.into(),
            point: Point::new(0.0, 0.0),
            properties,
        }
    }

    #[test]
    fn min_max_mean_over_all_years() {
        let dataset = Dataset::new(vec![
            feature("A", &[("2008", json!(10.0)), ("2009", json!(20.0))]),
            feature("B", &[("2008", json!(40.0)), ("2009", json!(30.0))]),
        ])
        .unwrap();

        let stats = calc_stats(&dataset, YearRange::new(2008, 2009)).unwrap();

        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 40.0);
        assert!((stats.mean - 25.0).abs() < 1e-9);
        assert_eq!(stats.get(Statistic::Mean), stats.mean);
    }

    #[test]
    fn missing_year_key_fails() {
        let dataset = Dataset::new(vec![
            feature("A", &[("2011", json!(10.0)), ("2012", json!(11.0))]),
            feature("B", &[("2011", json!(12.0))]),
        ])
        .unwrap();

        let err = calc_stats(&dataset, YearRange::new(2011, 2012)).unwrap_err();

        assert_eq!(
            err,
            MapError::MissingValue {
                feature: "B".into(),
                key: "2012".into()
            }
        );
    }

    #[test]
    fn null_values_are_skipped() {
        let dataset = Dataset::new(vec![feature(
            "A",
            &[("2008", json!(null)), ("2009", json!(12.5)), ("2010", json!("n/a"))],
        )])
        .unwrap();

        let stats = calc_stats(&dataset, YearRange::new(2008, 2010)).unwrap();

        assert_eq!(stats.min, 12.5);
        assert_eq!(stats.max, 12.5);
    }

    #[test]
    fn nothing_numeric_is_empty() {
        let dataset = Dataset::new(vec![feature("A", &[("2008", json!(null))])]).unwrap();
        assert_eq!(
            calc_stats(&dataset, YearRange::new(2008, 2008)),
            Err(MapError::EmptyDataset)
        );
    }
}
