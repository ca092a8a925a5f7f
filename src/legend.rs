//! Static reference key for the proportional symbols.
//!
//! The legend is computed once from whole-series statistics, so it does not
//! move when the selected year changes; only the temporal header does.

use std::fmt::Write;

use serde::Serialize;

use crate::error::MapError;
use crate::radius::RadiusModel;
use crate::stats::{DatasetStats, Statistic};

const LEGEND_ORDER: [Statistic; 3] = [Statistic::Max, Statistic::Mean, Statistic::Min];
const CIRCLE_BASELINE: f64 = 50.0;
const CIRCLE_X: f64 = 65.0;
const LABEL_X: f64 = 95.0;
const LABEL_SPACING: f64 = 20.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub statistic: Statistic,
    pub value: f64,
    pub radius: f64,
    pub cx: f64,
    pub cy: f64,
    pub label_x: f64,
    pub label_y: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendModel {
    pub entries: Vec<LegendEntry>,
    pub fill_color: String,
}

impl LegendModel {
    pub fn new(stats: &DatasetStats, model: &RadiusModel, unit: &str, fill_color: &str) -> Result<Self, MapError> {
        let mut entries = Vec::with_capacity(LEGEND_ORDER.len());
        for (i, statistic) in LEGEND_ORDER.iter().enumerate() {
            let value = round2(stats.get(*statistic));
            let radius = model.radius(stats.get(*statistic))?;
            entries.push(LegendEntry {
                statistic: *statistic,
                value,
                radius,
                cx: CIRCLE_X,
                // Circles share a bottom edge so they nest
                cy: CIRCLE_BASELINE - radius,
                label_x: LABEL_X,
                label_y: i as f64 * LABEL_SPACING + LABEL_SPACING,
                label: format!("{} {}", value, unit),
            });
        }
        Ok(Self {
            entries,
            fill_color: fill_color.to_string(),
        })
    }

    pub fn set_fill_color(&mut self, color: &str) {
        self.fill_color = color.to_string();
    }

    pub fn to_svg(&self) -> String {
        let mut svg = String::from(r#"<svg id="attribute-legend" xmlns="http://www.w3.org/2000/svg">"#);
        for entry in &self.entries {
            let name = entry.statistic.name();
            let _ = write!(
                svg,
                r##"<circle class="legend-circle" id="{}" r="{}" cy="{}" fill="{}" fill-opacity="0.8" stroke="#252525" cx="{}"/>"##,
                name, entry.radius, entry.cy, self.fill_color, entry.cx
            );
            let _ = write!(
                svg,
                r#"<text id="{}-text" x="{}" y="{}">{}</text>"#,
                name, entry.label_x, entry.label_y, entry.label
            );
        }
        svg.push_str("</svg>");
        svg
    }
}

/// Header naming the year currently on display.
pub fn temporal_legend_html(value_label: &str, year: &str) -> String {
    format!(
        r#"<p class="temporalLegend">{} in <span class="year">{}</span></p>"#,
        value_label, year
    )
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legend() -> LegendModel {
        let stats = DatasetStats {
            min: 10.0,
            max: 40.0,
            mean: 22.456,
        };
        let model = RadiusModel::new(stats.min, 5.0).unwrap();
        LegendModel::new(&stats, &model, "percent", "#756bb1").unwrap()
    }

    #[test]
    fn entries_ordered_max_mean_min() {
        let legend = legend();
        let order: Vec<_> = legend.entries.iter().map(|e| e.statistic).collect();
        assert_eq!(order, vec![Statistic::Max, Statistic::Mean, Statistic::Min]);
        assert!(legend.entries[0].radius > legend.entries[1].radius);
        assert!(legend.entries[1].radius > legend.entries[2].radius);
    }

    #[test]
    fn layout_nests_circles_and_stacks_labels() {
        let legend = legend();
        for (i, entry) in legend.entries.iter().enumerate() {
            assert!((entry.cy + entry.radius - 50.0).abs() < 1e-9);
            assert_eq!(entry.label_y, i as f64 * 20.0 + 20.0);
        }
        assert_eq!(legend.entries[1].label, "22.46 percent");
    }

    #[test]
    fn svg_uses_current_fill() {
        let mut legend = legend();
        legend.set_fill_color("#00ff00");
        let svg = legend.to_svg();
        assert!(svg.starts_with(r#"<svg id="attribute-legend""#));
        assert_eq!(svg.matches("<circle").count(), 3);
        assert_eq!(svg.matches(r##"fill="#00ff00""##).count(), 3);
        assert!(svg.contains(r#"id="max-text""#));
    }

    #[test]
    fn temporal_header_shows_year() {
        assert_eq!(
            temporal_legend_html("Elderly dependency ratio", "2012"),
            r#"<p class="temporalLegend">Elderly dependency ratio in <span class="year">2012</span></p>"#
        );
    }
}
