use crate::attributes::{extract_attributes, AttributeList};
use crate::config::AppConfig;
use crate::controller::TemporalController;
use crate::error::MapError;
use crate::legend::{temporal_legend_html, LegendModel};
use crate::radius::RadiusModel;
use crate::render::parse_hex_color;
use crate::stats::{calc_stats, DatasetStats};
use crate::symbols::{render_symbols, MapSurface, PopupTemplate, SymbolInstance};
use crate::types::Dataset;

/// Everything one loaded map needs between user events.
pub struct MapSession<S: MapSurface> {
    dataset: Dataset,
    stats: DatasetStats,
    model: RadiusModel,
    popup: PopupTemplate,
    controller: TemporalController,
    legend: LegendModel,
    surface: S,
}

impl<S: MapSurface> MapSession<S> {
    pub fn initialize(dataset: Dataset, config: &AppConfig, surface: S) -> Result<Self, MapError> {
        Self::initialize_at(dataset, config, surface, 0)
    }

    /// Builds the session with symbols first drawn for the attribute at `index`.
    pub fn initialize_at(
        dataset: Dataset,
        config: &AppConfig,
        mut surface: S,
        index: usize,
    ) -> Result<Self, MapError> {
        let years = config.input.years();
        let attributes = extract_attributes(&dataset, years)?;
        let stats = calc_stats(&dataset, years)?;
        let model = RadiusModel::new(stats.min, config.style.min_radius)?;
        tracing::info!(
            "Stats over {} years: min {:.2}, max {:.2}, mean {:.2}",
            attributes.len(),
            stats.min,
            stats.max,
            stats.mean
        );

        let index = index.min(attributes.last_index());
        let symbols = render_symbols(
            &dataset,
            &attributes,
            index,
            &model,
            &config.style.symbol_style(),
            &config.popup,
            &mut surface,
        )?;
        let legend = LegendModel::new(&stats, &model, &config.popup.unit, &config.style.legend_fill)?;

        Ok(Self {
            dataset,
            stats,
            model,
            popup: config.popup.clone(),
            controller: TemporalController::new(attributes, index, symbols),
            legend,
            surface,
        })
    }

    pub fn forward(&mut self) -> Result<usize, MapError> {
        self.controller
            .forward(&self.dataset, &self.model, &self.popup, &mut self.surface)
    }

    pub fn reverse(&mut self) -> Result<usize, MapError> {
        self.controller
            .reverse(&self.dataset, &self.model, &self.popup, &mut self.surface)
    }

    pub fn seek(&mut self, index: i64) -> Result<usize, MapError> {
        self.controller
            .seek(index, &self.dataset, &self.model, &self.popup, &mut self.surface)
    }

    /// Restyles every symbol and the legend; returns false for a malformed colour.
    pub fn set_fill_color(&mut self, color: &str) -> bool {
        if parse_hex_color(color).is_none() {
            return false;
        }
        for symbol in self.controller.symbols() {
            self.surface.set_fill_color(symbol.handle, color);
        }
        self.legend.set_fill_color(color);
        true
    }

    pub fn index(&self) -> usize {
        self.controller.index()
    }

    pub fn current_year(&self) -> &str {
        self.controller.label()
    }

    pub fn temporal_label(&self) -> String {
        temporal_legend_html(&self.popup.value_label, self.controller.label())
    }

    pub fn attributes(&self) -> &AttributeList {
        self.controller.attributes()
    }

    pub fn symbols(&self) -> &[SymbolInstance] {
        self.controller.symbols()
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn stats(&self) -> &DatasetStats {
        &self.stats
    }

    pub fn legend(&self) -> &LegendModel {
        &self.legend
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::parse_dataset;
    use crate::surface::LayerStore;

    fn config() -> AppConfig {
        AppConfig::from_toml(
            r#"
            [input]
            source = "unused"
            first_year = 2008
            last_year = 2009
            "#,
        )
        .unwrap()
    }

    fn dataset() -> Dataset {
        parse_dataset(
            br#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{"city":"Oslo","2008":10,"2009":12},
                 "geometry":{"type":"Point","coordinates":[10.7,59.9]}},
                {"type":"Feature","properties":{"city":"Riga","2008":40,"2009":44},
                 "geometry":{"type":"Point","coordinates":[24.1,56.9]}}]}"#,
            "city",
        )
        .unwrap()
    }

    #[test]
    fn initial_state_shows_first_year() {
        let session = MapSession::initialize(dataset(), &config(), LayerStore::default()).unwrap();
        assert_eq!(session.index(), 0);
        assert_eq!(session.current_year(), "2008");
        assert_eq!(session.stats().min, 10.0);
        assert_eq!(session.surface().len(), 2);
        assert!(session.temporal_label().contains(r#"<span class="year">2008</span>"#));
    }

    #[test]
    fn color_change_leaves_radius_and_content() {
        let mut session = MapSession::initialize(dataset(), &config(), LayerStore::default()).unwrap();
        session.forward().unwrap();
        let before: Vec<_> = session.surface().layers().map(|(_, l)| (l.radius, l.content.clone())).collect();

        assert!(session.set_fill_color("#123456"));
        assert!(!session.set_fill_color("blue"));

        let after: Vec<_> = session.surface().layers().map(|(_, l)| (l.radius, l.content.clone())).collect();
        assert_eq!(before, after);
        assert!(session.surface().layers().all(|(_, l)| l.style.fill_color == "#123456"));
        assert_eq!(session.legend().fill_color, "#123456");
        assert_eq!(session.current_year(), "2009");
    }

    #[test]
    fn legend_ignores_selection() {
        let mut session = MapSession::initialize(dataset(), &config(), LayerStore::default()).unwrap();
        let legend = session.legend().clone();
        session.seek(1).unwrap();
        assert_eq!(session.legend(), &legend);
    }

    #[test]
    fn start_index_is_clamped() {
        let session = MapSession::initialize_at(dataset(), &config(), LayerStore::default(), 99).unwrap();
        assert_eq!(session.current_year(), "2009");
        assert!(session.symbols()[0].content.contains("2009"));
    }
}
