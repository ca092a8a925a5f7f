use crate::attributes::AttributeList;
use crate::error::MapError;
use crate::radius::RadiusModel;
use crate::symbols::{symbol_radius, MapSurface, PopupTemplate, SymbolInstance};
use crate::types::Dataset;

/// Cyclic year selection driving every symbol on the surface.
#[derive(Debug, Clone)]
pub struct TemporalController {
    attributes: AttributeList,
    index: usize,
    symbols: Vec<SymbolInstance>,
    label: String,
}

impl TemporalController {
    /// Takes over already rendered symbols, currently showing `index`.
    pub fn new(attributes: AttributeList, index: usize, symbols: Vec<SymbolInstance>) -> Self {
        let index = index.min(attributes.last_index());
        let label = attributes.get(index).unwrap_or_default().to_string();
        Self {
            attributes,
            index,
            symbols,
            label,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn attribute(&self) -> &str {
        self.attributes.get(self.index).unwrap_or_default()
    }

    /// Year text of the temporal label display.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn attributes(&self) -> &AttributeList {
        &self.attributes
    }

    pub fn symbols(&self) -> &[SymbolInstance] {
        &self.symbols
    }

    pub fn next_index(&self) -> usize {
        (self.index + 1) % self.attributes.len().max(1)
    }

    pub fn previous_index(&self) -> usize {
        let n = self.attributes.len().max(1);
        (self.index + n - 1) % n
    }

    pub fn clamp_index(&self, index: i64) -> usize {
        index.clamp(0, self.attributes.last_index() as i64) as usize
    }

    pub fn forward<S: MapSurface>(
        &mut self,
        dataset: &Dataset,
        model: &RadiusModel,
        popup: &PopupTemplate,
        surface: &mut S,
    ) -> Result<usize, MapError> {
        self.transition(self.next_index(), dataset, model, popup, surface)
    }

    pub fn reverse<S: MapSurface>(
        &mut self,
        dataset: &Dataset,
        model: &RadiusModel,
        popup: &PopupTemplate,
        surface: &mut S,
    ) -> Result<usize, MapError> {
        self.transition(self.previous_index(), dataset, model, popup, surface)
    }

    pub fn seek<S: MapSurface>(
        &mut self,
        index: i64,
        dataset: &Dataset,
        model: &RadiusModel,
        popup: &PopupTemplate,
        surface: &mut S,
    ) -> Result<usize, MapError> {
        self.transition(self.clamp_index(index), dataset, model, popup, surface)
    }

    fn transition<S: MapSurface>(
        &mut self,
        index: usize,
        dataset: &Dataset,
        model: &RadiusModel,
        popup: &PopupTemplate,
        surface: &mut S,
    ) -> Result<usize, MapError> {
        let attribute = self
            .attributes
            .get(index)
            .ok_or_else(|| MapError::MissingAttribute {
                feature: dataset.features()[0].name.clone(),
                attribute: format!("#{}", index),
            })?
            .to_string();

        // Resolve every radius before touching the surface; a fault keeps the old year
        let mut updates = Vec::with_capacity(self.symbols.len());
        for symbol in &self.symbols {
            let feature = dataset
                .features()
                .get(symbol.feature)
                .ok_or_else(|| MapError::MissingAttribute {
                    feature: format!("#{}", symbol.feature),
                    attribute: attribute.clone(),
                })?;
            let radius = symbol_radius(feature, &attribute, model)?;
            updates.push((radius, popup.content(feature, &attribute)));
        }

        for (symbol, (radius, content)) in self.symbols.iter_mut().zip(updates) {
            surface.set_radius(symbol.handle, radius);
            surface.update_content(symbol.handle, &content);
            symbol.radius = radius;
            symbol.content = content;
        }

        self.index = index;
        self.label = attribute;
        tracing::debug!("Selected year {} (index {})", self.label, self.index);
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::YearRange;
    use crate::surface::LayerStore;
    use crate::symbols::{render_symbols, SymbolStyle};
    use crate::types::Feature;
    use geo::Point;
    use serde_json::{json, Map};

    struct Fixture {
        dataset: Dataset,
        model: RadiusModel,
        popup: PopupTemplate,
        store: LayerStore,
        controller: TemporalController,
    }

    fn fixture() -> Fixture {
        let features = ["Vienna", "Prague"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut properties = Map::new();
                properties.insert("city".into(), json!(name));
                for year in 2008..=2019 {
                    let v = 10.0 + i as f64 * 10.0 + (year - 2008) as f64;
                    properties.insert(year.to_string(), json!(v));
                }
                Feature {
                    name: name.to_string(),
                    point: Point::new(16.0 + i as f64, 48.0),
                    properties,
                }
            })
            .collect();
        let dataset = Dataset::new(features).unwrap();
        let attributes = AttributeList::from_range(YearRange::new(2008, 2019));
        let model = RadiusModel::new(10.0, 5.0).unwrap();
        let popup = PopupTemplate::default();
        let mut store = LayerStore::default();
        let symbols = render_symbols(
            &dataset,
            &attributes,
            0,
            &model,
            &SymbolStyle::default(),
            &popup,
            &mut store,
        )
        .unwrap();
        let controller = TemporalController::new(attributes, 0, symbols);
        Fixture {
            dataset,
            model,
            popup,
            store,
            controller,
        }
    }

    #[test]
    fn forward_wraps_to_first_year() {
        let mut f = fixture();
        f.controller
            .seek(11, &f.dataset, &f.model, &f.popup, &mut f.store)
            .unwrap();
        let index = f
            .controller
            .forward(&f.dataset, &f.model, &f.popup, &mut f.store)
            .unwrap();
        assert_eq!(index, 0);
        assert_eq!(f.controller.label(), "2008");
    }

    #[test]
    fn reverse_wraps_to_last_year() {
        let mut f = fixture();
        let index = f
            .controller
            .reverse(&f.dataset, &f.model, &f.popup, &mut f.store)
            .unwrap();
        assert_eq!(index, 11);
        assert_eq!(f.controller.attribute(), "2019");
    }

    #[test]
    fn forward_and_reverse_are_inverse() {
        let mut f = fixture();
        for start in 0..12 {
            f.controller
                .seek(start, &f.dataset, &f.model, &f.popup, &mut f.store)
                .unwrap();
            f.controller
                .forward(&f.dataset, &f.model, &f.popup, &mut f.store)
                .unwrap();
            f.controller
                .reverse(&f.dataset, &f.model, &f.popup, &mut f.store)
                .unwrap();
            assert_eq!(f.controller.index(), start as usize);

            f.controller
                .reverse(&f.dataset, &f.model, &f.popup, &mut f.store)
                .unwrap();
            f.controller
                .forward(&f.dataset, &f.model, &f.popup, &mut f.store)
                .unwrap();
            assert_eq!(f.controller.index(), start as usize);
        }
    }

    #[test]
    fn seek_clamps_out_of_range() {
        let mut f = fixture();
        assert_eq!(
            f.controller
                .seek(40, &f.dataset, &f.model, &f.popup, &mut f.store)
                .unwrap(),
            11
        );
        assert_eq!(
            f.controller
                .seek(-3, &f.dataset, &f.model, &f.popup, &mut f.store)
                .unwrap(),
            0
        );
    }

    #[test]
    fn transition_rewrites_every_symbol_in_place() {
        let mut f = fixture();
        f.controller
            .seek(7, &f.dataset, &f.model, &f.popup, &mut f.store)
            .unwrap();

        assert_eq!(f.store.len(), 2);
        for symbol in f.controller.symbols() {
            let feature = &f.dataset.features()[symbol.feature];
            let layer = f.store.layer(symbol.handle).unwrap();
            let content = layer.content.as_deref().unwrap();
            assert!(content.contains("2015"));
            assert!(content.contains(&format!("{} percent", feature.value("2015").unwrap())));
            assert_eq!(layer.radius, f.model.radius(feature.value("2015").unwrap()).unwrap());
        }
    }

    #[test]
    fn failed_transition_keeps_selection() {
        let mut f = fixture();
        let mut features = f.dataset.features().to_vec();
        features[1].properties.remove("2009");
        let broken = Dataset::new(features).unwrap();

        let err = f
            .controller
            .forward(&broken, &f.model, &f.popup, &mut f.store)
            .unwrap_err();

        assert!(matches!(err, MapError::MissingAttribute { .. }));
        assert_eq!(f.controller.index(), 0);
        assert!(f.store.layer(0).unwrap().content.as_deref().unwrap().contains("2008"));
    }

    #[test]
    fn symbol_without_source_feature_is_named() {
        let mut f = fixture();
        let mut symbols = f.controller.symbols().to_vec();
        symbols[1].feature = 5;
        let mut controller = TemporalController::new(f.controller.attributes().clone(), 0, symbols);

        let err = controller
            .forward(&f.dataset, &f.model, &f.popup, &mut f.store)
            .unwrap_err();

        assert_eq!(
            err,
            MapError::MissingAttribute {
                feature: "#5".into(),
                attribute: "2009".into()
            }
        );
        assert_eq!(controller.index(), 0);
    }
}
