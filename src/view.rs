use crate::aggregation::{aggregate_with, AggregatedView};
use crate::config::ViewOptions;
use crate::error::TradeViewError;
use crate::export::export_filtered;
use crate::filter::{apply_filters, FilterCriteria, FilterOptions};
use crate::record::{TradeDataset, TradeRecord};

/// Filter-and-aggregate pipeline over a loaded dataset.
///
/// Holds no derived state: each `compute` call recomputes from the
/// dataset, so the presentation layer calls it once per criteria change.
pub struct TradeDataView<'a> {
    dataset: &'a TradeDataset,
    options: ViewOptions,
}

impl<'a> TradeDataView<'a> {
    pub fn new(dataset: &'a TradeDataset, options: ViewOptions) -> Self {
        Self { dataset, options }
    }

    pub fn dataset(&self) -> &TradeDataset {
        self.dataset
    }

    pub fn options(&self) -> FilterOptions {
        FilterOptions::from_dataset(self.dataset)
    }

    pub fn filter(&self, criteria: &FilterCriteria) -> Vec<TradeRecord> {
        apply_filters(self.dataset.records(), criteria)
    }

    pub fn compute(&self, criteria: &FilterCriteria) -> AggregatedView {
        aggregate_with(self.filter(criteria), &self.options)
    }

    pub fn export(&self, criteria: &FilterCriteria) -> Result<Vec<u8>, TradeViewError> {
        export_filtered(&self.filter(criteria))
    }
}
