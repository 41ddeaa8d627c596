//! Filter-and-aggregate core for a foreign-trade dashboard.
//!
//! The dataset is loaded once (`loader`), then every user interaction runs
//! `filter::apply_filters` followed by `aggregation::aggregate`, and
//! optionally `export::export_filtered`. With the `python` feature the same
//! operations are exposed to a Python front end as the `_core` module.

pub mod aggregation;
pub mod chart;
pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod loader;
pub mod logging;
pub mod record;
pub mod schema;
pub mod view;

#[cfg(feature = "python")]
mod python;

pub use aggregation::{
    aggregate, aggregate_with, AggregatedView, Period, PeriodPoint, RankedValue, SummaryMetrics,
};
pub use config::{
    parse_dashboard_args, DateColumn, InvalidRowPolicy, LoadOptions, PeriodGranularity,
    ViewOptions,
};
pub use error::TradeViewError;
pub use export::export_filtered;
pub use filter::{apply_filters, DateRange, FilterCriteria, FilterOptions};
pub use loader::{load_path, parse_csv_bytes, LoadReport, RejectedRow};
pub use record::{Flow, TradeDataset, TradeRecord};
pub use view::TradeDataView;
