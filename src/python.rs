use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use pyo3::prelude::*;
use pyo3::types::{PyBytes, PyDict, PyModule};
use pyo3_polars::PyDataFrame;

use crate::aggregation::{rank_by_value, top_n, AggregatedView};
use crate::chart::{self, DEFAULT_TOP_N};
use crate::config::{parse_dashboard_args, InvalidRowPolicy, ViewOptions};
use crate::export::{export_filtered, period_frame, ranked_frame, to_dataframe};
use crate::filter::{DateRange, FilterCriteria, FilterOptions};
use crate::loader::{self, RejectedRow};
use crate::record::{Flow, TradeDataset};
use crate::schema::{flow, series, trade};
use crate::view::TradeDataView;

/// Loaded trade dataset. Immutable after construction.
#[pyclass(name = "TradeDashboard", frozen)]
pub struct PyTradeDashboard {
    dataset: Arc<TradeDataset>,
    options: ViewOptions,
    quarantined: Vec<RejectedRow>,
}

#[pymethods]
impl PyTradeDashboard {
    /// Load a CSV or parquet trade dataset.
    ///
    /// Fails if the file is missing, a required column is absent, or (unless
    /// `quarantine_invalid=True`) any row fails validation.
    #[new]
    #[pyo3(signature = (
        path,
        date_format = "%Y-%m-%d",
        delimiter = ",",
        rename = None,
        quarantine_invalid = false,
        period = "month",
        date_column = "date",
    ))]
    fn new(
        path: &str,
        date_format: &str,
        delimiter: &str,
        rename: Option<HashMap<String, String>>,
        quarantine_invalid: bool,
        period: &str,
        date_column: &str,
    ) -> PyResult<Self> {
        // Argument errors surface before the file is read
        let (options, load_options) = parse_dashboard_args(period, date_column, delimiter)?;
        let policy = if quarantine_invalid {
            InvalidRowPolicy::Quarantine
        } else {
            InvalidRowPolicy::Reject
        };
        let load_options = load_options
            .with_date_format(date_format)
            .with_rename(rename.unwrap_or_default())
            .with_invalid_rows(policy);

        let report = loader::load_path(path, &load_options)?;
        Ok(Self {
            dataset: Arc::new(report.dataset),
            options,
            quarantined: report.quarantined,
        })
    }

    // ── Widget options ──────────────────────────────────────────────────────

    /// Distinct sorted values per filter dimension plus the defaults
    /// (latest year, all flows).
    fn filter_options<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let opts = FilterOptions::from_dataset(&self.dataset);
        let defaults = opts.default_criteria();

        let dict = PyDict::new(py);
        dict.set_item(
            "date_range",
            opts.date_range.map(|r| (r.start, r.end)),
        )?;
        dict.set_item("years", &opts.years)?;
        dict.set_item(
            "flows",
            opts.flows.iter().map(|f| f.as_str()).collect::<Vec<_>>(),
        )?;
        dict.set_item("countries", &opts.countries)?;
        dict.set_item("regions", &opts.regions)?;
        dict.set_item("customs_units", &opts.customs_units)?;
        dict.set_item("product_sections", &opts.product_sections)?;
        dict.set_item(
            "default_years",
            defaults.years.into_iter().collect::<Vec<_>>(),
        )?;
        Ok(dict)
    }

    // ── Filtering / aggregation ─────────────────────────────────────────────

    #[pyo3(signature = (
        start = None,
        end = None,
        years = None,
        flows = None,
        countries = None,
        regions = None,
        sections = None,
        customs_units = None,
    ))]
    #[allow(clippy::too_many_arguments)]
    fn apply_filters(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        years: Option<Vec<i32>>,
        flows: Option<Vec<String>>,
        countries: Option<Vec<String>>,
        regions: Option<Vec<String>>,
        sections: Option<Vec<String>>,
        customs_units: Option<Vec<String>>,
    ) -> PyResult<PyDataFrame> {
        let criteria = self.criteria(
            start,
            end,
            years,
            flows,
            countries,
            regions,
            sections,
            customs_units,
        )?;
        let view = TradeDataView::new(&self.dataset, self.options);
        Ok(PyDataFrame(to_dataframe(&view.filter(&criteria))?))
    }

    /// Filter and aggregate in one call. Returns a `TradeView`.
    #[pyo3(signature = (
        start = None,
        end = None,
        years = None,
        flows = None,
        countries = None,
        regions = None,
        sections = None,
        customs_units = None,
    ))]
    #[allow(clippy::too_many_arguments)]
    fn view(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        years: Option<Vec<i32>>,
        flows: Option<Vec<String>>,
        countries: Option<Vec<String>>,
        regions: Option<Vec<String>>,
        sections: Option<Vec<String>>,
        customs_units: Option<Vec<String>>,
    ) -> PyResult<PyTradeView> {
        let criteria = self.criteria(
            start,
            end,
            years,
            flows,
            countries,
            regions,
            sections,
            customs_units,
        )?;
        let view = TradeDataView::new(&self.dataset, self.options);
        Ok(PyTradeView {
            inner: view.compute(&criteria),
        })
    }

    // ── Properties ──────────────────────────────────────────────────────────

    #[getter]
    fn records_df(&self) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(to_dataframe(self.dataset.records())?))
    }

    /// (row, reason) pairs for rows excluded at load time.
    #[getter]
    fn quarantined(&self) -> Vec<(usize, String)> {
        self.quarantined
            .iter()
            .map(|q| (q.row, q.reason.clone()))
            .collect()
    }

    fn __len__(&self) -> usize {
        self.dataset.len()
    }
}

impl PyTradeDashboard {
    #[allow(clippy::too_many_arguments)]
    fn criteria(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        years: Option<Vec<i32>>,
        flows: Option<Vec<String>>,
        countries: Option<Vec<String>>,
        regions: Option<Vec<String>>,
        sections: Option<Vec<String>>,
        customs_units: Option<Vec<String>>,
    ) -> PyResult<FilterCriteria> {
        // An open bound falls back to the dataset span.
        let span = self.dataset.full_range();
        let date_range = match (start, end) {
            (None, None) => None,
            (s, e) => s
                .or(span.map(|r| r.start))
                .zip(e.or(span.map(|r| r.end)))
                .map(|(s, e)| DateRange::new(s, e)),
        };

        let flows = flows
            .unwrap_or_default()
            .iter()
            .map(|f| f.parse::<Flow>())
            .collect::<Result<Vec<_>, _>>()?;

        let mut criteria = FilterCriteria::new()
            .with_years(years.unwrap_or_default())
            .with_flows(flows)
            .with_countries(countries.unwrap_or_default())
            .with_regions(regions.unwrap_or_default())
            .with_customs_units(customs_units.unwrap_or_default())
            .with_product_sections(sections.unwrap_or_default());
        criteria.date_range = date_range;
        Ok(criteria)
    }
}

/// Result of one filter selection.
#[pyclass(name = "TradeView", frozen)]
pub struct PyTradeView {
    inner: AggregatedView,
}

#[pymethods]
impl PyTradeView {
    #[getter]
    fn filtered_df(&self) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(to_dataframe(&self.inner.filtered_records)?))
    }

    /// Filtered records ordered by value, largest first.
    #[getter]
    fn detail_df(&self) -> PyResult<PyDataFrame> {
        let sorted = rank_by_value(&self.inner.filtered_records);
        Ok(PyDataFrame(to_dataframe(&sorted)?))
    }

    #[getter]
    fn totals_by_flow(&self) -> HashMap<&'static str, f64> {
        self.inner
            .totals_by_flow
            .iter()
            .map(|(f, v)| (f.as_str(), *v))
            .collect()
    }

    #[getter]
    fn series_by_period(&self) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(period_frame(&self.inner.series_by_period)?))
    }

    #[getter]
    fn series_by_country(&self) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(ranked_frame(
            trade::COUNTRY,
            &self.inner.series_by_country,
        )?))
    }

    #[getter]
    fn series_by_product(&self) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(ranked_frame(
            trade::PRODUCT_SECTION,
            &self.inner.series_by_product,
        )?))
    }

    #[getter]
    fn series_by_region(&self) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(ranked_frame(
            trade::REGION,
            &self.inner.series_by_region,
        )?))
    }

    #[getter]
    fn series_by_customs_unit(&self) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(ranked_frame(
            trade::CUSTOMS_UNIT,
            &self.inner.series_by_customs_unit,
        )?))
    }

    #[pyo3(signature = (n=DEFAULT_TOP_N))]
    fn top_countries(&self, n: usize) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(ranked_frame(
            trade::COUNTRY,
            top_n(&self.inner.series_by_country, n),
        )?))
    }

    /// Top sections by description (section code where none was loaded).
    #[pyo3(signature = (n=DEFAULT_TOP_N))]
    fn top_sections(&self, n: usize) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(ranked_frame(
            trade::SECTION_DESCRIPTION,
            top_n(&self.inner.series_by_section_label, n),
        )?))
    }

    /// Top products by description (product code where none was loaded).
    #[pyo3(signature = (n=DEFAULT_TOP_N))]
    fn top_products(&self, n: usize) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(ranked_frame(
            trade::PRODUCT_DESCRIPTION,
            top_n(&self.inner.series_by_product_label, n),
        )?))
    }

    #[getter]
    fn metrics<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let m = &self.inner.metrics;
        let dict = PyDict::new(py);
        dict.set_item("record_count", m.record_count)?;
        dict.set_item("total_value_usd", m.total_value_usd)?;
        dict.set_item("total_weight_kg", m.total_weight_kg)?;
        dict.set_item("distinct_countries", m.distinct_countries)?;
        dict.set_item("distinct_products", m.distinct_products)?;
        dict.set_item("distinct_regions", m.distinct_regions)?;
        dict.set_item("distinct_customs_units", m.distinct_customs_units)?;
        Ok(dict)
    }

    /// Filtered records as CSV bytes, ready for a download button.
    fn export_csv<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyBytes>> {
        let bytes = export_filtered(&self.inner.filtered_records)?;
        Ok(PyBytes::new(py, &bytes))
    }

    #[pyo3(signature = (top_n=DEFAULT_TOP_N))]
    fn to_json(&self, top_n: usize) -> PyResult<String> {
        Ok(chart::to_json(&self.inner, top_n)?)
    }

    fn __len__(&self) -> usize {
        self.inner.filtered_records.len()
    }
}

/// Route `tracing` output to stderr. `RUST_LOG` overrides `level`.
#[pyfunction]
#[pyo3(signature = (level="info"))]
fn init_logging(level: &str) -> PyResult<()> {
    Ok(crate::logging::init_logging(level)?)
}

/// Export schema constants as Python submodules
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Columns
    let columns = PyModule::new(m.py(), "columns")?;
    columns.add("DATE", trade::DATE)?;
    columns.add("FLOW", trade::FLOW)?;
    columns.add("COUNTRY", trade::COUNTRY)?;
    columns.add("REGION", trade::REGION)?;
    columns.add("CUSTOMS_UNIT", trade::CUSTOMS_UNIT)?;
    columns.add("PRODUCT_SECTION", trade::PRODUCT_SECTION)?;
    columns.add("SECTION_DESCRIPTION", trade::SECTION_DESCRIPTION)?;
    columns.add("PRODUCT_CODE", trade::PRODUCT_CODE)?;
    columns.add("PRODUCT_DESCRIPTION", trade::PRODUCT_DESCRIPTION)?;
    columns.add("VALUE_USD", trade::VALUE_USD)?;
    columns.add("WEIGHT_KG", trade::WEIGHT_KG)?;
    columns.add("PERIOD", series::PERIOD)?;
    m.add_submodule(&columns)?;

    // Flow
    let flows = PyModule::new(m.py(), "flow")?;
    flows.add("IMPORT", flow::IMPORT)?;
    flows.add("EXPORT", flow::EXPORT)?;
    m.add_submodule(&flows)?;

    Ok(())
}

#[pymodule]
#[pyo3(name = "_core")]
fn trade_view_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyTradeDashboard>()?;
    m.add_class::<PyTradeView>()?;
    m.add_function(wrap_pyfunction!(init_logging, m)?)?;
    add_schema_exports(m)?;
    Ok(())
}
