use std::io::{Cursor, ErrorKind};
use std::path::Path;

use chrono::NaiveDate;
use polars::prelude::*;
use tracing::{info, warn};

use crate::config::{DateColumn, InvalidRowPolicy, LoadOptions};
use crate::error::TradeViewError;
use crate::record::{Flow, TradeDataset, TradeRecord};
use crate::schema::trade;

/// A source row excluded under `InvalidRowPolicy::Quarantine`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    /// 1-based data row (header excluded)
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub dataset: TradeDataset,
    pub quarantined: Vec<RejectedRow>,
}

// ── Entry points ────────────────────────────────────────────────────────────

/// Load a trade dataset from a CSV or parquet file, chosen by extension.
///
/// Required columns: date, flow, country, product_section, product_code, value_usd
/// Optional columns: region, customs_unit, section_description,
/// product_description, weight_kg
/// Other columns are ignored.
pub fn load_path(
    path: impl AsRef<Path>,
    options: &LoadOptions,
) -> Result<LoadReport, TradeViewError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(TradeViewError::Io(std::io::Error::new(
            ErrorKind::NotFound,
            format!("trade dataset not found: {}", path.display()),
        )));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let raw = match extension.as_deref() {
        Some("csv") | Some("tsv") | Some("txt") => csv_read_options(options)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?,
        Some("parquet") | Some("pq") => {
            let file = std::fs::File::open(path)?;
            ParquetReader::new(file).finish()?
        }
        _ => {
            return Err(TradeViewError::UnsupportedFormat(
                path.display().to_string(),
            ))
        }
    };

    let report = records_from_frame(raw, options)?;
    info!(
        source = %path.display(),
        rows = report.dataset.len(),
        quarantined = report.quarantined.len(),
        "loaded trade dataset"
    );
    Ok(report)
}

/// Parse in-memory CSV bytes, e.g. a previous `export_filtered` result.
pub fn parse_csv_bytes(
    bytes: &[u8],
    options: &LoadOptions,
) -> Result<LoadReport, TradeViewError> {
    let raw = csv_read_options(options)
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()?;
    records_from_frame(raw, options)
}

/// Validate a raw frame into typed records.
///
/// Column names are trimmed and renamed first; every cell is cast to a
/// string and trimmed before row validation.
pub fn records_from_frame(
    mut df: DataFrame,
    options: &LoadOptions,
) -> Result<LoadReport, TradeViewError> {
    // Trim whitespace from column names
    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed.as_slice())?;

    if !options.rename.is_empty() {
        let old: Vec<&str> = options.rename.keys().map(|s| s.as_str()).collect();
        let new: Vec<&str> = options.rename.values().map(|s| s.as_str()).collect();
        df = df.lazy().rename(old, new, true).collect()?;
    }

    require_columns(&df, &trade::REQUIRED)?;

    let schema = df.schema();
    let optional: Vec<&'static str> = trade::OPTIONAL
        .iter()
        .copied()
        .filter(|c| schema.contains(c))
        .collect();

    let selected: Vec<Expr> = trade::REQUIRED
        .iter()
        .chain(optional.iter())
        .map(|c| {
            col(*c)
                .cast(DataType::String)
                .str()
                .strip_chars(lit(" \t\r\n"))
        })
        .collect();
    let df = df.lazy().select(selected).collect()?;

    let dates = df.column(trade::DATE)?.str()?;
    let flows = df.column(trade::FLOW)?.str()?;
    let countries = df.column(trade::COUNTRY)?.str()?;
    let sections = df.column(trade::PRODUCT_SECTION)?.str()?;
    let codes = df.column(trade::PRODUCT_CODE)?.str()?;
    let values = df.column(trade::VALUE_USD)?.str()?;
    let regions = optional_column(&df, &optional, trade::REGION)?;
    let customs_units = optional_column(&df, &optional, trade::CUSTOMS_UNIT)?;
    let section_descriptions = optional_column(&df, &optional, trade::SECTION_DESCRIPTION)?;
    let product_descriptions = optional_column(&df, &optional, trade::PRODUCT_DESCRIPTION)?;
    let weights = optional_column(&df, &optional, trade::WEIGHT_KG)?;

    let mut records = Vec::with_capacity(df.height());
    let mut quarantined = Vec::new();

    for i in 0..df.height() {
        let raw = RawRow {
            date: dates.get(i),
            flow: flows.get(i),
            country: countries.get(i),
            region: regions.and_then(|c| c.get(i)),
            customs_unit: customs_units.and_then(|c| c.get(i)),
            product_section: sections.get(i),
            section_description: section_descriptions.and_then(|c| c.get(i)),
            product_code: codes.get(i),
            product_description: product_descriptions.and_then(|c| c.get(i)),
            value_usd: values.get(i),
            weight_kg: weights.and_then(|c| c.get(i)),
        };

        match raw.validate(options) {
            Ok(record) => records.push(record),
            Err(reason) => match options.invalid_rows {
                InvalidRowPolicy::Reject => {
                    return Err(TradeViewError::InvalidRow { row: i + 1, reason })
                }
                InvalidRowPolicy::Quarantine => {
                    warn!(row = i + 1, %reason, "quarantined trade row");
                    quarantined.push(RejectedRow { row: i + 1, reason });
                }
            },
        }
    }

    Ok(LoadReport {
        dataset: TradeDataset::new(records),
        quarantined,
    })
}

// ── Private helpers ─────────────────────────────────────────────────────────

fn csv_read_options(options: &LoadOptions) -> CsvReadOptions {
    let separator = options.delimiter;
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .map_parse_options(|p| p.with_separator(separator))
}

fn require_columns(df: &DataFrame, required: &[&str]) -> Result<(), TradeViewError> {
    for &col_name in required {
        if df.column(col_name).is_err() {
            return Err(TradeViewError::MissingColumn(col_name.to_string()));
        }
    }
    Ok(())
}

fn optional_column<'a>(
    df: &'a DataFrame,
    present: &[&str],
    name: &str,
) -> Result<Option<&'a StringChunked>, TradeViewError> {
    if present.contains(&name) {
        Ok(Some(df.column(name)?.str()?))
    } else {
        Ok(None)
    }
}

/// One source row before validation.
struct RawRow<'a> {
    date: Option<&'a str>,
    flow: Option<&'a str>,
    country: Option<&'a str>,
    region: Option<&'a str>,
    customs_unit: Option<&'a str>,
    product_section: Option<&'a str>,
    section_description: Option<&'a str>,
    product_code: Option<&'a str>,
    product_description: Option<&'a str>,
    value_usd: Option<&'a str>,
    weight_kg: Option<&'a str>,
}

impl RawRow<'_> {
    fn validate(&self, options: &LoadOptions) -> Result<TradeRecord, String> {
        let date_str = required(trade::DATE, self.date)?;
        let date = match options.date_column {
            DateColumn::Date => NaiveDate::parse_from_str(date_str, &options.date_format)
                .map_err(|e| format!("{}: '{}' ({})", trade::DATE, date_str, e))?,
            DateColumn::Year => year_start(date_str)?,
        };

        let flow = required(trade::FLOW, self.flow)?
            .parse::<Flow>()
            .map_err(|e| e.to_string())?;

        let value_usd = amount(trade::VALUE_USD, required(trade::VALUE_USD, self.value_usd)?)?;
        let weight_kg = match self.weight_kg.filter(|s| !s.is_empty()) {
            Some(s) => Some(amount(trade::WEIGHT_KG, s)?),
            None => None,
        };

        Ok(TradeRecord {
            date,
            flow,
            country: required(trade::COUNTRY, self.country)?.to_string(),
            region: optional(self.region),
            customs_unit: optional(self.customs_unit),
            product_section: required(trade::PRODUCT_SECTION, self.product_section)?.to_string(),
            section_description: optional(self.section_description),
            product_code: required(trade::PRODUCT_CODE, self.product_code)?.to_string(),
            product_description: optional(self.product_description),
            value_usd,
            weight_kg,
        })
    }
}

fn required<'a>(column: &str, value: Option<&'a str>) -> Result<&'a str, String> {
    match value {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(format!("{column}: missing value")),
    }
}

/// Empty cells are absent values.
fn optional(value: Option<&str>) -> Option<String> {
    value.filter(|s| !s.is_empty()).map(|s| s.to_string())
}

/// January 1st of an integer year.
fn year_start(s: &str) -> Result<NaiveDate, String> {
    let year: i32 = s
        .parse()
        .map_err(|_| format!("{}: '{}' is not a year", trade::DATE, s))?;
    NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| format!("{}: year {} is out of range", trade::DATE, year))
}

/// Finite, non-negative number.
fn amount(column: &str, s: &str) -> Result<f64, String> {
    let v: f64 = s
        .parse()
        .map_err(|_| format!("{column}: '{s}' is not a number"))?;
    if !v.is_finite() || v < 0.0 {
        return Err(format!("{column}: '{s}' must be a finite non-negative amount"));
    }
    Ok(v)
}
