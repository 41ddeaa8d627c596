use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::TradeViewError;
use crate::schema::{self, date_column, period};

// ── Load options ────────────────────────────────────────────────────────────

/// What the loader does with a row that fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidRowPolicy {
    /// Abort the whole load on the first invalid row.
    #[default]
    Reject,
    /// Drop invalid rows and report them in the `LoadReport`.
    Quarantine,
}

/// How the date column is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateColumn {
    /// A calendar date parsed with `LoadOptions::date_format`.
    #[default]
    Date,
    /// An integer year, stored as January 1st of that year.
    Year,
}

impl FromStr for DateColumn {
    type Err = TradeViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            date_column::DATE => Ok(Self::Date),
            date_column::YEAR => Ok(Self::Year),
            other => Err(TradeViewError::InvalidArgument(format!(
                "Invalid date column mode: '{}'. Must be '{}' or '{}'",
                other,
                date_column::DATE,
                date_column::YEAR
            ))),
        }
    }
}

/// Configuration for reading a trade dataset.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// CSV field separator (ignored for parquet)
    pub delimiter: u8,
    /// chrono format string for the date column (`DateColumn::Date` only)
    pub date_format: String,
    pub date_column: DateColumn,
    /// Source column name -> canonical column name
    pub rename: HashMap<String, String>,
    pub invalid_rows: InvalidRowPolicy,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            date_format: schema::ISO_DATE_FORMAT.to_string(),
            date_column: DateColumn::Date,
            rename: HashMap::new(),
            invalid_rows: InvalidRowPolicy::Reject,
        }
    }
}

impl LoadOptions {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    pub fn with_date_column(mut self, mode: DateColumn) -> Self {
        self.date_column = mode;
        self
    }

    pub fn with_rename(mut self, rename: HashMap<String, String>) -> Self {
        self.rename = rename;
        self
    }

    pub fn with_invalid_rows(mut self, policy: InvalidRowPolicy) -> Self {
        self.invalid_rows = policy;
        self
    }
}

// ── View options ────────────────────────────────────────────────────────────

/// Calendar unit used to bucket the time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeriodGranularity {
    #[default]
    Month,
    Year,
}

impl FromStr for PeriodGranularity {
    type Err = TradeViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            period::MONTH => Ok(Self::Month),
            period::YEAR => Ok(Self::Year),
            other => Err(TradeViewError::InvalidArgument(format!(
                "Invalid period: '{}'. Must be '{}' or '{}'",
                other,
                period::MONTH,
                period::YEAR
            ))),
        }
    }
}

impl fmt::Display for PeriodGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Month => f.write_str(period::MONTH),
            Self::Year => f.write_str(period::YEAR),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ViewOptions {
    pub period: PeriodGranularity,
}

// ── String arguments ────────────────────────────────────────────────────────

/// Options from the string arguments a front end passes in.
///
/// Touches no file, so callers run it before loading and a bad argument
/// fails without paying for a full read.
pub fn parse_dashboard_args(
    period: &str,
    date_column: &str,
    delimiter: &str,
) -> Result<(ViewOptions, LoadOptions), TradeViewError> {
    let view = ViewOptions {
        period: period.parse()?,
    };
    let delimiter = match delimiter.as_bytes() {
        [b] => *b,
        _ => {
            return Err(TradeViewError::InvalidArgument(format!(
                "delimiter must be a single byte, got '{}'",
                delimiter
            )))
        }
    };
    let load = LoadOptions::default()
        .with_delimiter(delimiter)
        .with_date_column(date_column.parse()?);
    Ok((view, load))
}
