use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::error::TradeViewError;
use crate::filter::DateRange;
use crate::schema::flow;

/// Direction of trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Flow {
    Import,
    Export,
}

impl Flow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flow::Import => flow::IMPORT,
            Flow::Export => flow::EXPORT,
        }
    }
}

impl FromStr for Flow {
    type Err = TradeViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(flow::IMPORT) {
            Ok(Flow::Import)
        } else if s.eq_ignore_ascii_case(flow::EXPORT) {
            Ok(Flow::Export)
        } else {
            Err(TradeViewError::InvalidArgument(format!(
                "Invalid flow: '{}'. Must be '{}' or '{}'",
                s,
                flow::IMPORT,
                flow::EXPORT
            )))
        }
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validated row of the trade dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub date: NaiveDate,
    pub flow: Flow,
    pub country: String,
    pub region: Option<String>,
    /// Customs clearance unit (URF)
    pub customs_unit: Option<String>,
    pub product_section: String,
    pub section_description: Option<String>,
    pub product_code: String,
    pub product_description: Option<String>,
    pub value_usd: f64,
    pub weight_kg: Option<f64>,
}

impl TradeRecord {
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    /// Section description, or the section code when none was loaded.
    pub fn section_label(&self) -> &str {
        self.section_description
            .as_deref()
            .unwrap_or(&self.product_section)
    }

    /// Product description, or the product code when none was loaded.
    pub fn product_label(&self) -> &str {
        self.product_description
            .as_deref()
            .unwrap_or(&self.product_code)
    }
}

/// The loaded record set.
///
/// Built once by the loader and never mutated afterwards; callers pass it
/// by reference into filtering and aggregation.
#[derive(Debug, Clone, Default)]
pub struct TradeDataset {
    records: Vec<TradeRecord>,
    span: Option<DateRange>,
}

impl TradeDataset {
    pub fn new(records: Vec<TradeRecord>) -> Self {
        let span = records
            .iter()
            .map(|r| r.date)
            .min()
            .zip(records.iter().map(|r| r.date).max())
            .map(|(start, end)| DateRange::new(start, end));
        Self { records, span }
    }

    pub fn records(&self) -> &[TradeRecord] {
        &self.records
    }

    /// Earliest and latest date present, `None` for an empty dataset.
    pub fn full_range(&self) -> Option<DateRange> {
        self.span
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    pub fn record(d: &str, flow: Flow, country: &str, section: &str, value: f64) -> TradeRecord {
        TradeRecord {
            date: date(d),
            flow,
            country: country.to_string(),
            region: None,
            customs_unit: None,
            product_section: section.to_string(),
            section_description: None,
            product_code: format!("{section}-000"),
            product_description: None,
            value_usd: value,
            weight_kg: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn flow_parses_case_insensitively() {
        assert_eq!(" Export ".parse::<Flow>().unwrap(), Flow::Export);
        assert_eq!("IMPORT".parse::<Flow>().unwrap(), Flow::Import);
        assert!("transit".parse::<Flow>().is_err());
    }

    #[test]
    fn dataset_span_covers_min_and_max_dates() {
        let ds = TradeDataset::new(vec![
            record("2023-03-01", Flow::Export, "China", "A", 1.0),
            record("2022-11-20", Flow::Import, "Chile", "B", 2.0),
            record("2023-01-05", Flow::Import, "Peru", "B", 3.0),
        ]);
        let span = ds.full_range().unwrap();
        assert_eq!(span.start, date("2022-11-20"));
        assert_eq!(span.end, date("2023-03-01"));
        assert_eq!(ds.len(), 3);
    }

    #[test]
    fn labels_prefer_descriptions() {
        let mut r = record("2023-01-01", Flow::Export, "China", "II", 1.0);
        assert_eq!(r.section_label(), "II");
        assert_eq!(r.product_label(), "II-000");

        r.section_description = Some("Vegetable products".into());
        r.product_description = Some("Soya beans".into());
        assert_eq!(r.section_label(), "Vegetable products");
        assert_eq!(r.product_label(), "Soya beans");
    }

    #[test]
    fn empty_dataset_has_no_span() {
        let ds = TradeDataset::default();
        assert!(ds.is_empty());
        assert!(ds.full_range().is_none());
    }
}
