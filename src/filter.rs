use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::debug;

use crate::record::{Flow, TradeDataset, TradeRecord};

/// Inclusive calendar date interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Always false when `start > end`.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// User-selected constraints. An empty set means "no constraint" for that
/// dimension; dimensions combine with AND, members of one set with OR.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    /// `None` selects the full dataset range.
    pub date_range: Option<DateRange>,
    pub years: BTreeSet<i32>,
    pub flows: BTreeSet<Flow>,
    pub countries: BTreeSet<String>,
    pub regions: BTreeSet<String>,
    pub customs_units: BTreeSet<String>,
    pub product_sections: BTreeSet<String>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Criteria with the date range pinned to the dataset's full span.
    pub fn for_dataset(dataset: &TradeDataset) -> Self {
        Self {
            date_range: dataset.full_range(),
            ..Self::default()
        }
    }

    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = Some(DateRange::new(start, end));
        self
    }

    pub fn with_years(mut self, years: impl IntoIterator<Item = i32>) -> Self {
        self.years = years.into_iter().collect();
        self
    }

    pub fn with_flows(mut self, flows: impl IntoIterator<Item = Flow>) -> Self {
        self.flows = flows.into_iter().collect();
        self
    }

    pub fn with_countries<S: Into<String>>(
        mut self,
        countries: impl IntoIterator<Item = S>,
    ) -> Self {
        self.countries = countries.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_regions<S: Into<String>>(mut self, regions: impl IntoIterator<Item = S>) -> Self {
        self.regions = regions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_customs_units<S: Into<String>>(
        mut self,
        units: impl IntoIterator<Item = S>,
    ) -> Self {
        self.customs_units = units.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_product_sections<S: Into<String>>(
        mut self,
        sections: impl IntoIterator<Item = S>,
    ) -> Self {
        self.product_sections = sections.into_iter().map(Into::into).collect();
        self
    }

    /// True when the record passes every dimension.
    pub fn matches(&self, record: &TradeRecord) -> bool {
        if let Some(range) = &self.date_range {
            if !range.contains(record.date) {
                return false;
            }
        }
        if !self.years.is_empty() && !self.years.contains(&record.year()) {
            return false;
        }
        if !self.flows.is_empty() && !self.flows.contains(&record.flow) {
            return false;
        }
        if !self.countries.is_empty() && !self.countries.contains(&record.country) {
            return false;
        }
        if !selects(&self.regions, record.region.as_ref()) {
            return false;
        }
        if !selects(&self.customs_units, record.customs_unit.as_ref()) {
            return false;
        }
        if !self.product_sections.is_empty()
            && !self.product_sections.contains(&record.product_section)
        {
            return false;
        }
        true
    }
}

/// Empty set passes everything; otherwise an absent value never matches.
fn selects(set: &BTreeSet<String>, value: Option<&String>) -> bool {
    set.is_empty() || value.is_some_and(|v| set.contains(v))
}

/// Stable filter: returns the matching records in their input order.
pub fn apply_filters(records: &[TradeRecord], criteria: &FilterCriteria) -> Vec<TradeRecord> {
    let filtered: Vec<TradeRecord> = records
        .iter()
        .filter(|r| criteria.matches(r))
        .cloned()
        .collect();
    debug!(
        input = records.len(),
        output = filtered.len(),
        "applied trade filters"
    );
    filtered
}

// ── Widget options ──────────────────────────────────────────────────────────

/// Sorted distinct values per filterable dimension.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOptions {
    pub date_range: Option<DateRange>,
    pub years: Vec<i32>,
    pub flows: Vec<Flow>,
    pub countries: Vec<String>,
    pub regions: Vec<String>,
    pub customs_units: Vec<String>,
    pub product_sections: Vec<String>,
}

impl FilterOptions {
    pub fn from_dataset(dataset: &TradeDataset) -> Self {
        Self::from_records(dataset.records())
    }

    pub fn from_records(records: &[TradeRecord]) -> Self {
        let mut years = BTreeSet::new();
        let mut flows = BTreeSet::new();
        let mut countries = BTreeSet::new();
        let mut regions = BTreeSet::new();
        let mut customs_units = BTreeSet::new();
        let mut sections = BTreeSet::new();
        let mut start: Option<NaiveDate> = None;
        let mut end: Option<NaiveDate> = None;

        for r in records {
            years.insert(r.year());
            flows.insert(r.flow);
            countries.insert(r.country.clone());
            if let Some(region) = &r.region {
                regions.insert(region.clone());
            }
            if let Some(unit) = &r.customs_unit {
                customs_units.insert(unit.clone());
            }
            sections.insert(r.product_section.clone());
            start = Some(start.map_or(r.date, |d| d.min(r.date)));
            end = Some(end.map_or(r.date, |d| d.max(r.date)));
        }

        Self {
            date_range: start.zip(end).map(|(s, e)| DateRange::new(s, e)),
            years: years.into_iter().collect(),
            flows: flows.into_iter().collect(),
            countries: countries.into_iter().collect(),
            regions: regions.into_iter().collect(),
            customs_units: customs_units.into_iter().collect(),
            product_sections: sections.into_iter().collect(),
        }
    }

    /// Initial selection: latest year, every flow, nothing else constrained.
    pub fn default_criteria(&self) -> FilterCriteria {
        FilterCriteria {
            date_range: self.date_range,
            years: self.years.last().copied().into_iter().collect(),
            flows: self.flows.iter().copied().collect(),
            ..FilterCriteria::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures::{date, record};

    fn sample() -> Vec<TradeRecord> {
        let mut rs = vec![
            record("2023-01-15", Flow::Export, "China", "A", 100.0),
            record("2023-02-10", Flow::Import, "Chile", "B", 50.0),
            record("2022-06-30", Flow::Export, "Chile", "A", 75.0),
            record("2023-02-11", Flow::Export, "Peru", "C", 10.0),
        ];
        rs[0].region = Some("SP".into());
        rs[1].region = Some("RJ".into());
        rs[0].customs_unit = Some("Porto de Santos".into());
        rs[2].customs_unit = Some("Porto de Paranagua".into());
        rs[3].customs_unit = Some("Porto de Santos".into());
        rs
    }

    #[test]
    fn flow_filter_keeps_matching_rows() {
        let rs = sample();
        let crit = FilterCriteria::new().with_flows([Flow::Export]);
        let out = apply_filters(&rs[..2], &crit);
        assert_eq!(out, vec![rs[0].clone()]);
    }

    #[test]
    fn empty_criteria_keeps_everything_in_order() {
        let rs = sample();
        assert_eq!(apply_filters(&rs, &FilterCriteria::new()), rs);
    }

    #[test]
    fn dimensions_combine_conjunctively() {
        let rs = sample();
        let crit = FilterCriteria::new()
            .with_flows([Flow::Export])
            .with_countries(["Chile", "Peru"]);
        let out = apply_filters(&rs, &crit);
        assert_eq!(out, vec![rs[2].clone(), rs[3].clone()]);
    }

    #[test]
    fn date_range_is_inclusive() {
        let rs = sample();
        let crit = FilterCriteria::new().with_date_range(date("2023-01-15"), date("2023-02-10"));
        let out = apply_filters(&rs, &crit);
        assert_eq!(out, vec![rs[0].clone(), rs[1].clone()]);
    }

    #[test]
    fn inverted_date_range_yields_nothing() {
        let rs = sample();
        let crit = FilterCriteria::new().with_date_range(date("2023-12-31"), date("2022-01-01"));
        assert!(apply_filters(&rs, &crit).is_empty());
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let crit = FilterCriteria::new().with_flows([Flow::Import]);
        assert!(apply_filters(&[], &crit).is_empty());
    }

    #[test]
    fn region_filter_excludes_rows_without_region() {
        let rs = sample();
        let crit = FilterCriteria::new().with_regions(["SP", "RJ"]);
        let out = apply_filters(&rs, &crit);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| r.region.is_some()));
    }

    #[test]
    fn customs_unit_filter_excludes_rows_without_unit() {
        let rs = sample();
        let crit = FilterCriteria::new().with_customs_units(["Porto de Santos"]);
        assert_eq!(apply_filters(&rs, &crit), vec![rs[0].clone(), rs[3].clone()]);

        let crit = crit.with_flows([Flow::Export]).with_years([2022]);
        assert!(apply_filters(&rs, &crit).is_empty());
    }

    #[test]
    fn year_filter_selects_calendar_year() {
        let rs = sample();
        let crit = FilterCriteria::new().with_years([2022]);
        assert_eq!(apply_filters(&rs, &crit), vec![rs[2].clone()]);
    }

    #[test]
    fn options_are_sorted_and_distinct() {
        let opts = FilterOptions::from_records(&sample());
        assert_eq!(opts.years, vec![2022, 2023]);
        assert_eq!(opts.flows, vec![Flow::Import, Flow::Export]);
        assert_eq!(opts.countries, vec!["Chile", "China", "Peru"]);
        assert_eq!(opts.regions, vec!["RJ", "SP"]);
        assert_eq!(opts.customs_units, vec!["Porto de Paranagua", "Porto de Santos"]);
        assert_eq!(opts.product_sections, vec!["A", "B", "C"]);
        let range = opts.date_range.unwrap();
        assert_eq!(range.start, date("2022-06-30"));
        assert_eq!(range.end, date("2023-02-11"));
    }

    #[test]
    fn default_criteria_selects_latest_year_and_all_flows() {
        let crit = FilterOptions::from_records(&sample()).default_criteria();
        assert_eq!(crit.years.into_iter().collect::<Vec<_>>(), vec![2023]);
        assert_eq!(crit.flows.len(), 2);
        assert!(crit.countries.is_empty());
        assert!(crit.customs_units.is_empty());
    }
}
