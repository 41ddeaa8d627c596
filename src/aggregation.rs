use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::config::{PeriodGranularity, ViewOptions};
use crate::record::{Flow, TradeRecord};

// ── Output types ────────────────────────────────────────────────────────────

/// Calendar bucket for the time series. `month` is `None` for yearly buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    pub year: i32,
    pub month: Option<u32>,
}

impl Period {
    pub fn of(date: NaiveDate, granularity: PeriodGranularity) -> Self {
        match granularity {
            PeriodGranularity::Month => Self {
                year: date.year(),
                month: Some(date.month()),
            },
            PeriodGranularity::Year => Self {
                year: date.year(),
                month: None,
            },
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.month {
            Some(m) => write!(f, "{:04}-{:02}", self.year, m),
            None => write!(f, "{:04}", self.year),
        }
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodPoint {
    pub period: Period,
    pub flow: Flow,
    pub value_usd: f64,
}

/// One entry of a descending ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedValue {
    pub key: String,
    pub value_usd: f64,
}

/// Headline numbers shown above the charts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub record_count: usize,
    pub total_value_usd: f64,
    pub total_weight_kg: f64,
    pub distinct_countries: usize,
    pub distinct_products: usize,
    pub distinct_regions: usize,
    pub distinct_customs_units: usize,
}

/// Everything the dashboard renders for one filter selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedView {
    pub filtered_records: Vec<TradeRecord>,
    /// Flows absent from the input are omitted, never zero-filled.
    pub totals_by_flow: BTreeMap<Flow, f64>,
    pub series_by_period: Vec<PeriodPoint>,
    pub series_by_country: Vec<RankedValue>,
    pub series_by_product: Vec<RankedValue>,
    pub series_by_region: Vec<RankedValue>,
    pub series_by_product_code: Vec<RankedValue>,
    pub series_by_customs_unit: Vec<RankedValue>,
    /// Keyed by section description, falling back to the section code.
    pub series_by_section_label: Vec<RankedValue>,
    /// Keyed by product description, falling back to the product code.
    pub series_by_product_label: Vec<RankedValue>,
    pub metrics: SummaryMetrics,
}

// ── Aggregation ─────────────────────────────────────────────────────────────

/// Aggregate with monthly periods.
pub fn aggregate(filtered_records: Vec<TradeRecord>) -> AggregatedView {
    aggregate_with(filtered_records, &ViewOptions::default())
}

/// Pure function of the input records and their order. All sums accumulate
/// in input order, so repeated calls are bit-identical.
pub fn aggregate_with(
    filtered_records: Vec<TradeRecord>,
    options: &ViewOptions,
) -> AggregatedView {
    let records = filtered_records.as_slice();

    let mut totals_by_flow: BTreeMap<Flow, f64> = BTreeMap::new();
    for r in records {
        *totals_by_flow.entry(r.flow).or_insert(0.0) += r.value_usd;
    }

    let series_by_period = period_series(records, options.period);
    let series_by_country = rank_by(records, |r| Some(r.country.as_str()));
    let series_by_product = rank_by(records, |r| Some(r.product_section.as_str()));
    let series_by_region = rank_by(records, |r| r.region.as_deref());
    let series_by_product_code = rank_by(records, |r| Some(r.product_code.as_str()));
    let series_by_customs_unit = rank_by(records, |r| r.customs_unit.as_deref());
    let series_by_section_label = rank_by(records, |r| Some(r.section_label()));
    let series_by_product_label = rank_by(records, |r| Some(r.product_label()));
    let metrics = summarize(records);

    debug!(
        records = metrics.record_count,
        periods = series_by_period.len(),
        countries = series_by_country.len(),
        "aggregated trade view"
    );

    AggregatedView {
        filtered_records,
        totals_by_flow,
        series_by_period,
        series_by_country,
        series_by_product,
        series_by_region,
        series_by_product_code,
        series_by_customs_unit,
        series_by_section_label,
        series_by_product_label,
        metrics,
    }
}

/// (period, flow) sums, chronological; flows within a period follow the
/// order in which each flow first appears in `records`.
fn period_series(records: &[TradeRecord], granularity: PeriodGranularity) -> Vec<PeriodPoint> {
    let mut first_seen: Vec<Flow> = Vec::with_capacity(2);
    let mut sums: HashMap<(Period, Flow), f64> = HashMap::new();

    for r in records {
        if !first_seen.contains(&r.flow) {
            first_seen.push(r.flow);
        }
        *sums
            .entry((Period::of(r.date, granularity), r.flow))
            .or_insert(0.0) += r.value_usd;
    }

    let flow_rank = |flow: Flow| first_seen.iter().position(|f| *f == flow);

    let mut points: Vec<PeriodPoint> = sums
        .into_iter()
        .map(|((period, flow), value_usd)| PeriodPoint {
            period,
            flow,
            value_usd,
        })
        .collect();
    points.sort_by(|a, b| {
        a.period
            .cmp(&b.period)
            .then_with(|| flow_rank(a.flow).cmp(&flow_rank(b.flow)))
    });
    points
}

/// Group by `key`, sum value, sort descending with ascending key tie-break.
/// Records for which `key` returns `None` are skipped.
fn rank_by<'a, F>(records: &'a [TradeRecord], key: F) -> Vec<RankedValue>
where
    F: Fn(&'a TradeRecord) -> Option<&'a str>,
{
    let mut sums: HashMap<&'a str, f64> = HashMap::new();
    for r in records {
        if let Some(k) = key(r) {
            *sums.entry(k).or_insert(0.0) += r.value_usd;
        }
    }

    let mut ranked: Vec<RankedValue> = sums
        .into_iter()
        .map(|(k, value_usd)| RankedValue {
            key: k.to_string(),
            value_usd,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.value_usd
            .total_cmp(&a.value_usd)
            .then_with(|| a.key.cmp(&b.key))
    });
    ranked
}

fn summarize(records: &[TradeRecord]) -> SummaryMetrics {
    let mut countries: HashSet<&str> = HashSet::new();
    let mut products: HashSet<&str> = HashSet::new();
    let mut regions: HashSet<&str> = HashSet::new();
    let mut customs_units: HashSet<&str> = HashSet::new();
    let mut total_value_usd = 0.0;
    let mut total_weight_kg = 0.0;

    for r in records {
        countries.insert(&r.country);
        products.insert(&r.product_code);
        if let Some(region) = &r.region {
            regions.insert(region);
        }
        if let Some(unit) = &r.customs_unit {
            customs_units.insert(unit);
        }
        total_value_usd += r.value_usd;
        total_weight_kg += r.weight_kg.unwrap_or(0.0);
    }

    SummaryMetrics {
        record_count: records.len(),
        total_value_usd,
        total_weight_kg,
        distinct_countries: countries.len(),
        distinct_products: products.len(),
        distinct_regions: regions.len(),
        distinct_customs_units: customs_units.len(),
    }
}

// ── Presentation helpers ────────────────────────────────────────────────────

/// Leading `n` entries of a ranking.
pub fn top_n(ranked: &[RankedValue], n: usize) -> &[RankedValue] {
    &ranked[..n.min(ranked.len())]
}

/// Detail-table order: descending value, stable for equal values.
pub fn rank_by_value(records: &[TradeRecord]) -> Vec<TradeRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| b.value_usd.total_cmp(&a.value_usd));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures::record;

    fn ranked(pairs: &[(&str, f64)]) -> Vec<RankedValue> {
        pairs
            .iter()
            .map(|(k, v)| RankedValue {
                key: k.to_string(),
                value_usd: *v,
            })
            .collect()
    }

    #[test]
    fn single_export_record_view() {
        let view = aggregate(vec![record("2023-01-15", Flow::Export, "China", "A", 100.0)]);
        assert_eq!(view.totals_by_flow, BTreeMap::from([(Flow::Export, 100.0)]));
        assert_eq!(view.series_by_country, ranked(&[("China", 100.0)]));
        assert_eq!(view.series_by_product, ranked(&[("A", 100.0)]));
        assert_eq!(view.series_by_period.len(), 1);
        assert_eq!(view.series_by_period[0].period.to_string(), "2023-01");
    }

    #[test]
    fn empty_input_gives_empty_view() {
        let view = aggregate(Vec::new());
        assert_eq!(view, AggregatedView::default());
    }

    #[test]
    fn rankings_break_ties_by_name() {
        let view = aggregate(vec![
            record("2023-01-01", Flow::Export, "Peru", "B", 50.0),
            record("2023-01-02", Flow::Export, "Chile", "A", 50.0),
            record("2023-01-03", Flow::Import, "China", "A", 80.0),
        ]);
        assert_eq!(
            view.series_by_country,
            ranked(&[("China", 80.0), ("Chile", 50.0), ("Peru", 50.0)])
        );
        assert_eq!(view.series_by_product, ranked(&[("A", 130.0), ("B", 50.0)]));
    }

    #[test]
    fn period_ties_follow_first_seen_flow() {
        let view = aggregate(vec![
            record("2023-02-01", Flow::Import, "Chile", "A", 1.0),
            record("2023-01-20", Flow::Export, "Chile", "A", 2.0),
            record("2023-01-05", Flow::Import, "Chile", "A", 3.0),
            record("2023-02-09", Flow::Export, "Chile", "A", 4.0),
        ]);
        let got: Vec<(String, Flow, f64)> = view
            .series_by_period
            .iter()
            .map(|p| (p.period.to_string(), p.flow, p.value_usd))
            .collect();
        assert_eq!(
            got,
            vec![
                ("2023-01".to_string(), Flow::Import, 3.0),
                ("2023-01".to_string(), Flow::Export, 2.0),
                ("2023-02".to_string(), Flow::Import, 1.0),
                ("2023-02".to_string(), Flow::Export, 4.0),
            ]
        );
    }

    #[test]
    fn yearly_granularity_buckets_by_year() {
        let options = ViewOptions {
            period: PeriodGranularity::Year,
        };
        let view = aggregate_with(
            vec![
                record("2022-03-01", Flow::Export, "Chile", "A", 1.0),
                record("2022-11-01", Flow::Export, "Chile", "A", 2.0),
                record("2023-01-01", Flow::Export, "Chile", "A", 4.0),
            ],
            &options,
        );
        let got: Vec<(String, f64)> = view
            .series_by_period
            .iter()
            .map(|p| (p.period.to_string(), p.value_usd))
            .collect();
        assert_eq!(got, vec![("2022".to_string(), 3.0), ("2023".to_string(), 4.0)]);
    }

    #[test]
    fn metrics_count_distinct_dimensions() {
        let mut a = record("2023-01-01", Flow::Export, "Chile", "A", 10.0);
        a.region = Some("SP".into());
        a.customs_unit = Some("Porto de Santos".into());
        a.weight_kg = Some(2.5);
        let mut b = record("2023-01-02", Flow::Import, "Chile", "B", 5.0);
        b.region = Some("SP".into());
        b.customs_unit = Some("Aeroporto de Viracopos".into());
        let c = record("2023-01-03", Flow::Import, "Peru", "B", 1.0);

        let view = aggregate(vec![a, b, c]);
        assert_eq!(view.metrics.record_count, 3);
        assert_eq!(view.metrics.total_value_usd, 16.0);
        assert_eq!(view.metrics.total_weight_kg, 2.5);
        assert_eq!(view.metrics.distinct_countries, 2);
        assert_eq!(view.metrics.distinct_products, 2);
        assert_eq!(view.metrics.distinct_regions, 1);
        assert_eq!(view.metrics.distinct_customs_units, 2);
        assert_eq!(view.series_by_region, ranked(&[("SP", 15.0)]));
        assert_eq!(
            view.series_by_customs_unit,
            ranked(&[("Porto de Santos", 10.0), ("Aeroporto de Viracopos", 5.0)])
        );
    }

    #[test]
    fn label_rankings_group_by_description() {
        let mut a = record("2023-01-01", Flow::Export, "Chile", "II", 10.0);
        a.section_description = Some("Vegetable products".into());
        a.product_description = Some("Soya beans".into());
        let mut b = record("2023-01-02", Flow::Export, "Chile", "II", 4.0);
        b.section_description = Some("Vegetable products".into());
        b.product_code = "100590".into();
        b.product_description = Some("Maize".into());
        let c = record("2023-01-03", Flow::Export, "Peru", "V", 20.0);

        let view = aggregate(vec![a, b, c]);
        assert_eq!(
            view.series_by_section_label,
            ranked(&[("V", 20.0), ("Vegetable products", 14.0)])
        );
        assert_eq!(
            view.series_by_product_label,
            ranked(&[("V-000", 20.0), ("Soya beans", 10.0), ("Maize", 4.0)])
        );
    }

    #[test]
    fn top_n_truncates_without_panicking() {
        let r = ranked(&[("a", 3.0), ("b", 2.0)]);
        assert_eq!(top_n(&r, 1).len(), 1);
        assert_eq!(top_n(&r, 10).len(), 2);
    }

    #[test]
    fn rank_by_value_is_descending_and_stable() {
        let rs = vec![
            record("2023-01-01", Flow::Export, "Chile", "A", 5.0),
            record("2023-01-02", Flow::Export, "Peru", "A", 9.0),
            record("2023-01-03", Flow::Export, "China", "A", 5.0),
        ];
        let sorted = rank_by_value(&rs);
        let countries: Vec<&str> = sorted.iter().map(|r| r.country.as_str()).collect();
        assert_eq!(countries, vec!["Peru", "Chile", "China"]);
    }
}
