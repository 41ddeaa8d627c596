//! Chart payload: the JSON document the presentation layer feeds to its
//! charting library.
//!
//! Mirrors the dashboard's panels: headline metrics, flow totals, the
//! period line chart, top-N bar charts for countries, sections and products
//! (by description where one was loaded), and the full region and customs
//! unit breakdowns.

use serde::Serialize;

use crate::aggregation::{top_n, AggregatedView, PeriodPoint, RankedValue, SummaryMetrics};
use crate::error::TradeViewError;
use crate::record::Flow;

pub const DEFAULT_TOP_N: usize = 10;

#[derive(Debug, Serialize)]
pub struct FlowTotal {
    pub flow: Flow,
    pub value_usd: f64,
}

#[derive(Debug, Serialize)]
pub struct ChartPayload<'a> {
    pub metrics: &'a SummaryMetrics,
    pub totals_by_flow: Vec<FlowTotal>,
    pub timeline: &'a [PeriodPoint],
    pub top_countries: &'a [RankedValue],
    pub top_sections: &'a [RankedValue],
    pub top_products: &'a [RankedValue],
    pub regions: &'a [RankedValue],
    pub customs_units: &'a [RankedValue],
}

pub fn chart_payload(view: &AggregatedView, top: usize) -> ChartPayload<'_> {
    ChartPayload {
        metrics: &view.metrics,
        totals_by_flow: view
            .totals_by_flow
            .iter()
            .map(|(flow, value_usd)| FlowTotal {
                flow: *flow,
                value_usd: *value_usd,
            })
            .collect(),
        timeline: &view.series_by_period,
        top_countries: top_n(&view.series_by_country, top),
        top_sections: top_n(&view.series_by_section_label, top),
        top_products: top_n(&view.series_by_product_label, top),
        regions: &view.series_by_region,
        customs_units: &view.series_by_customs_unit,
    }
}

pub fn to_json(view: &AggregatedView, top: usize) -> Result<String, TradeViewError> {
    Ok(serde_json::to_string(&chart_payload(view, top))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::aggregate;
    use crate::record::fixtures::record;
    use serde_json::Value;

    #[test]
    fn payload_serializes_periods_and_flows_as_strings() {
        let view = aggregate(vec![
            record("2023-01-15", Flow::Export, "China", "A", 100.0),
            record("2023-02-10", Flow::Import, "Chile", "B", 50.0),
        ]);
        let json: Value = serde_json::from_str(&to_json(&view, DEFAULT_TOP_N).unwrap()).unwrap();

        assert_eq!(json["timeline"][0]["period"], "2023-01");
        assert_eq!(json["timeline"][0]["flow"], "export");
        assert_eq!(json["totals_by_flow"][0]["flow"], "import");
        assert_eq!(json["metrics"]["record_count"], 2);
        assert_eq!(json["top_countries"][0]["key"], "China");
    }

    #[test]
    fn top_n_limits_bar_series() {
        let records = (0..15)
            .map(|i| record("2023-01-01", Flow::Export, &format!("C{i:02}"), "A", i as f64))
            .collect();
        let view = aggregate(records);
        let payload = chart_payload(&view, 3);
        assert_eq!(payload.top_countries.len(), 3);
        assert_eq!(payload.top_countries[0].key, "C14");
        assert_eq!(payload.top_sections.len(), 1);
    }

    #[test]
    fn bar_charts_use_descriptions() {
        let mut a = record("2023-01-15", Flow::Export, "China", "II", 100.0);
        a.section_description = Some("Vegetable products".into());
        a.product_description = Some("Soya beans".into());
        a.customs_unit = Some("Porto de Santos".into());
        let b = record("2023-02-10", Flow::Export, "Chile", "V", 50.0);
        let json: Value =
            serde_json::from_str(&to_json(&aggregate(vec![a, b]), DEFAULT_TOP_N).unwrap()).unwrap();

        assert_eq!(json["top_sections"][0]["key"], "Vegetable products");
        assert_eq!(json["top_sections"][1]["key"], "V");
        assert_eq!(json["top_products"][0]["key"], "Soya beans");
        assert_eq!(json["customs_units"][0]["key"], "Porto de Santos");
        assert_eq!(json["metrics"]["distinct_customs_units"], 1);
    }

    #[test]
    fn empty_view_serializes() {
        let json = to_json(&AggregatedView::default(), DEFAULT_TOP_N).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["timeline"], Value::Array(vec![]));
    }
}
