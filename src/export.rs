use polars::prelude::*;
use tracing::debug;

use crate::aggregation::{PeriodPoint, RankedValue};
use crate::error::TradeViewError;
use crate::record::TradeRecord;
use crate::schema::{series, trade, ISO_DATE_FORMAT};

/// Records as a DataFrame with the export column order.
///
/// Dates are ISO strings and flows lowercase, so the frame writes out in the
/// same shape the loader reads back.
pub fn to_dataframe(records: &[TradeRecord]) -> Result<DataFrame, TradeViewError> {
    let dates: Vec<String> = records
        .iter()
        .map(|r| r.date.format(ISO_DATE_FORMAT).to_string())
        .collect();
    let dates: Vec<&str> = dates.iter().map(String::as_str).collect();
    let flows: Vec<&str> = records.iter().map(|r| r.flow.as_str()).collect();
    let countries: Vec<&str> = records.iter().map(|r| r.country.as_str()).collect();
    let regions: Vec<Option<&str>> = records.iter().map(|r| r.region.as_deref()).collect();
    let units: Vec<Option<&str>> = records.iter().map(|r| r.customs_unit.as_deref()).collect();
    let sections: Vec<&str> = records.iter().map(|r| r.product_section.as_str()).collect();
    let section_descriptions: Vec<Option<&str>> = records
        .iter()
        .map(|r| r.section_description.as_deref())
        .collect();
    let codes: Vec<&str> = records.iter().map(|r| r.product_code.as_str()).collect();
    let product_descriptions: Vec<Option<&str>> = records
        .iter()
        .map(|r| r.product_description.as_deref())
        .collect();
    let values: Vec<f64> = records.iter().map(|r| r.value_usd).collect();
    let weights: Vec<Option<f64>> = records.iter().map(|r| r.weight_kg).collect();

    let df = df!(
        trade::DATE => dates,
        trade::FLOW => flows,
        trade::COUNTRY => countries,
        trade::REGION => regions,
        trade::CUSTOMS_UNIT => units,
        trade::PRODUCT_SECTION => sections,
        trade::SECTION_DESCRIPTION => section_descriptions,
        trade::PRODUCT_CODE => codes,
        trade::PRODUCT_DESCRIPTION => product_descriptions,
        trade::VALUE_USD => values,
        trade::WEIGHT_KG => weights
    )?;
    Ok(df)
}

/// Comma-separated export with a header row.
pub fn export_filtered(records: &[TradeRecord]) -> Result<Vec<u8>, TradeViewError> {
    let mut df = to_dataframe(records)?;
    let mut buf: Vec<u8> = Vec::new();
    CsvWriter::new(&mut buf)
        .include_header(true)
        .with_separator(b',')
        .finish(&mut df)?;
    debug!(rows = records.len(), bytes = buf.len(), "exported trade records");
    Ok(buf)
}

/// Time series as (period, flow, value_usd) rows.
pub fn period_frame(points: &[PeriodPoint]) -> Result<DataFrame, TradeViewError> {
    let periods: Vec<String> = points.iter().map(|p| p.period.to_string()).collect();
    let periods: Vec<&str> = periods.iter().map(String::as_str).collect();
    let flows: Vec<&str> = points.iter().map(|p| p.flow.as_str()).collect();
    let values: Vec<f64> = points.iter().map(|p| p.value_usd).collect();

    let df = df!(
        series::PERIOD => periods,
        trade::FLOW => flows,
        trade::VALUE_USD => values
    )?;
    Ok(df)
}

/// A ranking as (key_column, value_usd) rows, ranking order kept.
pub fn ranked_frame(
    key_column: &str,
    ranked: &[RankedValue],
) -> Result<DataFrame, TradeViewError> {
    let keys: Vec<&str> = ranked.iter().map(|r| r.key.as_str()).collect();
    let values: Vec<f64> = ranked.iter().map(|r| r.value_usd).collect();

    let df = df!(
        key_column => keys,
        trade::VALUE_USD => values
    )?;
    Ok(df)
}
