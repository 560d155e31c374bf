//! Result Transformer
//!
//! Reshapes a raw query result into a flat list of records:
//!
//! - **Tabular** results: one record per row, nested aggregate lists
//!   unwrapped one level, millisecond timestamps rendered as dates
//! - **Time-series** results: one record per time bucket, carrying a `date`
//!   and the grouped-by values of its series
//!
//! The shape is decided once from column metadata (see [`ResultShape`]).
//! Transforming is pure: the input is never modified.
//!
//! # Example
//!
//! ```rust
//! use apm_querier::model::QueryResult;
//! use apm_querier::transform::{render_json, transform};
//!
//! let result: QueryResult = serde_json::from_str(r#"{
//!     "queryResultMetadataSummary": {
//!         "queryResultRowTypeSummaries": [
//!             {"displayName": "ts", "expression": "StartTime", "unit": "EPOCH_TIME_MS"}
//!         ]
//!     },
//!     "queryResultRows": [{"queryResultRowData": {"ts": 1700000000000}}]
//! }"#).unwrap();
//!
//! let records = transform(&result).unwrap();
//! assert_eq!(records[0]["ts"], "2023-11-14T22:13:20Z");
//! println!("{}", render_json(&records).unwrap());
//! ```

mod columns;
mod datetime;
mod error;
mod tabular;
mod time_bucket;
mod timeseries;

pub use columns::{ResultShape, TabularLayout, TimeSeriesLayout};
pub use datetime::{format_epoch_millis, format_epoch_seconds};
pub use error::{TransformError, TransformResult};
pub use time_bucket::TimeBucket;
pub use timeseries::DATE_KEY;

use serde_json::Value;

use crate::model::{QueryResult, Record};

/// Transform a query result into flat records
pub fn transform(result: &QueryResult) -> TransformResult<Vec<Record>> {
    let shape = ResultShape::detect(&result.query_result_metadata_summary);
    transform_with(&shape, result)
}

/// Transform using an already detected shape
pub fn transform_with(shape: &ResultShape, result: &QueryResult) -> TransformResult<Vec<Record>> {
    let rows = &result.query_result_rows;

    tracing::debug!(shape = shape.name(), rows = rows.len(), "Transforming query result");

    match shape {
        ResultShape::Tabular(layout) => tabular::transform_rows(layout, rows),
        ResultShape::TimeSeries(layout) => timeseries::transform_rows(layout, rows),
    }
}

/// Serialize records as pretty JSON: sorted keys, two-space indent
pub fn render_json(records: &[Record]) -> serde_json::Result<String> {
    let sorted: Vec<Value> = records.iter().map(sorted_object).collect();
    serde_json::to_string_pretty(&sorted)
}

// Key order must not depend on serde_json's `preserve_order` feature.
fn sorted_object(map: &Record) -> Value {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    Value::Object(
        entries
            .into_iter()
            .map(|(key, value)| (key.clone(), sorted_value(value)))
            .collect(),
    )
}

fn sorted_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => sorted_object(map),
        Value::Array(items) => Value::Array(items.iter().map(sorted_value).collect()),
        other => other.clone(),
    }
}
