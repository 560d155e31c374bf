//! Time-series result transform
//!
//! Every outer row holds one series under `timeseries`. Each bucket of the
//! series becomes one record: its `time_bucket(...)` key is replaced by a
//! `date`, and the outer row's grouped-by values are attached so each point
//! still says which series it belongs to.

use serde_json::Value;

use super::columns::TimeSeriesLayout;
use super::datetime::format_epoch_seconds;
use super::error::{TransformError, TransformResult};
use super::time_bucket::TimeBucket;
use crate::model::{QueryResultRow, Record, ROW_DATA_ENVELOPE, TIMESERIES_EXPRESSION};

/// Key holding the formatted bucket time in output records
pub const DATE_KEY: &str = "date";

/// Flatten all series into one list of points
///
/// Outer rows keep input order; buckets keep series order.
pub fn transform_rows(
    layout: &TimeSeriesLayout,
    rows: &[QueryResultRow],
) -> TransformResult<Vec<Record>> {
    let mut records = Vec::new();

    for row in rows {
        let data = &row.query_result_row_data;

        let series = data
            .get(TIMESERIES_EXPRESSION)
            .ok_or_else(|| TransformError::MissingKey(TIMESERIES_EXPRESSION.to_string()))?
            .as_array()
            .ok_or_else(|| TransformError::unexpected(TIMESERIES_EXPRESSION, "a list of buckets"))?;

        for bucket in series {
            let mut record = unwrap_bucket(bucket)?;
            replace_time_buckets(&mut record)?;
            attach_group(layout, data, &mut record)?;
            records.push(record);
        }
    }

    Ok(records)
}

fn unwrap_bucket(bucket: &Value) -> TransformResult<Record> {
    match bucket.get(ROW_DATA_ENVELOPE) {
        Some(Value::Object(payload)) => Ok(payload.clone()),
        _ => Err(TransformError::unexpected(
            TIMESERIES_EXPRESSION,
            "queryResultRowData objects",
        )),
    }
}

fn replace_time_buckets(record: &mut Record) -> TransformResult<()> {
    let keys: Vec<String> = record
        .keys()
        .filter(|key| TimeBucket::is_bucket_key(key))
        .cloned()
        .collect();

    for key in keys {
        let bucket = TimeBucket::parse(&key)?;
        let Some(index) = record.remove(&key) else {
            continue;
        };

        let seconds = bucket.seconds_from_value(&key, &index)?;
        let date = format_epoch_seconds(&key, seconds)?;
        record.insert(DATE_KEY.to_string(), Value::String(date));
    }

    Ok(())
}

fn attach_group(
    layout: &TimeSeriesLayout,
    outer: &Record,
    record: &mut Record,
) -> TransformResult<()> {
    for name in &layout.grouped_by {
        let value = outer
            .get(name)
            .ok_or_else(|| TransformError::MissingKey(name.clone()))?;
        record.insert(name.clone(), value.clone());
    }

    Ok(())
}
