//! Tabular result transform
//!
//! Each row becomes one record. Array-typed columns lose one level of
//! `queryResultRowData` envelopes and date columns become ISO-8601 strings.

use serde_json::Value;

use super::columns::TabularLayout;
use super::datetime::format_epoch_millis;
use super::error::{TransformError, TransformResult};
use crate::model::{QueryResultRow, Record, ROW_DATA_ENVELOPE};

/// Transform all rows, preserving order
pub fn transform_rows(
    layout: &TabularLayout,
    rows: &[QueryResultRow],
) -> TransformResult<Vec<Record>> {
    rows.iter()
        .map(|row| transform_row(layout, &row.query_result_row_data))
        .collect()
}

fn transform_row(layout: &TabularLayout, data: &Record) -> TransformResult<Record> {
    let mut record = data.clone();

    for column in &layout.array_columns {
        if let Some(value) = record.get_mut(column) {
            unwrap_elements(column, value)?;
        }
    }

    for column in &layout.date_columns {
        match record.get_mut(column) {
            None | Some(Value::Null) => {}
            Some(value) => {
                let date = format_epoch_millis(column, value)?;
                *value = Value::String(date);
            }
        }
    }

    Ok(record)
}

/// Replace each envelope in a list with its payload. Non-list values are left alone.
fn unwrap_elements(column: &str, value: &mut Value) -> TransformResult<()> {
    let Value::Array(elements) = value else {
        return Ok(());
    };

    for element in elements.iter_mut() {
        let payload = match element {
            Value::Object(envelope) => envelope.remove(ROW_DATA_ENVELOPE),
            _ => None,
        };

        *element = payload.ok_or_else(|| {
            TransformError::unexpected(column, "a list of queryResultRowData entries")
        })?;
    }

    Ok(())
}
