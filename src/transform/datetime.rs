//! Timestamp formatting for output records
//!
//! All dates are rendered as `YYYY-MM-DDTHH:MM:SSZ` in UTC. Sub-second
//! parts are floored away.

use chrono::DateTime;
use serde_json::Value;

use super::error::{TransformError, TransformResult};

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Format Unix seconds
pub fn format_epoch_seconds(key: &str, seconds: i64) -> TransformResult<String> {
    DateTime::from_timestamp(seconds, 0)
        .map(|dt| dt.format(DATE_FORMAT).to_string())
        .ok_or_else(|| TransformError::TimestampOutOfRange {
            key: key.to_string(),
            value: seconds.to_string(),
        })
}

/// Format a millisecond Unix timestamp held in a JSON value
pub fn format_epoch_millis(key: &str, value: &Value) -> TransformResult<String> {
    let out_of_range = || TransformError::TimestampOutOfRange {
        key: key.to_string(),
        value: value.to_string(),
    };

    let seconds = if let Some(millis) = value.as_i64() {
        millis.div_euclid(1000)
    } else if let Some(millis) = value.as_f64() {
        let seconds = (millis / 1000.0).floor();
        if !seconds.is_finite() || seconds.abs() >= i64::MAX as f64 {
            return Err(out_of_range());
        }
        seconds as i64
    } else {
        return Err(TransformError::unexpected(key, "a millisecond timestamp"));
    };

    format_epoch_seconds(key, seconds).map_err(|_| out_of_range())
}
