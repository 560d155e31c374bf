//! Time bucket key parser
//!
//! Time-series sub-rows carry their bucket index under a key such as
//! `time_bucket(5, StartTime)`. The first argument is the bucket width in
//! minutes; the index multiplied by `width * 60` gives Unix seconds.
//!
//! ```text
//! time_bucket(<width>, <expression>)
//! ```

use nom::{
    bytes::complete::{tag, take_till1},
    character::complete::char,
    combinator::{map_res, rest},
    sequence::{preceded, terminated, tuple},
    IResult,
};
use serde_json::Value;

use super::error::{TransformError, TransformResult};

const TIME_BUCKET: &str = "time_bucket";

/// A parsed `time_bucket(...)` key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBucket {
    /// Bucket width in minutes
    pub width_minutes: i64,
}

impl TimeBucket {
    /// Whether a row key names a time bucket
    pub fn is_bucket_key(key: &str) -> bool {
        key.starts_with(TIME_BUCKET)
    }

    /// Parse a time bucket key
    pub fn parse(key: &str) -> TransformResult<Self> {
        let malformed = || TransformError::MalformedTimeBucketKey(key.to_string());

        let (_, width_minutes) = bucket_width(key).map_err(|_| malformed())?;

        if width_minutes <= 0 {
            return Err(malformed());
        }

        Ok(Self { width_minutes })
    }

    /// Unix seconds of the bucket at `index`
    pub fn seconds(&self, index: i64) -> Option<i64> {
        index.checked_mul(self.width_minutes)?.checked_mul(60)
    }

    /// Unix seconds for a bucket index held in a JSON value
    pub fn seconds_from_value(&self, key: &str, index: &Value) -> TransformResult<i64> {
        let out_of_range = || TransformError::TimestampOutOfRange {
            key: key.to_string(),
            value: index.to_string(),
        };

        if let Some(index) = index.as_i64() {
            return self.seconds(index).ok_or_else(out_of_range);
        }

        match index.as_f64() {
            Some(index) => {
                let seconds = (index * self.width_minutes as f64 * 60.0).floor();
                if seconds.is_finite() && seconds.abs() < i64::MAX as f64 {
                    Ok(seconds as i64)
                } else {
                    Err(out_of_range())
                }
            }
            None => Err(TransformError::unexpected(key, "a numeric bucket index")),
        }
    }
}

/// `time_bucket(` width `,` remainder
fn bucket_width(input: &str) -> IResult<&str, i64> {
    let (input, (width, _)) = tuple((
        preceded(
            tag("time_bucket("),
            map_res(take_till1(|c: char| c == ','), |raw: &str| raw.trim().parse::<i64>()),
        ),
        terminated(char(','), rest),
    ))(input)?;

    Ok((input, width))
}
