//! Transform error types
//!
//! Every variant is a structural surprise in the query result and is
//! reported as a server error.

use thiserror::Error;

/// Errors that can occur while reshaping a query result
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// A `time_bucket(...)` key that does not carry a bucket width
    #[error("Malformed time bucket key: {0}")]
    MalformedTimeBucketKey(String),

    /// A key the result shape requires is absent
    #[error("Missing key '{0}' in query result row")]
    MissingKey(String),

    /// A value has a different JSON type than its column implies
    #[error("Unexpected value for '{key}': expected {expected}")]
    UnexpectedType { key: String, expected: &'static str },

    /// A timestamp that cannot be represented as a calendar date
    #[error("Timestamp out of range for '{key}': {value}")]
    TimestampOutOfRange { key: String, value: String },
}

impl TransformError {
    pub(crate) fn unexpected(key: &str, expected: &'static str) -> Self {
        TransformError::UnexpectedType {
            key: key.to_string(),
            expected,
        }
    }
}

/// Result type for transform operations
pub type TransformResult<T> = Result<T, TransformError>;
