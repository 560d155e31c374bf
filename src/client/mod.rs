//! APM Traces Query Client
//!
//! The query service is a collaborator: the querier only depends on the
//! [`QueryClient`] trait. [`ApmTracesClient`] implements it over the APM
//! traces REST API.
//!
//! One call per request, no retries. Timeouts belong to the client's HTTP
//! transport.

mod apm;
#[cfg(test)]
pub(crate) mod testing;

pub use apm::{ApmTracesClient, ApmTracesConfig};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::QueryResult;

/// Default number of rows fetched per query
pub const DEFAULT_LIMIT: u32 = 900;

/// Executes queries against an APM domain
#[async_trait]
pub trait QueryClient: Send + Sync {
    /// Run a single query
    async fn query(&self, request: &QueryRequest) -> Result<QueryResult, QueryServiceError>;
}

/// A single query against an APM domain
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    /// APM domain to query
    pub domain_id: String,
    /// Query text
    pub query_text: String,
    /// Span start-time window
    pub time_window: TimeWindow,
    /// Maximum number of rows
    pub limit: u32,
}

/// Span start-time window: `start <= t < end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Both bounds at 1970-01-01T00:00:00Z
    pub fn unix_epoch() -> Self {
        let epoch = DateTime::<Utc>::default();
        Self::new(epoch, epoch)
    }

    /// Build from millisecond Unix timestamps
    pub fn from_millis(start_ms: i64, end_ms: i64) -> Option<Self> {
        Some(Self::new(
            DateTime::from_timestamp_millis(start_ms)?,
            DateTime::from_timestamp_millis(end_ms)?,
        ))
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::unix_epoch()
    }
}

/// Errors returned by the query service or the transport to it
#[derive(Error, Debug)]
pub enum QueryServiceError {
    #[error("APM query service unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Failed to decode query response: {0}")]
    Decode(String),
}
