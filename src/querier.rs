//! Querier
//!
//! Runs one invocation of the function: resolve the query text from the
//! request parameters, send exactly one query, transform the result.

use std::sync::Arc;
use thiserror::Error;

use crate::client::{QueryClient, QueryRequest, QueryServiceError, TimeWindow, DEFAULT_LIMIT};
use crate::model::Record;
use crate::resolver::{resolve, ConfigProvider, QueryParams, ResolveError};
use crate::transform::{transform_with, ResultShape, TransformError};

/// Fixed parameters of every outbound query
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySettings {
    /// APM domain to query
    pub domain_id: String,
    /// Maximum number of rows fetched
    pub limit: u32,
    /// Span start-time window
    pub time_window: TimeWindow,
}

impl QuerySettings {
    pub fn new(domain_id: impl Into<String>) -> Self {
        Self {
            domain_id: domain_id.into(),
            limit: DEFAULT_LIMIT,
            time_window: TimeWindow::default(),
        }
    }
}

/// Resolves, queries and transforms
pub struct Querier {
    client: Arc<dyn QueryClient>,
    provider: Arc<dyn ConfigProvider>,
    settings: QuerySettings,
}

impl Querier {
    /// Create a new querier
    pub fn new(
        client: Arc<dyn QueryClient>,
        provider: Arc<dyn ConfigProvider>,
        settings: QuerySettings,
    ) -> Self {
        Self {
            client,
            provider,
            settings,
        }
    }

    pub fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    /// Handle one request
    pub async fn run(&self, params: &QueryParams) -> Result<Vec<Record>, QuerierError> {
        let resolved = resolve(params, self.provider.as_ref())?;

        tracing::info!(source = %resolved.source, "Resolved query text");

        let request = QueryRequest {
            domain_id: self.settings.domain_id.clone(),
            query_text: resolved.text,
            time_window: self.settings.time_window,
            limit: self.settings.limit,
        };

        let result = self.client.query(&request).await.map_err(|e| {
            tracing::error!(error = %e, "APM query failed");
            e
        })?;

        let shape = ResultShape::detect(&result.query_result_metadata_summary);
        let records = transform_with(&shape, &result)?;

        tracing::info!(
            shape = shape.name(),
            rows = result.query_result_rows.len(),
            records = records.len(),
            "Query completed"
        );

        Ok(records)
    }
}

/// Errors from a single invocation
#[derive(Error, Debug)]
pub enum QuerierError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Query service error: {0}")]
    Service(#[from] QueryServiceError),

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),
}

impl QuerierError {
    /// Whether the caller made a bad request
    pub fn is_client_error(&self) -> bool {
        matches!(self, QuerierError::Resolve(_))
    }
}
