//! APM traces REST API client
//!
//! HTTP client for the `runQuery` action of the APM traces API.

use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Client;
use serde::Serialize;

use super::{QueryClient, QueryRequest, QueryServiceError};
use crate::model::QueryResult;

/// APM traces API client
pub struct ApmTracesClient {
    client: Client,
    config: ApmTracesConfig,
}

/// Configuration for the APM traces client
#[derive(Debug, Clone)]
pub struct ApmTracesConfig {
    /// Base URL of the APM traces endpoint (or of a signing proxy in front of it)
    pub base_url: String,
    /// API version path segment
    pub api_version: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Optional bearer token sent with each request
    pub auth_token: Option<String>,
}

impl Default for ApmTracesConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8090".to_string(),
            api_version: "20200630".to_string(),
            request_timeout_ms: 60_000,
            auth_token: None,
        }
    }
}

impl ApmTracesClient {
    /// Create a new client with the given configuration
    pub fn new(config: ApmTracesConfig) -> Result<Self, QueryServiceError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &ApmTracesConfig {
        &self.config
    }

    fn run_query_url(&self) -> String {
        format!(
            "{}/{}/queries/actions/runQuery",
            self.config.base_url.trim_end_matches('/'),
            self.config.api_version
        )
    }
}

#[async_trait]
impl QueryClient for ApmTracesClient {
    async fn query(&self, request: &QueryRequest) -> Result<QueryResult, QueryServiceError> {
        let url = self.run_query_url();

        let params = [
            ("apmDomainId", request.domain_id.clone()),
            (
                "timeSpanStartedGreaterThanOrEqualTo",
                request
                    .time_window
                    .start
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
            (
                "timeSpanStartedLessThan",
                request
                    .time_window
                    .end
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
            ("limit", request.limit.to_string()),
        ];

        let body = RunQueryBody {
            query_text: &request.query_text,
        };

        let mut builder = self.client.post(&url).query(&params).json(&body);
        if let Some(token) = &self.config.auth_token {
            builder = builder.bearer_auth(token);
        }

        tracing::debug!(url = %url, limit = request.limit, "Sending APM query");

        let response = builder.send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(QueryServiceError::ApiError {
                status: status.as_u16(),
                message: text,
            });
        }

        let bytes = response.bytes().await.map_err(classify)?;
        serde_json::from_slice(&bytes).map_err(|e| QueryServiceError::Decode(e.to_string()))
    }
}

fn classify(e: reqwest::Error) -> QueryServiceError {
    if e.is_timeout() {
        QueryServiceError::Timeout
    } else if e.is_connect() {
        QueryServiceError::Unavailable
    } else {
        QueryServiceError::Request(e)
    }
}

// ============================================
// Request DTOs
// ============================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunQueryBody<'a> {
    query_text: &'a str,
}
