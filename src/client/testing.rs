//! In-process query clients for tests

use async_trait::async_trait;
use std::sync::Mutex;

use super::{QueryClient, QueryRequest, QueryServiceError};
use crate::model::QueryResult;

/// Returns a fixed result and records every request
pub struct FixedClient {
    result: QueryResult,
    requests: Mutex<Vec<QueryRequest>>,
}

impl FixedClient {
    pub fn new(result: serde_json::Value) -> Self {
        Self {
            result: serde_json::from_value(result).unwrap(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<QueryRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryClient for FixedClient {
    async fn query(&self, request: &QueryRequest) -> Result<QueryResult, QueryServiceError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.result.clone())
    }
}

/// Fails every query with the error built by `make`
pub struct FailingClient {
    make: fn() -> QueryServiceError,
}

impl FailingClient {
    pub fn new(make: fn() -> QueryServiceError) -> Self {
        Self { make }
    }
}

#[async_trait]
impl QueryClient for FailingClient {
    async fn query(&self, _request: &QueryRequest) -> Result<QueryResult, QueryServiceError> {
        Err((self.make)())
    }
}

/// Waits before answering, then returns a fixed result
pub struct SlowClient {
    delay: std::time::Duration,
    inner: FixedClient,
}

impl SlowClient {
    pub fn new(delay: std::time::Duration, result: serde_json::Value) -> Self {
        Self {
            delay,
            inner: FixedClient::new(result),
        }
    }
}

#[async_trait]
impl QueryClient for SlowClient {
    async fn query(&self, request: &QueryRequest) -> Result<QueryResult, QueryServiceError> {
        tokio::time::sleep(self.delay).await;
        self.inner.query(request).await
    }
}
