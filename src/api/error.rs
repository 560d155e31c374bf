//! API Error Types
//!
//! Maps querier failures to HTTP responses. A request that names no usable
//! query is the caller's fault and gets a plain-text 400; everything else is
//! a server-side failure with a JSON error body.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::client::QueryServiceError;
use crate::querier::QuerierError;
use crate::resolver::ResolveError;
use crate::transform::TransformError;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request did not resolve to a query
    #[error(transparent)]
    BadRequest(#[from] ResolveError),

    /// Query service call failed
    #[error("Query service error: {0}")]
    QueryService(#[from] QueryServiceError),

    /// Result could not be flattened
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// Records could not be rendered
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<QuerierError> for ApiError {
    fn from(err: QuerierError) -> Self {
        match err {
            QuerierError::Resolve(e) => ApiError::BadRequest(e),
            QuerierError::Service(e) => ApiError::QueryService(e),
            QuerierError::Transform(e) => ApiError::Transform(e),
        }
    }
}

impl ApiError {
    /// Status code and machine-readable error code
    pub fn status_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::QueryService(e) => match e {
                QueryServiceError::ApiError { .. } => (StatusCode::BAD_GATEWAY, "QUERY_SERVICE_ERROR"),
                QueryServiceError::Unavailable => {
                    (StatusCode::SERVICE_UNAVAILABLE, "QUERY_SERVICE_UNAVAILABLE")
                }
                QueryServiceError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "QUERY_SERVICE_TIMEOUT"),
                QueryServiceError::Request(_) => (StatusCode::BAD_GATEWAY, "QUERY_REQUEST_FAILED"),
                QueryServiceError::Decode(_) => (StatusCode::BAD_GATEWAY, "QUERY_RESPONSE_INVALID"),
            },
            ApiError::Transform(_) => (StatusCode::INTERNAL_SERVER_ERROR, "TRANSFORM_ERROR"),
            ApiError::Serialization(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "SERIALIZATION_ERROR")
            }
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        }
    }
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

/// Error details
#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_code();

        if let ApiError::BadRequest(e) = &self {
            tracing::error!(error_code = %code, error_message = %e, "Rejected request");
            return (
                status,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                e.to_string(),
            )
                .into_response();
        }

        let request_id = uuid::Uuid::new_v4().to_string();

        tracing::error!(
            request_id = %request_id,
            error_code = %code,
            error_message = %self,
            "API error occurred"
        );

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
