//! Query Routes
//!
//! The function entry point. The raw query string names the query to run;
//! the response body is the flattened records as pretty JSON.
//!
//! - GET / - Run a query
//! - GET /api/v1/query - Run a query

use axum::{
    extract::{RawQuery, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::resolver::QueryParams;
use crate::transform::render_json;

/// GET /api/v1/query
pub async fn run_query(
    State(state): State<Arc<AppState>>,
    RawQuery(raw): RawQuery,
) -> ApiResult<Response> {
    let params = raw.as_deref().map(QueryParams::parse).unwrap_or_default();

    let records = state.querier.run(&params).await?;
    let body = render_json(&records)?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response())
}
