//! APM Querier HTTP function
//!
//! HTTP surface of the function, built with Axum.
//!
//! # Endpoints
//!
//! ## Query
//! - `GET /` - Function entry point
//! - `GET /api/v1/query` - Same handler under the versioned prefix
//!
//! Exactly one of these parameters selects the query, checked in this order:
//! `query_result_name`, `query_tql`, `configuration_name`.
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,ignore
//! use apm_querier::api::{serve, ApiConfig, AppState};
//! use apm_querier::client::{ApmTracesClient, ApmTracesConfig};
//! use apm_querier::querier::{Querier, QuerySettings};
//! use apm_querier::resolver::EnvProvider;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApmTracesClient::new(ApmTracesConfig::default())?;
//!     let querier = Querier::new(
//!         Arc::new(client),
//!         Arc::new(EnvProvider),
//!         QuerySettings::new("ocid1.apmdomain.oc1..example"),
//!     );
//!     let config = ApiConfig::default();
//!
//!     serve(AppState::new(querier, config.clone()), &config).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{ApiConfig, AppState};

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new().route("/query", get(routes::query::run_query));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let shared_state = Arc::new(state);

    Router::new()
        .route("/", get(routes::query::run_query))
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("APM querier listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("APM querier shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{FailingClient, FixedClient, SlowClient};
    use crate::client::{QueryClient, QueryServiceError};
    use crate::querier::{Querier, QuerySettings};
    use crate::resolver::StaticProvider;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::util::ServiceExt;
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    /// Counts error-level events
    struct ErrorCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for ErrorCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::ERROR {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn timeseries_result() -> Value {
        json!({
            "queryResultMetadataSummary": {
                "queryResultRowTypeSummaries": [
                    {"displayName": "Service", "expression": "serviceName"},
                    {"displayName": "Series", "expression": "timeseries"}
                ],
                "queryResultsGroupedBy": [
                    {"queryResultsGroupedByColumn": "serviceName"}
                ]
            },
            "queryResultRows": [
                {"queryResultRowData": {
                    "Service": "checkout",
                    "timeseries": [
                        {"queryResultRowData": {"time_bucket(60, StartTime)": 472222, "count": 4}},
                        {"queryResultRowData": {"time_bucket(60, StartTime)": 472223, "count": 2}}
                    ]
                }}
            ]
        })
    }

    fn create_test_app(client: Arc<dyn QueryClient>, domain_id: &str) -> Router {
        let provider = StaticProvider::default().with("slow_spans", "show spans where duration > 1000");
        let querier = Querier::new(client, Arc::new(provider), QuerySettings::new(domain_id));
        build_router(AppState::new(querier, ApiConfig::default()))
    }

    fn test_app() -> (Router, Arc<FixedClient>) {
        let client = Arc::new(FixedClient::new(timeseries_result()));
        (create_test_app(client.clone(), "ocid1.apmdomain.test"), client)
    }

    async fn call(app: Router, uri: &str) -> axum::response::Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health_live() {
        let (app, _) = test_app();
        let response = call(app, "/health/live").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_ready() {
        let (app, _) = test_app();
        let response = call(app, "/health/ready").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_not_ready_without_domain() {
        let app = create_test_app(Arc::new(FixedClient::new(timeseries_result())), "");
        let response = call(app, "/health/ready").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_health_full() {
        let (app, _) = test_app();
        let response = call(app, "/health").await;
        assert_eq!(response.status(), StatusCode::OK);

        let health: dto::HealthResponse = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(health.status, "healthy");
        assert!(health.domain_configured);
        assert_eq!(health.limit, 900);
    }

    #[tokio::test]
    async fn test_query_timeseries() {
        let (app, client) = test_app();

        let response = call(app, "/?query_result_name=hourly_errors").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let body = body_text(response).await;
        let records: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            records,
            json!([
                {"Service": "checkout", "count": 4, "date": "2023-11-14T22:00:00Z"},
                {"Service": "checkout", "count": 2, "date": "2023-11-14T23:00:00Z"}
            ])
        );
        assert!(body.starts_with("[\n  {\n    \"Service\": \"checkout\""));

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].query_text, "fetch query result hourly_errors");
    }

    #[tokio::test]
    async fn test_query_versioned_path_with_tql() {
        let (app, client) = test_app();

        let response = call(
            app,
            "/api/v1/query?query_tql=show%2520spans%2520where%2520isError%2520%253D%2520true",
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            client.requests()[0].query_text,
            "show spans where isError = true"
        );
    }

    #[tokio::test]
    async fn test_query_configuration_name() {
        let (app, client) = test_app();

        let response = call(app, "/?configuration_name=slow_spans").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            client.requests()[0].query_text,
            "show spans where duration > 1000"
        );
    }

    #[tokio::test]
    async fn test_query_without_parameters() {
        let (app, client) = test_app();

        let response = call(app, "/").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));

        let body = body_text(response).await;
        assert!(body.contains("query_result_name"));
        assert!(body.contains("query_tql"));
        assert!(body.contains("configuration_name"));
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_query_unknown_configuration() {
        let (app, client) = test_app();

        let response = call(app, "/?configuration_name=missing").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_text(response).await,
            "Incorrect configuration name: missing"
        );
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_request_logged_once() {
        let errors = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(ErrorCounter(errors.clone()));
        let _guard = tracing::subscriber::set_default(subscriber);

        let (app, _) = test_app();
        let response = call(app, "/?configuration_name=missing").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_query_service_unavailable() {
        let app = create_test_app(
            Arc::new(FailingClient::new(|| QueryServiceError::Unavailable)),
            "ocid1.apmdomain.test",
        );

        let response = call(app, "/?query_result_name=daily").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"]["code"], "QUERY_SERVICE_UNAVAILABLE");
        assert!(body["request_id"].is_string());
    }

    #[tokio::test]
    async fn test_slow_query_is_not_cut_off() {
        let app = create_test_app(
            Arc::new(SlowClient::new(Duration::from_millis(300), timeseries_result())),
            "ocid1.apmdomain.test",
        );

        let response = call(app, "/?query_result_name=x").await;
        assert_eq!(response.status(), StatusCode::OK);

        let records: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(records.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_query_service_timeout() {
        let app = create_test_app(
            Arc::new(FailingClient::new(|| QueryServiceError::Timeout)),
            "ocid1.apmdomain.test",
        );

        let response = call(app, "/?query_result_name=x").await;
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"]["code"], "QUERY_SERVICE_TIMEOUT");
    }

    #[tokio::test]
    async fn test_query_malformed_result() {
        let app = create_test_app(
            Arc::new(FixedClient::new(json!({
                "queryResultMetadataSummary": {
                    "queryResultRowTypeSummaries": [
                        {"displayName": "Series", "expression": "timeseries"}
                    ]
                },
                "queryResultRows": [
                    {"queryResultRowData": {"timeseries": [
                        {"queryResultRowData": {"time_bucket(abc)": 1}}
                    ]}}
                ]
            }))),
            "ocid1.apmdomain.test",
        );

        let response = call(app, "/?query_result_name=daily").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"]["code"], "TRANSFORM_ERROR");
    }
}
