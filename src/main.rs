//! APM Querier function server
//!
//! Run with: cargo run --bin apm-querier
//!
//! # Configuration
//!
//! Read from `config.toml` in the user config directory, `/etc/apm-querier/`
//! or the working directory, then overridden by environment variables:
//! - `apm_domain_id` / `APM_QUERIER_DOMAIN_ID`: APM domain to query
//! - `APM_QUERIER_ENDPOINT`: APM traces endpoint
//! - `APM_QUERIER_AUTH_TOKEN`: Bearer token for the endpoint
//! - `APM_QUERIER_HOST`, `APM_QUERIER_PORT`: Listen address (default: 0.0.0.0:8080)
//! - `APM_QUERIER_LOG_LEVEL`, `APM_QUERIER_LOG_FORMAT`: Logging (pretty or json)
//! - `RUST_LOG`: Takes precedence over the configured log level
//!
//! A config file that exists but fails to parse stops startup.
//!
//! `configuration_name` lookups check the `[queries]` table first, then the
//! process environment.

use apm_querier::api::{serve, AppState};
use apm_querier::client::ApmTracesClient;
use apm_querier::config::{Config, LoggingConfig};
use apm_querier::querier::Querier;
use apm_querier::resolver::{EnvProvider, LayeredProvider};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = Config::find_file(&Config::default_paths());
    let config = match Config::load_from(path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_tracing(&Config::from_env().logging);
            tracing::error!("{}", e);
            return Err(e.into());
        }
    };
    init_tracing(&config.logging);

    tracing::info!("Starting APM querier v{}", env!("CARGO_PKG_VERSION"));
    match &path {
        Some(path) => tracing::info!("Loaded config from {:?}", path),
        None => tracing::info!("No config file found, using defaults with environment overrides"),
    }

    if let Err(e) = config.validate() {
        if !config.apm.domain_id.trim().is_empty() {
            tracing::error!("{}", e);
            return Err(e.into());
        }
        tracing::warn!("{} (queries will fail until it is set)", e);
    }

    let settings = config.query_settings()?;
    tracing::info!(
        endpoint = %config.apm.endpoint,
        limit = settings.limit,
        saved_queries = config.queries.len(),
        "APM query service configured"
    );

    let client = ApmTracesClient::new(config.client_config())?;
    let provider = LayeredProvider::new()
        .layer(config.saved_queries())
        .layer(EnvProvider);

    let querier = Querier::new(Arc::new(client), Arc::new(provider), settings);

    let server_config = config.server_config();
    let state = AppState::new(querier, server_config.clone());

    serve(state, &server_config).await?;

    tracing::info!("APM querier stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("apm_querier={},tower_http=debug", logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);

    if logging.is_json() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
