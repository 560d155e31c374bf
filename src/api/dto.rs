//! Data Transfer Objects
//!
//! Response bodies that are not the flattened query records themselves.

use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status: healthy or unconfigured
    pub status: String,
    /// Whether an APM domain id is configured
    pub domain_configured: bool,
    /// Rows fetched per query
    pub limit: u32,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}
