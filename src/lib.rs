//! # APM Querier
//!
//! An HTTP function that runs one tracing query against an APM domain and
//! flattens the result into a plain list of JSON records.
//!
//! ## Modules
//!
//! - [`resolver`]: Turns request parameters into query text
//! - [`client`]: APM traces query service client
//! - [`transform`]: Flattens tabular and time-series results
//! - [`querier`]: Resolve, query, transform for a single request
//! - [`api`]: HTTP surface with Axum
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust
//! use apm_querier::model::QueryResult;
//! use apm_querier::transform::{render_json, transform};
//!
//! let result: QueryResult = serde_json::from_str(r#"{
//!     "queryResultMetadataSummary": {
//!         "queryResultRowTypeSummaries": [
//!             {"displayName": "Start", "expression": "StartTime", "unit": "EPOCH_TIME_MS"}
//!         ]
//!     },
//!     "queryResultRows": [
//!         {"queryResultRowData": {"Start": 1700000000000, "Service": "checkout"}}
//!     ]
//! }"#).unwrap();
//!
//! let records = transform(&result).unwrap();
//! assert_eq!(records[0]["Start"], "2023-11-14T22:13:20Z");
//!
//! println!("{}", render_json(&records).unwrap());
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod model;
pub mod querier;
pub mod resolver;
pub mod transform;

pub use client::{ApmTracesClient, QueryClient, QueryServiceError};
pub use config::Config;
pub use model::{QueryResult, Record};
pub use querier::{Querier, QuerierError, QuerySettings};
pub use resolver::{resolve, QueryParams, ResolveError};
pub use transform::{render_json, transform, TransformError};
