//! Resolver error types
//!
//! Both variants are client errors: the caller answers them with a 400.

use thiserror::Error;

use super::{CONFIGURATION_NAME, QUERY_RESULT_NAME, QUERY_TQL};

/// Errors that can occur while resolving the query text of a request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// None of the accepted parameters was present
    #[error(
        "No valid parameters specified, you need to specify one of the following parameters: {}, {}, {}",
        QUERY_RESULT_NAME,
        QUERY_TQL,
        CONFIGURATION_NAME
    )]
    NoQueryParameterSpecified,

    /// `configuration_name` referenced a key the configuration source does not hold
    #[error("Incorrect configuration name: {0}")]
    ConfigurationNotFound(String),
}

/// Result type for resolver operations
pub type ResolveResult<T> = Result<T, ResolveError>;
