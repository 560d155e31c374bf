//! Request Resolver
//!
//! Turns the query string of an inbound request into the query text sent to
//! the APM traces service. Three mutually exclusive parameters are accepted,
//! checked in this order:
//!
//! ```text
//! ?query_result_name=<name>    -> "fetch query result <name>"
//! ?query_tql=<url-encoded TQL> -> decoded TQL
//! ?configuration_name=<key>    -> value of <key> in the configuration source
//! ```
//!
//! # Example
//!
//! ```rust
//! use apm_querier::resolver::{resolve, QueryParams, StaticProvider};
//!
//! let params = QueryParams::parse("configuration_name=errors");
//! let provider = StaticProvider::default().with("errors", "show spans where isError = true");
//!
//! let resolved = resolve(&params, &provider).unwrap();
//! assert_eq!(resolved.text, "show spans where isError = true");
//! ```

mod error;
mod params;
mod provider;

pub use error::{ResolveError, ResolveResult};
pub use params::{percent_decode, QueryParams};
pub use provider::{ConfigProvider, EnvProvider, LayeredProvider, StaticProvider};

use std::fmt;

/// Parameter naming a saved query result
pub const QUERY_RESULT_NAME: &str = "query_result_name";

/// Parameter carrying URL-encoded query text
pub const QUERY_TQL: &str = "query_tql";

/// Parameter naming a configuration entry holding the query text
pub const CONFIGURATION_NAME: &str = "configuration_name";

const FETCH_QUERY_RESULT: &str = "fetch query result ";

/// Where the query text came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuerySource {
    /// A saved query result, fetched by name
    SavedQueryResult(String),
    /// Raw query text from the request
    Tql,
    /// A configuration entry
    Configuration(String),
}

impl fmt::Display for QuerySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuerySource::SavedQueryResult(name) => write!(f, "{}={}", QUERY_RESULT_NAME, name),
            QuerySource::Tql => write!(f, "{}", QUERY_TQL),
            QuerySource::Configuration(name) => write!(f, "{}={}", CONFIGURATION_NAME, name),
        }
    }
}

/// Query text together with its origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuery {
    pub source: QuerySource,
    pub text: String,
}

/// Resolve the query text for a request
///
/// The first parameter present wins; only its first value is used.
pub fn resolve(params: &QueryParams, provider: &dyn ConfigProvider) -> ResolveResult<ResolvedQuery> {
    if let Some(name) = params.first(QUERY_RESULT_NAME) {
        return Ok(ResolvedQuery {
            source: QuerySource::SavedQueryResult(name.to_string()),
            text: format!("{}{}", FETCH_QUERY_RESULT, name),
        });
    }

    if let Some(tql) = params.first(QUERY_TQL) {
        return Ok(ResolvedQuery {
            source: QuerySource::Tql,
            text: percent_decode(tql),
        });
    }

    if let Some(name) = params.first(CONFIGURATION_NAME) {
        let text = provider
            .get(name)
            .ok_or_else(|| ResolveError::ConfigurationNotFound(name.to_string()))?;

        return Ok(ResolvedQuery {
            source: QuerySource::Configuration(name.to_string()),
            text,
        });
    }

    Err(ResolveError::NoQueryParameterSpecified)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> StaticProvider {
        StaticProvider::default().with("slow", "show traces where duration > 1000")
    }

    #[test]
    fn test_query_result_name() {
        let params = QueryParams::from_pairs([(QUERY_RESULT_NAME, "daily")]);
        let resolved = resolve(&params, &provider()).unwrap();

        assert_eq!(resolved.text, "fetch query result daily");
        assert_eq!(resolved.source, QuerySource::SavedQueryResult("daily".into()));
    }

    #[test]
    fn test_query_result_name_takes_precedence() {
        let params = QueryParams::parse(
            "configuration_name=missing&query_tql=show%20spans&query_result_name=daily",
        );
        let resolved = resolve(&params, &provider()).unwrap();
        assert_eq!(resolved.text, "fetch query result daily");
    }

    #[test]
    fn test_tql_is_percent_decoded() {
        // The query string layer decodes once; query_tql is decoded again.
        let params = QueryParams::parse("query_tql=show%2520traces%2520where%2520x%253D1");
        let resolved = resolve(&params, &provider()).unwrap();

        assert_eq!(resolved.text, "show traces where x=1");
        assert_eq!(resolved.source, QuerySource::Tql);
    }

    #[test]
    fn test_tql_beats_configuration() {
        let params = QueryParams::from_pairs([
            (CONFIGURATION_NAME, "slow"),
            (QUERY_TQL, "show%20spans"),
        ]);
        let resolved = resolve(&params, &provider()).unwrap();
        assert_eq!(resolved.text, "show spans");
    }

    #[test]
    fn test_configuration_name_found() {
        let params = QueryParams::from_pairs([(CONFIGURATION_NAME, "slow")]);
        let resolved = resolve(&params, &provider()).unwrap();

        assert_eq!(resolved.text, "show traces where duration > 1000");
        assert_eq!(resolved.source, QuerySource::Configuration("slow".into()));
    }

    #[test]
    fn test_configuration_name_missing() {
        let params = QueryParams::from_pairs([(CONFIGURATION_NAME, "nope")]);
        let err = resolve(&params, &provider()).unwrap_err();
        assert_eq!(err, ResolveError::ConfigurationNotFound("nope".into()));
    }

    #[test]
    fn test_no_parameters() {
        let err = resolve(&QueryParams::new(), &provider()).unwrap_err();
        assert_eq!(err, ResolveError::NoQueryParameterSpecified);
    }

    #[test]
    fn test_unrelated_parameters_only() {
        let params = QueryParams::parse("limit=10&format=json");
        let err = resolve(&params, &provider()).unwrap_err();
        assert_eq!(err, ResolveError::NoQueryParameterSpecified);
    }

    #[test]
    fn test_first_value_used() {
        let params = QueryParams::parse("query_result_name=first&query_result_name=second");
        let resolved = resolve(&params, &provider()).unwrap();
        assert_eq!(resolved.text, "fetch query result first");
    }

    #[test]
    fn test_source_display() {
        assert_eq!(
            QuerySource::Configuration("slow".into()).to_string(),
            "configuration_name=slow"
        );
        assert_eq!(QuerySource::Tql.to_string(), "query_tql");
    }
}
