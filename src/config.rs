//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::api::ApiConfig as ServerConfig;
use crate::client::{ApmTracesConfig, TimeWindow, DEFAULT_LIMIT};
use crate::querier::QuerySettings;
use crate::resolver::StaticProvider;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub apm: ApmConfig,

    /// Named query texts, available to `configuration_name`
    #[serde(default)]
    pub queries: HashMap<String, String>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// APM domain and query service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApmConfig {
    /// APM domain OCID
    #[serde(default)]
    pub domain_id: String,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_limit")]
    pub limit: u32,

    #[serde(default = "default_apm_timeout")]
    pub request_timeout_secs: u64,

    pub auth_token: Option<String>,

    #[serde(default)]
    pub time_window_start_ms: i64,

    #[serde(default)]
    pub time_window_end_ms: i64,
}

fn default_endpoint() -> String {
    "http://localhost:8090".to_string()
}

fn default_api_version() -> String {
    "20200630".to_string()
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

fn default_apm_timeout() -> u64 {
    60
}

impl Default for ApmConfig {
    fn default() -> Self {
        Self {
            domain_id: String::new(),
            endpoint: default_endpoint(),
            api_version: default_api_version(),
            limit: default_limit(),
            request_timeout_secs: default_apm_timeout(),
            auth_token: None,
            time_window_start_ms: 0,
            time_window_end_ms: 0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { error, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                error,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            error: e.to_string(),
        })
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Default config file locations, highest priority first
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("apm-querier").join("config.toml"));
        }
        paths.push(PathBuf::from("/etc/apm-querier/config.toml"));
        paths.push(PathBuf::from("./config.toml"));
        paths
    }

    /// First of `paths` that exists
    pub fn find_file(paths: &[PathBuf]) -> Option<PathBuf> {
        paths.iter().find(|path| path.exists()).cloned()
    }

    /// Load `path` with environment overrides, or the environment alone
    ///
    /// A file that exists but does not parse is an error; it never falls
    /// back to defaults.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_with_env(path),
            None => Ok(Self::from_env()),
        }
    }

    /// Apply environment variable overrides using the given lookup
    pub fn apply_env_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // API overrides
        if let Some(host) = var("APM_QUERIER_HOST") {
            self.api.host = host;
        }
        if let Some(port) = var("APM_QUERIER_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }

        // APM overrides; `apm_domain_id` is the key functions are deployed with
        if let Some(domain_id) = var("apm_domain_id").or_else(|| var("APM_QUERIER_DOMAIN_ID")) {
            self.apm.domain_id = domain_id;
        }
        if let Some(endpoint) = var("APM_QUERIER_ENDPOINT") {
            self.apm.endpoint = endpoint;
        }
        if let Some(token) = var("APM_QUERIER_AUTH_TOKEN") {
            self.apm.auth_token = Some(token);
        }
        if let Some(limit) = var("APM_QUERIER_LIMIT") {
            if let Ok(l) = limit.parse() {
                self.apm.limit = l;
            }
        }

        // Logging overrides
        if let Some(level) = var("APM_QUERIER_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("APM_QUERIER_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Check the settings a query cannot run without
    ///
    /// The domain id is checked last, so an error about it means every other
    /// setting is valid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.apm.limit == 0 {
            return Err(ConfigError::Invalid("apm.limit must be positive".to_string()));
        }
        if self.apm.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "apm.request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.apm.time_window_start_ms > self.apm.time_window_end_ms {
            return Err(ConfigError::Invalid(
                "apm.time_window_start_ms is after apm.time_window_end_ms".to_string(),
            ));
        }
        self.time_window()?;
        if self.apm.domain_id.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "apm domain id is not set (apm.domain_id or apm_domain_id)".to_string(),
            ));
        }
        Ok(())
    }

    /// Span start-time window for outbound queries
    pub fn time_window(&self) -> Result<TimeWindow, ConfigError> {
        TimeWindow::from_millis(self.apm.time_window_start_ms, self.apm.time_window_end_ms)
            .ok_or_else(|| ConfigError::Invalid("apm time window is out of range".to_string()))
    }

    /// Settings for the querier
    pub fn query_settings(&self) -> Result<QuerySettings, ConfigError> {
        Ok(QuerySettings {
            domain_id: self.apm.domain_id.clone(),
            limit: self.apm.limit,
            time_window: self.time_window()?,
        })
    }

    /// Settings for the APM traces client
    pub fn client_config(&self) -> ApmTracesConfig {
        ApmTracesConfig {
            base_url: self.apm.endpoint.clone(),
            api_version: self.apm.api_version.clone(),
            request_timeout_ms: self.apm.request_timeout_secs.saturating_mul(1000),
            auth_token: self.apm.auth_token.clone(),
        }
    }

    /// Settings for the HTTP server
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.api.host.clone(),
            port: self.api.port,
        }
    }

    /// Named queries from the `[queries]` table
    pub fn saved_queries(&self) -> StaticProvider {
        StaticProvider::new(self.queries.clone())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# APM Querier Configuration
#
# Environment variables override these settings:
# - apm_domain_id (or APM_QUERIER_DOMAIN_ID)
# - APM_QUERIER_ENDPOINT
# - APM_QUERIER_AUTH_TOKEN
# - APM_QUERIER_LIMIT
# - APM_QUERIER_HOST
# - APM_QUERIER_PORT
# - APM_QUERIER_LOG_LEVEL
# - APM_QUERIER_LOG_FORMAT

[api]
# Function host
host = "0.0.0.0"

# Function port
port = 8080

[apm]
# APM domain to query
domain_id = ""

# APM traces endpoint (or a signing proxy in front of it)
endpoint = "http://localhost:8090"

# API version path segment
api_version = "20200630"

# Rows fetched per query
limit = 900

# Query request timeout in seconds
request_timeout_secs = 60

# Span start-time window (ms since epoch). Both default to the epoch.
time_window_start_ms = 0
time_window_end_ms = 0

[queries]
# Named queries, selected with ?configuration_name=<name>.
# Names not found here are looked up in the process environment.
# slow_traces = "show traces where TraceDuration > 1000"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ConfigProvider;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.port, 8080);
        assert_eq!(config.apm.limit, 900);
        assert_eq!(config.apm.api_version, "20200630");
        assert_eq!(config.time_window().unwrap(), TimeWindow::unix_epoch());
        assert!(!config.logging.is_json());
    }

    #[test]
    fn test_default_config_parses() {
        let config = Config::from_toml(&generate_default_config()).unwrap();
        assert_eq!(config.apm.limit, 900);
        assert!(config.queries.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[apm]
domain_id = "ocid1.apmdomain.test"
limit = 50

[queries]
slow = "show traces where TraceDuration > 1000"

[logging]
format = "json"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.apm.domain_id, "ocid1.apmdomain.test");
        assert_eq!(config.apm.limit, 50);
        assert_eq!(config.apm.endpoint, "http://localhost:8090");
        assert!(config.logging.is_json());
        assert_eq!(
            config.saved_queries().get("slow").as_deref(),
            Some("show traces where TraceDuration > 1000")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/apm-querier.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[apm\nlimit = ").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref path, .. } if path == file.path()));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("apm_domain_id", "ocid1.apmdomain.env"),
            ("APM_QUERIER_DOMAIN_ID", "ignored"),
            ("APM_QUERIER_PORT", "9000"),
            ("APM_QUERIER_LIMIT", "not-a-number"),
            ("APM_QUERIER_AUTH_TOKEN", "secret"),
        ]);

        let mut config = Config::default();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.apm.domain_id, "ocid1.apmdomain.env");
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.apm.limit, 900);
        assert_eq!(config.client_config().auth_token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_validate_requires_domain() {
        let err = Config::default().validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_derived_settings() {
        let mut config = Config::default();
        config.apm.domain_id = "ocid1.apmdomain.test".to_string();
        config.apm.request_timeout_secs = 5;

        let settings = config.query_settings().unwrap();
        assert_eq!(settings.domain_id, "ocid1.apmdomain.test");
        assert_eq!(settings.limit, 900);
        assert_eq!(config.client_config().request_timeout_ms, 5000);
        assert_eq!(config.server_config().addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_client_timeout_saturates() {
        let mut config = Config::default();
        config.apm.request_timeout_secs = u64::MAX;
        assert_eq!(config.client_config().request_timeout_ms, u64::MAX);
    }

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.apm.domain_id = "ocid1.apmdomain.test".to_string();
        config
    }

    #[test]
    fn test_validate_rejects_reversed_window() {
        let mut config = valid_config();
        config.apm.time_window_start_ms = 1_700_000_060_000;
        config.apm.time_window_end_ms = 1_700_000_000_000;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.apm.time_window_end_ms = config.apm.time_window_start_ms;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = valid_config();
        config.apm.request_timeout_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_reports_other_errors_before_missing_domain() {
        let mut config = Config::default();
        config.apm.limit = 0;
        match config.validate() {
            Err(ConfigError::Invalid(msg)) => assert!(msg.contains("apm.limit"), "{}", msg),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_find_file_takes_first_existing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let second = dir.path().join("second.toml");
        let third = dir.path().join("third.toml");
        std::fs::write(&second, "").unwrap();
        std::fs::write(&third, "").unwrap();

        assert_eq!(
            Config::find_file(&[missing.clone(), second.clone(), third]),
            Some(second)
        );
        assert_eq!(Config::find_file(&[missing]), None);
    }

    #[test]
    fn test_load_from_broken_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[queries]\nslow = \"unterminated\n").unwrap();

        let err = Config::load_from(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_from_file_keeps_queries() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[queries]\nslow = \"show traces\"\n").unwrap();

        let config = Config::load_from(Some(file.path())).unwrap();
        assert_eq!(config.saved_queries().get("slow").as_deref(), Some("show traces"));
    }
}
