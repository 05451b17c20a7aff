//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//!
//! ## Optional
//! - `ORDERHUB_HOST` - Bind address (default: 127.0.0.1)
//! - `ORDERHUB_PORT` - Listen port (default: 3000)
//! - `SEARCH_ENABLE` - Route listing reads through the search index (default: false)
//! - `SEARCH_URL` - Search index base URL (required when `SEARCH_ENABLE` is true)
//! - `SEARCH_USERNAME` / `SEARCH_PASSWORD` - Basic auth for the search index
//! - `SEARCH_ORDERS_INDEX` - Index name for order documents (default: orders)
//! - `SEARCH_MAX_RESULT_WINDOW` - Deep-paging ceiling of the index (default: 50000)
//! - `SEARCH_LOOKBACK_DAYS` - Default creation-date range width (default: 60)
//! - `ACCOUNT_SCOPE_UNRESTRICTED` - Disable per-request account scoping (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_MAX_RESULT_WINDOW: i64 = 50_000;
const DEFAULT_LOOKBACK_DAYS: u64 = 60;
const DEFAULT_ORDERS_INDEX: &str = "orders";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Orderhub server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Search index configuration; `None` keeps all listing reads relational
    pub search: Option<SearchConfig>,
    /// Deep-paging ceiling of the search index (`offset + size`)
    pub max_result_window: i64,
    /// Default creation-date range width in days
    pub lookback_days: u64,
    /// When true, ignore the per-request account scope header
    pub account_scope_unrestricted: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Search index connection settings.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct SearchConfig {
    /// Base URL of the search index REST API
    pub url: String,
    /// Basic auth username
    pub username: String,
    /// Basic auth password
    pub password: SecretString,
    /// Name of the orders index
    pub orders_index: String,
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("orders_index", &self.orders_index)
            .finish()
    }
}

impl SearchConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        if !get_bool_env("SEARCH_ENABLE")? {
            return Ok(None);
        }
        Ok(Some(Self {
            url: get_required_env("SEARCH_URL")?,
            username: get_env_or_default("SEARCH_USERNAME", ""),
            password: SecretString::from(get_env_or_default("SEARCH_PASSWORD", "")),
            orders_index: get_env_or_default("SEARCH_ORDERS_INDEX", DEFAULT_ORDERS_INDEX),
        }))
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = SecretString::from(get_required_env("DATABASE_URL")?);
        let host = get_env_or_default("ORDERHUB_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ORDERHUB_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("ORDERHUB_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("ORDERHUB_PORT".to_string(), e.to_string()))?;

        let search = SearchConfig::from_env()?;
        let max_result_window = get_parsed_env("SEARCH_MAX_RESULT_WINDOW", DEFAULT_MAX_RESULT_WINDOW)?;
        let lookback_days = get_parsed_env("SEARCH_LOOKBACK_DAYS", DEFAULT_LOOKBACK_DAYS)?;
        let account_scope_unrestricted = get_bool_env("ACCOUNT_SCOPE_UNRESTRICTED")?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            database_url,
            host,
            port,
            search,
            max_result_window,
            lookback_days,
            account_scope_unrestricted,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Returns the search configuration, if the search path is enabled.
    #[must_use]
    pub const fn search(&self) -> Option<&SearchConfig> {
        self.search.as_ref()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an environment variable parsed into `T`, with a default when unset.
fn get_parsed_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Get a boolean flag; accepts `true`/`false`/`1`/`0`, defaults to false.
fn get_bool_env(key: &str) -> Result<bool, ConfigError> {
    match std::env::var(key).ok().as_deref() {
        None | Some("") => Ok(false),
        Some("true" | "1") => Ok(true),
        Some("false" | "0") => Ok(false),
        Some(other) => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected true/false, got '{other}'"),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            search: None,
            max_result_window: DEFAULT_MAX_RESULT_WINDOW,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            account_scope_unrestricted: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_search_config_debug_redacts_password() {
        let config = SearchConfig {
            url: "http://localhost:9200".to_string(),
            username: "orderhub".to_string(),
            password: SecretString::from("super_secret_search_password"),
            orders_index: "orders".to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("http://localhost:9200"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_search_password"));
    }
}
