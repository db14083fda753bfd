//! Storefront client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `APPAREL_API_URL` - Base URL of the backend API (e.g. `https://api.example.in`)
//!
//! ## Optional
//! - `APPAREL_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `APPAREL_PAGE_SIZE` - Products per catalog page (default: 6)
//! - `APPAREL_POLL_INTERVAL_SECS` - Order tracking / dashboard poll interval (default: 15)
//! - `APPAREL_STATE_DIR` - Directory for the local key/value cache (default: `.apparel`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PAGE_SIZE: u32 = 6;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;
const DEFAULT_STATE_DIR: &str = ".apparel";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend API base URL
    pub api_url: Url,
    /// Timeout applied to every backend request
    pub request_timeout: Duration,
    /// Catalog page size
    pub page_size: u32,
    /// Interval for background polling loops
    pub poll_interval: Duration,
    /// Directory holding the local key/value cache
    pub state_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production", "staging")
    pub sentry_environment: Option<String>,
}

impl StorefrontConfig {
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

        let api_url = parse_api_url(&get_required_env("APPAREL_API_URL")?)?;
        let request_timeout = Duration::from_secs(require_nonzero(
            "APPAREL_REQUEST_TIMEOUT_SECS",
            get_parsed_or_default("APPAREL_REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
        )?);
        let page_size = require_nonzero(
            "APPAREL_PAGE_SIZE",
            get_parsed_or_default("APPAREL_PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
        )?;
        let poll_interval = Duration::from_secs(require_nonzero(
            "APPAREL_POLL_INTERVAL_SECS",
            get_parsed_or_default("APPAREL_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?,
        )?);
        let state_dir = PathBuf::from(get_env_or_default("APPAREL_STATE_DIR", DEFAULT_STATE_DIR));

        Ok(Self {
            api_url,
            request_timeout,
            page_size,
            poll_interval,
            state_dir,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Configuration pointing at `api_url` with every other value defaulted.
    #[must_use]
    pub fn with_api_url(api_url: Url) -> Self {
        Self {
            api_url,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            page_size: DEFAULT_PAGE_SIZE,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse and check the backend base URL.
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar("APPAREL_API_URL".to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "APPAREL_API_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an optional environment variable, falling back to `default`.
fn get_parsed_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

/// Reject a zero count or duration.
fn require_nonzero<T>(key: &str, value: T) -> Result<T, ConfigError>
where
    T: PartialEq + Default,
{
    if value == T::default() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be at least 1".to_string(),
        ));
    }
    Ok(value)
}
