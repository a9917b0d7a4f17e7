//! Cart client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BAZAAR_API_URL` - Base URL of the cart service (e.g., `https://api.example.com/`)
//!
//! ## Optional
//! - `BAZAAR_API_TOKEN` - Bearer token for the customer session
//! - `BAZAAR_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `BAZAAR_ERROR_WINDOW_SECS` - How long item errors stay visible (default: 5)
//! - `BAZAAR_VENDOR_CACHE_TTL_SECS` - Vendor lookup cache TTL (default: 300)

use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Cart client configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct CartConfig {
    /// Base URL of the cart service. Paths such as `cart` and `vendors/{id}`
    /// are joined onto it.
    pub api_url: Url,
    /// Bearer token identifying the customer session, if signed in.
    pub api_token: Option<SecretString>,
    /// Timeout applied to every request.
    pub request_timeout: Duration,
    /// How long a failed mutation stays on the error surface.
    pub error_window: Duration,
    /// Time-to-live of cached vendor lookups.
    pub vendor_cache_ttl: Duration,
}

impl std::fmt::Debug for CartConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartConfig")
            .field("api_url", &self.api_url.as_str())
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout", &self.request_timeout)
            .field("error_window", &self.error_window)
            .field("vendor_cache_ttl", &self.vendor_cache_ttl)
            .finish()
    }
}

impl CartConfig {
    /// Default per-request timeout.
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    /// Default lifetime of an item error.
    pub const DEFAULT_ERROR_WINDOW: Duration = Duration::from_secs(5);
    /// Default vendor cache TTL.
    pub const DEFAULT_VENDOR_CACHE_TTL: Duration = Duration::from_secs(300);

    /// Configuration for `api_url` with every optional setting at its default.
    #[must_use]
    pub const fn new(api_url: Url) -> Self {
        Self {
            api_url,
            api_token: None,
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            error_window: Self::DEFAULT_ERROR_WINDOW,
            vendor_cache_ttl: Self::DEFAULT_VENDOR_CACHE_TTL,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid, or
    /// if the API token looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_api_url(&get_required_env("BAZAAR_API_URL")?)?;
        let api_token = get_optional_env("BAZAAR_API_TOKEN")
            .map(|token| {
                validate_token(&token, "BAZAAR_API_TOKEN")?;
                Ok::<_, ConfigError>(SecretString::from(token))
            })
            .transpose()?;

        Ok(Self {
            api_url,
            api_token,
            request_timeout: get_secs_or_default(
                "BAZAAR_REQUEST_TIMEOUT_SECS",
                Self::DEFAULT_REQUEST_TIMEOUT,
            )?,
            error_window: get_secs_or_default(
                "BAZAAR_ERROR_WINDOW_SECS",
                Self::DEFAULT_ERROR_WINDOW,
            )?,
            vendor_cache_ttl: get_secs_or_default(
                "BAZAAR_VENDOR_CACHE_TTL_SECS",
                Self::DEFAULT_VENDOR_CACHE_TTL,
            )?,
        })
    }

    /// The bearer token value, if configured.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.api_token.as_ref().map(|token| token.expose_secret())
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating an empty value as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Get a duration in whole seconds with a default value.
fn get_secs_or_default(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |value| parse_secs(key, &value))
}

fn parse_secs(key: &str, value: &str) -> Result<Duration, ConfigError> {
    u64::from_str(value.trim())
        .map(Duration::from_secs)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse the API base URL, making sure it ends with a slash so relative
/// paths join under it instead of replacing its last segment.
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar("BAZAAR_API_URL".to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            "BAZAAR_API_URL".to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Reject tokens that are obviously placeholders.
fn validate_token(token: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = token.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}
