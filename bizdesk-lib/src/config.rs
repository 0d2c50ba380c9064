//! Client configuration loaded from the environment

use std::env;
use std::time::Duration;

use crate::error::Error;
use crate::retry::RetryConfig;

/// Environment variable holding the backend project URL.
pub const URL_VAR: &str = "BIZDESK_URL";
/// Environment variable holding the project's anon key.
pub const API_KEY_VAR: &str = "BIZDESK_ANON_KEY";
/// Optional request timeout in seconds.
pub const TIMEOUT_VAR: &str = "BIZDESK_TIMEOUT_SECS";

/// Connection settings for [`BizdeskClient`](crate::BizdeskClient).
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use bizdesk_lib::config::ClientConfig;
///
/// let config = ClientConfig::new("https://project.example.co", "anon-key")
///     .with_timeout(Duration::from_secs(20));
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend project URL.
    pub url: String,
    /// Public (anon) API key.
    pub api_key: String,
    /// Per-request timeout.
    pub timeout: Option<Duration>,
    /// Transport-level retry policy.
    pub retry: RetryConfig,
}

impl ClientConfig {
    /// Creates a config with default timeout and retry settings.
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            timeout: Some(Duration::from_secs(30)),
            retry: RetryConfig::default(),
        }
    }

    /// Reads `BIZDESK_URL`, `BIZDESK_ANON_KEY` and the optional
    /// `BIZDESK_TIMEOUT_SECS` from the process environment.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads from any lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::InvalidOperation(format!("{} is not set", name)))
        };

        let mut config = Self::new(required(URL_VAR)?, required(API_KEY_VAR)?);

        if let Some(raw) = lookup(TIMEOUT_VAR) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                Error::InvalidOperation(format!("{} must be a whole number of seconds", TIMEOUT_VAR))
            })?;
            config.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}
