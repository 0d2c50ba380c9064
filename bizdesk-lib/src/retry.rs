//! Retry configuration for automatic request retry.

use std::future::Future;
use std::time::Duration;

use log::warn;

use crate::error::Error;

/// How the delay between attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed,
    /// Delay doubles after every retry, capped at `max_delay`.
    Exponential,
}

/// Configuration for automatic retry behavior.
///
/// Controls how the client handles transient failures such as rate limiting (429),
/// server errors (5xx), and network errors.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use bizdesk_lib::retry::RetryConfig;
///
/// // Default configuration
/// let config = RetryConfig::default();
///
/// // Three attempts in total, one second apart
/// let fixed = RetryConfig::fixed(3, Duration::from_secs(1));
///
/// // Disable all retries
/// let no_retry = RetryConfig::no_retry();
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not counting the first try).
    pub max_retries: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// How the delay grows.
    pub backoff: Backoff,
    /// Whether to retry on HTTP 429 (rate limited).
    pub retry_on_429: bool,
    /// Whether to retry on HTTP 5xx (server errors).
    pub retry_on_5xx: bool,
    /// Whether to retry on network errors.
    pub retry_on_network: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff: Backoff::Exponential,
            retry_on_429: true,
            retry_on_5xx: true,
            retry_on_network: true,
        }
    }
}

impl RetryConfig {
    /// Creates a config with all retries disabled.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            retry_on_429: false,
            retry_on_5xx: false,
            retry_on_network: false,
            ..Default::default()
        }
    }

    /// Creates a fixed-delay config with `attempts` total tries.
    pub fn fixed(attempts: u32, delay: Duration) -> Self {
        Self {
            max_retries: attempts.saturating_sub(1),
            initial_delay: delay,
            max_delay: delay,
            backoff: Backoff::Fixed,
            ..Default::default()
        }
    }

    /// Sets the maximum number of retries.
    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// Sets the initial delay between retries.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enables or disables retry on HTTP 429.
    pub fn retry_on_429(mut self, enabled: bool) -> Self {
        self.retry_on_429 = enabled;
        self
    }

    /// Enables or disables retry on HTTP 5xx.
    pub fn retry_on_5xx(mut self, enabled: bool) -> Self {
        self.retry_on_5xx = enabled;
        self
    }

    /// Enables or disables retry on network errors.
    pub fn retry_on_network(mut self, enabled: bool) -> Self {
        self.retry_on_network = enabled;
        self
    }

    /// Delay to wait after a failed attempt, given the previous delay.
    pub(crate) fn next_delay(&self, current: Duration) -> Duration {
        match self.backoff {
            Backoff::Fixed => current,
            Backoff::Exponential => (current * 2).min(self.max_delay),
        }
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// runs out of attempts.
///
/// Unlike the transport-level retry inside the client, this wraps a whole
/// logical read (possibly several requests) and retries on any error that
/// [`Error::is_retryable`] accepts.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, label: &str, mut operation: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                attempt += 1;
                warn!(
                    "{} failed (attempt {}/{}): {}",
                    label,
                    attempt,
                    config.max_retries + 1,
                    e
                );
                tokio::time::sleep(delay).await;
                delay = config.next_delay(delay);
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::error::ApiError;

    #[test]
    fn test_fixed_counts_attempts() {
        let config = RetryConfig::fixed(3, Duration::from_millis(500));
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.next_delay(Duration::from_millis(500)), Duration::from_millis(500));
    }

    #[test]
    fn test_exponential_is_capped() {
        let config = RetryConfig::default().max_delay(Duration::from_secs(3));
        assert_eq!(config.next_delay(Duration::from_secs(1)), Duration::from_secs(2));
        assert_eq!(config.next_delay(Duration::from_secs(2)), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_gives_up_after_attempts() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::fixed(3, Duration::from_secs(1));

        let result: Result<(), Error> = with_retry(&config, "list users", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::Api(ApiError::http(503, "unavailable"))) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_stops_on_permanent_error() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::fixed(3, Duration::from_secs(1));

        let result: Result<(), Error> = with_retry(&config, "list users", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::Api(ApiError::http(400, "bad request"))) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_recovers() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::fixed(3, Duration::from_secs(1));

        let result = with_retry(&config, "list users", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(Error::Api(ApiError::http(502, "bad gateway")))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 1);
    }
}
