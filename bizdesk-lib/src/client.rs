//! Main BizdeskClient

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::auth::StaticTokenProvider;
use crate::auth::TokenProvider;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::error::Error;
use crate::retry::RetryConfig;

/// The client for the hosted backend: tables, RPC, storage, and auth.
///
/// This client is cheap to clone (uses `Arc` internally) and can be shared
/// across tasks safely.
///
/// # Example
///
/// ```ignore
/// use bizdesk_lib::BizdeskClient;
///
/// let client = BizdeskClient::builder()
///     .url("https://project.example.co")
///     .api_key("anon-key")
///     .build()?;
///
/// let bills = client.select_rows("bills", &Query::new()).await?;
/// ```
#[derive(Clone)]
pub struct BizdeskClient {
    pub(crate) inner: Arc<BizdeskClientInner>,
}

pub(crate) struct BizdeskClientInner {
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) token_provider: Arc<dyn TokenProvider>,
    pub(crate) http_client: Client,
    pub(crate) timeout: Option<Duration>,
    pub(crate) retry_config: RetryConfig,
}

impl BizdeskClient {
    /// Creates a new builder for constructing a client.
    pub fn builder() -> BizdeskClientBuilder<Missing, Missing> {
        BizdeskClientBuilder::new()
    }

    /// Builds a client from a loaded [`ClientConfig`].
    pub fn from_config(config: &ClientConfig) -> Result<Self, Error> {
        let mut builder = Self::builder()
            .url(config.url.clone())
            .api_key(config.api_key.clone())
            .retry(config.retry.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }

    /// Returns the base URL of the backend project.
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Returns the transport-level retry configuration.
    pub fn retry_config(&self) -> &RetryConfig {
        &self.inner.retry_config
    }
}

// =============================================================================
// Typestate Builder
// =============================================================================

/// Marker type for missing required builder fields.
pub struct Missing;

/// Marker type for set builder fields.
pub struct Set<T>(T);

/// Builder for constructing a [`BizdeskClient`].
///
/// Uses the typestate pattern to ensure required fields are set at compile time.
///
/// # Required Fields
///
/// - `url` - The backend project URL
/// - `api_key` - The project's public (anon) key
///
/// Without a [`TokenProvider`] the API key is also used as the bearer token,
/// which gives anonymous access subject to row-level security.
pub struct BizdeskClientBuilder<Url, Key> {
    url: Url,
    api_key: Key,
    token_provider: Option<Arc<dyn TokenProvider>>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    retry_config: RetryConfig,
    http_client: Option<Client>,
}

impl BizdeskClientBuilder<Missing, Missing> {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            url: Missing,
            api_key: Missing,
            token_provider: None,
            timeout: None,
            connect_timeout: None,
            retry_config: RetryConfig::default(),
            http_client: None,
        }
    }
}

impl Default for BizdeskClientBuilder<Missing, Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> BizdeskClientBuilder<Missing, K> {
    /// Sets the backend project URL.
    pub fn url(self, url: impl Into<String>) -> BizdeskClientBuilder<Set<String>, K> {
        BizdeskClientBuilder {
            url: Set(url.into()),
            api_key: self.api_key,
            token_provider: self.token_provider,
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            retry_config: self.retry_config,
            http_client: self.http_client,
        }
    }
}

impl<U> BizdeskClientBuilder<U, Missing> {
    /// Sets the project's API key, sent as the `apikey` header.
    pub fn api_key(self, key: impl Into<String>) -> BizdeskClientBuilder<U, Set<String>> {
        BizdeskClientBuilder {
            url: self.url,
            api_key: Set(key.into()),
            token_provider: self.token_provider,
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            retry_config: self.retry_config,
            http_client: self.http_client,
        }
    }
}

impl<U, K> BizdeskClientBuilder<U, K> {
    /// Sets the token provider for signed-in access.
    pub fn token_provider<T: TokenProvider + 'static>(mut self, provider: T) -> Self {
        self.token_provider = Some(Arc::new(provider));
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connection timeout.
    ///
    /// This is applied when building the HTTP client.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the transport-level retry policy.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Sets a custom HTTP client.
    ///
    /// If not set, a default client will be created.
    pub fn http_client(mut self, client: Client) -> Self {
        self.http_client = Some(client);
        self
    }
}

impl BizdeskClientBuilder<Set<String>, Set<String>> {
    /// Builds the [`BizdeskClient`].
    ///
    /// This method is only available when both `url` and `api_key` have been set.
    pub fn build(self) -> Result<BizdeskClient, Error> {
        let base_url = self.url.0.trim_end_matches('/').to_string();
        url::Url::parse(&base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => {
                let mut builder = Client::builder();
                if let Some(timeout) = self.connect_timeout {
                    builder = builder.connect_timeout(timeout);
                }
                builder.build().map_err(ApiError::from)?
            }
        };

        let api_key = self.api_key.0;
        let token_provider = self
            .token_provider
            .unwrap_or_else(|| Arc::new(StaticTokenProvider::new(api_key.clone())));

        Ok(BizdeskClient {
            inner: Arc::new(BizdeskClientInner {
                base_url,
                api_key,
                token_provider,
                http_client,
                timeout: self.timeout,
                retry_config: self.retry_config,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_trims_trailing_slash() {
        let client = BizdeskClient::builder()
            .url("https://project.example.co/")
            .api_key("anon")
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "https://project.example.co");
    }

    #[test]
    fn test_build_rejects_invalid_url() {
        let result = BizdeskClient::builder().url("not a url").api_key("anon").build();
        assert!(matches!(result, Err(Error::Api(ApiError::InvalidUrl(_)))));
    }
}
