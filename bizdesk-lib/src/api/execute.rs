//! Request execution
//!
//! URL construction, default headers, and the retrying request loop shared by
//! every backend call.

use std::time::Duration;

use log::debug;
use log::warn;
use reqwest::Method;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use serde::de::DeserializeOwned;

use crate::BizdeskClient;
use crate::error::ApiError;
use crate::error::Error;

impl BizdeskClient {
    pub(crate) fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.inner.base_url, path.trim_start_matches('/'))
    }

    pub(crate) fn storage_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/{}",
            self.inner.base_url,
            path.trim_start_matches('/')
        )
    }

    pub(crate) fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.inner.base_url, path.trim_start_matches('/'))
    }

    pub(crate) fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(key) = HeaderValue::from_str(&self.inner.api_key) {
            headers.insert("apikey", key);
        }
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        headers
    }

    /// Makes an HTTP request with retry logic.
    ///
    /// This is the low-level request method used by all backend operations.
    /// Non-success responses are turned into [`ApiError::Http`] with the
    /// backend's error body parsed when possible.
    pub(crate) async fn request(
        &self,
        method: Method,
        url: &str,
        headers: Option<HeaderMap>,
        body: Option<Vec<u8>>,
    ) -> Result<reqwest::Response, Error> {
        let headers = headers.unwrap_or_else(|| self.default_headers());
        let retry_config = &self.inner.retry_config;
        let mut attempts = 0;
        let mut delay = retry_config.initial_delay;

        loop {
            debug!("{} {}", method, url);
            let result = self
                .send_request_inner(method.clone(), url, headers.clone(), body.clone())
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();

                    if status.as_u16() == 429 {
                        if !retry_config.retry_on_429 || attempts >= retry_config.max_retries {
                            let retry_after = parse_retry_after(&response);
                            return Err(Error::RateLimit { retry_after });
                        }

                        let wait = parse_retry_after(&response).unwrap_or(delay);
                        warn!("{} {} rate limited, retrying in {:?}", method, url, wait);
                        tokio::time::sleep(wait).await;
                        attempts += 1;
                        continue;
                    }

                    if status.is_server_error() {
                        if !retry_config.retry_on_5xx || attempts >= retry_config.max_retries {
                            let body = response.text().await.unwrap_or_default();
                            return Err(Error::Api(ApiError::from_body(status.as_u16(), &body)));
                        }

                        warn!("{} {} returned {}, retrying in {:?}", method, url, status, delay);
                        tokio::time::sleep(delay).await;
                        delay = retry_config.next_delay(delay);
                        attempts += 1;
                        continue;
                    }

                    if status.is_success() {
                        return Ok(response);
                    }

                    let body = response.text().await.unwrap_or_default();
                    return Err(Error::Api(ApiError::from_body(status.as_u16(), &body)));
                }
                Err(e) => {
                    let transient = matches!(
                        &e,
                        Error::Api(ApiError::Network(_)) | Error::Api(ApiError::Timeout(_))
                    );

                    if transient
                        && retry_config.retry_on_network
                        && attempts < retry_config.max_retries
                    {
                        warn!("{} {} failed ({}), retrying in {:?}", method, url, e, delay);
                        tokio::time::sleep(delay).await;
                        delay = retry_config.next_delay(delay);
                        attempts += 1;
                        continue;
                    }

                    return Err(e);
                }
            }
        }
    }

    /// Inner request method without retry logic.
    async fn send_request_inner(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Option<Vec<u8>>,
    ) -> Result<reqwest::Response, Error> {
        let token = self
            .inner
            .token_provider
            .get_token(&self.inner.base_url)
            .await?;

        let mut request = self
            .inner
            .http_client
            .request(method, url)
            .headers(headers)
            .bearer_auth(&token.access_token);

        if let Some(timeout) = self.inner.timeout {
            request = request.timeout(timeout);
        }

        if let Some(body) = body {
            request = request.body(body);
        }

        request.send().await.map_err(|e| {
            match (e.is_timeout(), self.inner.timeout) {
                (true, Some(timeout)) => Error::Api(ApiError::Timeout(timeout)),
                _ => Error::Api(ApiError::from(e)),
            }
        })
    }
}

/// Reads a JSON body, keeping the raw text on parse failure.
pub(crate) async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, Error> {
    let text = response.text().await.map_err(ApiError::from)?;
    serde_json::from_str(&text).map_err(|e| Error::Api(ApiError::parse_with_body(e.to_string(), text)))
}

/// Serializes a request body.
pub(crate) fn to_body<T: serde::Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, Error> {
    Ok(serde_json::to_vec(value)?)
}

/// Parses the Retry-After header value (seconds).
fn parse_retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get("Retry-After")?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
