//! Email/password sign-in against the backend's auth service

use async_trait::async_trait;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::AccessToken;
use super::auto_refresh::AuthFlow;
use crate::error::AuthError;
use crate::error::BackendErrorDetail;

/// Signs a user in with email and password and refreshes the session.
///
/// # Example
///
/// ```ignore
/// use bizdesk_lib::auth::{AutoRefreshTokenProvider, PasswordFlow};
///
/// let flow = PasswordFlow::new("anon-key", "user@example.com", "secret");
/// let provider = AutoRefreshTokenProvider::new(flow);
/// ```
#[derive(Debug, Clone)]
pub struct PasswordFlow {
    api_key: String,
    email: String,
    password: String,
    http_client: reqwest::Client,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    #[serde(default)]
    user: Option<SessionUser>,
}

#[derive(Deserialize)]
struct SessionUser {
    id: Uuid,
}

impl TokenResponse {
    fn into_access_token(self) -> AccessToken {
        let expires_at = self
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
        AccessToken {
            access_token: self.access_token,
            expires_at,
            refresh_token: self.refresh_token,
            user_id: self.user.map(|u| u.id),
        }
    }
}

impl PasswordFlow {
    /// Creates a new password flow.
    pub fn new(api_key: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            email: email.into(),
            password: password.into(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Uses a custom HTTP client.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = client;
        self
    }

    fn token_url(base_url: &str, grant_type: &str) -> String {
        format!(
            "{}/auth/v1/token?grant_type={}",
            base_url.trim_end_matches('/'),
            grant_type
        )
    }

    async fn post_token(&self, url: &str, body: serde_json::Value) -> Result<AccessToken, AuthError> {
        let response = self
            .http_client
            .post(url)
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let token: TokenResponse = response
                .json()
                .await
                .map_err(|e| AuthError::Parse(e.to_string()))?;
            return Ok(token.into_access_token());
        }

        let body = response.text().await.unwrap_or_default();
        Err(map_error_response(status.as_u16(), &body))
    }
}

#[async_trait]
impl AuthFlow for PasswordFlow {
    async fn authenticate(&self, base_url: &str) -> Result<AccessToken, AuthError> {
        let url = Self::token_url(base_url, "password");
        self.post_token(
            &url,
            json!({ "email": self.email, "password": self.password }),
        )
        .await
    }

    async fn refresh(&self, base_url: &str, refresh_token: &str) -> Result<AccessToken, AuthError> {
        let url = Self::token_url(base_url, "refresh_token");
        self.post_token(&url, json!({ "refresh_token": refresh_token }))
            .await
            .map_err(|e| AuthError::TokenExpired {
                message: e.to_string(),
            })
    }
}

pub(crate) fn map_error_response(status: u16, body: &str) -> AuthError {
    let detail = BackendErrorDetail::parse(body);
    let is_grant_error = detail
        .as_ref()
        .is_some_and(|d| d.has_code("invalid_grant") || d.has_code("invalid_credentials"));

    if status == 400 && is_grant_error {
        return AuthError::InvalidCredentials;
    }

    AuthError::Rejected {
        status,
        message: detail.map(|d| d.message).unwrap_or_else(|| body.to_string()),
    }
}
