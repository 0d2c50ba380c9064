//! Automatic token refresh handling.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use log::warn;
use tokio::sync::RwLock;

use super::AccessToken;
use super::TokenProvider;
use crate::error::AuthError;

/// Trait for authentication flows that support token refresh.
#[async_trait]
pub trait AuthFlow: Send + Sync {
    /// Authenticates and obtains a new access token.
    async fn authenticate(&self, base_url: &str) -> Result<AccessToken, AuthError>;

    /// Refreshes an access token using a refresh token.
    async fn refresh(&self, base_url: &str, refresh_token: &str) -> Result<AccessToken, AuthError>;
}

/// A token provider that caches the session and refreshes it before expiry.
///
/// - Returns the cached token while it is valid
/// - Refreshes with the refresh token when it is expiring
/// - Falls back to full sign-in if the refresh fails
pub struct AutoRefreshTokenProvider<F> {
    flow: F,
    token: RwLock<Option<AccessToken>>,
    refresh_buffer: Duration,
}

impl<F: AuthFlow> AutoRefreshTokenProvider<F> {
    /// Creates a provider that refreshes 60 seconds before expiry.
    pub fn new(flow: F) -> Self {
        Self::with_refresh_buffer(flow, Duration::from_secs(60))
    }

    /// Creates a provider with a custom refresh buffer.
    pub fn with_refresh_buffer(flow: F, refresh_buffer: Duration) -> Self {
        Self {
            flow,
            token: RwLock::new(None),
            refresh_buffer,
        }
    }

    /// Clears the cached session (sign out).
    pub async fn clear_token(&self) {
        let mut token = self.token.write().await;
        *token = None;
    }

    fn is_fresh(&self, token: &AccessToken) -> bool {
        let buffer =
            chrono::Duration::from_std(self.refresh_buffer).unwrap_or(chrono::Duration::zero());
        !token.expires_within(buffer)
    }
}

#[async_trait]
impl<F: AuthFlow> TokenProvider for AutoRefreshTokenProvider<F> {
    async fn get_token(&self, base_url: &str) -> Result<AccessToken, AuthError> {
        {
            let guard = self.token.read().await;
            if let Some(token) = guard.as_ref().filter(|t| self.is_fresh(t)) {
                return Ok(token.clone());
            }
        }

        let mut guard = self.token.write().await;

        // Another task may have refreshed while we waited for the lock.
        if let Some(token) = guard.as_ref().filter(|t| self.is_fresh(t)) {
            return Ok(token.clone());
        }

        let refresh_token = guard.as_ref().and_then(|t| t.refresh_token.clone());
        let new_token = match refresh_token {
            Some(refresh_token) => match self.flow.refresh(base_url, &refresh_token).await {
                Ok(token) => {
                    debug!("session refreshed");
                    token
                }
                Err(e) => {
                    warn!("session refresh failed, signing in again: {}", e);
                    self.flow.authenticate(base_url).await?
                }
            },
            None => self.flow.authenticate(base_url).await?,
        };

        *guard = Some(new_token.clone());
        Ok(new_token)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;
    use std::sync::atomic::Ordering;

    use chrono::Utc;

    use super::*;

    struct CountingFlow {
        sign_ins: AtomicU32,
        refreshes: AtomicU32,
        lifetime: chrono::Duration,
    }

    #[async_trait]
    impl AuthFlow for CountingFlow {
        async fn authenticate(&self, _base_url: &str) -> Result<AccessToken, AuthError> {
            let n = self.sign_ins.fetch_add(1, Ordering::SeqCst);
            Ok(AccessToken::with_refresh(
                format!("token-{n}"),
                Some(Utc::now() + self.lifetime),
                "refresh",
            ))
        }

        async fn refresh(&self, _base_url: &str, _refresh_token: &str) -> Result<AccessToken, AuthError> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            Ok(AccessToken::with_refresh(
                "refreshed",
                Some(Utc::now() + chrono::Duration::hours(1)),
                "refresh",
            ))
        }
    }

    #[tokio::test]
    async fn test_caches_fresh_token() {
        let provider = AutoRefreshTokenProvider::new(CountingFlow {
            sign_ins: AtomicU32::new(0),
            refreshes: AtomicU32::new(0),
            lifetime: chrono::Duration::hours(1),
        });

        let first = provider.get_token("https://x").await.unwrap();
        let second = provider.get_token("https://x").await.unwrap();

        assert_eq!(first.access_token, second.access_token);
        assert_eq!(provider.flow.sign_ins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refreshes_expiring_token() {
        let provider = AutoRefreshTokenProvider::new(CountingFlow {
            sign_ins: AtomicU32::new(0),
            refreshes: AtomicU32::new(0),
            // Inside the 60 second buffer, so the next call must refresh.
            lifetime: chrono::Duration::seconds(10),
        });

        provider.get_token("https://x").await.unwrap();
        let token = provider.get_token("https://x").await.unwrap();

        assert_eq!(token.access_token, "refreshed");
        assert_eq!(provider.flow.refreshes.load(Ordering::SeqCst), 1);
    }
}
