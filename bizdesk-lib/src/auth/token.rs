//! Session tokens and the provider trait the client pulls them from

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::error::AuthError;

/// Bearer credentials for one request.
///
/// Anonymous access uses the project's anon key as the token, with no expiry
/// and no user. A signed-in session carries the user's JWT, its expiry, the
/// refresh token and the user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub refresh_token: Option<String>,
    /// Id of the signed-in user, when the token belongs to a session.
    pub user_id: Option<Uuid>,
}

impl AccessToken {
    /// A token that never expires and cannot be refreshed.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: None,
            refresh_token: None,
            user_id: None,
        }
    }

    /// A session token that can be refreshed.
    pub fn with_refresh(
        access_token: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            expires_at,
            refresh_token: Some(refresh_token.into()),
            ..Self::new(access_token)
        }
    }

    pub fn for_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// True for the anon key and other tokens without a user.
    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_none()
    }

    /// Tokens without a known expiry never count as expired.
    pub fn is_expired(&self) -> bool {
        self.expires_within(chrono::Duration::zero())
    }

    /// Whether the token expires before `now + window`.
    pub fn expires_within(&self, window: chrono::Duration) -> bool {
        match self.expires_at {
            Some(at) => Utc::now() + window >= at,
            None => false,
        }
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }
}

/// Source of bearer tokens, asked before every request.
///
/// Implementations cache what they can; the client does not.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn get_token(&self, base_url: &str) -> Result<AccessToken, AuthError>;
}

/// Hands out one fixed token. The client falls back to this with the anon
/// key when no provider is configured.
///
/// ```
/// use bizdesk_lib::auth::StaticTokenProvider;
///
/// let provider = StaticTokenProvider::new("anon-key");
/// ```
#[derive(Debug, Clone)]
pub struct StaticTokenProvider(AccessToken);

impl StaticTokenProvider {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self(AccessToken::new(access_token))
    }
}

impl From<AccessToken> for StaticTokenProvider {
    fn from(token: AccessToken) -> Self {
        Self(token)
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_token(&self, _base_url: &str) -> Result<AccessToken, AuthError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_anon_token_never_expires() {
        let token = AccessToken::new("anon");
        assert!(token.is_anonymous());
        assert!(!token.is_expired());
        assert!(!token.expires_within(Duration::days(365)));
        assert!(!token.can_refresh());
    }

    #[test]
    fn test_session_token_expiry() {
        let user = Uuid::from_u128(7);
        let token = AccessToken::with_refresh("jwt", Some(Utc::now() + Duration::minutes(5)), "r").for_user(user);

        assert!(!token.is_anonymous());
        assert!(!token.is_expired());
        assert!(token.expires_within(Duration::minutes(10)));
        assert!(!token.expires_within(Duration::minutes(1)));

        let stale = AccessToken::with_refresh("jwt", Some(Utc::now() - Duration::seconds(1)), "r");
        assert!(stale.is_expired());
    }

    #[tokio::test]
    async fn test_static_provider_returns_its_token() {
        let provider = StaticTokenProvider::from(AccessToken::new("anon").for_user(Uuid::nil()));
        let token = provider.get_token("https://x.example.co").await.unwrap();
        assert_eq!(token.access_token, "anon");
        assert_eq!(token.user_id, Some(Uuid::nil()));
    }
}
