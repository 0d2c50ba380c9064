//! Signed-in user (`/auth/v1/user`)

use chrono::DateTime;
use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::execute::read_json;
use super::execute::to_body;
use crate::BizdeskClient;
use crate::error::AuthError;
use crate::error::Error;
use crate::validation;

/// The authenticated user as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

impl AuthUser {
    /// Display name from user metadata, falling back to the email.
    pub fn display_name(&self) -> Option<&str> {
        self.user_metadata
            .get("full_name")
            .or_else(|| self.user_metadata.get("name"))
            .and_then(|v| v.as_str())
            .or(self.email.as_deref())
    }
}

/// Maps 401/403 on session endpoints to [`AuthError::NoSession`].
fn session_error(e: Error) -> Error {
    match e {
        Error::Api(api) if api.is_auth_rejection() => Error::Auth(AuthError::NoSession),
        other => other,
    }
}

impl BizdeskClient {
    /// Returns the user owning the current session.
    pub async fn current_user(&self) -> Result<AuthUser, Error> {
        let url = self.auth_url("user");
        let response = self
            .request(Method::GET, &url, None, None)
            .await
            .map_err(session_error)?;
        read_json(response).await
    }

    /// Changes the current user's password.
    ///
    /// The password is checked locally before anything is sent.
    pub async fn update_password(&self, new_password: &str) -> Result<AuthUser, Error> {
        validation::validate_password("password", new_password)?;

        let url = self.auth_url("user");
        let body = to_body(&json!({ "password": new_password }))?;
        let response = self
            .request(Method::PUT, &url, None, Some(body))
            .await
            .map_err(session_error)?;
        read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    #[test]
    fn test_auth_user_parses_minimal_body() {
        let user: AuthUser = serde_json::from_str(
            r#"{"id":"7f1c1f5e-5f44-4b4e-9d43-1c3f4f6b2a10","email":"a@b.co","aud":"authenticated"}"#,
        )
        .unwrap();
        assert_eq!(user.email.as_deref(), Some("a@b.co"));
        assert_eq!(user.display_name(), Some("a@b.co"));
    }

    #[test]
    fn test_display_name_prefers_metadata() {
        let user: AuthUser = serde_json::from_str(
            r#"{"id":"7f1c1f5e-5f44-4b4e-9d43-1c3f4f6b2a10","email":"a@b.co","user_metadata":{"full_name":"Ada"}}"#,
        )
        .unwrap();
        assert_eq!(user.display_name(), Some("Ada"));
    }

    #[test]
    fn test_session_error_mapping() {
        let mapped = session_error(Error::Api(ApiError::http(401, "jwt expired")));
        assert!(matches!(mapped, Error::Auth(AuthError::NoSession)));

        let kept = session_error(Error::Api(ApiError::http(500, "boom")));
        assert!(matches!(kept, Error::Api(_)));
    }
}
