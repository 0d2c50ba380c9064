//! Transport and HTTP failures

use std::time::Duration;

use super::BackendErrorDetail;

/// A backend call that failed before or after reaching the server.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Non-success response. `detail` is set when the body was a structured
    /// backend error.
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        detail: Option<Box<BackendErrorDetail>>,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    /// The project URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A success response whose body did not have the expected shape.
    #[error("Unexpected response body: {message}")]
    Parse { message: String, body: String },
}

impl ApiError {
    /// A non-success response with a plain-text message.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
            detail: None,
        }
    }

    /// A non-success response built from its raw body.
    ///
    /// Structured error bodies from the table, storage and auth endpoints
    /// contribute their message; anything else is used verbatim.
    pub fn from_body(status: u16, body: &str) -> Self {
        match BackendErrorDetail::parse(body) {
            Some(detail) => Self::Http {
                status,
                message: detail.message.clone(),
                detail: Some(Box::new(detail)),
            },
            None => Self::http(status, body),
        }
    }

    pub fn parse_with_body(message: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            body: body.into(),
        }
    }

    pub fn detail(&self) -> Option<&BackendErrorDetail> {
        match self {
            Self::Http { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// SQLSTATE or PostgREST code of a structured error.
    pub fn code(&self) -> Option<&str> {
        self.detail().and_then(|d| d.code.as_deref())
    }

    /// 401 or 403: the session is missing, expired or lacks access.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::Http { status: 401 | 403, .. })
    }

    /// Rate limits, gateway failures and transport errors.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            Self::Network(_) | Self::Timeout(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UNIQUE_VIOLATION;

    #[test]
    fn test_from_body_lifts_backend_message() {
        let err = ApiError::from_body(409, r#"{"code":"23505","message":"duplicate key value"}"#);
        assert_eq!(err.to_string(), "HTTP 409: duplicate key value");
        assert_eq!(err.code(), Some(UNIQUE_VIOLATION));
    }

    #[test]
    fn test_from_body_keeps_plain_text() {
        let err = ApiError::from_body(502, "Bad Gateway");
        assert_eq!(err.to_string(), "HTTP 502: Bad Gateway");
        assert!(err.detail().is_none());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_auth_rejection() {
        assert!(ApiError::http(401, "jwt expired").is_auth_rejection());
        assert!(ApiError::http(403, "denied").is_auth_rejection());
        assert!(!ApiError::http(404, "missing").is_auth_rejection());
    }
}
