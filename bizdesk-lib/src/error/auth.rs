//! Authentication error types

/// Errors that can occur during authentication flows.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Invalid email or password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No signed-in session is available.
    #[error("Not signed in")]
    NoSession,

    /// Access token expired and refresh failed.
    #[error("Token expired and refresh failed: {message}")]
    TokenExpired { message: String },

    /// The auth service rejected the request for another reason.
    #[error("Auth request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Network error during authentication.
    #[error("Network error during auth: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to parse authentication response.
    #[error("Auth response parse error: {0}")]
    Parse(String),
}
