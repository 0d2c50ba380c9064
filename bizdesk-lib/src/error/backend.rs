//! Backend-specific error details

use serde::Deserialize;

/// Postgres SQLSTATE for a unique-constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";

/// Postgres SQLSTATE for a foreign-key violation.
pub const FOREIGN_KEY_VIOLATION: &str = "23503";

/// PostgREST code returned when a single-row request matched no rows.
pub const NO_ROWS: &str = "PGRST116";

/// Structured error body returned by the table and RPC endpoints.
///
/// ```json
/// {"code": "23505", "message": "duplicate key value ...", "details": "...", "hint": null}
/// ```
///
/// Storage and auth endpoints use slightly different keys (`error`,
/// `msg`, `error_description`); [`BackendErrorDetail::parse`] accepts all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendErrorDetail {
    /// The error code (e.g., "23505"), if any.
    pub code: Option<String>,
    /// Human-readable error message.
    pub message: String,
    /// Additional details.
    pub details: Option<String>,
    /// Hint on how to fix the request.
    pub hint: Option<String>,
}

#[derive(Deserialize)]
struct RawDetail {
    code: Option<serde_json::Value>,
    message: Option<String>,
    msg: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

impl BackendErrorDetail {
    /// Creates a new error detail with the given code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
            details: None,
            hint: None,
        }
    }

    /// Parses a JSON error body. Returns `None` when the body is not a
    /// recognizable error object.
    pub fn parse(body: &str) -> Option<Self> {
        let raw: RawDetail = serde_json::from_str(body).ok()?;
        let message = raw
            .message
            .or(raw.msg)
            .or(raw.error_description)
            .or_else(|| raw.error.clone())?;
        let code = match raw.code {
            Some(serde_json::Value::String(s)) => Some(s),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => raw.error.filter(|e| *e != message),
        };
        Some(Self {
            code,
            message,
            details: raw.details,
            hint: raw.hint,
        })
    }

    /// Checks if this error has the given code.
    pub fn has_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }

    /// Returns `true` for unique-constraint violations.
    pub fn is_unique_violation(&self) -> bool {
        self.has_code(UNIQUE_VIOLATION)
    }
}

impl std::fmt::Display for BackendErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{}] {}", code, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}
