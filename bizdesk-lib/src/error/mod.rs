//! Error types

mod api;
mod auth;
mod backend;
mod field;
mod validation;

use std::time::Duration;

pub use api::*;
pub use auth::*;
pub use backend::*;
pub use field::*;
pub use validation::*;

/// Top-level error returned by every fallible operation in this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backend rejected the request or could not be reached.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Signing in, refreshing, or resolving the current user failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Client-side validation failed before any request was sent.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// A business rule rejected the operation (duplicate email, protected role, ...).
    #[error("{0}")]
    BusinessRule(String),

    /// Typed access to a row field failed.
    #[error(transparent)]
    Field(#[from] FieldError),

    /// A row could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The requested row does not exist.
    #[error("{table} row {id} not found")]
    NotFound { table: &'static str, id: String },

    /// The operation was cancelled by its caller.
    #[error("Operation cancelled")]
    Cancelled,

    /// The backend kept answering 429 after all retries.
    #[error("Rate limited (retry after {retry_after:?})")]
    RateLimit { retry_after: Option<Duration> },

    /// The operation cannot be performed with the given arguments.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Writing CSV output failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File system I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates a business rule error.
    pub fn business(message: impl Into<String>) -> Self {
        Self::BusinessRule(message.into())
    }

    /// Creates a not-found error for a table row.
    pub fn not_found(table: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            table,
            id: id.to_string(),
        }
    }

    /// Returns a message suitable for showing to an end user.
    ///
    /// Backend errors prefer the message reported by the backend over the raw
    /// HTTP status line.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(api) => match api.detail() {
                Some(detail) => detail.message.clone(),
                None => api.to_string(),
            },
            other => other.to_string(),
        }
    }

    /// Returns `true` if the backend rejected a write on a unique constraint.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::Api(api) if api.code() == Some(UNIQUE_VIOLATION))
    }

    /// Returns `true` if retrying the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api(api) => api.is_retryable(),
            Self::RateLimit { .. } => true,
            _ => false,
        }
    }
}
