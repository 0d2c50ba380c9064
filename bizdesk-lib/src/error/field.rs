//! Typed row access failures

/// Reading a [`Row`](crate::model::Row) field as a specific type failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("Row has no field `{0}`")]
    Missing(String),

    #[error("Field `{field}` holds {actual}, not {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },
}

impl FieldError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::Missing(field.into())
    }

    pub fn wrong_type(field: impl Into<String>, expected: &'static str, actual: &'static str) -> Self {
        Self::WrongType {
            field: field.into(),
            expected,
            actual,
        }
    }
}
