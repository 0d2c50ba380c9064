//! Value enum for dynamic field values

use std::cmp::Ordering;

use chrono::DateTime;
use chrono::NaiveDate;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use uuid::Uuid;

/// A dynamic value that can hold any column type returned by the backend.
///
/// # Type Mapping
///
/// | Column type | Rust Variant |
/// |-------------|--------------|
/// | null | `Null` |
/// | boolean | `Bool` |
/// | int2/int4/int8 | `Int` |
/// | float4/float8 | `Float` |
/// | numeric (written) | `Decimal` |
/// | text, varchar, date | `String` |
/// | uuid | `Uuid` |
/// | timestamptz | `DateTime` |
/// | arrays | `Array` |
/// | json/jsonb objects | `Json` |
///
/// Numeric columns come back from the backend as JSON numbers and are read as
/// `Int` or `Float`; `Decimal` is used when the client writes money values.
///
/// # Example
///
/// ```
/// use bizdesk_lib::model::Value;
///
/// let name = Value::from("Acme");
/// let qty = Value::from(12i64);
/// let active = Value::from(true);
/// let empty = Value::Null;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Null/empty value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit integer.
    Int(i64),
    /// 64-bit floating point.
    Float(f64),
    /// Arbitrary precision decimal.
    Decimal(Decimal),
    /// String value.
    String(String),
    /// UUID value.
    Uuid(Uuid),
    /// Date and time with timezone.
    DateTime(DateTime<Utc>),
    /// Array value.
    Array(Vec<Value>),
    /// Fallback for JSON objects.
    Json(serde_json::Value),
}

impl Value {
    /// Returns `true` if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Uuid(_) => "uuid",
            Value::DateTime(_) => "datetime",
            Value::Array(_) => "array",
            Value::Json(_) => "json",
        }
    }

    /// Returns the string slice if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as `f64` if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    /// Returns the value as a `Decimal` if it is numeric.
    ///
    /// Numeric strings are accepted, since `numeric` columns may be
    /// serialized as text.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Int(n) => Some(Decimal::from(*n)),
            Value::Float(n) => Decimal::try_from(*n).ok(),
            Value::Decimal(d) => Some(*d),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_) | Value::Decimal(_))
    }

    /// Renders the value the way it appears in a table cell or CSV field.
    ///
    /// `Null` renders as the empty string and arrays are joined with commas.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(n) => n.to_string(),
            Value::Decimal(d) => d.normalize().to_string(),
            Value::String(s) => s.clone(),
            Value::Uuid(u) => u.to_string(),
            Value::DateTime(dt) => dt.to_rfc3339(),
            Value::Array(items) => items
                .iter()
                .map(Value::to_display_string)
                .collect::<Vec<_>>()
                .join(","),
            Value::Json(json) => json.to_string(),
        }
    }

    /// Text used for substring search. `Null` never matches anything.
    pub fn search_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            other => Some(other.to_display_string()),
        }
    }

    /// Equality used by filters: numbers compare by value across variants,
    /// everything else compares structurally.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_numeric() && b.is_numeric() => match (a.as_decimal(), b.as_decimal()) {
                (Some(x), Some(y)) => x == y,
                _ => a.as_f64() == b.as_f64(),
            },
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loosely_equals(y))
            }
            (Value::Uuid(u), Value::String(s)) | (Value::String(s), Value::Uuid(u)) => {
                Uuid::parse_str(s).is_ok_and(|parsed| parsed == *u)
            }
            (a, b) => a == b,
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) | Value::Decimal(_) => 2,
            Value::DateTime(_) => 3,
            Value::String(_) | Value::Uuid(_) => 4,
            Value::Array(_) => 5,
            Value::Json(_) => 6,
        }
    }

    /// Ascending comparison used by table sorting.
    ///
    /// Strings compare case-insensitively. Values of different kinds order by
    /// kind: bool, number, datetime, string, array, object. Callers handle
    /// `Null` placement themselves.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (a, b) if a.is_numeric() && b.is_numeric() => match (a.as_decimal(), b.as_decimal()) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => {
                    let x = a.as_f64().unwrap_or(f64::NAN);
                    let y = b.as_f64().unwrap_or(f64::NAN);
                    x.partial_cmp(&y).unwrap_or(Ordering::Equal)
                }
            },
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (a @ (Value::String(_) | Value::Uuid(_)), b @ (Value::String(_) | Value::Uuid(_))) => a
                .to_display_string()
                .to_lowercase()
                .cmp(&b.to_display_string().to_lowercase()),
            (Value::Array(a), Value::Array(b)) => {
                for (x, y) in a.iter().zip(b) {
                    let ord = x.sort_cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Json(a), Value::Json(b)) => a.to_string().cmp(&b.to_string()),
            (a, b) => a.type_rank().cmp(&b.type_rank()),
        }
    }

    /// Converts a raw JSON value, recognizing UUID and RFC 3339 strings.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Value::Float(f)
                } else {
                    Value::Json(serde_json::Value::Number(n))
                }
            }
            serde_json::Value::String(s) => {
                if let Ok(uuid) = Uuid::parse_str(&s) {
                    Value::Uuid(uuid)
                } else if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
                    Value::DateTime(dt.with_timezone(&Utc))
                } else {
                    Value::String(s)
                }
            }
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            obj @ serde_json::Value::Object(_) => Value::Json(obj),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let json = serde_json::Value::deserialize(deserializer)?;
        Ok(Value::from_json(json))
    }
}

// =============================================================================
// From implementations
// =============================================================================

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}

/// Dates travel as ISO `YYYY-MM-DD` strings, which also sort correctly.
impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::String(v.format("%Y-%m-%d").to_string())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::from_json(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_recognizes_uuid_and_datetime() {
        let id = "12345678-1234-1234-1234-123456789012";
        assert!(matches!(Value::from_json(serde_json::json!(id)), Value::Uuid(_)));
        assert!(matches!(
            Value::from_json(serde_json::json!("2024-03-01T10:00:00Z")),
            Value::DateTime(_)
        ));
        // Plain dates stay strings so they still sort lexically.
        assert_eq!(
            Value::from_json(serde_json::json!("2024-03-01")),
            Value::String("2024-03-01".into())
        );
    }

    #[test]
    fn test_loose_numeric_equality() {
        assert!(Value::Int(3).loosely_equals(&Value::Float(3.0)));
        assert!(Value::Decimal(Decimal::new(250, 2)).loosely_equals(&Value::Float(2.5)));
        assert!(!Value::Int(3).loosely_equals(&Value::String("3".into())));
    }

    #[test]
    fn test_sort_cmp_strings_case_insensitive() {
        assert_eq!(
            Value::from("apple").sort_cmp(&Value::from("Banana")),
            Ordering::Less
        );
        assert_eq!(
            Value::from("ACME").sort_cmp(&Value::from("acme")),
            Ordering::Equal
        );
    }

    #[test]
    fn test_sort_cmp_mixed_kinds_by_rank() {
        assert_eq!(Value::Int(100).sort_cmp(&Value::from("a")), Ordering::Less);
        assert_eq!(Value::Bool(true).sort_cmp(&Value::Int(0)), Ordering::Less);
    }

    #[test]
    fn test_display_string() {
        assert_eq!(Value::Null.to_display_string(), "");
        assert_eq!(Value::Decimal(Decimal::new(1250, 2)).to_display_string(), "12.5");
        assert_eq!(
            Value::from(vec!["a", "b"]).to_display_string(),
            "a,b"
        );
    }
}
