//! Dynamic table row

use std::collections::HashMap;

use chrono::DateTime;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::Value;
use crate::error::FieldError;

/// A dynamic row as read from or written to a backend table.
///
/// Rows hold field values as a `HashMap<String, Value>` and serialize as a
/// flat JSON object. Typed getter methods provide safe access with proper
/// error handling.
///
/// # Example
///
/// ```
/// use bizdesk_lib::model::Row;
///
/// let row = Row::new()
///     .set("name", "Acme")
///     .set("quantity", 12i64);
///
/// assert_eq!(row.get_string("name").unwrap(), Some("Acme"));
/// assert_eq!(row.get_int("quantity").unwrap(), Some(12));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    fields: HashMap<String, Value>,
}

impl Row {
    /// Creates a new empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts any serializable struct into a row.
    pub fn from_struct<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::to_value(value)?)
    }

    /// Converts the row into a typed struct.
    pub fn into_struct<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(serde_json::to_value(self)?)
    }

    /// Returns the `id` column as a UUID, if present and well-formed.
    pub fn id(&self) -> Option<Uuid> {
        self.get_uuid("id").ok().flatten()
    }

    // =========================================================================
    // Raw field access
    // =========================================================================

    /// Returns a reference to the field value, if it exists.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns `true` if the row contains the given field.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Returns a reference to all fields.
    pub fn fields(&self) -> &HashMap<String, Value> {
        &self.fields
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the row has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    // =========================================================================
    // Setters
    // =========================================================================

    /// Sets a field value (builder pattern).
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Inserts a field value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Removes a field and returns its value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Copies every field of `patch` onto this row.
    pub fn merge(&mut self, patch: Row) {
        self.fields.extend(patch.fields);
    }

    // =========================================================================
    // Typed getters
    //
    // Return Err if field is missing or wrong type.
    // Return Ok(None) only if the field exists and is Value::Null.
    // =========================================================================

    /// Gets a string field value.
    pub fn get_string(&self, field: &str) -> Result<Option<&str>, FieldError> {
        match self.fields.get(field) {
            None => Err(FieldError::missing(field)),
            Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(FieldError::wrong_type(
                field,
                "string",
                other.type_name(),
            )),
        }
    }

    /// Gets a boolean field value.
    pub fn get_bool(&self, field: &str) -> Result<Option<bool>, FieldError> {
        match self.fields.get(field) {
            None => Err(FieldError::missing(field)),
            Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(FieldError::wrong_type(field, "bool", other.type_name())),
        }
    }

    /// Gets an integer field value.
    pub fn get_int(&self, field: &str) -> Result<Option<i64>, FieldError> {
        match self.fields.get(field) {
            None => Err(FieldError::missing(field)),
            Some(Value::Null) => Ok(None),
            Some(Value::Int(n)) => Ok(Some(*n)),
            Some(other) => Err(FieldError::wrong_type(field, "int", other.type_name())),
        }
    }

    /// Gets a floating point field value. Integers are widened.
    pub fn get_float(&self, field: &str) -> Result<Option<f64>, FieldError> {
        match self.fields.get(field) {
            None => Err(FieldError::missing(field)),
            Some(Value::Null) => Ok(None),
            Some(Value::Float(n)) => Ok(Some(*n)),
            Some(Value::Int(n)) => Ok(Some(*n as f64)),
            Some(other) => Err(FieldError::wrong_type(field, "float", other.type_name())),
        }
    }

    /// Gets a decimal field value from any numeric representation.
    pub fn get_decimal(&self, field: &str) -> Result<Option<Decimal>, FieldError> {
        match self.fields.get(field) {
            None => Err(FieldError::missing(field)),
            Some(Value::Null) => Ok(None),
            Some(other) => other.as_decimal().map(Some).ok_or_else(|| {
                FieldError::wrong_type(field, "decimal", other.type_name())
            }),
        }
    }

    /// Gets a UUID field value.
    pub fn get_uuid(&self, field: &str) -> Result<Option<Uuid>, FieldError> {
        match self.fields.get(field) {
            None => Err(FieldError::missing(field)),
            Some(Value::Null) => Ok(None),
            Some(Value::Uuid(u)) => Ok(Some(*u)),
            Some(other) => Err(FieldError::wrong_type(field, "uuid", other.type_name())),
        }
    }

    /// Gets a DateTime field value.
    pub fn get_datetime(&self, field: &str) -> Result<Option<DateTime<Utc>>, FieldError> {
        match self.fields.get(field) {
            None => Err(FieldError::missing(field)),
            Some(Value::Null) => Ok(None),
            Some(Value::DateTime(dt)) => Ok(Some(*dt)),
            Some(other) => Err(FieldError::wrong_type(
                field,
                "datetime",
                other.type_name(),
            )),
        }
    }

    /// Gets an array field value.
    pub fn get_array(&self, field: &str) -> Result<Option<&[Value]>, FieldError> {
        match self.fields.get(field) {
            None => Err(FieldError::missing(field)),
            Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items.as_slice())),
            Some(other) => Err(FieldError::wrong_type(field, "array", other.type_name())),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: Uuid,
        name: String,
        price: Decimal,
    }

    #[test]
    fn test_getters_distinguish_missing_and_null() {
        let row = Row::new().set("name", "Acme").set("notes", Value::Null);

        assert_eq!(row.get_string("name").unwrap(), Some("Acme"));
        assert_eq!(row.get_string("notes").unwrap(), None);
        assert_eq!(
            row.get_string("missing"),
            Err(FieldError::missing("missing"))
        );
        assert!(matches!(
            row.get_int("name"),
            Err(FieldError::WrongType { expected: "int", .. })
        ));
    }

    #[test]
    fn test_deserialize_flat_object() {
        let json = r#"{
            "id": "12345678-1234-1234-1234-123456789012",
            "name": "Widget",
            "quantity": 4,
            "price": 12.5,
            "created_at": "2024-03-01T10:00:00+00:00"
        }"#;
        let row: Row = serde_json::from_str(json).unwrap();

        assert!(row.id().is_some());
        assert_eq!(row.get_int("quantity").unwrap(), Some(4));
        assert_eq!(row.get_decimal("price").unwrap(), Some(Decimal::new(125, 1)));
        assert!(row.get_datetime("created_at").unwrap().is_some());
    }

    #[test]
    fn test_struct_round_trip() {
        let item = Item {
            id: Uuid::new_v4(),
            name: "Widget".into(),
            price: Decimal::new(1999, 2),
        };
        let row = Row::from_struct(&item).unwrap();
        assert_eq!(row.get_string("name").unwrap(), Some("Widget"));
        assert_eq!(row.into_struct::<Item>().unwrap(), item);
    }
}
