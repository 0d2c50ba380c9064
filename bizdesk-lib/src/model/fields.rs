//! Read-only field access for table views

use super::Row;
use super::Value;

/// Read-only, name-based field access.
///
/// The table engine, search, and CSV export only ever look at rows through
/// this trait, so they work equally for dynamic [`Row`]s and for typed entity
/// structs that expose their columns.
pub trait Fields {
    /// Returns the value of `name`, or `None` if the row has no such field.
    fn field(&self, name: &str) -> Option<Value>;
}

impl Fields for Row {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl Fields for serde_json::Value {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name).cloned().map(Value::from_json)
    }
}

impl<T: Fields + ?Sized> Fields for &T {
    fn field(&self, name: &str) -> Option<Value> {
        (**self).field(name)
    }
}
