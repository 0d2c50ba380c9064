//! Filter types for table queries.

use crate::model::Value;

/// A filter condition for querying rows.
///
/// Filters are combined with logical operators (`And`, `Or`) and rendered as
/// PostgREST query parameters (`column=op.value`, `or=(...)`).
///
/// # Example
///
/// ```
/// use bizdesk_lib::api::query::Filter;
///
/// // Simple equality filter
/// let filter = Filter::eq("status", "active");
///
/// // Combined filter
/// let filter = Filter::and([
///     Filter::eq("status", "active"),
///     Filter::gt("quantity", 10),
/// ]);
///
/// // Either/or
/// let filter = Filter::ilike("name", "%acme%")
///     .or_else(Filter::ilike("sku", "%acme%"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Equality: `field=eq.value`
    Eq(String, Value),
    /// Not equal: `field=neq.value`
    Neq(String, Value),
    /// Greater than: `field=gt.value`
    Gt(String, Value),
    /// Greater than or equal: `field=gte.value`
    Gte(String, Value),
    /// Less than: `field=lt.value`
    Lt(String, Value),
    /// Less than or equal: `field=lte.value`
    Lte(String, Value),
    /// Case-insensitive pattern match: `field=ilike.pattern`
    ILike(String, String),
    /// Membership: `field=in.(a,b,c)`
    In(String, Vec<Value>),
    /// Is null: `field=is.null`
    IsNull(String),
    /// Is not null: `field=not.is.null`
    IsNotNull(String),
    /// Logical AND of multiple filters.
    And(Vec<Filter>),
    /// Logical OR of multiple filters.
    Or(Vec<Filter>),
}

impl Filter {
    /// Creates an equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    /// Creates a not-equal filter.
    pub fn neq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Neq(field.into(), value.into())
    }

    /// Creates a greater-than filter.
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Gt(field.into(), value.into())
    }

    /// Creates a greater-than-or-equal filter.
    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Gte(field.into(), value.into())
    }

    /// Creates a less-than filter.
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Lt(field.into(), value.into())
    }

    /// Creates a less-than-or-equal filter.
    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Lte(field.into(), value.into())
    }

    /// Creates a case-insensitive pattern filter. `%` is the wildcard.
    pub fn ilike(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Filter::ILike(field.into(), pattern.into())
    }

    /// Creates a case-insensitive substring filter (`%term%`).
    pub fn contains(field: impl Into<String>, term: &str) -> Self {
        Filter::ILike(field.into(), format!("%{}%", term))
    }

    /// Creates a membership filter.
    pub fn is_in<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In(field.into(), values.into_iter().map(Into::into).collect())
    }

    /// Creates an is-null filter.
    pub fn is_null(field: impl Into<String>) -> Self {
        Filter::IsNull(field.into())
    }

    /// Creates an is-not-null filter.
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Filter::IsNotNull(field.into())
    }

    /// Creates a logical AND of multiple filters.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::And(filters.into_iter().collect())
    }

    /// Creates a logical OR of multiple filters.
    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Or(filters.into_iter().collect())
    }

    /// Combines this filter with another using logical AND.
    pub fn and_also(self, other: Filter) -> Self {
        match self {
            Filter::And(mut filters) => {
                filters.push(other);
                Filter::And(filters)
            }
            _ => Filter::And(vec![self, other]),
        }
    }

    /// Combines this filter with another using logical OR.
    pub fn or_else(self, other: Filter) -> Self {
        match self {
            Filter::Or(mut filters) => {
                filters.push(other);
                Filter::Or(filters)
            }
            _ => Filter::Or(vec![self, other]),
        }
    }
}
