//! PostgREST query string generation.

use super::Filter;
use super::OrderBy;
use super::Range;
use crate::model::Value;

/// A table read (or the row selector of an update/delete).
///
/// # Example
///
/// ```
/// use bizdesk_lib::api::query::{Filter, OrderBy, Query, Range};
///
/// let query = Query::new()
///     .select("id,name,status")
///     .filter(Filter::eq("status", "active"))
///     .order(OrderBy::desc("created_at"))
///     .range(Range::page(2, 25))
///     .count_exact();
///
/// assert_eq!(
///     query.to_query_string(),
///     "select=id%2Cname%2Cstatus&status=eq.active&order=created_at.desc&offset=25&limit=25"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    select: Option<String>,
    filters: Vec<Filter>,
    order: Option<OrderBy>,
    range: Option<Range>,
    count_exact: bool,
}

impl Query {
    /// Creates an empty query (all columns, all rows).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the column list, including embedded resources (`*,bill_items(*)`).
    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = Some(columns.into());
        self
    }

    /// Adds a filter. Multiple filters are combined with AND.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Sets the ordering.
    pub fn order(mut self, order: OrderBy) -> Self {
        self.order = Some(order);
        self
    }

    /// Sets the offset/limit window.
    pub fn range(mut self, range: Range) -> Self {
        self.range = Some(range);
        self
    }

    /// Limits the number of rows returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.range = Some(Range::new(self.range.map_or(0, |r| r.offset), limit));
        self
    }

    /// Requests an exact total count in the `Content-Range` header.
    pub fn count_exact(mut self) -> Self {
        self.count_exact = true;
        self
    }

    /// Returns `true` if an exact count was requested.
    pub fn wants_count(&self) -> bool {
        self.count_exact
    }

    /// Returns the configured ordering, if any.
    pub fn get_order(&self) -> Option<&OrderBy> {
        self.order.as_ref()
    }

    /// Returns the configured range, if any.
    pub fn get_range(&self) -> Option<Range> {
        self.range
    }

    /// Returns `true` if the query has at least one filter.
    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    /// Returns the query as decoded key/value pairs, in order.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();

        if let Some(select) = &self.select {
            pairs.push(("select".to_string(), select.clone()));
        }

        for filter in &self.filters {
            push_filter(filter, &mut pairs);
        }

        if let Some(order) = &self.order {
            pairs.push(("order".to_string(), order.to_param()));
        }

        if let Some(range) = self.range {
            if range.offset > 0 {
                pairs.push(("offset".to_string(), range.offset.to_string()));
            }
            pairs.push(("limit".to_string(), range.limit.to_string()));
        }

        pairs
    }

    /// Renders the percent-encoded query string (without the leading `?`).
    pub fn to_query_string(&self) -> String {
        self.to_pairs()
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn push_filter(filter: &Filter, pairs: &mut Vec<(String, String)>) {
    match filter {
        Filter::And(filters) => {
            for f in filters {
                push_filter(f, pairs);
            }
        }
        Filter::Or(filters) => {
            if !filters.is_empty() {
                let parts: Vec<_> = filters.iter().map(render_tree).collect();
                pairs.push(("or".to_string(), format!("({})", parts.join(","))));
            }
        }
        other => {
            if let Some((field, op)) = render_condition(other, false) {
                pairs.push((field, op));
            }
        }
    }
}

/// Renders a leaf filter as `(field, "op.value")`.
///
/// Inside `or(...)`/`and(...)` trees values containing reserved characters
/// must be double-quoted, at the top level they are sent verbatim.
fn render_condition(filter: &Filter, in_tree: bool) -> Option<(String, String)> {
    let value = |v: &Value| {
        let encoded = encode_value(v);
        if in_tree { quote_reserved(&encoded) } else { encoded }
    };
    let condition = match filter {
        Filter::Eq(field, v) => (field.clone(), format!("eq.{}", value(v))),
        Filter::Neq(field, v) => (field.clone(), format!("neq.{}", value(v))),
        Filter::Gt(field, v) => (field.clone(), format!("gt.{}", value(v))),
        Filter::Gte(field, v) => (field.clone(), format!("gte.{}", value(v))),
        Filter::Lt(field, v) => (field.clone(), format!("lt.{}", value(v))),
        Filter::Lte(field, v) => (field.clone(), format!("lte.{}", value(v))),
        Filter::ILike(field, pattern) => {
            let pattern = if in_tree {
                quote_reserved(pattern)
            } else {
                pattern.clone()
            };
            (field.clone(), format!("ilike.{}", pattern))
        }
        Filter::In(field, values) => {
            let items: Vec<_> = values
                .iter()
                .map(|v| quote_reserved(&encode_value(v)))
                .collect();
            (field.clone(), format!("in.({})", items.join(",")))
        }
        Filter::IsNull(field) => (field.clone(), "is.null".to_string()),
        Filter::IsNotNull(field) => (field.clone(), "not.is.null".to_string()),
        Filter::And(_) | Filter::Or(_) => return None,
    };
    Some(condition)
}

fn render_tree(filter: &Filter) -> String {
    match filter {
        Filter::And(filters) => {
            let parts: Vec<_> = filters.iter().map(render_tree).collect();
            format!("and({})", parts.join(","))
        }
        Filter::Or(filters) => {
            let parts: Vec<_> = filters.iter().map(render_tree).collect();
            format!("or({})", parts.join(","))
        }
        leaf => match render_condition(leaf, true) {
            Some((field, op)) => format!("{}.{}", field, op),
            None => String::new(),
        },
    }
}

/// Converts a `Value` to its PostgREST literal representation.
pub fn encode_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Array(items) => {
            let parts: Vec<_> = items
                .iter()
                .map(|v| quote_reserved(&encode_value(v)))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        Value::Json(json) => json.to_string(),
        other => other.to_display_string(),
    }
}

fn quote_reserved(s: &str) -> String {
    if s.chars().any(|c| matches!(c, ',' | '.' | ':' | '(' | ')' | '"' | '\\' | ' ')) {
        format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::query::OrderBy;

    fn pairs(query: &Query) -> Vec<(String, String)> {
        query.to_pairs()
    }

    fn expect(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_simple_filters() {
        let query = Query::new()
            .filter(Filter::eq("status", "active"))
            .filter(Filter::gte("quantity", 5))
            .filter(Filter::is_null("deleted_at"));
        assert_eq!(
            pairs(&query),
            expect(&[
                ("status", "eq.active"),
                ("quantity", "gte.5"),
                ("deleted_at", "is.null"),
            ])
        );
    }

    #[test]
    fn test_and_is_flattened() {
        let query = Query::new().filter(Filter::and([
            Filter::eq("bill_id", 7),
            Filter::neq("status", "void"),
        ]));
        assert_eq!(
            pairs(&query),
            expect(&[("bill_id", "eq.7"), ("status", "neq.void")])
        );
    }

    #[test]
    fn test_or_tree_quotes_reserved_values() {
        let query = Query::new().filter(
            Filter::contains("name", "acme, inc").or_else(Filter::contains("sku", "ac")),
        );
        assert_eq!(
            pairs(&query),
            expect(&[("or", "(name.ilike.\"%acme, inc%\",sku.ilike.%ac%)")])
        );
    }

    #[test]
    fn test_nested_and_inside_or() {
        let filter = Filter::or([
            Filter::eq("status", "paid"),
            Filter::and([Filter::eq("status", "pending"), Filter::lt("due_date", "2024-01-01")]),
        ]);
        let query = Query::new().filter(filter);
        assert_eq!(
            pairs(&query),
            expect(&[("or", "(status.eq.paid,and(status.eq.pending,due_date.lt.2024-01-01))")])
        );
    }

    #[test]
    fn test_in_filter() {
        let query = Query::new().filter(Filter::is_in("role", ["admin", "manager"]));
        assert_eq!(
            pairs(&query),
            expect(&[("role", "in.(admin,manager)")])
        );
    }

    #[test]
    fn test_order_and_range() {
        let query = Query::new()
            .order(OrderBy::desc("created_at").then_asc("name"))
            .range(Range::page(3, 10));
        assert_eq!(
            pairs(&query),
            expect(&[
                ("order", "created_at.desc,name.asc"),
                ("offset", "20"),
                ("limit", "10"),
            ])
        );
    }

    #[test]
    fn test_empty_query() {
        assert_eq!(Query::new().to_query_string(), "");
    }
}
