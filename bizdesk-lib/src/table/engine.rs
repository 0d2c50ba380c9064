//! Table state engine

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::Transform;
use crate::api::query::Direction;
use crate::model::Fields;
use crate::model::Value;

/// Page size used when none is configured.
pub const DEFAULT_ITEMS_PER_PAGE: usize = 10;

// =============================================================================
// Configuration
// =============================================================================

/// Maps a filter key to the field it constrains.
#[derive(Clone)]
pub struct FilterSpec {
    field: String,
    transform: Option<Transform>,
}

impl FilterSpec {
    /// Filters on the raw value of `field`.
    pub fn field(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            transform: None,
        }
    }

    /// Maps the field value before comparing it to the filter value.
    pub fn with_transform(mut self, transform: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn field_name(&self) -> &str {
        &self.field
    }

    fn project<R: Fields>(&self, row: &R) -> Value {
        let value = row.field(&self.field).unwrap_or(Value::Null);
        match &self.transform {
            Some(transform) => transform(&value),
            None => value,
        }
    }
}

impl fmt::Debug for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterSpec")
            .field("field", &self.field)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

/// Selected value of one filter.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FilterValue {
    /// No constraint.
    #[default]
    All,
    /// Field must equal this value.
    One(Value),
    /// Field must equal one of these values.
    AnyOf(Vec<Value>),
}

impl FilterValue {
    /// Whether `value` passes this filter.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FilterValue::All => true,
            FilterValue::One(expected) => value.loosely_equals(expected),
            FilterValue::AnyOf(options) => options.iter().any(|o| value.loosely_equals(o)),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, FilterValue::All)
    }
}

impl From<Value> for FilterValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(values) => FilterValue::AnyOf(values),
            other => FilterValue::One(other),
        }
    }
}

/// Select value meaning "no constraint".
pub const ALL_SENTINEL: &str = "all";

/// `"all"` and blank strings clear the filter.
impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        if value.trim().is_empty() || value == ALL_SENTINEL {
            FilterValue::All
        } else {
            FilterValue::One(Value::from(value))
        }
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::from(value.as_str())
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::One(Value::from(value))
    }
}

impl<T: Into<Value>> From<Vec<T>> for FilterValue {
    fn from(values: Vec<T>) -> Self {
        FilterValue::AnyOf(values.into_iter().map(Into::into).collect())
    }
}

/// Declarative setup for a [`TableState`].
///
/// # Example
///
/// ```
/// use bizdesk_lib::api::query::Direction;
/// use bizdesk_lib::table::{FilterSpec, TableConfig};
///
/// let config = TableConfig::new()
///     .search_fields(["name", "sku"])
///     .filter("status", FilterSpec::field("status"))
///     .sort_by("name", Direction::Asc)
///     .items_per_page(25);
/// ```
#[derive(Debug, Clone)]
pub struct TableConfig {
    search_fields: Vec<String>,
    filters: HashMap<String, FilterSpec>,
    default_sort: Option<(String, Direction)>,
    items_per_page: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            search_fields: Vec::new(),
            filters: HashMap::new(),
            default_sort: None,
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
        }
    }
}

impl TableConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fields matched by the search term.
    pub fn search_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Registers a filter key.
    pub fn filter(mut self, key: impl Into<String>, spec: FilterSpec) -> Self {
        self.filters.insert(key.into(), spec);
        self
    }

    /// Initial sort.
    pub fn sort_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.default_sort = Some((field.into(), direction));
        self
    }

    /// Initial page size. Zero is treated as one.
    pub fn items_per_page(mut self, n: usize) -> Self {
        self.items_per_page = n.max(1);
        self
    }
}

// =============================================================================
// TableState
// =============================================================================

/// Current sort column and direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState {
    pub field: String,
    pub direction: Direction,
}

/// Search, filter, sort and pagination state over an owned collection.
///
/// Derived views are recomputed after every mutating call. Rows whose sort
/// field is missing or null always sort after rows that have a value, in both
/// directions.
pub struct TableState<R> {
    config: TableConfig,
    data: Vec<R>,
    search_term: String,
    filters: HashMap<String, FilterValue>,
    sort: Option<SortState>,
    current_page: usize,
    items_per_page: usize,
    /// Indices into `data`, filtered and sorted.
    view: Vec<usize>,
}

impl<R: Fields> TableState<R> {
    /// Creates a table over `data` at page 1.
    pub fn new(data: Vec<R>, config: TableConfig) -> Self {
        let sort = config
            .default_sort
            .clone()
            .map(|(field, direction)| SortState { field, direction });
        let items_per_page = config.items_per_page;
        let mut state = Self {
            config,
            data,
            search_term: String::new(),
            filters: HashMap::new(),
            sort,
            current_page: 1,
            items_per_page,
            view: Vec::new(),
        };
        state.recompute();
        state
    }

    // =========================================================================
    // Mutators
    // =========================================================================

    /// Sets the search term and returns to page 1.
    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
        self.current_page = 1;
        self.recompute();
    }

    /// Sets one filter and returns to page 1. [`FilterValue::All`] clears it.
    pub fn set_filter(&mut self, key: impl Into<String>, value: impl Into<FilterValue>) {
        let key = key.into();
        match value.into() {
            FilterValue::All => {
                self.filters.remove(&key);
            }
            value => {
                self.filters.insert(key, value);
            }
        }
        self.current_page = 1;
        self.recompute();
    }

    /// Clears the search term and every filter, and returns to page 1.
    pub fn clear_filters(&mut self) {
        self.search_term.clear();
        self.filters.clear();
        self.current_page = 1;
        self.recompute();
    }

    /// Sorts by `field`; sorting by the current field again flips direction.
    pub fn handle_sort(&mut self, field: &str) {
        self.sort = Some(match self.sort.take() {
            Some(sort) if sort.field == field => SortState {
                direction: sort.direction.flip(),
                ..sort
            },
            _ => SortState {
                field: field.to_string(),
                direction: Direction::Asc,
            },
        });
        self.recompute();
    }

    /// Sets the sort explicitly.
    pub fn set_sort(&mut self, field: impl Into<String>, direction: Direction) {
        self.sort = Some(SortState {
            field: field.into(),
            direction,
        });
        self.recompute();
    }

    /// Jumps to a 1-based page. Not clamped; out-of-range pages are empty and
    /// report zero for both indices.
    pub fn set_current_page(&mut self, page: usize) {
        self.current_page = page;
    }

    /// Moves forward one page unless already on the last.
    pub fn next_page(&mut self) {
        if self.has_next_page() {
            self.current_page += 1;
        }
    }

    /// Moves back one page unless already on the first.
    pub fn previous_page(&mut self) {
        if self.has_previous_page() {
            self.current_page -= 1;
        }
    }

    /// Changes the page size and returns to page 1. Zero is treated as one.
    pub fn set_items_per_page(&mut self, n: usize) {
        self.items_per_page = n.max(1);
        self.current_page = 1;
    }

    /// Replaces the collection. The current page is kept.
    pub fn set_data(&mut self, data: Vec<R>) {
        self.data = data;
        self.recompute();
    }

    // =========================================================================
    // State accessors
    // =========================================================================

    pub fn data(&self) -> &[R] {
        &self.data
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    /// Selected value for a filter key; [`FilterValue::All`] when unset.
    pub fn filter_value(&self, key: &str) -> FilterValue {
        self.filters.get(key).cloned().unwrap_or_default()
    }

    /// Whether a search term or any filter is active.
    pub fn has_active_filters(&self) -> bool {
        !self.search_term.is_empty() || !self.filters.is_empty()
    }

    pub fn sort(&self) -> Option<&SortState> {
        self.sort.as_ref()
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn items_per_page(&self) -> usize {
        self.items_per_page
    }

    // =========================================================================
    // Derived views
    // =========================================================================

    /// All rows passing search and filters, in sort order.
    pub fn filtered_data(&self) -> Vec<&R> {
        self.view.iter().map(|&i| &self.data[i]).collect()
    }

    pub fn filtered_len(&self) -> usize {
        self.view.len()
    }

    /// The rows on the current page.
    pub fn paginated_data(&self) -> Vec<&R> {
        let Some(start) = self.window_start() else {
            return Vec::new();
        };
        self.view
            .iter()
            .skip(start)
            .take(self.items_per_page)
            .map(|&i| &self.data[i])
            .collect()
    }

    /// `ceil(filtered / items_per_page)`; zero when nothing matches.
    pub fn total_pages(&self) -> usize {
        self.view.len().div_ceil(self.items_per_page)
    }

    /// 1-based position of the first row on the page; zero when the page is
    /// empty.
    pub fn start_index(&self) -> usize {
        match self.window_start() {
            Some(start) if start < self.view.len() => start + 1,
            _ => 0,
        }
    }

    /// 1-based position of the last row on the page, clamped to the row count;
    /// zero when the page is empty.
    pub fn end_index(&self) -> usize {
        if self.start_index() == 0 {
            return 0;
        }
        self.current_page
            .saturating_mul(self.items_per_page)
            .min(self.view.len())
    }

    pub fn has_next_page(&self) -> bool {
        self.current_page < self.total_pages()
    }

    pub fn has_previous_page(&self) -> bool {
        self.current_page > 1
    }

    fn window_start(&self) -> Option<usize> {
        self.current_page
            .checked_sub(1)
            .map(|p| p.saturating_mul(self.items_per_page))
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    fn recompute(&mut self) {
        let needle = self.search_term.to_lowercase();
        let searching = !needle.is_empty() && !self.config.search_fields.is_empty();

        let active: Vec<(&FilterSpec, &FilterValue)> = self
            .filters
            .iter()
            .filter_map(|(key, value)| self.config.filters.get(key).map(|spec| (spec, value)))
            .collect();

        let mut view: Vec<usize> = self
            .data
            .iter()
            .enumerate()
            .filter(|(_, row)| !searching || self.matches_search(*row, &needle))
            .filter(|(_, row)| active.iter().all(|(spec, value)| value.matches(&spec.project(*row))))
            .map(|(i, _)| i)
            .collect();

        if let Some(sort) = &self.sort {
            let keys: Vec<Option<Value>> = self
                .data
                .iter()
                .map(|row| row.field(&sort.field).filter(|v| !v.is_null()))
                .collect();
            let direction = sort.direction;

            // `sort_by` is stable.
            view.sort_by(|&a, &b| match (&keys[a], &keys[b]) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(x), Some(y)) => match direction {
                    Direction::Asc => x.sort_cmp(y),
                    Direction::Desc => y.sort_cmp(x),
                },
            });
        }

        self.view = view;
    }

    fn matches_search(&self, row: &R, needle: &str) -> bool {
        self.config.search_fields.iter().any(|field| {
            row.field(field)
                .and_then(|v| v.search_text())
                .is_some_and(|text| text.to_lowercase().contains(needle))
        })
    }
}

impl<R: fmt::Debug> fmt::Debug for TableState<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableState")
            .field("rows", &self.data.len())
            .field("search_term", &self.search_term)
            .field("filters", &self.filters)
            .field("sort", &self.sort)
            .field("current_page", &self.current_page)
            .field("items_per_page", &self.items_per_page)
            .field("filtered", &self.view.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Row;

    fn rows(values: &[(&str, Option<i64>)]) -> Vec<Row> {
        values
            .iter()
            .map(|(name, qty)| Row::new().set("name", *name).set("qty", *qty))
            .collect()
    }

    fn names<R: Fields>(rows: Vec<&R>) -> Vec<String> {
        rows.iter()
            .map(|r| r.field("name").map(|v| v.to_display_string()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_nulls_sort_last_both_directions() {
        let data = rows(&[("a", None), ("b", Some(2)), ("c", Some(1))]);
        let mut table = TableState::new(data, TableConfig::new());

        table.handle_sort("qty");
        assert_eq!(names(table.filtered_data()), ["c", "b", "a"]);

        table.handle_sort("qty");
        assert_eq!(table.sort().unwrap().direction, Direction::Desc);
        assert_eq!(names(table.filtered_data()), ["b", "c", "a"]);
    }

    #[test]
    fn test_sort_is_stable_and_case_insensitive() {
        let data = rows(&[("beta", Some(1)), ("Alpha", Some(1)), ("alpha", Some(2))]);
        let mut table = TableState::new(data, TableConfig::new());
        table.handle_sort("name");
        assert_eq!(names(table.filtered_data()), ["Alpha", "alpha", "beta"]);
    }

    #[test]
    fn test_new_sort_field_resets_to_ascending() {
        let mut table = TableState::new(rows(&[("a", Some(1))]), TableConfig::new());
        table.handle_sort("qty");
        table.handle_sort("qty");
        table.handle_sort("name");
        assert_eq!(
            table.sort(),
            Some(&SortState {
                field: "name".into(),
                direction: Direction::Asc
            })
        );
    }

    #[test]
    fn test_transform_filter() {
        let data = rows(&[("a", Some(0)), ("b", Some(5)), ("c", Some(12))]);
        let config = TableConfig::new().filter(
            "stock",
            FilterSpec::field("qty").with_transform(|v| {
                let qty = v.as_f64().unwrap_or(0.0);
                Value::from(if qty <= 0.0 { "out" } else { "in" })
            }),
        );
        let mut table = TableState::new(data, config);
        table.set_filter("stock", "in");
        assert_eq!(names(table.filtered_data()), ["b", "c"]);

        table.set_filter("stock", FilterValue::All);
        assert_eq!(table.filtered_len(), 3);
    }

    #[test]
    fn test_all_sentinel_clears_filter() {
        let data = rows(&[("a", Some(1)), ("b", Some(2))]);
        let config = TableConfig::new().filter("name", FilterSpec::field("name"));
        let mut table = TableState::new(data, config);

        table.set_filter("name", "a");
        assert_eq!(table.filtered_len(), 1);

        table.set_filter("name", "all");
        assert_eq!(table.filtered_len(), 2);
        assert!(table.filter_value("name").is_all());

        table.set_filter("name", "b");
        table.set_filter("name", String::from("  "));
        assert!(!table.has_active_filters());
    }

    #[test]
    fn test_any_of_filter() {
        let data = rows(&[("a", Some(1)), ("b", Some(2)), ("c", Some(3))]);
        let config = TableConfig::new().filter("qty", FilterSpec::field("qty"));
        let mut table = TableState::new(data, config);
        table.set_filter("qty", vec![1i64, 3]);
        assert_eq!(names(table.filtered_data()), ["a", "c"]);
    }

    #[test]
    fn test_unknown_filter_key_is_ignored() {
        let mut table = TableState::new(rows(&[("a", Some(1))]), TableConfig::new());
        table.set_filter("nope", "x");
        assert_eq!(table.filtered_len(), 1);
    }

    #[test]
    fn test_search_skips_null_fields() {
        let data = rows(&[("a", None), ("b", Some(10))]);
        let config = TableConfig::new().search_fields(["qty"]);
        let mut table = TableState::new(data, config);
        table.set_search_term("1");
        assert_eq!(names(table.filtered_data()), ["b"]);
    }

    #[test]
    fn test_empty_view_indices() {
        let mut table = TableState::new(Vec::<Row>::new(), TableConfig::new());
        assert_eq!(table.total_pages(), 0);
        assert_eq!(table.start_index(), 0);
        assert_eq!(table.end_index(), 0);
        table.set_current_page(0);
        assert!(table.paginated_data().is_empty());
    }

    #[test]
    fn test_page_navigation_is_bounded() {
        let data = rows(&[("a", None); 15]);
        let mut table = TableState::new(data, TableConfig::new());
        table.previous_page();
        assert_eq!(table.current_page(), 1);
        table.next_page();
        table.next_page();
        assert_eq!(table.current_page(), 2);
        assert_eq!(table.paginated_data().len(), 5);
    }

    #[test]
    fn test_set_data_keeps_page() {
        let mut table = TableState::new(rows(&[("a", None); 30]), TableConfig::new());
        table.set_current_page(2);
        table.set_data(rows(&[("b", None); 12]));
        assert_eq!(table.current_page(), 2);
        assert_eq!(table.paginated_data().len(), 2);
    }
}
