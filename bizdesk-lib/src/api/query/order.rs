//! Ordering types for table queries.

/// Sort direction for ordering results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Ascending order (A-Z, 0-9).
    #[default]
    Asc,
    /// Descending order (Z-A, 9-0).
    Desc,
}

impl Direction {
    /// Returns the opposite direction.
    pub fn flip(self) -> Self {
        match self {
            Direction::Asc => Direction::Desc,
            Direction::Desc => Direction::Asc,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// Where nulls go in a server-side ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nulls {
    First,
    Last,
}

/// Specifies the ordering of query results.
///
/// Multiple fields can be chained together for secondary sorting.
///
/// # Example
///
/// ```
/// use bizdesk_lib::api::query::OrderBy;
///
/// let order = OrderBy::desc("created_at").then_asc("name");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub(crate) fields: Vec<(String, Direction, Option<Nulls>)>,
}

impl OrderBy {
    /// Creates an ascending order on a field.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            fields: vec![(field.into(), Direction::Asc, None)],
        }
    }

    /// Creates a descending order on a field.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            fields: vec![(field.into(), Direction::Desc, None)],
        }
    }

    /// Adds a secondary ascending order on a field.
    pub fn then_asc(mut self, field: impl Into<String>) -> Self {
        self.fields.push((field.into(), Direction::Asc, None));
        self
    }

    /// Adds a secondary descending order on a field.
    pub fn then_desc(mut self, field: impl Into<String>) -> Self {
        self.fields.push((field.into(), Direction::Desc, None));
        self
    }

    /// Sets null placement for the most recently added field.
    pub fn nulls(mut self, nulls: Nulls) -> Self {
        if let Some(last) = self.fields.last_mut() {
            last.2 = Some(nulls);
        }
        self
    }

    /// Renders the `order` parameter value, e.g. `created_at.desc,name.asc`.
    pub fn to_param(&self) -> String {
        self.fields
            .iter()
            .map(|(field, dir, nulls)| match nulls {
                Some(Nulls::First) => format!("{}.{}.nullsfirst", field, dir.as_str()),
                Some(Nulls::Last) => format!("{}.{}.nullslast", field, dir.as_str()),
                None => format!("{}.{}", field, dir.as_str()),
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}
