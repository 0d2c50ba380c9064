//! Realtime change events
//!
//! The backend broadcasts row changes on topics such as
//! `realtime:public:task_comments:task_id=eq.<uuid>`. This module parses the
//! change payloads and applies them as patches to an in-memory
//! [`LiveCollection`]. The transport that delivers payloads is up to the
//! caller: anything that yields [`ChangeEvent`]s as a [`Stream`] works.

use std::cmp::Ordering;
use std::fmt;

use futures::Stream;
use futures::StreamExt;
use log::debug;
use log::warn;
use serde::Deserialize;
use uuid::Uuid;

use super::TableRecord;
use super::query::encode_value;
use crate::error::Error;
use crate::model::Row;
use crate::model::Value;

// =============================================================================
// Events
// =============================================================================

/// Kind of row change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One row change on a table.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
    /// Row after the change. `None` for deletes.
    pub new: Option<Row>,
    /// Row before the change. Usually only the primary key is present.
    pub old: Option<Row>,
}

#[derive(Deserialize)]
struct RawChange {
    #[serde(rename = "eventType", alias = "type")]
    kind: ChangeKind,
    table: String,
    #[serde(default, alias = "record")]
    new: Option<Row>,
    #[serde(default, alias = "old_record")]
    old: Option<Row>,
}

impl ChangeEvent {
    /// Creates an insert event.
    pub fn insert(table: impl Into<String>, row: Row) -> Self {
        Self {
            table: table.into(),
            kind: ChangeKind::Insert,
            new: Some(row),
            old: None,
        }
    }

    /// Creates an update event.
    pub fn update(table: impl Into<String>, row: Row) -> Self {
        Self {
            table: table.into(),
            kind: ChangeKind::Update,
            new: Some(row),
            old: None,
        }
    }

    /// Creates a delete event carrying only the removed row's id.
    pub fn delete(table: impl Into<String>, id: Uuid) -> Self {
        Self {
            table: table.into(),
            kind: ChangeKind::Delete,
            new: None,
            old: Some(Row::new().set("id", id)),
        }
    }

    /// Parses a change payload.
    ///
    /// Empty `new`/`old` objects are treated as absent.
    pub fn from_json(payload: &str) -> Result<Self, Error> {
        let raw: RawChange = serde_json::from_str(payload)?;
        Ok(Self {
            table: raw.table,
            kind: raw.kind,
            new: raw.new.filter(|r| !r.is_empty()),
            old: raw.old.filter(|r| !r.is_empty()),
        })
    }

    /// Id of the affected row, taken from `new` then `old`.
    pub fn row_id(&self) -> Option<Uuid> {
        self.new
            .as_ref()
            .and_then(Row::id)
            .or_else(|| self.old.as_ref().and_then(Row::id))
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// A table channel, optionally narrowed to rows where `column == value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    table: String,
    column_eq: Option<(String, Value)>,
}

impl Subscription {
    /// Subscribes to every change on a table.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column_eq: None,
        }
    }

    /// Narrows the subscription to rows whose `column` equals `value`.
    pub fn where_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.column_eq = Some((column.into(), value.into()));
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Channel topic string.
    pub fn topic(&self) -> String {
        match &self.column_eq {
            Some((column, value)) => {
                format!("realtime:public:{}:{}=eq.{}", self.table, column, encode_value(value))
            }
            None => format!("realtime:public:{}", self.table),
        }
    }

    /// Whether a row falls inside this subscription.
    pub fn matches(&self, row: &Row) -> bool {
        match &self.column_eq {
            Some((column, value)) => row.get(column).is_some_and(|v| v.loosely_equals(value)),
            None => true,
        }
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.topic())
    }
}

// =============================================================================
// LiveCollection
// =============================================================================

type Comparator<T> = Box<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// An in-memory list kept in sync by applying change events.
///
/// Records are keyed by [`TableRecord::id`]. Deletes of unknown ids and
/// events for other tables are ignored.
pub struct LiveCollection<T: TableRecord> {
    subscription: Subscription,
    items: Vec<T>,
    order: Option<Comparator<T>>,
}

impl<T: TableRecord> LiveCollection<T> {
    /// Creates a collection from an initial load.
    pub fn new(subscription: Subscription, items: Vec<T>) -> Self {
        Self {
            subscription,
            items,
            order: None,
        }
    }

    /// Keeps items sorted by `compare` after every change.
    pub fn with_order(mut self, compare: impl Fn(&T, &T) -> Ordering + Send + Sync + 'static) -> Self {
        self.items.sort_by(&compare);
        self.order = Some(Box::new(compare));
        self
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Replaces the contents, e.g. after a reconnect.
    pub fn reset(&mut self, items: Vec<T>) {
        self.items = items;
        self.resort();
    }

    /// Applies one change. Returns whether the collection changed.
    pub fn apply(&mut self, event: &ChangeEvent) -> Result<bool, Error> {
        if event.table != self.subscription.table {
            return Ok(false);
        }

        match event.kind {
            ChangeKind::Insert | ChangeKind::Update => {
                let Some(row) = &event.new else {
                    return Ok(false);
                };
                if !self.subscription.matches(row) {
                    // Row moved out of scope.
                    return Ok(row.id().is_some_and(|id| self.remove(id)));
                }
                let record: T = row.clone().into_struct()?;
                self.upsert(record);
                Ok(true)
            }
            ChangeKind::Delete => Ok(event.row_id().is_some_and(|id| self.remove(id))),
        }
    }

    /// Applies events from a stream until it ends, calling `on_change` with
    /// the current items after each effective change.
    ///
    /// Malformed events are logged and skipped.
    pub async fn follow<S, F>(&mut self, events: S, mut on_change: F)
    where
        S: Stream<Item = ChangeEvent>,
        F: FnMut(&[T]),
    {
        let mut events = std::pin::pin!(events);
        while let Some(event) = events.next().await {
            match self.apply(&event) {
                Ok(true) => on_change(&self.items),
                Ok(false) => debug!("ignored {:?} on {}", event.kind, event.table),
                Err(e) => warn!("skipping malformed change on {}: {}", event.table, e),
            }
        }
    }

    fn upsert(&mut self, record: T) {
        let existing = record
            .id()
            .and_then(|id| self.items.iter().position(|item| item.id() == Some(id)));
        match existing {
            Some(index) => self.items[index] = record,
            None => self.items.push(record),
        }
        self.resort();
    }

    fn remove(&mut self, id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id() != Some(id));
        self.items.len() != before
    }

    fn resort(&mut self) {
        if let Some(order) = &self.order {
            self.items.sort_by(|a, b| order(a, b));
        }
    }
}

impl<T: TableRecord + fmt::Debug> fmt::Debug for LiveCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveCollection")
            .field("subscription", &self.subscription)
            .field("items", &self.items)
            .finish()
    }
}
