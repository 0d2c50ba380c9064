//! Table operations
//!
//! Generic select/insert/update/delete against `/rest/v1/{table}`. Typed
//! entities implement [`TableRecord`]; untyped access goes through [`Row`].
//!
//! # Example
//!
//! ```ignore
//! use bizdesk_lib::api::query::{Filter, OrderBy, Query};
//!
//! let open: Vec<Bill> = client
//!     .list(&Query::new()
//!         .filter(Filter::neq("status", "paid"))
//!         .order(OrderBy::desc("due_date")))
//!     .await?;
//! ```

use async_stream::try_stream;
use futures::Stream;
use reqwest::Method;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::execute::read_json;
use super::execute::to_body;
use super::query::Filter;
use super::query::Page;
use super::query::Query;
use super::query::Range;
use super::query::parse_content_range;
use crate::BizdeskClient;
use crate::error::Error;
use crate::model::Row;

// =============================================================================
// TableRecord
// =============================================================================

/// A typed entity stored in a named backend table.
pub trait TableRecord: Serialize + DeserializeOwned + Send + Sync {
    /// Name of the backing table.
    const TABLE: &'static str;

    /// Primary key, `None` before the row has been inserted.
    fn id(&self) -> Option<Uuid>;
}

/// Selects what an insert or update sends back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Returning {
    Representation,
    Minimal,
}

impl BizdeskClient {
    fn write_headers(&self, returning: Returning) -> HeaderMap {
        let mut headers = self.default_headers();
        let prefer = match returning {
            Returning::Representation => "return=representation",
            Returning::Minimal => "return=minimal",
        };
        headers.insert("Prefer", HeaderValue::from_static(prefer));
        headers
    }

    fn table_url(&self, table: &str, query: &Query) -> String {
        let qs = query.to_query_string();
        if qs.is_empty() {
            self.rest_url(table)
        } else {
            format!("{}?{}", self.rest_url(table), qs)
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Selects rows from any table as untyped [`Row`]s.
    pub async fn select_rows(&self, table: &str, query: &Query) -> Result<Vec<Row>, Error> {
        self.select(table, query).await
    }

    /// Selects rows from a table, deserializing into `T`.
    pub async fn select<T: DeserializeOwned>(&self, table: &str, query: &Query) -> Result<Vec<T>, Error> {
        let url = self.table_url(table, query);
        let response = self.request(Method::GET, &url, None, None).await?;
        read_json(response).await
    }

    /// Selects one window of rows together with the exact total count.
    ///
    /// The count is taken from the `Content-Range` response header.
    pub async fn select_page<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
    ) -> Result<Page<T>, Error> {
        let query = query.clone().count_exact();
        let offset = query.get_range().map(|r| r.offset).unwrap_or(0);
        let url = self.table_url(table, &query);

        let mut headers = self.default_headers();
        headers.insert("Prefer", HeaderValue::from_static("count=exact"));

        let response = self.request(Method::GET, &url, Some(headers), None).await?;
        let total = response
            .headers()
            .get("Content-Range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range);
        let items: Vec<T> = read_json(response).await?;

        Ok(Page::new(items, offset, total))
    }

    /// Streams every matching row, fetching `page_size` rows per request.
    ///
    /// Any range on `query` is replaced by the paging window.
    pub fn select_all<'a, T>(
        &'a self,
        table: &'a str,
        query: Query,
        page_size: usize,
    ) -> impl Stream<Item = Result<T, Error>> + 'a
    where
        T: DeserializeOwned + 'a,
    {
        let page_size = page_size.max(1);
        try_stream! {
            let mut page = 1;
            loop {
                let window = query.clone().range(Range::page(page, page_size));
                let rows: Vec<T> = self.select(table, &window).await?;
                let fetched = rows.len();
                for row in rows {
                    yield row;
                }
                if fetched < page_size {
                    break;
                }
                page += 1;
            }
        }
    }

    /// Lists records of a typed table.
    pub async fn list<T: TableRecord>(&self, query: &Query) -> Result<Vec<T>, Error> {
        self.select(T::TABLE, query).await
    }

    /// Fetches a single record by id.
    pub async fn get_by_id<T: TableRecord>(&self, id: Uuid) -> Result<T, Error> {
        let query = Query::new().filter(Filter::eq("id", id)).limit(1);
        self.select::<T>(T::TABLE, &query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(T::TABLE, id))
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Inserts one record and returns the stored row.
    pub async fn insert<T: TableRecord, P: Serialize + ?Sized>(&self, payload: &P) -> Result<T, Error> {
        let mut rows: Vec<T> = self.insert_rows(T::TABLE, payload).await?;
        rows.pop()
            .ok_or_else(|| Error::InvalidOperation(format!("insert into {} returned no row", T::TABLE)))
    }

    /// Inserts several records in one request.
    pub async fn insert_many<T: TableRecord, P: Serialize>(&self, payloads: &[P]) -> Result<Vec<T>, Error> {
        if payloads.is_empty() {
            return Ok(Vec::new());
        }
        self.insert_rows(T::TABLE, payloads).await
    }

    /// Inserts into any table; `payload` may be an object or an array.
    pub async fn insert_rows<T: DeserializeOwned, P: Serialize + ?Sized>(
        &self,
        table: &str,
        payload: &P,
    ) -> Result<Vec<T>, Error> {
        let url = self.rest_url(table);
        let headers = self.write_headers(Returning::Representation);
        let response = self
            .request(Method::POST, &url, Some(headers), Some(to_body(payload)?))
            .await?;
        read_json(response).await
    }

    /// Patches a record by id and returns the updated row.
    pub async fn update<T: TableRecord, P: Serialize + ?Sized>(&self, id: Uuid, patch: &P) -> Result<T, Error> {
        let query = Query::new().filter(Filter::eq("id", id));
        self.update_where::<T, P>(T::TABLE, &query, patch)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(T::TABLE, id))
    }

    /// Patches every row matching `query`.
    ///
    /// An unfiltered update is refused.
    pub async fn update_where<T: DeserializeOwned, P: Serialize + ?Sized>(
        &self,
        table: &str,
        query: &Query,
        patch: &P,
    ) -> Result<Vec<T>, Error> {
        if !query.has_filters() {
            return Err(Error::InvalidOperation(format!("refusing unfiltered update on {table}")));
        }
        let url = self.table_url(table, query);
        let headers = self.write_headers(Returning::Representation);
        let response = self
            .request(Method::PATCH, &url, Some(headers), Some(to_body(patch)?))
            .await?;
        read_json(response).await
    }

    /// Deletes a record by id.
    pub async fn delete<T: TableRecord>(&self, id: Uuid) -> Result<(), Error> {
        self.delete_where(T::TABLE, &Query::new().filter(Filter::eq("id", id)))
            .await
    }

    /// Deletes every row matching `query`.
    ///
    /// An unfiltered delete is refused.
    pub async fn delete_where(&self, table: &str, query: &Query) -> Result<(), Error> {
        if !query.has_filters() {
            return Err(Error::InvalidOperation(format!("refusing unfiltered delete on {table}")));
        }
        let url = self.table_url(table, query);
        let headers = self.write_headers(Returning::Minimal);
        self.request(Method::DELETE, &url, Some(headers), None).await?;
        Ok(())
    }
}
