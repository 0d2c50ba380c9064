//! Query building for table reads, updates, and deletes.
//!
//! # Shared Types
//!
//! - [`Filter`] - Row predicates rendered as PostgREST query parameters
//! - [`OrderBy`] - Ordering of query results
//! - [`Range`] - Offset/limit window
//! - [`Page`] - A page of query results with the exact total count
//!
//! [`Query`] ties them together and renders the query string.

mod filter;
mod order;
mod page;
mod params;

pub use filter::Filter;
pub use order::Direction;
pub use order::Nulls;
pub use order::OrderBy;
pub use page::Page;
pub use page::Range;
pub(crate) use page::parse_content_range;
pub use params::Query;
pub use params::encode_value;
