//! Client-side table views
//!
//! [`TableState`] turns an in-memory collection into a searched, filtered,
//! sorted and paginated view. [`export_csv`] renders rows to CSV text.

mod engine;
mod export;

use std::sync::Arc;

use crate::model::Value;

pub use engine::*;
pub use export::*;

/// A value mapping applied to a field before it is compared or exported.
pub type Transform = Arc<dyn Fn(&Value) -> Value + Send + Sync>;
