//! Domain services
//!
//! Each service borrows the client and exposes `list`, `create`, `update` and
//! `delete` for its entity plus the operations specific to it. Derived fields
//! are recomputed through [`crate::calc`] on every write, and input is checked
//! through [`crate::validation`] before anything is sent.
//!
//! Writes that span several requests undo their earlier steps when a later
//! step fails, so a failed create never leaves a half-written record behind.
//!
//! ```ignore
//! let bills = client.bills().list().await?;
//! let low = client.inventory().low_stock().await?;
//! ```

use log::warn;

use crate::BizdeskClient;
use crate::error::Error;

/// Implements [`crate::model::Fields`] for an entity by listing the struct
/// fields the table engine may read.
macro_rules! impl_fields {
    ($ty:ty { $($name:ident),* $(,)? }) => {
        impl $crate::model::Fields for $ty {
            fn field(&self, name: &str) -> Option<$crate::model::Value> {
                match name {
                    $(stringify!($name) => Some($crate::model::Value::from(self.$name.clone())),)*
                    _ => None,
                }
            }
        }
    };
}

/// `From<Enum> for Value` through the enum's `as_str`.
macro_rules! impl_value_from_enum {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for $crate::model::Value {
                fn from(v: $ty) -> Self {
                    $crate::model::Value::String(v.as_str().to_string())
                }
            }
        )*
    };
}

pub(crate) use impl_fields;
pub(crate) use impl_value_from_enum;

pub mod bills;
pub mod comments;
pub mod content;
pub mod inventory;
pub mod payroll;
pub mod products;
pub mod users;

impl_value_from_enum!(
    crate::calc::bill::BillStatus,
    crate::calc::inventory::MovementType,
    crate::calc::inventory::StockStatus,
);

impl BizdeskClient {
    pub fn bills(&self) -> bills::Bills<'_> {
        bills::Bills::new(self)
    }

    pub fn inventory(&self) -> inventory::Inventory<'_> {
        inventory::Inventory::new(self)
    }

    pub fn payroll(&self) -> payroll::Payroll<'_> {
        payroll::Payroll::new(self)
    }

    pub fn users(&self) -> users::Users<'_> {
        users::Users::new(self)
    }

    pub fn products(&self) -> products::Products<'_> {
        products::Products::new(self)
    }

    pub fn content(&self) -> content::ContentLibrary<'_> {
        content::ContentLibrary::new(self)
    }

    pub fn comments(&self) -> comments::TaskComments<'_> {
        comments::TaskComments::new(self)
    }
}

/// Logs a failed backend call at the call site and passes the result on.
pub(crate) fn logged<T>(operation: &str, result: Result<T, Error>) -> Result<T, Error> {
    result.inspect_err(|e| warn!("{} failed: {}", operation, e))
}

/// Runs a compensating step after a failed write, keeping the original error.
pub(crate) async fn compensate<F, Fut>(operation: &str, original: Error, undo: F) -> Error
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<(), Error>>,
{
    warn!("{} failed, rolling back: {}", operation, original);
    if let Err(e) = undo().await {
        warn!("rollback of {} failed: {}", operation, e);
    }
    original
}
