//! Row model shared by the table engine and the backend client

mod fields;
mod row;
mod value;

pub use fields::*;
pub use row::*;
pub use value::*;
