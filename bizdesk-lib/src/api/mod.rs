//! Backend operations: tables, RPC, storage, auth user, realtime

mod execute;
pub mod query;
mod realtime;
mod rpc;
mod storage;
mod tables;
mod user;

pub use realtime::*;
pub use rpc::*;
pub use storage::*;
pub use tables::*;
pub use user::*;
