//! Business dashboard client library
//!
//! Data access for a small-business back office (bills, inventory, payroll,
//! users, products, content library, task comments) over a hosted
//! PostgREST-style backend, plus the pure pieces the views are built from:
//! the table state engine, CSV export, per-entity calculations, validation
//! rules, debounced auto-save and design tokens.

pub mod api;
pub mod auth;
pub mod autosave;
pub mod calc;
pub mod config;
pub mod error;
pub mod model;
pub mod retry;
pub mod services;
pub mod table;
pub mod theme;
pub mod validation;

mod client;

pub use client::*;
pub use config::ClientConfig;
pub use error::Error;
