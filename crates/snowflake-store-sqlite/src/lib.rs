//! SQLite backend for the Snowflake data service.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Accounts, bearer sessions, role
//! assignments and the row-level policies all live here.

mod credentials;
mod encode;
mod policy;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{DEFAULT_SESSION_TTL_SECS, SqliteService};

#[cfg(test)]
mod tests;
