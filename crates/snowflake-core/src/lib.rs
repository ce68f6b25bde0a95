//! Core types and trait definitions for the Snowflake inventory dashboard.
//!
//! This crate is free of HTTP and database dependencies. It holds the data
//! model, the [`DataService`] boundary every backend implements, and the
//! client-side session, role and routing logic built on top of it.

// Trait methods spell out `impl Future + Send` in the trait and use native
// `async fn` in impls.
#![allow(async_fn_in_trait)]

pub mod collection;
pub mod dashboard;
pub mod error;
pub mod guard;
pub mod identity;
pub mod load;
pub mod record;
pub mod role;
pub mod service;
pub mod session;
pub mod table;
pub mod thread;

#[cfg(test)]
mod testing;

pub use collection::Collection;
pub use dashboard::{Dashboard, Overview, Page, Screen};
pub use error::{AuthError, ReadError, ValidationError, WriteError};
pub use guard::{GuardState, Navigation, Route, RouteGuard};
pub use identity::{AccessToken, Credentials, MIN_PASSWORD_LEN, Role, RoleAssignment, Session, UserId};
pub use load::{Gated, LoadState};
pub use record::{Draft, Record};
pub use role::{Authorizer, RoleResolver};
pub use service::DataService;
pub use session::SessionStore;
pub use table::{Filter, Order, Query, Row, Table};
pub use thread::DisputeThread;
