//! The `DataService` trait: the authenticated backend every other component
//! talks to.
//!
//! The trait is implemented by `snowflake-store-sqlite` (in process) and by
//! the CLI's HTTP client. Row-level authorization lives behind this trait;
//! callers treat any denial as an ordinary read or write error.

use std::future::Future;

use crate::{
  error::{AuthError, ReadError, WriteError},
  identity::{AccessToken, Credentials, Session, UserId},
  table::{Query, Row, Table},
};

/// Abstraction over an authentication + tabular data backend.
///
/// All methods return `Send` futures so implementations can be shared across
/// a multi-threaded runtime (e.g. behind an axum router).
pub trait DataService: Send + Sync {
  // ── Identity ──────────────────────────────────────────────────────────

  /// Register a new password account. Does not start a session.
  fn sign_up(
    &self,
    credentials: Credentials,
  ) -> impl Future<Output = Result<UserId, AuthError>> + Send + '_;

  /// Exchange credentials for a fresh [`Session`].
  fn sign_in(
    &self,
    credentials: Credentials,
  ) -> impl Future<Output = Result<Session, AuthError>> + Send + '_;

  /// Revoke `token`. Revoking an unknown token is not an error.
  fn sign_out<'a>(
    &'a self,
    token: &'a AccessToken,
  ) -> impl Future<Output = Result<(), AuthError>> + Send + 'a;

  /// Resolve `token` to its session; `None` if unknown or expired.
  fn get_session<'a>(
    &'a self,
    token: &'a AccessToken,
  ) -> impl Future<Output = Result<Option<Session>, AuthError>> + Send + 'a;

  // ── Data ──────────────────────────────────────────────────────────────

  /// Return the rows of `query.table` visible to the token's user.
  fn query<'a>(
    &'a self,
    token: &'a AccessToken,
    query: &'a Query,
  ) -> impl Future<Output = Result<Vec<Row>, ReadError>> + Send + 'a;

  /// Insert one row and return it as stored, with the server-assigned `id`
  /// and `created_at` filled in.
  fn insert<'a>(
    &'a self,
    token: &'a AccessToken,
    table: Table,
    row: Row,
  ) -> impl Future<Output = Result<Row, WriteError>> + Send + 'a;
}
