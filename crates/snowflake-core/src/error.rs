//! Error taxonomy for `snowflake-core`.
//!
//! Every failure a caller can see falls into one of three families: signing
//! in and out ([`AuthError`]), reading ([`ReadError`]) and writing
//! ([`WriteError`]). None of them is fatal; callers surface the message and
//! let the user retry.

use thiserror::Error;

use crate::identity::Role;

/// A form field that failed client-side validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("{0} is required")]
  Required(&'static str),

  #[error("{field} {reason}")]
  Invalid {
    field:  &'static str,
    reason: &'static str,
  },

  /// The row does not have the shape of the table's form.
  #[error("malformed row: {0}")]
  Malformed(String),
}

#[derive(Debug, Error)]
pub enum AuthError {
  #[error("invalid email or password")]
  InvalidCredentials,

  #[error("an account with this email already exists")]
  EmailTaken,

  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error("session expired")]
  SessionExpired,

  #[error("network error: {0}")]
  Network(String),

  #[error("backend error: {0}")]
  Backend(String),
}

#[derive(Debug, Error)]
pub enum ReadError {
  #[error("not signed in")]
  Unauthenticated,

  /// A row-level policy refused the read.
  #[error("access denied: {0}")]
  Denied(String),

  #[error("invalid query: {0}")]
  InvalidQuery(String),

  #[error("malformed record: {0}")]
  Decode(#[from] serde_json::Error),

  #[error("network error: {0}")]
  Network(String),

  #[error("backend error: {0}")]
  Backend(String),
}

#[derive(Debug, Error)]
pub enum WriteError {
  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error("not signed in")]
  Unauthenticated,

  /// The acting identity lacks the role the form requires.
  #[error("the {0} role is required")]
  Forbidden(Role),

  /// A row-level policy refused the insert.
  #[error("access denied: {0}")]
  Denied(String),

  #[error("malformed record: {0}")]
  Decode(#[from] serde_json::Error),

  #[error("network error: {0}")]
  Network(String),

  #[error("backend error: {0}")]
  Backend(String),
}

/// A refetch after a successful write failed; the write itself stands.
impl From<ReadError> for WriteError {
  fn from(e: ReadError) -> Self {
    match e {
      ReadError::Unauthenticated => Self::Unauthenticated,
      ReadError::Denied(m) => Self::Denied(m),
      ReadError::InvalidQuery(m) => Self::Backend(m),
      ReadError::Decode(e) => Self::Decode(e),
      ReadError::Network(m) => Self::Network(m),
      ReadError::Backend(m) => Self::Backend(m),
    }
  }
}
