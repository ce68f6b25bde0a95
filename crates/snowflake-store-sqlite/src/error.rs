//! Error type for `snowflake-store-sqlite`, and its mapping onto the core
//! error taxonomy at the `DataService` boundary.

use snowflake_core::error::{AuthError, ReadError, WriteError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("password hashing failed: {0}")]
  PasswordHash(String),

  #[error("unknown role: {0:?}")]
  UnknownRole(String),

  #[error("stored row is not a JSON object")]
  NotAnObject,

  #[error("no account with email {0:?}")]
  UnknownUser(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for AuthError {
  fn from(e: Error) -> Self { AuthError::Backend(e.to_string()) }
}

impl From<Error> for ReadError {
  fn from(e: Error) -> Self {
    match e {
      Error::Json(e) => ReadError::Decode(e),
      other => ReadError::Backend(other.to_string()),
    }
  }
}

impl From<Error> for WriteError {
  fn from(e: Error) -> Self {
    match e {
      Error::Json(e) => WriteError::Decode(e),
      other => WriteError::Backend(other.to_string()),
    }
  }
}
