//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error body is `{"error": <message>, "code": <kind>}`. Clients match
//! on `code`; the message is for humans.

use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use snowflake_core::error::{AuthError, ReadError, WriteError};
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("missing or malformed bearer token")]
  MissingToken,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Auth(#[from] AuthError),

  #[error(transparent)]
  Read(#[from] ReadError),

  #[error(transparent)]
  Write(#[from] WriteError),
}

impl ApiError {
  /// HTTP status and the machine-readable `code` for this error.
  pub fn classify(&self) -> (StatusCode, &'static str) {
    match self {
      ApiError::MissingToken => (StatusCode::UNAUTHORIZED, "unauthenticated"),
      ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
      ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),

      ApiError::Auth(e) => match e {
        AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
        AuthError::SessionExpired => (StatusCode::UNAUTHORIZED, "unauthenticated"),
        AuthError::EmailTaken => (StatusCode::CONFLICT, "email_taken"),
        AuthError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
        AuthError::Network(_) => (StatusCode::BAD_GATEWAY, "network"),
        AuthError::Backend(_) => (StatusCode::INTERNAL_SERVER_ERROR, "backend"),
      },

      ApiError::Read(e) => match e {
        ReadError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
        ReadError::Denied(_) => (StatusCode::FORBIDDEN, "denied"),
        ReadError::InvalidQuery(_) => (StatusCode::BAD_REQUEST, "invalid_query"),
        ReadError::Network(_) => (StatusCode::BAD_GATEWAY, "network"),
        ReadError::Decode(_) | ReadError::Backend(_) => {
          (StatusCode::INTERNAL_SERVER_ERROR, "backend")
        }
      },

      ApiError::Write(e) => match e {
        WriteError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
        WriteError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
        WriteError::Forbidden(_) | WriteError::Denied(_) => (StatusCode::FORBIDDEN, "denied"),
        WriteError::Network(_) => (StatusCode::BAD_GATEWAY, "network"),
        WriteError::Decode(_) | WriteError::Backend(_) => {
          (StatusCode::INTERNAL_SERVER_ERROR, "backend")
        }
      },
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, code) = self.classify();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    let mut res = (status, Json(json!({ "error": self.to_string(), "code": code }))).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Bearer realm=\"snowflake\""),
      );
    }
    res
  }
}
