//! Handlers for `/auth/v1` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/v1/signup`  | Body: `Credentials`; 201 `{"user_id"}` |
//! | `POST` | `/auth/v1/token`   | Body: `Credentials`; 200 `Session` |
//! | `POST` | `/auth/v1/logout`  | Bearer; 204 |
//! | `GET`  | `/auth/v1/session` | Bearer; 200 `Session`, 401 if not live |

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use snowflake_core::{
  error::AuthError,
  identity::{Credentials, Session},
  service::DataService,
};

use crate::{bearer::Bearer, body::JsonBody, error::ApiError};

/// `POST /auth/v1/signup`
pub async fn sign_up<S: DataService>(
  State(service): State<Arc<S>>,
  JsonBody(credentials): JsonBody<Credentials>,
) -> Result<impl IntoResponse, ApiError> {
  let user_id = service.sign_up(credentials).await?;
  Ok((StatusCode::CREATED, Json(json!({ "user_id": user_id }))))
}

/// `POST /auth/v1/token`
pub async fn sign_in<S: DataService>(
  State(service): State<Arc<S>>,
  JsonBody(credentials): JsonBody<Credentials>,
) -> Result<Json<Session>, ApiError> {
  Ok(Json(service.sign_in(credentials).await?))
}

/// `POST /auth/v1/logout`
pub async fn sign_out<S: DataService>(
  State(service): State<Arc<S>>,
  Bearer(token): Bearer,
) -> Result<StatusCode, ApiError> {
  service.sign_out(&token).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /auth/v1/session`
pub async fn session<S: DataService>(
  State(service): State<Arc<S>>,
  Bearer(token): Bearer,
) -> Result<Json<Session>, ApiError> {
  service
    .get_session(&token)
    .await?
    .map(Json)
    .ok_or(ApiError::Auth(AuthError::SessionExpired))
}
