//! `Authorization: Bearer <token>` extractor.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use snowflake_core::identity::AccessToken;

use crate::error::ApiError;

/// The caller's access token. Whether it is live is the service's call.
pub struct Bearer(pub AccessToken);

/// Pull a bearer token out of `headers`.
pub fn bearer_token(headers: &HeaderMap) -> Option<AccessToken> {
  let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
  let token = value.strip_prefix("Bearer ")?.trim();
  (!token.is_empty()).then(|| AccessToken::new(token))
}

impl<S: Send + Sync> FromRequestParts<S> for Bearer {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    bearer_token(&parts.headers)
      .map(Bearer)
      .ok_or(ApiError::MissingToken)
  }
}
