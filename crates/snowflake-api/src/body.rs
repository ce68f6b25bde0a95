//! JSON body extractor whose rejections go through [`ApiError`].

use axum::extract::FromRequest;

use crate::error::ApiError;

/// Like [`axum::Json`], but a missing, malformed or mistyped body answers
/// `400` with the usual `{"error", "code"}` payload.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);
