//! JSON/HTTP surface for Snowflake.
//!
//! Exposes an axum [`Router`] backed by any [`DataService`]. Every data
//! endpoint takes a bearer token and passes it straight through, so the
//! service's row-level policies decide what each caller sees. TLS and
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = snowflake_api::api_router(Arc::new(service));
//! axum::serve(listener, app).await?;
//! ```

pub mod auth;
pub mod bearer;
pub mod body;
pub mod error;
pub mod rest;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use snowflake_core::service::DataService;
use tower_http::trace::TraceLayer;

pub use bearer::Bearer;
pub use body::JsonBody;
pub use error::ApiError;

/// Build the full API router for `service`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(service: Arc<S>) -> Router<()>
where
  S: DataService + 'static,
{
  Router::new()
    // Identity
    .route("/auth/v1/signup", post(auth::sign_up::<S>))
    .route("/auth/v1/token", post(auth::sign_in::<S>))
    .route("/auth/v1/logout", post(auth::sign_out::<S>))
    .route("/auth/v1/session", get(auth::session::<S>))
    // Data
    .route("/rest/v1/query", post(rest::query::<S>))
    .route("/rest/v1/{table}", post(rest::insert::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(service)
}
