//! Handlers for `/rest/v1` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/rest/v1/query`   | Bearer; body `Query`; 200 rows |
//! | `POST` | `/rest/v1/{table}` | Bearer; body row object; 201 stored row |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use snowflake_core::{
  service::DataService,
  table::{Query, Row, Table},
};

use crate::{bearer::Bearer, body::JsonBody, error::ApiError};

/// `POST /rest/v1/query`
pub async fn query<S: DataService>(
  State(service): State<Arc<S>>,
  Bearer(token): Bearer,
  JsonBody(query): JsonBody<Query>,
) -> Result<Json<Vec<Row>>, ApiError> {
  Ok(Json(service.query(&token, &query).await?))
}

/// `POST /rest/v1/{table}`
pub async fn insert<S: DataService>(
  State(service): State<Arc<S>>,
  Path(table): Path<String>,
  Bearer(token): Bearer,
  JsonBody(row): JsonBody<Row>,
) -> Result<impl IntoResponse, ApiError> {
  let table = Table::parse(&table).ok_or_else(|| ApiError::NotFound(format!("table {table}")))?;
  let stored = service.insert(&token, table, row).await?;
  Ok((StatusCode::CREATED, Json(stored)))
}
