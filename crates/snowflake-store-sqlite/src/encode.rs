//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings with exactly six fractional digits, so
//! lexical order in SQL equals chronological order. UUIDs are hyphenated
//! lowercase strings. Resource rows are stored as compact JSON objects.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value as SqlValue;
use serde_json::Value;
use snowflake_core::{
  identity::{AccessToken, Role, Session, UserId},
  table::Row,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Role ────────────────────────────────────────────────────────────────────

pub fn decode_role(s: &str) -> Result<Role> {
  Role::parse(s).ok_or_else(|| Error::UnknownRole(s.to_owned()))
}

// ─── JSON rows ───────────────────────────────────────────────────────────────

pub fn decode_row(s: &str) -> Result<Row> {
  match serde_json::from_str(s)? {
    Value::Object(row) => Ok(row),
    _ => Err(Error::NotAnObject),
  }
}

/// The SQL value `json_extract` yields for `value`, for use as a bound
/// parameter. `None` for JSON `null`, which has to be matched with `IS NULL`.
pub fn sql_value(value: &Value) -> Option<SqlValue> {
  match value {
    Value::Null => None,
    Value::Bool(b) => Some(SqlValue::Integer(i64::from(*b))),
    Value::Number(n) => Some(match n.as_i64() {
      Some(i) => SqlValue::Integer(i),
      None => SqlValue::Real(n.as_f64().unwrap_or_default()),
    }),
    Value::String(s) => Some(SqlValue::Text(s.clone())),
    other => Some(SqlValue::Text(other.to_string())),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read from a `sessions` row joined with `users`.
pub struct RawSession {
  pub user_id:    String,
  pub email:      String,
  pub expires_at: String,
}

impl RawSession {
  pub fn into_session(self, token: AccessToken) -> Result<Session> {
    Ok(Session {
      user_id: UserId(decode_uuid(&self.user_id)?),
      email: self.email,
      token,
      expires_at: decode_dt(&self.expires_at)?,
    })
  }
}
