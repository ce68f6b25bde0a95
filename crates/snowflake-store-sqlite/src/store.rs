//! [`SqliteService`]: the SQLite implementation of [`DataService`].

use std::path::Path;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use rusqlite::{Connection, OptionalExtension as _};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use snowflake_core::{
  error::{AuthError, ReadError, ValidationError, WriteError},
  identity::{AccessToken, Credentials, Role, RoleAssignment, Session, UserId},
  service::DataService,
  table::{Query, Row, Table},
};

use crate::{
  Error, Result,
  credentials::{hash_password, new_token, token_digest, verify_password},
  encode::{RawSession, decode_dt, decode_role, decode_row, decode_uuid, encode_dt, encode_uuid},
  policy::{check_insert, normalise_row, read_scope, select},
  schema::SCHEMA,
};

/// Lifetime of a session when none is configured.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 3600;

/// Stored timestamps carry microseconds; so does every `now` we compare them
/// with.
fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

/// Result of an insert that runs under a token.
enum Verdict<T> {
  Allowed(T),
  NoSession,
  Denied(String),
  Invalid(ValidationError),
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Snowflake data service backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteService {
  conn:        tokio_rusqlite::Connection,
  session_ttl: Duration,
}

impl SqliteService {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let store = Self { conn, session_ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECS) };
    store
      .db(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(store)
  }

  /// How long sessions issued from now on stay valid.
  pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
    self.session_ttl = ttl;
    self
  }

  /// Run `f` on the connection thread.
  async fn db<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&mut Connection) -> tokio_rusqlite::Result<T> + Send + 'static,
    T: Send + 'static,
  {
    Ok(self.conn.call(f).await?)
  }

  /// Assign `role` to the account registered under `email`. Granting a role
  /// the user already holds is a no-op that returns the existing assignment.
  ///
  /// Role assignments are never writable through [`DataService::insert`];
  /// this is the only way in.
  pub async fn grant_role(&self, email: &str, role: Role) -> Result<RoleAssignment> {
    let email = email.trim().to_lowercase();
    let lookup = email.clone();
    let at_str = encode_dt(now());

    let granted: Option<(String, String)> = self
      .db(move |conn| {
        let user_id: Option<String> = conn
          .query_row(
            "SELECT user_id FROM users WHERE email = ?1",
            rusqlite::params![lookup],
            |r| r.get(0),
          )
          .optional()?;
        let Some(user_id) = user_id else {
          return Ok(None);
        };

        conn.execute(
          "INSERT OR IGNORE INTO user_roles (user_id, role, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![user_id, role.as_str(), at_str],
        )?;
        let created_at: String = conn.query_row(
          "SELECT created_at FROM user_roles WHERE user_id = ?1 AND role = ?2",
          rusqlite::params![user_id, role.as_str()],
          |r| r.get(0),
        )?;
        Ok(Some((user_id, created_at)))
      })
      .await?;

    let (user_id, created_at) = granted.ok_or(Error::UnknownUser(email))?;
    let assignment = RoleAssignment {
      user_id:    UserId(decode_uuid(&user_id)?),
      role,
      created_at: decode_dt(&created_at)?,
    };
    info!(user_id = %assignment.user_id, %role, "role granted");
    Ok(assignment)
  }

  /// Every role `user_id` holds, oldest first.
  pub async fn roles_of(&self, user_id: UserId) -> Result<Vec<RoleAssignment>> {
    let id_str = encode_uuid(user_id.0);
    let raws: Vec<(String, String)> = self
      .db(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT role, created_at FROM user_roles WHERE user_id = ?1 ORDER BY created_at, rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(role, created_at)| {
        Ok(RoleAssignment {
          user_id,
          role: decode_role(&role)?,
          created_at: decode_dt(&created_at)?,
        })
      })
      .collect()
  }

  /// Remove sessions that expired before now. Returns how many went.
  pub async fn purge_expired_sessions(&self) -> Result<usize> {
    let now_str = encode_dt(now());
    let purged = self
      .db(move |conn| {
        Ok(conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", rusqlite::params![now_str])?)
      })
      .await?;
    debug!(purged, "expired sessions purged");
    Ok(purged)
  }
}

// ─── Connection-thread helpers ───────────────────────────────────────────────

/// The live session behind a token digest, if any.
fn live_session(conn: &Connection, digest: &str, now: &str) -> rusqlite::Result<Option<RawSession>> {
  conn
    .query_row(
      "SELECT s.user_id, u.email, s.expires_at
       FROM sessions s
       JOIN users u ON u.user_id = s.user_id
       WHERE s.token_hash = ?1 AND s.expires_at > ?2",
      rusqlite::params![digest, now],
      |r| {
        Ok(RawSession {
          user_id:    r.get(0)?,
          email:      r.get(1)?,
          expires_at: r.get(2)?,
        })
      },
    )
    .optional()
}

fn is_admin(conn: &Connection, user_id: &str) -> rusqlite::Result<bool> {
  conn.query_row(
    "SELECT EXISTS (SELECT 1 FROM user_roles WHERE user_id = ?1 AND role = 'admin')",
    rusqlite::params![user_id],
    |r| r.get(0),
  )
}

/// Rewrite a caller-supplied `inspection_date` into the stored timestamp
/// form, or default it to `created_at`.
fn normalise_inspection_date(row: &mut Row, created_at: &str) -> Result<(), ValidationError> {
  let invalid = ValidationError::Invalid {
    field:  "inspection_date",
    reason: "must be an RFC 3339 timestamp",
  };
  let value = match row.get("inspection_date") {
    None | Some(Value::Null) => created_at.to_owned(),
    Some(Value::String(s)) => decode_dt(s).map(encode_dt).map_err(|_| invalid)?,
    Some(_) => return Err(invalid),
  };
  row.insert("inspection_date".into(), Value::String(value));
  Ok(())
}

// ─── DataService impl ────────────────────────────────────────────────────────

impl DataService for SqliteService {
  // ── Identity ──────────────────────────────────────────────────────────────

  async fn sign_up(&self, credentials: Credentials) -> Result<UserId, AuthError> {
    credentials.validate_for_sign_up()?;

    let user_id = UserId::new();
    let email = credentials.normalized_email();
    let password_hash = hash_password(&credentials.password)?;
    let id_str = encode_uuid(user_id.0);
    let at_str = encode_dt(now());

    let created = self
      .db(move |conn| {
        let taken = conn
          .query_row(
            "SELECT 1 FROM users WHERE email = ?1",
            rusqlite::params![email],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if taken {
          return Ok(false);
        }
        conn.execute(
          "INSERT INTO users (user_id, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, email, password_hash, at_str],
        )?;
        Ok(true)
      })
      .await?;

    if !created {
      return Err(AuthError::EmailTaken);
    }
    info!(%user_id, "account registered");
    Ok(user_id)
  }

  async fn sign_in(&self, credentials: Credentials) -> Result<Session, AuthError> {
    credentials.validate()?;

    let email = credentials.normalized_email();
    let lookup = email.clone();
    let account: Option<(String, String)> = self
      .db(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, password_hash FROM users WHERE email = ?1",
              rusqlite::params![lookup],
              |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?,
        )
      })
      .await?;

    let Some((id_str, password_hash)) = account else {
      debug!("sign-in for unknown email");
      return Err(AuthError::InvalidCredentials);
    };
    if !verify_password(&credentials.password, &password_hash) {
      debug!(user_id = %id_str, "sign-in with wrong password");
      return Err(AuthError::InvalidCredentials);
    }

    let user_id = UserId(decode_uuid(&id_str)?);
    let token = new_token();
    let created_at = now();
    let expires_at = created_at + self.session_ttl;

    let digest = token_digest(&token);
    let (created_str, expires_str) = (encode_dt(created_at), encode_dt(expires_at));
    self
      .db(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![digest, id_str, created_str, expires_str],
        )?;
        Ok(())
      })
      .await?;

    info!(%user_id, %expires_at, "session issued");
    Ok(Session { user_id, email, token: AccessToken::new(token), expires_at })
  }

  async fn sign_out<'a>(&'a self, token: &'a AccessToken) -> Result<(), AuthError> {
    let digest = token_digest(token.as_str());
    let revoked = self
      .db(move |conn| {
        Ok(conn.execute("DELETE FROM sessions WHERE token_hash = ?1", rusqlite::params![digest])?)
      })
      .await?;
    debug!(revoked, "session revoked");
    Ok(())
  }

  async fn get_session<'a>(
    &'a self,
    token: &'a AccessToken,
  ) -> Result<Option<Session>, AuthError> {
    let digest = token_digest(token.as_str());
    let now_str = encode_dt(now());
    let raw = self
      .db(move |conn| Ok(live_session(conn, &digest, &now_str)?))
      .await?;

    Ok(raw.map(|r| r.into_session(token.clone())).transpose()?)
  }

  // ── Data ──────────────────────────────────────────────────────────────────

  async fn query<'a>(
    &'a self,
    token: &'a AccessToken,
    query: &'a Query,
  ) -> Result<Vec<Row>, ReadError> {
    if let Some(column) = query.invalid_column() {
      return Err(ReadError::InvalidQuery(format!("invalid column name {column:?}")));
    }

    let digest = token_digest(token.as_str());
    let now_str = encode_dt(now());
    let query = query.clone();
    let table = query.table;

    let rows = self
      .db(move |conn| {
        let Some(session) = live_session(conn, &digest, &now_str)? else {
          return Ok(None);
        };
        let scope = read_scope(query.table, is_admin(conn, &session.user_id)?);
        let select = select(&query, scope, &session.user_id);

        let mut stmt = conn.prepare(&select.sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(select.params.iter()), |r| r.get::<_, String>(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Some(rows))
      })
      .await?;

    let Some(raws) = rows else {
      return Err(ReadError::Unauthenticated);
    };
    debug!(%table, count = raws.len(), "query");
    Ok(raws.iter().map(String::as_str).map(decode_row).collect::<Result<Vec<_>>>()?)
  }

  async fn insert<'a>(
    &'a self,
    token: &'a AccessToken,
    table: Table,
    row: Row,
  ) -> Result<Row, WriteError> {
    let digest = token_digest(token.as_str());
    let created_at = encode_dt(now());
    let record_id = encode_uuid(Uuid::new_v4());

    let verdict = self
      .db(move |conn| {
        let Some(session) = live_session(conn, &digest, &created_at)? else {
          return Ok(Verdict::NoSession);
        };
        let admin = is_admin(conn, &session.user_id)?;
        if let Err(reason) = check_insert(conn, table, &row, &session.user_id, admin)? {
          return Ok(Verdict::Denied(reason));
        }
        let mut row = match normalise_row(table, row) {
          Ok(row) => row,
          Err(e) => return Ok(Verdict::Invalid(e)),
        };

        row.insert(table.actor_column().into(), Value::String(session.user_id.clone()));
        row.insert("id".into(), Value::String(record_id.clone()));
        row.insert("created_at".into(), Value::String(created_at.clone()));
        if table == Table::FoodConditions
          && let Err(e) = normalise_inspection_date(&mut row, &created_at)
        {
          return Ok(Verdict::Invalid(e));
        }

        let data_json = Value::Object(row.clone()).to_string();
        conn.execute(
          "INSERT INTO records (table_name, record_id, actor_id, created_at, data_json)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![table.name(), record_id, session.user_id, created_at, data_json],
        )?;
        Ok(Verdict::Allowed(row))
      })
      .await?;

    match verdict {
      Verdict::Allowed(row) => {
        debug!(%table, "row inserted");
        Ok(row)
      }
      Verdict::NoSession => Err(WriteError::Unauthenticated),
      Verdict::Denied(reason) => {
        debug!(%table, %reason, "insert denied");
        Err(WriteError::Denied(reason))
      }
      Verdict::Invalid(e) => Err(WriteError::Validation(e)),
    }
  }
}
