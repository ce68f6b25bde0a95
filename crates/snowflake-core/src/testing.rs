//! In-memory [`DataService`] used by the unit tests of this crate.
//!
//! It keeps accounts, sessions and rows in a mutex and counts every query
//! and insert so tests can assert that validation failures never reach the
//! service. It applies no row-level policies beyond requiring a live token.

use std::{
  cmp::Ordering,
  collections::HashMap,
  sync::{
    Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering},
  },
};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::{
  error::{AuthError, ReadError, WriteError},
  identity::{AccessToken, Credentials, Role, Session, UserId},
  service::DataService,
  table::{Filter, Query, Row, Table},
};

#[derive(Default)]
struct Inner {
  accounts: HashMap<String, (UserId, String)>,
  sessions: HashMap<String, Session>,
  rows:     HashMap<Table, Vec<Row>>,
  last_at:  Option<DateTime<Utc>>,
}

pub struct MemoryService {
  inner:            Mutex<Inner>,
  pub fail_queries: AtomicBool,
  pub fail_inserts: AtomicBool,
  pub queries:      AtomicUsize,
  pub inserts:      AtomicUsize,
}

impl MemoryService {
  pub fn new() -> Self {
    Self {
      inner:        Mutex::new(Inner::default()),
      fail_queries: AtomicBool::new(false),
      fail_inserts: AtomicBool::new(false),
      queries:      AtomicUsize::new(0),
      inserts:      AtomicUsize::new(0),
    }
  }

  pub fn add_account(&self, email: &str, password: &str) -> UserId {
    let id = UserId::new();
    self
      .inner
      .lock()
      .unwrap()
      .accounts
      .insert(email.to_owned(), (id, password.to_owned()));
    id
  }

  pub fn grant(&self, user_id: UserId, role: Role) {
    let mut inner = self.inner.lock().unwrap();
    let at = next_timestamp(&mut inner);
    let mut row = Row::new();
    row.insert("user_id".into(), Value::String(user_id.to_string()));
    row.insert("role".into(), Value::String(role.as_str().into()));
    row.insert("created_at".into(), Value::String(at));
    inner.rows.entry(Table::UserRoles).or_default().push(row);
  }

  /// Forget every issued token, as if the backend revoked them.
  pub fn revoke_all(&self) { self.inner.lock().unwrap().sessions.clear(); }

  pub fn query_count(&self) -> usize { self.queries.load(AtomicOrdering::SeqCst) }

  pub fn insert_count(&self) -> usize { self.inserts.load(AtomicOrdering::SeqCst) }

  fn live_session(&self, token: &AccessToken) -> Option<Session> {
    let inner = self.inner.lock().unwrap();
    inner
      .sessions
      .get(token.as_str())
      .filter(|s| !s.is_expired())
      .cloned()
  }
}

fn next_timestamp(inner: &mut Inner) -> String {
  let mut at = Utc::now();
  if let Some(last) = inner.last_at
    && at <= last
  {
    at = last + Duration::microseconds(1);
  }
  inner.last_at = Some(at);
  at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
  match (a, b) {
    (Some(Value::String(x)), Some(Value::String(y))) => {
      match (x.parse::<DateTime<Utc>>(), y.parse::<DateTime<Utc>>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => x.cmp(y),
      }
    }
    (Some(Value::Number(x)), Some(Value::Number(y))) => x
      .as_f64()
      .partial_cmp(&y.as_f64())
      .unwrap_or(Ordering::Equal),
    (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
    (None, Some(_)) => Ordering::Less,
    (Some(_), None) => Ordering::Greater,
    _ => Ordering::Equal,
  }
}

impl DataService for MemoryService {
  async fn sign_up(&self, credentials: Credentials) -> Result<UserId, AuthError> {
    let mut inner = self.inner.lock().unwrap();
    let email = credentials.normalized_email();
    if inner.accounts.contains_key(&email) {
      return Err(AuthError::EmailTaken);
    }
    let id = UserId::new();
    inner.accounts.insert(email, (id, credentials.password));
    Ok(id)
  }

  async fn sign_in(&self, credentials: Credentials) -> Result<Session, AuthError> {
    let mut inner = self.inner.lock().unwrap();
    let email = credentials.normalized_email();
    let (user_id, password) = inner
      .accounts
      .get(&email)
      .cloned()
      .ok_or(AuthError::InvalidCredentials)?;
    if password != credentials.password {
      return Err(AuthError::InvalidCredentials);
    }
    let session = Session {
      user_id,
      email,
      token: AccessToken::new(Uuid::new_v4().to_string()),
      expires_at: Utc::now() + Duration::hours(1),
    };
    inner
      .sessions
      .insert(session.token.as_str().to_owned(), session.clone());
    Ok(session)
  }

  async fn sign_out<'a>(&'a self, token: &'a AccessToken) -> Result<(), AuthError> {
    self.inner.lock().unwrap().sessions.remove(token.as_str());
    Ok(())
  }

  async fn get_session<'a>(
    &'a self,
    token: &'a AccessToken,
  ) -> Result<Option<Session>, AuthError> {
    Ok(self.live_session(token))
  }

  async fn query<'a>(
    &'a self,
    token: &'a AccessToken,
    query: &'a Query,
  ) -> Result<Vec<Row>, ReadError> {
    self.queries.fetch_add(1, AtomicOrdering::SeqCst);
    if self.fail_queries.load(AtomicOrdering::SeqCst) {
      return Err(ReadError::Network("connection reset".into()));
    }
    if self.live_session(token).is_none() {
      return Err(ReadError::Unauthenticated);
    }

    let inner = self.inner.lock().unwrap();
    let mut rows: Vec<Row> = inner
      .rows
      .get(&query.table)
      .map(|rows| {
        rows
          .iter()
          .filter(|row| {
            query.filters.iter().all(|f| match f {
              Filter::Eq { column, value } => row.get(column) == Some(value),
            })
          })
          .cloned()
          .collect()
      })
      .unwrap_or_default();

    if let Some(order) = &query.order {
      rows.sort_by(|a, b| compare(a.get(&order.column), b.get(&order.column)));
      if !order.ascending {
        rows.reverse();
      }
    }
    if let Some(limit) = query.limit {
      rows.truncate(limit);
    }
    Ok(rows)
  }

  async fn insert<'a>(
    &'a self,
    token: &'a AccessToken,
    table: Table,
    mut row: Row,
  ) -> Result<Row, WriteError> {
    self.inserts.fetch_add(1, AtomicOrdering::SeqCst);
    if self.fail_inserts.load(AtomicOrdering::SeqCst) {
      return Err(WriteError::Denied("row-level policy".into()));
    }
    if self.live_session(token).is_none() {
      return Err(WriteError::Unauthenticated);
    }

    let mut inner = self.inner.lock().unwrap();
    let at = next_timestamp(&mut inner);
    row.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
    row.insert("created_at".into(), Value::String(at.clone()));
    if table == Table::FoodConditions && !row.contains_key("inspection_date") {
      row.insert("inspection_date".into(), Value::String(at));
    }
    inner.rows.entry(table).or_default().push(row.clone());
    Ok(row)
  }
}
