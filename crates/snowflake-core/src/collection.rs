//! [`Collection`]: list and create for one record type, scoped to the
//! current session.

use std::marker::PhantomData;

use serde_json::Value;
use tracing::debug;

use crate::{
  error::{ReadError, WriteError},
  identity::Session,
  record::{Draft, Record},
  role::{Authorizer, RoleResolver},
  service::DataService,
  session::SessionStore,
  table::{Query, Row},
};

pub struct Collection<S, R> {
  sessions: SessionStore<S>,
  roles:    RoleResolver<S>,
  _record:  PhantomData<fn() -> R>,
}

impl<S, R> Clone for Collection<S, R> {
  fn clone(&self) -> Self {
    Self {
      sessions: self.sessions.clone(),
      roles:    self.roles.clone(),
      _record:  PhantomData,
    }
  }
}

pub(crate) fn decode<R: Record>(row: Row) -> Result<R, serde_json::Error> {
  serde_json::from_value(Value::Object(row))
}

impl<S: DataService, R: Record> Collection<S, R> {
  pub fn new(sessions: SessionStore<S>, roles: RoleResolver<S>) -> Self {
    Self { sessions, roles, _record: PhantomData }
  }

  /// Every record visible to the current session, in the record's list
  /// order.
  pub async fn list(&self) -> Result<Vec<R>, ReadError> {
    let session = self.sessions.current().ok_or(ReadError::Unauthenticated)?;
    let query = Query::new(R::TABLE).order_by(R::ORDER_COLUMN, R::ASCENDING);
    self.fetch(&session, &query).await
  }

  pub(crate) async fn fetch(&self, session: &Session, query: &Query) -> Result<Vec<R>, ReadError> {
    let rows = self.sessions.service().query(&session.token, query).await?;
    debug!(table = %R::TABLE, count = rows.len(), "fetched");
    Ok(rows.into_iter().map(decode).collect::<Result<Vec<R>, _>>()?)
  }

  /// Validate `draft`, stamp the acting identity and insert it.
  ///
  /// Validation, session and role checks all happen before the insert is
  /// sent.
  pub async fn create(&self, draft: R::Draft) -> Result<R, WriteError> {
    draft.validate()?;
    let session = self.sessions.current().ok_or(WriteError::Unauthenticated)?;

    if let Some(role) = R::CREATE_ROLE
      && !self.roles.authorize(&session.user_id, role).await
    {
      return Err(WriteError::Forbidden(role));
    }

    let Value::Object(mut row) = serde_json::to_value(&draft)? else {
      return Err(WriteError::Backend("draft did not serialise to an object".into()));
    };
    row.insert(
      R::TABLE.actor_column().to_owned(),
      Value::String(session.user_id.to_string()),
    );

    let stored = self
      .sessions
      .service()
      .insert(&session.token, R::TABLE, row)
      .await?;
    debug!(table = %R::TABLE, user_id = %session.user_id, "inserted");
    Ok(decode(stored)?)
  }
}
