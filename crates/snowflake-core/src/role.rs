//! Role resolution and the [`Authorizer`] capability.
//!
//! Role checks fail closed: no session, no matching assignment, or any
//! backend error all answer `false`.

use std::future::Future;

use tracing::{debug, warn};

use crate::{
  identity::{Role, UserId},
  service::DataService,
  session::SessionStore,
  table::{Query, Table},
};

/// The one authorization question admin-gated code asks.
pub trait Authorizer: Send + Sync {
  fn authorize<'a>(
    &'a self,
    identity: &'a UserId,
    required: Role,
  ) -> impl Future<Output = bool> + Send + 'a;
}

/// Answers role questions with a point lookup on `user_roles`.
///
/// Nothing is cached; each call reads the table again.
pub struct RoleResolver<S> {
  sessions: SessionStore<S>,
}

impl<S> Clone for RoleResolver<S> {
  fn clone(&self) -> Self { Self { sessions: self.sessions.clone() } }
}

impl<S: DataService> RoleResolver<S> {
  pub fn new(sessions: SessionStore<S>) -> Self { Self { sessions } }

  pub async fn has_role(&self, user_id: &UserId, role: Role) -> bool {
    let Some(session) = self.sessions.current() else {
      return false;
    };

    let query = Query::new(Table::UserRoles)
      .eq("user_id", user_id.to_string())
      .eq("role", role.as_str())
      .limit(1);

    match self.sessions.service().query(&session.token, &query).await {
      Ok(rows) => {
        let granted = !rows.is_empty();
        debug!(%user_id, %role, granted, "role lookup");
        granted
      }
      Err(e) => {
        warn!(%user_id, %role, error = %e, "role lookup failed; treating as not granted");
        false
      }
    }
  }
}

impl<S: DataService> Authorizer for RoleResolver<S> {
  async fn authorize<'a>(&'a self, identity: &'a UserId, required: Role) -> bool {
    self.has_role(identity, required).await
  }
}
