//! [`SessionStore`]: the single owner of the current session.
//!
//! The store is an explicit handle, not a global: the dashboard creates one
//! and passes clones to everything that needs the acting identity. Changes
//! are broadcast over a [`tokio::sync::watch`] channel so the route guard
//! can react to sign-outs and expiry as they happen.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::{
  error::AuthError,
  identity::{AccessToken, Credentials, Session, UserId},
  service::DataService,
};

pub struct SessionStore<S> {
  service: Arc<S>,
  state:   Arc<watch::Sender<Option<Session>>>,
}

impl<S> Clone for SessionStore<S> {
  fn clone(&self) -> Self {
    Self { service: Arc::clone(&self.service), state: Arc::clone(&self.state) }
  }
}

impl<S: DataService> SessionStore<S> {
  /// Create a store with no session.
  pub fn new(service: Arc<S>) -> Self {
    let (tx, _rx) = watch::channel(None);
    Self { service, state: Arc::new(tx) }
  }

  pub fn service(&self) -> &Arc<S> { &self.service }

  /// The live session, or `None` if signed out or expired.
  pub fn current(&self) -> Option<Session> { self.current_at(Utc::now()) }

  /// Like [`Self::current`] against an explicit clock. An expired session is
  /// dropped here and subscribers see the change.
  pub fn current_at(&self, now: DateTime<Utc>) -> Option<Session> {
    let mut live = None;
    self.state.send_if_modified(|slot| match slot {
      Some(session) if session.is_expired_at(now) => {
        debug!(user_id = %session.user_id, "session expired");
        *slot = None;
        true
      }
      Some(session) => {
        live = Some(session.clone());
        false
      }
      None => false,
    });
    live
  }

  /// Receive every session change from now on.
  pub fn subscribe(&self) -> watch::Receiver<Option<Session>> { self.state.subscribe() }

  /// Register an account. The new user still has to sign in.
  pub async fn sign_up(&self, credentials: Credentials) -> Result<UserId, AuthError> {
    credentials.validate_for_sign_up()?;
    let user_id = self.service.sign_up(credentials).await?;
    info!(%user_id, "account created");
    Ok(user_id)
  }

  pub async fn sign_in(&self, credentials: Credentials) -> Result<Session, AuthError> {
    credentials.validate()?;
    let session = self.service.sign_in(credentials).await?;
    info!(user_id = %session.user_id, "signed in");
    self.state.send_replace(Some(session.clone()));
    Ok(session)
  }

  /// Drop the local session, then revoke it remotely. A remote failure is
  /// returned but the user stays signed out locally.
  pub async fn sign_out(&self) -> Result<(), AuthError> {
    let Some(previous) = self.state.send_replace(None) else {
      return Ok(());
    };
    info!(user_id = %previous.user_id, "signed out");
    self.service.sign_out(&previous.token).await
  }

  /// Resume a persisted token. Unknown or expired tokens leave the store
  /// signed out.
  pub async fn restore(&self, token: AccessToken) -> Result<Option<Session>, AuthError> {
    let session = self
      .service
      .get_session(&token)
      .await?
      .filter(|s| !s.is_expired());
    debug!(restored = session.is_some(), "session restore");
    self.state.send_replace(session.clone());
    Ok(session)
  }
}
