//! Routes and the [`RouteGuard`] that decides what a session may see.
//!
//! The guard is a three-state machine (`Unknown` → `Authenticated` |
//! `Unauthenticated`). It re-reads the session on every navigation and also
//! follows the session subscription, so an external sign-out or an expiry
//! moves it to `Unauthenticated` without a navigation.

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;

use crate::{
  identity::{Role, Session},
  service::DataService,
  session::SessionStore,
};

// ─── Route ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
  Home,
  Products,
  Invoices,
  Returns,
  FoodCondition,
  Rejected,
  Auth,
}

impl Route {
  pub const ALL: [Route; 7] = [
    Route::Home,
    Route::Products,
    Route::Invoices,
    Route::Returns,
    Route::FoodCondition,
    Route::Rejected,
    Route::Auth,
  ];

  pub fn path(&self) -> &'static str {
    match self {
      Self::Home => "/",
      Self::Products => "/products",
      Self::Invoices => "/invoices",
      Self::Returns => "/returns",
      Self::FoodCondition => "/food-condition",
      Self::Rejected => "/rejected",
      Self::Auth => "/auth",
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      Self::Home => "Home",
      Self::Products => "Products",
      Self::Invoices => "Invoices",
      Self::Returns => "Returns",
      Self::FoodCondition => "Food Condition",
      Self::Rejected => "Rejected Items",
      Self::Auth => "Sign in",
    }
  }

  /// Match a location path. Query strings, fragments and a trailing slash
  /// are ignored.
  pub fn parse(location: &str) -> Option<Self> {
    let path = location
      .split(['?', '#'])
      .next()
      .unwrap_or_default()
      .trim_end_matches('/');
    let path = if path.is_empty() { "/" } else { path };
    Self::ALL.into_iter().find(|r| r.path() == path)
  }

  /// Everything except the sign-in view needs a session.
  pub fn is_protected(&self) -> bool { !matches!(self, Self::Auth) }

  /// Role the page's content is gated behind, beyond a session.
  pub fn required_role(&self) -> Option<Role> {
    match self {
      Self::Rejected => Some(Role::Admin),
      _ => None,
    }
  }
}

// ─── Guard ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
  Unknown,
  Authenticated(Session),
  Unauthenticated,
}

impl GuardState {
  pub fn session(&self) -> Option<&Session> {
    match self {
      Self::Authenticated(s) => Some(s),
      _ => None,
    }
  }
}

/// What the shell should do with a requested location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
  Render(Route),
  Redirect(Route),
  NotFound(String),
}

pub struct RouteGuard<S> {
  sessions: SessionStore<S>,
  changes:  watch::Receiver<Option<Session>>,
  state:    GuardState,
}

impl<S: DataService> RouteGuard<S> {
  pub fn new(sessions: SessionStore<S>) -> Self {
    let changes = sessions.subscribe();
    Self { sessions, changes, state: GuardState::Unknown }
  }

  pub fn state(&self) -> &GuardState { &self.state }

  /// Settle `Unknown` (or refresh any state) from the session store.
  pub fn resolve(&mut self) -> &GuardState { self.resolve_at(Utc::now()) }

  pub fn resolve_at(&mut self, now: DateTime<Utc>) -> &GuardState {
    let session = self.sessions.current_at(now);
    self.changes.mark_unchanged();
    self.apply(session);
    &self.state
  }

  pub fn navigate(&mut self, location: &str) -> Navigation {
    self.navigate_at(location, Utc::now())
  }

  pub fn navigate_at(&mut self, location: &str, now: DateTime<Utc>) -> Navigation {
    self.resolve_at(now);
    let Some(route) = Route::parse(location) else {
      return Navigation::NotFound(location.to_owned());
    };

    let authenticated = matches!(self.state, GuardState::Authenticated(_));
    let decision = match route {
      Route::Auth if authenticated => Navigation::Redirect(Route::Home),
      r if r.is_protected() && !authenticated => Navigation::Redirect(Route::Auth),
      r => Navigation::Render(r),
    };
    debug!(location, ?decision, "navigate");
    decision
  }

  /// Wait for the next session change and apply it.
  ///
  /// The guard keeps its own handle on the session store, so the channel
  /// stays open and this resolves to `Some` whenever the session changes.
  /// `None` would mean the channel closed underneath it.
  pub async fn changed(&mut self) -> Option<&GuardState> {
    self.changes.changed().await.ok()?;
    let session = self
      .changes
      .borrow_and_update()
      .clone()
      .filter(|s| !s.is_expired());
    self.apply(session);
    Some(&self.state)
  }

  fn apply(&mut self, session: Option<Session>) {
    let next = match session {
      Some(s) => GuardState::Authenticated(s),
      None => GuardState::Unauthenticated,
    };
    if next != self.state {
      debug!(authenticated = next.session().is_some(), "guard transition");
      self.state = next;
    }
  }
}
