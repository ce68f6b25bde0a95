//! Tagged results consumed by views: load progress and role gates.

use crate::error::ReadError;

/// The outcome of a view's initial fetch.
#[derive(Debug)]
pub enum LoadState<T, E = ReadError> {
  Loading,
  Loaded(T),
  Failed(E),
}

impl<T, E> LoadState<T, E> {
  pub fn is_loading(&self) -> bool { matches!(self, Self::Loading) }

  pub fn loaded(&self) -> Option<&T> {
    match self {
      Self::Loaded(v) => Some(v),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&E> {
    match self {
      Self::Failed(e) => Some(e),
      _ => None,
    }
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> LoadState<U, E> {
    match self {
      Self::Loading => LoadState::Loading,
      Self::Loaded(v) => LoadState::Loaded(f(v)),
      Self::Failed(e) => LoadState::Failed(e),
    }
  }
}

impl<T, E> From<Result<T, E>> for LoadState<T, E> {
  fn from(result: Result<T, E>) -> Self {
    match result {
      Ok(v) => Self::Loaded(v),
      Err(e) => Self::Failed(e),
    }
  }
}

/// Content behind a role check. Anything short of a confirmed grant is
/// `Denied`.
#[derive(Debug)]
pub enum Gated<T> {
  Granted(T),
  Denied,
}

impl<T> Gated<T> {
  pub fn is_granted(&self) -> bool { matches!(self, Self::Granted(_)) }

  pub fn granted(&self) -> Option<&T> {
    match self {
      Self::Granted(v) => Some(v),
      Self::Denied => None,
    }
  }
}
