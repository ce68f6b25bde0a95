//! Identities, credentials, sessions and roles.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Shortest password accepted at sign-up.
pub const MIN_PASSWORD_LEN: usize = 6;

// ─── UserId ──────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
  pub fn new() -> Self { Self(Uuid::new_v4()) }
}

impl Default for UserId {
  fn default() -> Self { Self::new() }
}

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

// ─── AccessToken ─────────────────────────────────────────────────────────────

/// Opaque bearer token issued by the data service at sign-in.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
  pub fn new(token: impl Into<String>) -> Self { Self(token.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Debug for AccessToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("AccessToken(<redacted>)")
  }
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// An authenticated identity plus its bearer token, valid until `expires_at`
/// or an explicit sign-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub user_id:    UserId,
  pub email:      String,
  pub token:      AccessToken,
  pub expires_at: DateTime<Utc>,
}

impl Session {
  pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool { self.expires_at <= now }

  pub fn is_expired(&self) -> bool { self.is_expired_at(Utc::now()) }
}

// ─── Credentials ─────────────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
  pub email:    String,
  pub password: String,
}

impl Credentials {
  pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
    Self { email: email.into(), password: password.into() }
  }

  /// Checks run before a sign-in request leaves the client.
  pub fn validate(&self) -> Result<(), ValidationError> {
    let email = self.email.trim();
    if email.is_empty() {
      return Err(ValidationError::Required("email"));
    }
    if !email.contains('@') {
      return Err(ValidationError::Invalid {
        field:  "email",
        reason: "must be an email address",
      });
    }
    if self.password.is_empty() {
      return Err(ValidationError::Required("password"));
    }
    Ok(())
  }

  /// Sign-in checks plus the minimum password length.
  pub fn validate_for_sign_up(&self) -> Result<(), ValidationError> {
    self.validate()?;
    if self.password.chars().count() < MIN_PASSWORD_LEN {
      return Err(ValidationError::Invalid {
        field:  "password",
        reason: "must be at least 6 characters",
      });
    }
    Ok(())
  }

  /// The email as it is stored: trimmed and lowercased.
  pub fn normalized_email(&self) -> String { self.email.trim().to_lowercase() }
}

impl fmt::Debug for Credentials {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Credentials")
      .field("email", &self.email)
      .field("password", &"<redacted>")
      .finish()
  }
}

// ─── Roles ───────────────────────────────────────────────────────────────────

/// A named privilege level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Admin,
  Moderator,
  User,
}

impl Role {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Admin => "admin",
      Self::Moderator => "moderator",
      Self::User => "user",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "admin" => Some(Self::Admin),
      "moderator" => Some(Self::Moderator),
      "user" => Some(Self::User),
      _ => None,
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// A row of the `user_roles` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleAssignment {
  pub user_id:    UserId,
  pub role:       Role,
  pub created_at: DateTime<Utc>,
}
