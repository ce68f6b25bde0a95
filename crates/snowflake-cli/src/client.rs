//! [`HttpService`]: a [`DataService`] that talks to `snowflake-server` over
//! its JSON API.
//!
//! Error bodies carry a machine-readable `code`; it is mapped back onto the
//! core error families so the dashboard cannot tell this client from an
//! in-process store.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use snowflake_core::{
  error::{AuthError, ReadError, WriteError},
  identity::{AccessToken, Credentials, Session, UserId},
  service::DataService,
  table::{Query, Row, Table},
};

/// Async HTTP client for the Snowflake data API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpService {
  client:   Client,
  base_url: String,
}

impl HttpService {
  pub fn new(base_url: impl Into<String>) -> reqwest::Result<Self> {
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self { client, base_url: base_url.into() })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url.trim_end_matches('/'), path)
  }

  fn authed(&self, req: RequestBuilder, token: &AccessToken) -> RequestBuilder {
    req.bearer_auth(token.as_str())
  }

  /// Send `req`; non-2xx responses become a [`Failure`].
  async fn send(&self, req: RequestBuilder) -> Result<Response, Failure> {
    let resp = req.send().await.map_err(|e| Failure::Network(e.to_string()))?;
    if resp.status().is_success() {
      return Ok(resp);
    }

    let status = resp.status();
    let body = resp.json::<ErrorBody>().await.unwrap_or_else(|_| ErrorBody {
      error: status.to_string(),
      code:  String::new(),
    });
    tracing::debug!(%status, code = %body.code, "request failed");
    Err(Failure::Api { status, code: body.code, message: body.error })
  }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, Failure> {
  let bytes = resp.bytes().await.map_err(|e| Failure::Network(e.to_string()))?;
  serde_json::from_slice(&bytes).map_err(Failure::Decode)
}

// ─── Failures ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ErrorBody {
  error: String,
  #[serde(default)]
  code:  String,
}

#[derive(Debug)]
enum Failure {
  Network(String),
  Decode(serde_json::Error),
  Api {
    status:  StatusCode,
    code:    String,
    message: String,
  },
}

impl Failure {
  fn is_unauthorized(&self) -> bool {
    matches!(self, Self::Api { status, .. } if *status == StatusCode::UNAUTHORIZED)
  }
}

impl From<Failure> for AuthError {
  fn from(f: Failure) -> Self {
    match f {
      Failure::Network(m) => Self::Network(m),
      Failure::Decode(e) => Self::Backend(e.to_string()),
      Failure::Api { code, message, .. } => match code.as_str() {
        "invalid_credentials" => Self::InvalidCredentials,
        "email_taken" => Self::EmailTaken,
        "unauthenticated" => Self::SessionExpired,
        _ => Self::Backend(message),
      },
    }
  }
}

impl From<Failure> for ReadError {
  fn from(f: Failure) -> Self {
    match f {
      Failure::Network(m) => Self::Network(m),
      Failure::Decode(e) => Self::Decode(e),
      Failure::Api { code, message, .. } => match code.as_str() {
        "unauthenticated" => Self::Unauthenticated,
        "denied" => Self::Denied(message),
        "invalid_query" => Self::InvalidQuery(message),
        _ => Self::Backend(message),
      },
    }
  }
}

impl From<Failure> for WriteError {
  fn from(f: Failure) -> Self {
    match f {
      Failure::Network(m) => Self::Network(m),
      Failure::Decode(e) => Self::Decode(e),
      Failure::Api { code, message, .. } => match code.as_str() {
        "unauthenticated" => Self::Unauthenticated,
        "denied" => Self::Denied(message),
        _ => Self::Backend(message),
      },
    }
  }
}

// ─── DataService ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SignedUp {
  user_id: UserId,
}

impl DataService for HttpService {
  async fn sign_up(&self, credentials: Credentials) -> Result<UserId, AuthError> {
    let req = self.client.post(self.url("/auth/v1/signup")).json(&credentials);
    let resp = self.send(req).await?;
    Ok(decode::<SignedUp>(resp).await?.user_id)
  }

  async fn sign_in(&self, credentials: Credentials) -> Result<Session, AuthError> {
    let req = self.client.post(self.url("/auth/v1/token")).json(&credentials);
    let resp = self.send(req).await?;
    Ok(decode(resp).await?)
  }

  async fn sign_out(&self, token: &AccessToken) -> Result<(), AuthError> {
    let req = self.authed(self.client.post(self.url("/auth/v1/logout")), token);
    match self.send(req).await {
      Ok(_) => Ok(()),
      Err(f) if f.is_unauthorized() => Ok(()),
      Err(f) => Err(f.into()),
    }
  }

  async fn get_session(&self, token: &AccessToken) -> Result<Option<Session>, AuthError> {
    let req = self.authed(self.client.get(self.url("/auth/v1/session")), token);
    match self.send(req).await {
      Ok(resp) => Ok(Some(decode(resp).await?)),
      Err(f) if f.is_unauthorized() => Ok(None),
      Err(f) => Err(f.into()),
    }
  }

  async fn query(&self, token: &AccessToken, query: &Query) -> Result<Vec<Row>, ReadError> {
    let req = self.authed(self.client.post(self.url("/rest/v1/query")), token).json(query);
    let resp = self.send(req).await?;
    Ok(decode(resp).await?)
  }

  async fn insert(&self, token: &AccessToken, table: Table, row: Row) -> Result<Row, WriteError> {
    let path = format!("/rest/v1/{table}");
    let req = self.authed(self.client.post(self.url(&path)), token).json(&row);
    let resp = self.send(req).await?;
    Ok(decode(resp).await?)
  }
}
