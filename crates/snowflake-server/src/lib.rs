//! Server-side wiring for Snowflake: configuration and opening the SQLite
//! data service the HTTP API is served from.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;
use snowflake_store_sqlite::{DEFAULT_SESSION_TTL_SECS, SqliteService};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `SNOWFLAKE_*` environment variables.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:             String,
  #[serde(default = "default_port")]
  pub port:             u16,
  #[serde(default = "default_store_path")]
  pub store_path:       PathBuf,
  #[serde(default = "default_session_ttl_secs")]
  pub session_ttl_secs: i64,
}

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 5300 }

fn default_store_path() -> PathBuf { PathBuf::from("snowflake.db") }

fn default_session_ttl_secs() -> i64 { DEFAULT_SESSION_TTL_SECS }

impl ServerConfig {
  /// Layer the optional TOML file at `path` under the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("SNOWFLAKE").try_parsing(true))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Open the SQLite service described by `config`, creating the file if
/// needed.
pub async fn open_service(config: &ServerConfig) -> anyhow::Result<SqliteService> {
  let store_path = expand_tilde(&config.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }

  let service = SqliteService::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?
    .with_session_ttl(chrono::Duration::seconds(config.session_ttl_secs));
  Ok(service)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
