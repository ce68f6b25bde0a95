//! snowflake-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `SNOWFLAKE_*` environment variables, opens the SQLite data service and
//! serves the JSON API over HTTP.
//!
//! # Granting the admin role
//!
//! Role assignments cannot be written through the API. Register the account
//! first, then:
//!
//! ```text
//! snowflake-server --grant-admin qc@example.com
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use snowflake_core::identity::Role;
use snowflake_server::{ServerConfig, open_service};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Snowflake data service")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Grant the admin role to the account with this email and exit.
  #[arg(long, value_name = "EMAIL")]
  grant_admin: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = ServerConfig::load(&cli.config).context("failed to read configuration")?;
  let service = open_service(&server_cfg).await?;

  // Helper mode: grant a role and exit.
  if let Some(email) = cli.grant_admin {
    let assignment = service
      .grant_role(&email, Role::Admin)
      .await
      .with_context(|| format!("failed to grant admin to {email}"))?;
    println!("{email} ({}) is now {}", assignment.user_id, assignment.role);
    return Ok(());
  }

  let purged = service
    .purge_expired_sessions()
    .await
    .context("failed to purge expired sessions")?;
  tracing::debug!(purged, "startup cleanup");

  let app = snowflake_api::api_router(Arc::new(service));
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
