//! `snowflake`: command-line dashboard for the Snowflake data service.
//!
//! # Usage
//!
//! ```text
//! snowflake sign-up --email ana@example.com --password secret1
//! snowflake sign-in --email ana@example.com --password secret1
//! snowflake open /invoices
//! snowflake add invoice --number INV-001 --total 250000
//! snowflake chat 3f2c... --send "Batch arrived damaged"
//! snowflake --url http://qc.local:5300 open /rejected
//! ```
//!
//! The session from `sign-in` is kept in `session.json` beside the config
//! file and resumed by every later command.

mod client;
mod render;

use std::{
  fs::{File, OpenOptions},
  io::Write as _,
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use client::HttpService;
use serde::Deserialize;
use snowflake_core::{
  Dashboard,
  identity::{AccessToken, Credentials, Session},
  record::{
    FoodConditionRecord, Invoice, InvoiceStatus, NewFoodCondition, NewInvoice, NewProduct,
    NewRejectedItem, NewReturnItem, Product, RejectedItem, ReturnItem,
  },
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "snowflake", about = "Command-line dashboard for Snowflake")]
struct Args {
  /// Path to a TOML config file (url).
  #[arg(short, long, value_name = "FILE", default_value = "~/.config/snowflake/config.toml")]
  config: PathBuf,

  /// Base URL of the snowflake server (default: http://localhost:5300).
  #[arg(long, env = "SNOWFLAKE_URL")]
  url: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Register a new account. Does not sign in.
  SignUp(Login),
  /// Start a session and remember it.
  SignIn(Login),
  /// End the remembered session.
  SignOut,
  /// Show a dashboard page, e.g. `/`, `/products` or `/rejected`.
  Open {
    #[arg(default_value = "/")]
    path: String,
  },
  /// Create a record.
  #[command(subcommand)]
  Add(AddCommand),
  /// Read, or post to, the dispute thread of a rejected item.
  Chat {
    item: Uuid,
    #[arg(long, value_name = "MESSAGE")]
    send: Option<String>,
  },
}

#[derive(clap::Args, Debug)]
struct Login {
  #[arg(long)]
  email:    String,
  #[arg(long, env = "SNOWFLAKE_PASSWORD", hide_env_values = true)]
  password: String,
}

#[derive(Subcommand, Debug)]
enum AddCommand {
  Product {
    #[arg(long)]
    name:        String,
    #[arg(long)]
    price:       i64,
    #[arg(long, default_value_t = 0)]
    stock:       u32,
    #[arg(long)]
    description: Option<String>,
  },
  Invoice {
    #[arg(long)]
    number: String,
    #[arg(long)]
    total:  i64,
    #[arg(long)]
    paid:   bool,
  },
  Return {
    #[arg(long)]
    product:  String,
    #[arg(long)]
    quantity: u32,
    #[arg(long)]
    reason:   String,
  },
  /// Record a food-condition inspection (admins only).
  Inspection {
    #[arg(long)]
    product:   String,
    #[arg(long)]
    condition: String,
    /// Mark the batch unfit for processing.
    #[arg(long)]
    unfit:     bool,
    #[arg(long)]
    notes:     Option<String>,
    /// RFC 3339 timestamp; defaults to now.
    #[arg(long)]
    date:      Option<DateTime<Utc>>,
  },
  Rejected {
    #[arg(long)]
    product:  String,
    #[arg(long)]
    reason:   String,
    #[arg(long)]
    quantity: u32,
  },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url: String,
}

fn load_config(path: &Path) -> Result<ConfigFile> {
  if !path.exists() {
    return Ok(ConfigFile::default());
  }
  let raw = std::fs::read_to_string(path)
    .with_context(|| format!("reading config file {}", path.display()))?;
  toml::from_str(&raw).context("parsing config file")
}

fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Session file ─────────────────────────────────────────────────────────────

struct SessionFile(PathBuf);

impl SessionFile {
  fn beside(config: &Path) -> Self { Self(config.with_file_name("session.json")) }

  fn load(&self) -> Result<Option<AccessToken>> {
    if !self.0.exists() {
      return Ok(None);
    }
    let raw = std::fs::read_to_string(&self.0)
      .with_context(|| format!("reading {}", self.0.display()))?;
    let session: Session = serde_json::from_str(&raw).context("parsing session file")?;
    Ok(Some(session.token))
  }

  fn save(&self, session: &Session) -> Result<()> {
    if let Some(parent) = self.0.parent() {
      std::fs::create_dir_all(parent)
        .with_context(|| format!("creating {}", parent.display()))?;
    }
    let raw = serde_json::to_string_pretty(session).context("serialising session")?;
    let mut file = private_file(&self.0).with_context(|| format!("opening {}", self.0.display()))?;
    file
      .write_all(raw.as_bytes())
      .with_context(|| format!("writing {}", self.0.display()))
  }

  fn clear(&self) -> Result<()> {
    match std::fs::remove_file(&self.0) {
      Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
        Err(e).with_context(|| format!("removing {}", self.0.display()))
      }
      _ => Ok(()),
    }
  }
}

/// Open `path` for writing, truncated, readable by the owner only. The file
/// holds a live bearer token.
fn private_file(path: &Path) -> std::io::Result<File> {
  let mut options = OpenOptions::new();
  options.write(true).create(true).truncate(true);
  #[cfg(unix)]
  {
    use std::os::unix::fs::OpenOptionsExt as _;
    options.mode(0o600);
  }
  let file = options.open(path)?;
  // `mode` only applies on creation; tighten a file left by older builds.
  #[cfg(unix)]
  {
    use std::os::unix::fs::PermissionsExt as _;
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
  }
  Ok(file)
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();
  let config_path = expand_tilde(&args.config);
  let file_cfg = load_config(&config_path)?;

  // CLI flag (or env) overrides config file, which overrides the default.
  let base_url = args
    .url
    .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
    .unwrap_or_else(|| "http://localhost:5300".to_string());

  let service = HttpService::new(base_url).context("failed to build HTTP client")?;
  let mut dash = Dashboard::new(Arc::new(service));
  let session_file = SessionFile::beside(&config_path);

  let command = match args.command {
    Command::SignUp(login) => {
      let user_id = dash.sessions().sign_up(Credentials::new(login.email, login.password)).await?;
      println!("Account created ({user_id}). Sign in to continue.");
      return Ok(());
    }
    Command::SignIn(login) => {
      let session = dash.sessions().sign_in(Credentials::new(login.email, login.password)).await?;
      session_file.save(&session)?;
      println!("Signed in as {}", session.email);
      return Ok(());
    }
    other => other,
  };

  // Every other command resumes the remembered session, if any.
  if let Some(token) = session_file.load()? {
    let restored = dash.sessions().restore(token).await?;
    if restored.is_none() {
      session_file.clear()?;
    }
  }

  match command {
    Command::SignUp(_) | Command::SignIn(_) => {}
    Command::SignOut => {
      session_file.clear()?;
      dash.sessions().sign_out().await?;
      println!("Signed out");
    }
    Command::Open { path } => {
      let screen = dash.open(&path).await;
      print!("{}", render::screen(&screen));
    }
    Command::Add(add) => {
      if dash.sessions().current().is_none() {
        bail!("not signed in; run `snowflake sign-in` first");
      }
      add_record(&dash, add).await?;
    }
    Command::Chat { item, send } => {
      if dash.sessions().current().is_none() {
        bail!("not signed in; run `snowflake sign-in` first");
      }
      let thread = dash.thread();
      let messages = match send {
        Some(body) => thread.send(item, &body).await?,
        None => thread.list_messages(item).await?,
      };
      print!("{}", render::thread(&messages, |m| thread.is_own(m)));
    }
  }

  Ok(())
}

async fn add_record(dash: &Dashboard<HttpService>, add: AddCommand) -> Result<()> {
  let line = match add {
    AddCommand::Product { name, price, stock, description } => {
      let draft = NewProduct { name, price, stock, description };
      render::product(&dash.collection::<Product>().create(draft).await?)
    }
    AddCommand::Invoice { number, total, paid } => {
      let status = if paid { InvoiceStatus::Paid } else { InvoiceStatus::Pending };
      let draft = NewInvoice { invoice_number: number, total_amount: total, status };
      render::invoice(&dash.collection::<Invoice>().create(draft).await?)
    }
    AddCommand::Return { product, quantity, reason } => {
      let draft = NewReturnItem { product_name: product, quantity, reason, ..Default::default() };
      render::return_item(&dash.collection::<ReturnItem>().create(draft).await?)
    }
    AddCommand::Inspection { product, condition, unfit, notes, date } => {
      let draft = NewFoodCondition {
        product_name: product,
        condition,
        fit_for_processing: !unfit,
        notes,
        inspection_date: date,
      };
      render::inspection(&dash.collection::<FoodConditionRecord>().create(draft).await?)
    }
    AddCommand::Rejected { product, reason, quantity } => {
      let draft =
        NewRejectedItem { product_name: product, reason, quantity, ..Default::default() };
      render::rejected(&dash.collection::<RejectedItem>().create(draft).await?)
    }
  };
  println!("Created {line}");
  Ok(())
}
