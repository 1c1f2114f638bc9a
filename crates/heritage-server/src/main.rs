//! heritage-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) layered with
//! `HERITAGE_*` environment variables, opens an in-process SQLite store, and
//! serves the research-request API over HTTP. The notification dispatcher
//! and the expiry janitor run as background tasks.
//!
//! # Adding users
//!
//! Authentication is handled upstream, but notifications need to know who
//! the admins and research experts are:
//!
//! ```
//! cargo run -p heritage-server -- add-user curator --email c@example.org --role admin
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use heritage_api::{AppState, notifier};
use heritage_core::{
  store::HeritageStore,
  user::{NewUser, Role},
};
use heritage_server::{
  ServerConfig, images::LocalImageStore, janitor::spawn_janitor, mail::ConfiguredMailer,
};
use heritage_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Heritage registry server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Register a user in the store and exit.
  AddUser {
    username: String,
    #[arg(long)]
    email:    String,
    /// One of `user`, `research_expert`, `admin`.
    #[arg(long, default_value = "research_expert")]
    role:     Role,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let server_cfg = ServerConfig::load(&cli.config)
    .context("failed to load ServerConfig")?
    .expand_paths();

  // Open SQLite store.
  let store = SqliteStore::open(&server_cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", server_cfg.store_path))?;
  let store = Arc::new(store);

  // Helper mode: add a user and exit.
  if let Some(Command::AddUser { username, email, role }) = cli.command {
    let user = store
      .add_user(NewUser { username, email, role })
      .await
      .context("failed to add user")?;
    println!("{}", user.user_id);
    return Ok(());
  }

  // Collaborators.
  let images = LocalImageStore::new(&server_cfg.media_dir, &server_cfg.public_url);
  tokio::fs::create_dir_all(images.root())
    .await
    .with_context(|| format!("failed to create media dir {:?}", images.root()))?;

  let mailer = ConfiguredMailer::from_config(
    server_cfg.mail_webhook_url.as_deref(),
    &server_cfg.mail_from,
  )
  .context("failed to set up mailer")?;

  // Background tasks.
  let (notifier, events) = notifier::channel();
  notifier::spawn_dispatcher(store.clone(), Arc::new(mailer), events);
  spawn_janitor(
    store.clone(),
    Duration::from_secs(server_cfg.janitor_interval_secs.max(1)),
  );

  // Build application.
  let state = AppState::new(store, Arc::new(images), notifier);
  let app = heritage_server::app(state, &server_cfg);
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
