//! tizeta-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered with
//! `TIZETA_*` environment variables, opens the SQLite store, starts the
//! expiry sweeper and serves the JSON API over HTTP.
//!
//! Nested keys use a double underscore, e.g.
//! `TIZETA_GATEWAY__SECRET_KEY=CHASECK-...`.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use tizeta_api::{AppState, ServerConfig};
use tizeta_booking::Sweeper;
use tizeta_chapa::{ChapaConfig, ChapaGateway};
use tizeta_core::clock::{Clock, SystemClock};
use tizeta_store_sqlite::SqliteStore;
use tokio::{net::TcpListener, sync::watch};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Tizeta seat-booking server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
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
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("TIZETA")
        .prefix_separator("_")
        .separator("__"),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  anyhow::ensure!(
    !server_cfg.collaborator_token.is_empty(),
    "collaborator_token must not be empty"
  );

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let store = Arc::new(store);

  let gateway = ChapaGateway::new(ChapaConfig {
    base_url:       server_cfg.gateway.base_url.clone(),
    secret_key:     server_cfg.gateway.secret_key.clone(),
    webhook_secret: server_cfg.gateway.webhook_secret.clone(),
    callback_url:   server_cfg.gateway.callback_url.clone(),
    return_url:     server_cfg.gateway.return_url.clone(),
    timeout:        server_cfg.gateway_timeout(),
  })
  .context("failed to build gateway client")?;

  let clock: Arc<dyn Clock> = Arc::new(SystemClock);

  // Build application state.
  let state = AppState::new(
    store.clone(),
    Arc::new(gateway),
    clock.clone(),
    server_cfg.hold_policy(),
    server_cfg.gateway_timeout(),
    &server_cfg.collaborator_token,
  );

  // Start the sweeper.
  let (shutdown_tx, shutdown_rx) = watch::channel(false);
  let sweeper = Sweeper::new(
    store,
    clock,
    server_cfg.sweep_interval(),
    server_cfg.sweep_batch,
  );
  let sweeper_task = tokio::spawn(sweeper.run(shutdown_rx));

  let app = tizeta_api::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  tracing::info!("shutting down");
  shutdown_tx.send(true).ok();
  sweeper_task.await.context("sweeper task panicked")?;

  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
