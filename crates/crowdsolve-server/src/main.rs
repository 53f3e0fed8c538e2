//! crowdsolve-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) plus
//! `CROWDSOLVE_*` environment variables, opens the SQLite store, and serves
//! the JSON API over HTTP until Ctrl-C or SIGTERM.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use crowdsolve_api::AppState;
use crowdsolve_server::{ServerConfig, images::ConfiguredImageHost, shutdown_signal};
use crowdsolve_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "CrowdSolve API server")]
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

  let server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let images = ConfiguredImageHost::from_config(server_cfg.cloudinary.clone())
    .context("failed to build image host client")?;
  if matches!(images, ConfiguredImageHost::Disabled) {
    tracing::warn!("no cloudinary credentials configured; image uploads are disabled");
  }

  let state = AppState {
    store:            Arc::new(store),
    images:           Arc::new(images),
    auth:             Arc::new(server_cfg.auth_config()),
    max_upload_bytes: server_cfg.max_upload_bytes,
  };

  let app = crowdsolve_server::router(state, &server_cfg.cors_origin)?;
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  tracing::info!("server stopped");
  Ok(())
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
