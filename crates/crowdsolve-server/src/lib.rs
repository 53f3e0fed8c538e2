//! HTTP server assembly for CrowdSolve.
//!
//! Wraps the JSON API from `crowdsolve-api` with a liveness route, request
//! tracing and a credentialed CORS policy, and provides configuration
//! loading and the Cloudinary image host.

pub mod error;
pub mod images;

pub use error::Error;

use std::path::{Path, PathBuf};

use axum::{
  Json, Router,
  http::{HeaderValue, Method, header},
  routing::get,
};
use config::{ConfigBuilder, Environment, File, builder::DefaultState};
use crowdsolve_api::{AppState, AuthConfig};
use crowdsolve_core::{media::ImageHost, store::CommunityStore};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use images::CloudinaryConfig;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` layered
/// under `CROWDSOLVE_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:             String,
  #[serde(default = "default_port")]
  pub port:             u16,
  #[serde(default = "default_store_path")]
  pub store_path:       PathBuf,
  /// HMAC secret for session tokens.
  pub jwt_secret:       String,
  #[serde(default = "default_token_ttl_days")]
  pub token_ttl_days:   u32,
  #[serde(default)]
  pub cookie_secure:    bool,
  #[serde(default = "default_cors_origin")]
  pub cors_origin:      String,
  #[serde(default = "default_max_upload_bytes")]
  pub max_upload_bytes: usize,
  /// Image uploads are disabled when absent.
  #[serde(default)]
  pub cloudinary:       Option<CloudinaryConfig>,
}

fn default_host() -> String { "0.0.0.0".to_owned() }

fn default_port() -> u16 { 5000 }

fn default_store_path() -> PathBuf { PathBuf::from("crowdsolve.db") }

fn default_token_ttl_days() -> u32 { 30 }

fn default_cors_origin() -> String { "http://localhost:5173".to_owned() }

fn default_max_upload_bytes() -> usize { 10 * 1024 * 1024 }

impl ServerConfig {
  /// Read `path` (optional) and the environment. Nested keys use `__` in
  /// variable names, e.g. `CROWDSOLVE_CLOUDINARY__API_KEY`.
  pub fn load(path: &Path) -> Result<Self, Error> {
    Self::build(
      config::Config::builder()
        .add_source(File::from(path).required(false))
        .add_source(
          Environment::with_prefix("CROWDSOLVE")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
        ),
    )
  }

  fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, Error> {
    let config: Self = builder.build()?.try_deserialize()?;
    if config.jwt_secret.trim().is_empty() {
      return Err(Error::MissingSecret);
    }
    Ok(config)
  }

  pub fn auth_config(&self) -> AuthConfig {
    AuthConfig::new(
      self.jwt_secret.as_bytes(),
      chrono::Duration::days(i64::from(self.token_ttl_days)),
      self.cookie_secure,
    )
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full application: `GET /` plus the API under `/api`.
pub fn router<S, I>(state: AppState<S, I>, cors_origin: &str) -> Result<Router, Error>
where
  S: CommunityStore + 'static,
  I: ImageHost + 'static,
{
  let invalid = || Error::InvalidCorsOrigin(cors_origin.to_owned());
  if cors_origin == "*" {
    return Err(invalid());
  }
  let origin = HeaderValue::from_str(cors_origin).map_err(|_| invalid())?;

  let cors = CorsLayer::new()
    .allow_origin(origin)
    .allow_credentials(true)
    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
    .allow_headers([header::CONTENT_TYPE]);

  Ok(
    Router::new()
      .route("/", get(root))
      .nest("/api", crowdsolve_api::api_router(state))
      .layer(TraceLayer::new_for_http())
      .layer(cors),
  )
}

async fn root() -> Json<Value> {
  Json(json!({ "message": "CrowdSolve API is running..." }))
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(error) = tokio::signal::ctrl_c().await {
      tracing::error!(%error, "failed to listen for Ctrl-C");
      std::future::pending::<()>().await;
    }
    tracing::info!("received Ctrl-C, shutting down");
  };

  #[cfg(unix)]
  let terminate = async {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
      Ok(mut stream) => {
        stream.recv().await;
        tracing::info!("received SIGTERM, shutting down");
      }
      Err(error) => {
        tracing::error!(%error, "failed to install SIGTERM handler");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }
}

// ─── Integration tests ───────────────────────────────────────────────────────
