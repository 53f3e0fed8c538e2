//! JSON REST API for CrowdSolve.
//!
//! Exposes an axum [`Router`] backed by any
//! [`crowdsolve_core::store::CommunityStore`] and
//! [`crowdsolve_core::media::ImageHost`]. TLS, CORS and request tracing are
//! the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", crowdsolve_api::api_router(state))
//! ```

pub mod auth;
pub mod error;
pub mod json;
pub mod problems;
pub mod solutions;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post, put},
};
use crowdsolve_core::{media::ImageHost, store::CommunityStore};
use uuid::Uuid;

pub use auth::{AuthConfig, CurrentUser};
pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S, I> {
  pub store:            Arc<S>,
  pub images:           Arc<I>,
  pub auth:             Arc<AuthConfig>,
  /// Upper bound on request bodies, image uploads included.
  pub max_upload_bytes: usize,
}

impl<S, I> Clone for AppState<S, I> {
  fn clone(&self) -> Self {
    Self {
      store:            Arc::clone(&self.store),
      images:           Arc::clone(&self.images),
      auth:             Arc::clone(&self.auth),
      max_upload_bytes: self.max_upload_bytes,
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, I>(state: AppState<S, I>) -> Router<()>
where
  S: CommunityStore + 'static,
  I: ImageHost + 'static,
{
  let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);

  Router::new()
    // Identity
    .route("/auth/register", post(users::register::<S, I>))
    .route("/auth/login", post(users::login::<S, I>))
    .route("/auth/logout", post(users::logout::<S, I>))
    .route("/auth/me", get(users::me::<S, I>))
    // Problems
    .route(
      "/problems",
      get(problems::list::<S, I>).post(problems::create::<S, I>),
    )
    .route(
      "/problems/{id}",
      get(problems::get_one::<S, I>)
        .put(problems::update::<S, I>)
        .delete(problems::remove::<S, I>),
    )
    // Solutions
    .route(
      "/solutions/problems/{problem_id}/solutions",
      post(solutions::create::<S, I>),
    )
    .route("/solutions/{id}/upvote", put(solutions::upvote::<S, I>))
    .route("/solutions/{id}/comments", post(solutions::comment::<S, I>))
    .layer(body_limit)
    .with_state(state)
}

/// Parse a path identifier. Anything that is not a UUID cannot name an
/// existing record, so it is reported as not found.
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
  Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(format!("{what} not found")))
}

#[cfg(test)]
mod tests;
