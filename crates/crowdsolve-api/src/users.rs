//! Handlers for `/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/register` | Body: `{"name","email","password","avatar"?}`; sets cookie |
//! | `POST` | `/auth/login` | Body: `{"email","password"}`; sets cookie |
//! | `POST` | `/auth/logout` | Clears cookie |
//! | `GET`  | `/auth/me` | 401 without a valid cookie |

use axum::{
  Json as JsonResponse,
  extract::State,
  http::{StatusCode, header},
  response::{IntoResponse, Response},
};
use chrono::Utc;
use crowdsolve_core::{
  media::ImageHost,
  store::CommunityStore,
  user::{NewUser, User},
};
use serde::Deserialize;
use serde_json::json;

use crate::{
  AppState,
  auth::{CurrentUser, hash_password, verify_password},
  error::ApiError,
  json::Json,
};

/// Issue a session for `user` and render it with `status`.
fn session_response<S, I>(
  state: &AppState<S, I>,
  status: StatusCode,
  user: &User,
) -> Result<Response, ApiError> {
  let token = state.auth.issue(user.user_id, Utc::now())?;
  let cookie = state.auth.session_cookie(&token)?;
  Ok((
    status,
    [(header::SET_COOKIE, cookie)],
    JsonResponse(json!({ "success": true, "user": user.profile() })),
  )
    .into_response())
}

// ─── Register ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  #[serde(default)]
  pub name:     String,
  #[serde(default)]
  pub email:    String,
  #[serde(default)]
  pub password: String,
  pub avatar:   Option<String>,
}

/// `POST /auth/register`
pub async fn register<S, I>(
  State(state): State<AppState<S, I>>,
  Json(body): Json<RegisterBody>,
) -> Result<Response, ApiError>
where
  S: CommunityStore + 'static,
  I: ImageHost + 'static,
{
  if body.password.trim().is_empty() {
    return Err(ApiError::Validation("password is required".into()));
  }
  // Validate before paying for the hash.
  NewUser::new(&body.name, &body.email, None, String::new())?;

  let hash = hash_password(&body.password)?;
  let input = NewUser::new(&body.name, &body.email, body.avatar, hash)?;
  let user = state.store.create_user(input).await.map_err(ApiError::store)?;

  tracing::info!(user_id = %user.user_id, "registered user");
  session_response(&state, StatusCode::CREATED, &user)
}

// ─── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  #[serde(default)]
  pub email:    String,
  #[serde(default)]
  pub password: String,
}

/// `POST /auth/login`
pub async fn login<S, I>(
  State(state): State<AppState<S, I>>,
  Json(body): Json<LoginBody>,
) -> Result<Response, ApiError>
where
  S: CommunityStore + 'static,
  I: ImageHost + 'static,
{
  const REJECTED: ApiError = ApiError::Unauthorized("invalid email or password");

  let (user, hash) = state
    .store
    .find_credentials(&body.email)
    .await
    .map_err(ApiError::store)?
    .ok_or(REJECTED)?;

  if !verify_password(&body.password, &hash) {
    return Err(REJECTED);
  }
  session_response(&state, StatusCode::OK, &user)
}

// ─── Logout ──────────────────────────────────────────────────────────────────

/// `POST /auth/logout`
pub async fn logout<S, I>(
  State(state): State<AppState<S, I>>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CommunityStore + 'static,
  I: ImageHost + 'static,
{
  let cookie = state.auth.cleared_cookie()?;
  Ok((
    [(header::SET_COOKIE, cookie)],
    JsonResponse(json!({ "success": true, "message": "Logged out" })),
  ))
}

// ─── Me ──────────────────────────────────────────────────────────────────────

/// `GET /auth/me`
pub async fn me<S, I>(
  CurrentUser(user): CurrentUser,
) -> JsonResponse<serde_json::Value>
where
  S: CommunityStore + 'static,
  I: ImageHost + 'static,
{
  JsonResponse(json!({ "success": true, "user": user.profile() }))
}
