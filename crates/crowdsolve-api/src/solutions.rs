//! Handlers for `/solutions` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/solutions/problems/{problem_id}/solutions` | Body: `{"description":"…"}` |
//! | `PUT`  | `/solutions/{id}/upvote` | Toggles the caller's vote |
//! | `POST` | `/solutions/{id}/comments` | Body: `{"text":"…"}` |

use axum::{
  Json as JsonResponse,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use crowdsolve_core::{
  media::ImageHost,
  solution::NewSolution,
  store::CommunityStore,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
  AppState,
  auth::CurrentUser,
  error::ApiError,
  json::Json,
  parse_id,
};

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  #[serde(default)]
  pub description: String,
}

/// `POST /solutions/problems/{problem_id}/solutions`
pub async fn create<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentUser(user): CurrentUser,
  Path(problem_id): Path<String>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CommunityStore + 'static,
  I: ImageHost + 'static,
{
  let problem_id = parse_id(&problem_id, "problem")?;
  let input = NewSolution::new(problem_id, &body.description)?;
  let solution = state
    .store
    .create_solution(input, user.user_id)
    .await
    .map_err(ApiError::store)?;

  tracing::info!(
    solution_id = %solution.solution_id,
    problem_id = %problem_id,
    "created solution"
  );
  Ok((
    StatusCode::CREATED,
    JsonResponse(json!({ "success": true, "solution": solution })),
  ))
}

// ─── Upvote ──────────────────────────────────────────────────────────────────

/// `PUT /solutions/{id}/upvote`
pub async fn upvote<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentUser(user): CurrentUser,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CommunityStore + 'static,
  I: ImageHost + 'static,
{
  let id = parse_id(&id, "solution")?;
  let outcome = state
    .store
    .toggle_upvote(id, user.user_id)
    .await
    .map_err(ApiError::store)?;

  Ok(JsonResponse(json!({
    "success": true,
    "upvoteCount": outcome.upvote_count,
    "hasUpvoted": outcome.has_upvoted,
  })))
}

// ─── Comment ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CommentBody {
  #[serde(default)]
  pub text: String,
}

/// `POST /solutions/{id}/comments`
pub async fn comment<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentUser(user): CurrentUser,
  Path(id): Path<String>,
  Json(body): Json<CommentBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CommunityStore + 'static,
  I: ImageHost + 'static,
{
  let id = parse_id(&id, "solution")?;
  let solution = state
    .store
    .add_comment(id, user.user_id, body.text)
    .await
    .map_err(ApiError::store)?;

  Ok((
    StatusCode::CREATED,
    JsonResponse(json!({ "success": true, "solution": solution })),
  ))
}
