//! Handlers for `/problems` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/problems` | Optional `?status=open\|in-progress\|solved&location=<substring>` |
//! | `POST`   | `/problems` | Multipart: `title`, `description`, `location`, optional `image` file |
//! | `GET`    | `/problems/{id}` | Problem plus its solutions; 404 if not found |
//! | `PUT`    | `/problems/{id}` | Owner only. Body: any of `title`, `description`, `location`, `status`, `image` |
//! | `DELETE` | `/problems/{id}` | Owner only. Removes the problem and all its solutions |

use axum::{
  Json as JsonResponse,
  extract::{Multipart, Path, Query, State, multipart::MultipartError},
  http::StatusCode,
  response::IntoResponse,
};
use crowdsolve_core::{
  media::{ImageHost, ImageUpload},
  problem::{NewProblem, ProblemFilter, ProblemPatch},
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

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status:   Option<String>,
  pub location: Option<String>,
}

/// `GET /problems[?status=<status>][&location=<substring>]`
pub async fn list<S, I>(
  State(state): State<AppState<S, I>>,
  Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CommunityStore + 'static,
  I: ImageHost + 'static,
{
  let filter =
    ProblemFilter::parse(params.status.as_deref(), params.location.as_deref())?;
  let problems = state
    .store
    .list_problems(&filter)
    .await
    .map_err(ApiError::store)?;

  Ok(JsonResponse(json!({
    "success": true,
    "count": problems.len(),
    "problems": problems,
  })))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// The text fields and optional file of a problem submission.
#[derive(Default)]
struct Submission {
  title:       String,
  description: String,
  location:    String,
  image:       Option<ImageUpload>,
}

fn multipart_error(error: MultipartError) -> ApiError {
  match error.status() {
    StatusCode::PAYLOAD_TOO_LARGE => {
      ApiError::PayloadTooLarge(error.body_text())
    }
    _ => ApiError::Validation(error.body_text()),
  }
}

async fn read_submission(mut multipart: Multipart) -> Result<Submission, ApiError> {
  let mut submission = Submission::default();

  while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
    let name = field.name().unwrap_or_default().to_owned();
    match name.as_str() {
      "title" => submission.title = field.text().await.map_err(multipart_error)?,
      "description" => {
        submission.description = field.text().await.map_err(multipart_error)?
      }
      "location" => {
        submission.location = field.text().await.map_err(multipart_error)?
      }
      "image" => {
        let file_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        if !bytes.is_empty() {
          submission.image = Some(ImageUpload {
            bytes: bytes.to_vec(),
            file_name,
            content_type,
          });
        }
      }
      _ => {}
    }
  }

  Ok(submission)
}

/// `POST /problems` (multipart form).
///
/// Fields are validated before the image is uploaded, so a rejected
/// submission never reaches the image host.
pub async fn create<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentUser(user): CurrentUser,
  multipart: Multipart,
) -> Result<impl IntoResponse, ApiError>
where
  S: CommunityStore + 'static,
  I: ImageHost + 'static,
{
  let submission = read_submission(multipart).await?;
  let mut input = NewProblem::new(
    &submission.title,
    &submission.description,
    &submission.location,
  )?;

  if let Some(image) = submission.image {
    let url = state
      .images
      .upload(image)
      .await
      .map_err(|e| ApiError::Upload(e.to_string()))?;
    input = input.with_image(url);
  }

  let problem = state
    .store
    .create_problem(input, user.user_id)
    .await
    .map_err(ApiError::store)?;

  tracing::info!(
    problem_id = %problem.problem.problem_id,
    owner_id = %user.user_id,
    "created problem"
  );
  Ok((
    StatusCode::CREATED,
    JsonResponse(json!({ "success": true, "problem": problem })),
  ))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /problems/{id}`
pub async fn get_one<S, I>(
  State(state): State<AppState<S, I>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CommunityStore + 'static,
  I: ImageHost + 'static,
{
  let id = parse_id(&id, "problem")?;
  let detail = state.store.get_problem(id).await.map_err(ApiError::store)?;

  Ok(JsonResponse(json!({
    "success": true,
    "problem": detail.problem,
    "solutions": detail.solutions,
  })))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PUT /problems/{id}`
pub async fn update<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentUser(user): CurrentUser,
  Path(id): Path<String>,
  Json(patch): Json<ProblemPatch>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CommunityStore + 'static,
  I: ImageHost + 'static,
{
  let id = parse_id(&id, "problem")?;
  let problem = state
    .store
    .update_problem(id, user.user_id, patch)
    .await
    .map_err(ApiError::store)?;

  Ok(JsonResponse(json!({ "success": true, "problem": problem })))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /problems/{id}`
pub async fn remove<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentUser(user): CurrentUser,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CommunityStore + 'static,
  I: ImageHost + 'static,
{
  let id = parse_id(&id, "problem")?;
  state
    .store
    .delete_problem(id, user.user_id)
    .await
    .map_err(ApiError::store)?;

  tracing::info!(problem_id = %id, "deleted problem");
  Ok(JsonResponse(json!({
    "success": true,
    "message": "Problem deleted successfully",
  })))
}
