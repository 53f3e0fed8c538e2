//! Router tests: real in-memory store, fake image host.

use std::sync::{Arc, Mutex};

use axum::{
  Router,
  body::Body,
  http::{Method, Request, StatusCode, header},
};
use chrono::Duration;
use crowdsolve_core::media::{ImageHost, ImageUpload};
use crowdsolve_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{AppState, AuthConfig, api_router};

// ─── Fixtures ────────────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeImages {
  uploads: Mutex<Vec<ImageUpload>>,
}

#[derive(Debug, thiserror::Error)]
#[error("image host unavailable")]
struct Unavailable;

impl ImageHost for FakeImages {
  type Error = Unavailable;

  async fn upload(&self, image: ImageUpload) -> Result<String, Unavailable> {
    let mut uploads = self.uploads.lock().unwrap();
    uploads.push(image);
    Ok(format!("https://images.test/{}.png", uploads.len()))
  }
}

struct FailingImages;

impl ImageHost for FailingImages {
  type Error = Unavailable;

  async fn upload(&self, _: ImageUpload) -> Result<String, Unavailable> {
    Err(Unavailable)
  }
}

async fn state_with<I: ImageHost>(images: Arc<I>) -> AppState<SqliteStore, I> {
  AppState {
    store: Arc::new(SqliteStore::open_in_memory().await.unwrap()),
    images,
    auth: Arc::new(AuthConfig::new(b"test-secret", Duration::days(30), false)),
    max_upload_bytes: 1024 * 1024,
  }
}

async fn app() -> (Router, Arc<FakeImages>) {
  let images = Arc::new(FakeImages::default());
  let router = api_router(state_with(images.clone()).await);
  (router, images)
}

struct Reply {
  status: StatusCode,
  cookie: Option<String>,
  body:   Value,
}

async fn send(app: &Router, req: Request<Body>) -> Reply {
  let resp = app.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let cookie = resp
    .headers()
    .get(header::SET_COOKIE)
    .map(|v| v.to_str().unwrap().to_owned());
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let body = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  Reply { status, cookie, body }
}

fn json_request(
  method: Method,
  uri: &str,
  session: Option<&str>,
  body: Option<Value>,
) -> Request<Body> {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(session) = session {
    builder = builder.header(header::COOKIE, session);
  }
  match body {
    Some(body) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  }
}

const BOUNDARY: &str = "crowdsolve-test-boundary";

fn multipart_request(
  session: Option<&str>,
  fields: &[(&str, &str)],
  image: Option<&[u8]>,
) -> Request<Body> {
  let mut body = Vec::new();
  for (name, value) in fields {
    body.extend_from_slice(
      format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n\
         {value}\r\n"
      )
      .as_bytes(),
    );
  }
  if let Some(bytes) = image {
    body.extend_from_slice(
      format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; \
         filename=\"pothole.png\"\r\nContent-Type: image/png\r\n\r\n"
      )
      .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n");
  }
  body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

  let mut builder = Request::builder()
    .method(Method::POST)
    .uri("/problems")
    .header(
      header::CONTENT_TYPE,
      format!("multipart/form-data; boundary={BOUNDARY}"),
    );
  if let Some(session) = session {
    builder = builder.header(header::COOKIE, session);
  }
  builder.body(Body::from(body)).unwrap()
}

/// The `name=value` pair of a `Set-Cookie` header, ready to send back.
fn session_of(reply: &Reply) -> String {
  let cookie = reply.cookie.as_deref().expect("Set-Cookie header");
  cookie.split(';').next().unwrap().to_owned()
}

async fn register(app: &Router, name: &str) -> (String, Value) {
  let reply = send(
    app,
    json_request(
      Method::POST,
      "/auth/register",
      None,
      Some(json!({
        "name": name,
        "email": format!("{}@example.com", name.to_lowercase()),
        "password": "correct horse",
      })),
    ),
  )
  .await;
  assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
  (session_of(&reply), reply.body["user"].clone())
}

async fn create_problem(app: &Router, session: &str, location: &str) -> Value {
  let reply = send(
    app,
    multipart_request(
      Some(session),
      &[
        ("title", "Pothole on Elm St"),
        ("description", "Large pothole"),
        ("location", location),
      ],
      None,
    ),
  )
  .await;
  assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
  reply.body["problem"].clone()
}

// ─── Identity ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_me_logout_login() {
  let (app, _) = app().await;
  let (session, user) = register(&app, "Ada").await;
  assert_eq!(user["email"], "ada@example.com");
  assert_eq!(user["avatar"], "");

  let me = send(&app, json_request(Method::GET, "/auth/me", Some(&session), None))
    .await;
  assert_eq!(me.status, StatusCode::OK);
  assert_eq!(me.body["user"]["userId"], user["userId"]);

  let out = send(&app, json_request(Method::POST, "/auth/logout", None, None))
    .await;
  assert_eq!(out.status, StatusCode::OK);
  assert!(out.cookie.unwrap().contains("Max-Age=0"));

  let login = send(
    &app,
    json_request(
      Method::POST,
      "/auth/login",
      None,
      Some(json!({ "email": "ADA@example.com", "password": "correct horse" })),
    ),
  )
  .await;
  assert_eq!(login.status, StatusCode::OK);
  assert_eq!(login.body["user"]["userId"], user["userId"]);
  assert!(login.cookie.unwrap().contains("HttpOnly"));
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
  let (app, _) = app().await;
  register(&app, "Ada").await;

  let reply = send(
    &app,
    json_request(
      Method::POST,
      "/auth/register",
      None,
      Some(json!({ "name": "Ada", "email": "ada@example.com", "password": "x" })),
    ),
  )
  .await;
  assert_eq!(reply.status, StatusCode::CONFLICT);
  assert_eq!(reply.body["code"], "conflict");
}

#[tokio::test]
async fn registration_requires_fields() {
  let (app, _) = app().await;
  let reply = send(
    &app,
    json_request(
      Method::POST,
      "/auth/register",
      None,
      Some(json!({ "name": "Ada", "email": "ada@example.com" })),
    ),
  )
  .await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
  assert_eq!(reply.body["code"], "validation");
}

#[tokio::test]
async fn whitespace_password_is_missing() {
  let (app, _) = app().await;
  let reply = send(
    &app,
    json_request(
      Method::POST,
      "/auth/register",
      None,
      Some(json!({
        "name": "Ada",
        "email": "ada@example.com",
        "password": "   ",
      })),
    ),
  )
  .await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
  assert_eq!(reply.body["error"], "password is required");
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
  let (app, _) = app().await;
  register(&app, "Ada").await;

  let reply = send(
    &app,
    json_request(
      Method::POST,
      "/auth/login",
      None,
      Some(json!({ "email": "ada@example.com", "password": "wrong" })),
    ),
  )
  .await;
  assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
  assert!(reply.cookie.is_none());
}

#[tokio::test]
async fn protected_routes_need_a_valid_cookie() {
  let (app, _) = app().await;

  let none = send(&app, json_request(Method::GET, "/auth/me", None, None)).await;
  assert_eq!(none.status, StatusCode::UNAUTHORIZED);
  assert_eq!(none.body["code"], "unauthorized");

  let forged = send(
    &app,
    json_request(Method::GET, "/auth/me", Some("token=forged.token.value"), None),
  )
  .await;
  assert_eq!(forged.status, StatusCode::UNAUTHORIZED);

  let create = send(
    &app,
    multipart_request(None, &[("title", "t"), ("description", "d"), ("location", "l")], None),
  )
  .await;
  assert_eq!(create.status, StatusCode::UNAUTHORIZED);
}

// ─── Problems ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_problem_with_image() {
  let (app, images) = app().await;
  let (session, user) = register(&app, "Ada").await;

  let reply = send(
    &app,
    multipart_request(
      Some(&session),
      &[
        ("title", "  Broken light  "),
        ("description", "Out since Monday"),
        ("location", "Springfield"),
      ],
      Some(b"\x89PNG fake"),
    ),
  )
  .await;
  assert_eq!(reply.status, StatusCode::CREATED);

  let problem = &reply.body["problem"];
  assert_eq!(problem["title"], "Broken light");
  assert_eq!(problem["status"], "open");
  assert_eq!(problem["solutionsCount"], 0);
  assert_eq!(problem["image"], "https://images.test/1.png");
  assert_eq!(problem["owner"]["userId"], user["userId"]);

  let uploads = images.uploads.lock().unwrap();
  assert_eq!(uploads.len(), 1);
  assert_eq!(uploads[0].file_name.as_deref(), Some("pothole.png"));
  assert_eq!(uploads[0].content_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn invalid_submission_never_reaches_image_host() {
  let (app, images) = app().await;
  let (session, _) = register(&app, "Ada").await;

  let reply = send(
    &app,
    multipart_request(
      Some(&session),
      &[("description", "d"), ("location", "l")],
      Some(b"bytes"),
    ),
  )
  .await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
  assert!(images.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn image_host_failure_is_bad_gateway() {
  let app = api_router(state_with(Arc::new(FailingImages)).await);
  let (session, _) = register(&app, "Ada").await;

  let reply = send(
    &app,
    multipart_request(
      Some(&session),
      &[("title", "t"), ("description", "d"), ("location", "l")],
      Some(b"bytes"),
    ),
  )
  .await;
  assert_eq!(reply.status, StatusCode::BAD_GATEWAY);
  assert_eq!(reply.body["code"], "upload");

  let list = send(&app, json_request(Method::GET, "/problems", None, None)).await;
  assert_eq!(list.body["count"], 0);
}

#[tokio::test]
async fn oversized_upload_is_payload_too_large() {
  let (app, images) = app().await;
  let (session, _) = register(&app, "Ada").await;

  let image = vec![0u8; 2 * 1024 * 1024];
  let reply = send(
    &app,
    multipart_request(
      Some(&session),
      &[("title", "t"), ("description", "d"), ("location", "l")],
      Some(&image),
    ),
  )
  .await;
  assert_eq!(reply.status, StatusCode::PAYLOAD_TOO_LARGE);
  assert_eq!(reply.body["code"], "payload_too_large");
  assert!(images.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_status_filter_is_rejected() {
  let (app, _) = app().await;
  let reply = send(
    &app,
    json_request(Method::GET, "/problems?status=closed", None, None),
  )
  .await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_and_unknown_ids_are_not_found() {
  let (app, _) = app().await;
  for uri in [
    "/problems/not-a-uuid".to_owned(),
    format!("/problems/{}", uuid::Uuid::new_v4()),
  ] {
    let reply = send(&app, json_request(Method::GET, &uri, None, None)).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["code"], "not_found");
  }
}

#[tokio::test]
async fn only_the_owner_may_update_or_delete() {
  let (app, _) = app().await;
  let (ada, _) = register(&app, "Ada").await;
  let (bob, _) = register(&app, "Bob").await;
  let problem = create_problem(&app, &ada, "Springfield").await;
  let uri = format!("/problems/{}", problem["problemId"].as_str().unwrap());

  let put = send(
    &app,
    json_request(Method::PUT, &uri, Some(&bob), Some(json!({ "status": "solved" }))),
  )
  .await;
  assert_eq!(put.status, StatusCode::FORBIDDEN);
  assert_eq!(put.body["code"], "forbidden");

  let delete = send(&app, json_request(Method::DELETE, &uri, Some(&bob), None)).await;
  assert_eq!(delete.status, StatusCode::FORBIDDEN);

  let get = send(&app, json_request(Method::GET, &uri, None, None)).await;
  assert_eq!(get.body["problem"]["status"], "open");

  let put = send(
    &app,
    json_request(Method::PUT, &uri, Some(&ada), Some(json!({ "status": "in-progress" }))),
  )
  .await;
  assert_eq!(put.status, StatusCode::OK);
  assert_eq!(put.body["problem"]["status"], "in-progress");

  let bad = send(
    &app,
    json_request(Method::PUT, &uri, Some(&ada), Some(json!({ "status": "closed" }))),
  )
  .await;
  assert_eq!(bad.status, StatusCode::BAD_REQUEST);

  let delete = send(&app, json_request(Method::DELETE, &uri, Some(&ada), None)).await;
  assert_eq!(delete.status, StatusCode::OK);
  assert_eq!(delete.body["message"], "Problem deleted successfully");

  let gone = send(&app, json_request(Method::GET, &uri, None, None)).await;
  assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

// ─── End to end ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn pothole_scenario_over_http() {
  let (app, _) = app().await;
  let (ada, _) = register(&app, "Ada").await;
  let (bob, bob_user) = register(&app, "Bob").await;

  let problem = create_problem(&app, &ada, "Springfield").await;
  let problem_id = problem["problemId"].as_str().unwrap().to_owned();
  create_problem(&app, &ada, "Shelbyville").await;

  let list = send(
    &app,
    json_request(Method::GET, "/problems?location=spring", None, None),
  )
  .await;
  assert_eq!(list.body["count"], 1);
  assert_eq!(list.body["problems"][0]["problemId"], problem_id.as_str());

  let created = send(
    &app,
    json_request(
      Method::POST,
      &format!("/solutions/problems/{problem_id}/solutions"),
      Some(&bob),
      Some(json!({ "description": "Fill with gravel" })),
    ),
  )
  .await;
  assert_eq!(created.status, StatusCode::CREATED);
  let solution_id = created.body["solution"]["solutionId"]
    .as_str()
    .unwrap()
    .to_owned();

  let detail = send(
    &app,
    json_request(Method::GET, &format!("/problems/{problem_id}"), None, None),
  )
  .await;
  assert_eq!(detail.body["problem"]["solutionsCount"], 1);
  assert_eq!(detail.body["solutions"].as_array().unwrap().len(), 1);
  assert_eq!(detail.body["solutions"][0]["upvoteCount"], 0);

  let upvote_uri = format!("/solutions/{solution_id}/upvote");
  let on = send(&app, json_request(Method::PUT, &upvote_uri, Some(&ada), None)).await;
  assert_eq!(on.body["upvoteCount"], 1);
  assert_eq!(on.body["hasUpvoted"], true);
  let off = send(&app, json_request(Method::PUT, &upvote_uri, Some(&ada), None)).await;
  assert_eq!(off.body["upvoteCount"], 0);
  assert_eq!(off.body["hasUpvoted"], false);

  let commented = send(
    &app,
    json_request(
      Method::POST,
      &format!("/solutions/{solution_id}/comments"),
      Some(&bob),
      Some(json!({ "text": "Good idea" })),
    ),
  )
  .await;
  assert_eq!(commented.status, StatusCode::CREATED);
  let comments = commented.body["solution"]["comments"].as_array().unwrap();
  assert_eq!(comments.len(), 1);
  assert_eq!(comments[0]["text"], "Good idea");
  assert_eq!(comments[0]["author"]["userId"], bob_user["userId"]);
  assert!(comments[0]["author"].get("email").is_none());
}

#[tokio::test]
async fn solution_on_missing_problem_is_not_found() {
  let (app, _) = app().await;
  let (session, _) = register(&app, "Ada").await;
  let reply = send(
    &app,
    json_request(
      Method::POST,
      &format!("/solutions/problems/{}/solutions", uuid::Uuid::new_v4()),
      Some(&session),
      Some(json!({ "description": "x" })),
    ),
  )
  .await;
  assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blank_comment_is_a_validation_error() {
  let (app, _) = app().await;
  let (session, _) = register(&app, "Ada").await;
  let problem = create_problem(&app, &session, "Springfield").await;
  let created = send(
    &app,
    json_request(
      Method::POST,
      &format!(
        "/solutions/problems/{}/solutions",
        problem["problemId"].as_str().unwrap()
      ),
      Some(&session),
      Some(json!({ "description": "Fill it" })),
    ),
  )
  .await;
  let solution_id = created.body["solution"]["solutionId"].as_str().unwrap();

  let reply = send(
    &app,
    json_request(
      Method::POST,
      &format!("/solutions/{solution_id}/comments"),
      Some(&session),
      Some(json!({ "text": "  " })),
    ),
  )
  .await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
  assert_eq!(reply.body["code"], "validation");
}
