//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure is rendered as `{"code": .., "error": ..}` with a status
//! derived from its [`ErrorKind`].

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use crowdsolve_core::{Classify, ErrorKind};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  Validation(String),

  #[error("{0}")]
  Unauthorized(&'static str),

  #[error("{0}")]
  Forbidden(String),

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  Conflict(String),

  #[error("{0}")]
  PayloadTooLarge(String),

  #[error("image upload failed: {0}")]
  Upload(String),

  #[error("{0}")]
  PartialFailure(String),

  #[error("{0}")]
  Internal(String),
}

impl ApiError {
  /// Map a classified store or core error onto its HTTP counterpart.
  pub fn store<E>(error: E) -> Self
  where
    E: std::error::Error + Classify,
  {
    let message = error.to_string();
    match error.kind() {
      ErrorKind::Validation => Self::Validation(message),
      ErrorKind::NotFound => Self::NotFound(message),
      ErrorKind::Forbidden => {
        tracing::warn!(error = %message, "ownership check rejected request");
        Self::Forbidden(message)
      }
      ErrorKind::Conflict => Self::Conflict(message),
      ErrorKind::PartialFailure => Self::PartialFailure(message),
      ErrorKind::Internal => Self::Internal(message),
    }
  }

  pub fn internal(error: impl std::fmt::Display) -> Self {
    Self::Internal(error.to_string())
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::Validation(_) => StatusCode::BAD_REQUEST,
      Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      Self::Forbidden(_) => StatusCode::FORBIDDEN,
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::Conflict(_) => StatusCode::CONFLICT,
      Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
      Self::Upload(_) => StatusCode::BAD_GATEWAY,
      Self::PartialFailure(_) | Self::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  pub fn code(&self) -> &'static str {
    match self {
      Self::Validation(_) => "validation",
      Self::Unauthorized(_) => "unauthorized",
      Self::Forbidden(_) => "forbidden",
      Self::NotFound(_) => "not_found",
      Self::Conflict(_) => "conflict",
      Self::PayloadTooLarge(_) => "payload_too_large",
      Self::Upload(_) => "upload",
      Self::PartialFailure(_) => "partial_failure",
      Self::Internal(_) => "internal",
    }
  }
}

impl From<crowdsolve_core::Error> for ApiError {
  fn from(error: crowdsolve_core::Error) -> Self { Self::store(error) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let message = match &self {
      Self::Internal(detail) => {
        tracing::error!(error = %detail, "internal error");
        "internal server error".to_owned()
      }
      Self::PartialFailure(detail) => {
        tracing::error!(error = %detail, "two-step write did not complete");
        detail.clone()
      }
      Self::Upload(detail) => {
        tracing::error!(error = %detail, "image upload failed");
        self.to_string()
      }
      other => other.to_string(),
    };

    (
      self.status(),
      Json(json!({ "code": self.code(), "error": message })),
    )
      .into_response()
  }
}
