//! Error type for `crowdsolve-store-sqlite`.

use crowdsolve_core::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] crowdsolve_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A stored column could not be turned back into a domain value.
  #[error("decode error: {0}")]
  Decode(String),

  /// The second write of a two-step operation failed; the transaction was
  /// rolled back, so neither write is visible.
  #[error("{step} failed after {committed}; rolled back: {reason}")]
  PartialFailure {
    committed: &'static str,
    step:      &'static str,
    reason:    String,
  },
}

impl Error {
  pub(crate) fn partial(
    committed: &'static str,
    step: &'static str,
    reason: impl ToString,
  ) -> Self {
    Self::PartialFailure { committed, step, reason: reason.to_string() }
  }
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::Core(e) => e.kind(),
      Self::PartialFailure { .. } => ErrorKind::PartialFailure,
      Self::Database(_)
      | Self::Sqlite(_)
      | Self::Json(_)
      | Self::Uuid(_)
      | Self::Decode(_) => ErrorKind::Internal,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
