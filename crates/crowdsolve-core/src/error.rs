//! Error types for `crowdsolve-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{0} is required")]
  MissingField(&'static str),

  #[error("invalid problem status: {0:?}")]
  InvalidStatus(String),

  #[error("problem not found: {0}")]
  ProblemNotFound(Uuid),

  #[error("solution not found: {0}")]
  SolutionNotFound(Uuid),

  #[error("user not found: {0}")]
  UserNotFound(Uuid),

  #[error("user {caller} is not the owner of problem {problem}")]
  NotOwner { problem: Uuid, caller: Uuid },

  #[error("email is already registered: {0}")]
  EmailTaken(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Classification ──────────────────────────────────────────────────────────

/// The coarse failure categories a caller needs in order to react to an
/// error (render a message, retry, alert).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// A required field is missing or malformed.
  Validation,
  /// A referenced problem, solution or user does not exist.
  NotFound,
  /// The caller does not own the resource it tried to mutate.
  Forbidden,
  /// The write would violate a uniqueness constraint.
  Conflict,
  /// The second half of a two-step write failed; nothing was committed.
  PartialFailure,
  /// Storage or serialisation fault.
  Internal,
}

/// Implemented by every error a [`crate::store::CommunityStore`] can return,
/// so the HTTP layer can map failures without knowing the backend.
pub trait Classify {
  fn kind(&self) -> ErrorKind;
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::MissingField(_) | Self::InvalidStatus(_) => ErrorKind::Validation,
      Self::ProblemNotFound(_)
      | Self::SolutionNotFound(_)
      | Self::UserNotFound(_) => ErrorKind::NotFound,
      Self::NotOwner { .. } => ErrorKind::Forbidden,
      Self::EmailTaken(_) => ErrorKind::Conflict,
    }
  }
}

/// Fail with [`Error::MissingField`] unless `value` has visible content.
pub(crate) fn require(field: &'static str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::MissingField(field));
  }
  Ok(())
}
