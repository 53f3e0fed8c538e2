//! The `CommunityStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `crowdsolve-store-sqlite`). The HTTP layer depends on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  Classify,
  problem::{NewProblem, ProblemDetail, ProblemFilter, ProblemPatch, ProblemView},
  solution::{NewSolution, SolutionView, UpvoteOutcome},
  user::{NewUser, User},
};

/// Abstraction over a CrowdSolve store backend.
///
/// Every mutating operation receives an already-authenticated caller id;
/// credential checks happen before the store is reached.
///
/// The two two-step writes (`create_solution` incrementing the parent's
/// `solutions_count`, `delete_problem` cascading to solutions) are each one
/// logical unit. A backend that cannot complete the second step after the
/// first must report an error classified as
/// [`ErrorKind::PartialFailure`](crate::ErrorKind::PartialFailure).
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait CommunityStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Persist a new user. Fails with a conflict if the email is taken.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Retrieve a user by UUID. Returns `None` if not found.
  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Look up a user and their password hash by (normalised) email.
  fn find_credentials<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<(User, String)>, Self::Error>> + Send + 'a;

  // ── Problems ──────────────────────────────────────────────────────────

  /// Create a problem owned by `owner_id`, status `open`, no solutions.
  fn create_problem(
    &self,
    input: NewProblem,
    owner_id: Uuid,
  ) -> impl Future<Output = Result<ProblemView, Self::Error>> + Send + '_;

  /// All problems matching `filter`, newest first.
  fn list_problems<'a>(
    &'a self,
    filter: &'a ProblemFilter,
  ) -> impl Future<Output = Result<Vec<ProblemView>, Self::Error>> + Send + 'a;

  /// A problem and its solutions, most-upvoted first. Fails with not-found
  /// if `id` is unknown.
  fn get_problem(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<ProblemDetail, Self::Error>> + Send + '_;

  /// Apply `patch` on behalf of `caller_id`, who must own the problem.
  fn update_problem(
    &self,
    id: Uuid,
    caller_id: Uuid,
    patch: ProblemPatch,
  ) -> impl Future<Output = Result<ProblemView, Self::Error>> + Send + '_;

  /// Delete a problem and every solution referencing it. `caller_id` must
  /// own the problem.
  fn delete_problem(
    &self,
    id: Uuid,
    caller_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Solutions ─────────────────────────────────────────────────────────

  /// Propose a solution and bump the parent's `solutions_count` by one.
  fn create_solution(
    &self,
    input: NewSolution,
    author_id: Uuid,
  ) -> impl Future<Output = Result<SolutionView, Self::Error>> + Send + '_;

  /// Add or remove `user_id`'s upvote. Concurrent toggles are serialised per
  /// solution; none are lost.
  fn toggle_upvote(
    &self,
    solution_id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<UpvoteOutcome, Self::Error>> + Send + '_;

  /// Append a comment and return the expanded solution.
  fn add_comment(
    &self,
    solution_id: Uuid,
    author_id: Uuid,
    text: String,
  ) -> impl Future<Output = Result<SolutionView, Self::Error>> + Send + '_;
}
