//! Solutions: proposed remedies for a problem, carrying an upvote set and an
//! append-only comment thread.
//!
//! The upvote set and the comment list are owned exclusively by their
//! solution. Both are only reachable through methods that keep
//! `upvote_count == upvotes.len()`.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Result,
  error::require,
  user::{CommentAuthor, User, UserProfile},
};

// ─── Comment ─────────────────────────────────────────────────────────────────

/// A comment embedded in a solution. Comments have no identity of their own
/// and are never edited or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
  pub author_id:  Uuid,
  pub text:       String,
  pub created_at: DateTime<Utc>,
}

// ─── Upvote toggle ───────────────────────────────────────────────────────────

/// Result of [`Solution::toggle_upvote`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpvoteOutcome {
  pub upvote_count: u32,
  /// Whether the caller's vote is present after the toggle.
  pub has_upvoted:  bool,
}

// ─── Solution ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
  solution_id: Uuid,
  problem_id:  Uuid,
  author_id:   Uuid,
  description: String,
  upvotes:     BTreeSet<Uuid>,
  comments:    Vec<Comment>,
  created_at:  DateTime<Utc>,
  updated_at:  DateTime<Utc>,
}

impl Solution {
  /// A fresh solution with no votes and no comments.
  pub fn new(input: NewSolution, author_id: Uuid, now: DateTime<Utc>) -> Self {
    Self {
      solution_id: Uuid::new_v4(),
      problem_id: input.problem_id,
      author_id,
      description: input.description,
      upvotes: BTreeSet::new(),
      comments: Vec::new(),
      created_at: now,
      updated_at: now,
    }
  }

  /// Reassemble a stored solution. Duplicate voters collapse into one vote.
  #[allow(clippy::too_many_arguments)]
  pub fn from_parts(
    solution_id: Uuid,
    problem_id: Uuid,
    author_id: Uuid,
    description: String,
    upvotes: impl IntoIterator<Item = Uuid>,
    comments: Vec<Comment>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
  ) -> Self {
    Self {
      solution_id,
      problem_id,
      author_id,
      description,
      upvotes: upvotes.into_iter().collect(),
      comments,
      created_at,
      updated_at,
    }
  }

  pub fn solution_id(&self) -> Uuid { self.solution_id }

  pub fn problem_id(&self) -> Uuid { self.problem_id }

  pub fn author_id(&self) -> Uuid { self.author_id }

  pub fn description(&self) -> &str { &self.description }

  pub fn upvotes(&self) -> &BTreeSet<Uuid> { &self.upvotes }

  pub fn upvote_count(&self) -> u32 {
    u32::try_from(self.upvotes.len()).unwrap_or(u32::MAX)
  }

  pub fn has_upvoted(&self, user_id: Uuid) -> bool {
    self.upvotes.contains(&user_id)
  }

  pub fn comments(&self) -> &[Comment] { &self.comments }

  pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

  pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

  /// Add `user_id`'s vote if absent, remove it if present.
  pub fn toggle_upvote(
    &mut self,
    user_id: Uuid,
    now: DateTime<Utc>,
  ) -> UpvoteOutcome {
    let has_upvoted = if self.upvotes.remove(&user_id) {
      false
    } else {
      self.upvotes.insert(user_id);
      true
    };
    self.updated_at = now;
    UpvoteOutcome {
      upvote_count: self.upvote_count(),
      has_upvoted,
    }
  }

  /// Append a comment to the end of the thread.
  pub fn add_comment(
    &mut self,
    author_id: Uuid,
    text: &str,
    now: DateTime<Utc>,
  ) -> Result<&Comment> {
    require("text", text)?;
    self.comments.push(Comment {
      author_id,
      text: text.to_owned(),
      created_at: now,
    });
    self.updated_at = now;
    Ok(&self.comments[self.comments.len() - 1])
  }

  /// Every user id this solution refers to: its author and each commenter.
  pub fn referenced_users(&self) -> impl Iterator<Item = Uuid> + '_ {
    std::iter::once(self.author_id)
      .chain(self.comments.iter().map(|c| c.author_id))
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`crate::store::CommunityStore::create_solution`].
#[derive(Debug, Clone)]
pub struct NewSolution {
  pub problem_id:  Uuid,
  pub description: String,
}

impl NewSolution {
  pub fn new(problem_id: Uuid, description: &str) -> Result<Self> {
    require("description", description)?;
    Ok(Self {
      problem_id,
      description: description.to_owned(),
    })
  }
}

// ─── Read models ─────────────────────────────────────────────────────────────

/// A comment with its author expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
  pub author:     Option<CommentAuthor>,
  pub text:       String,
  pub created_at: DateTime<Utc>,
}

/// A solution with its author and comment authors expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionView {
  pub solution_id:  Uuid,
  pub problem_id:   Uuid,
  pub description:  String,
  pub author:       Option<UserProfile>,
  pub upvotes:      Vec<Uuid>,
  pub upvote_count: u32,
  pub comments:     Vec<CommentView>,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

impl SolutionView {
  /// Expand `solution` against a user directory. Users missing from
  /// `users` are rendered as `null`.
  pub fn assemble(solution: &Solution, users: &HashMap<Uuid, User>) -> Self {
    Self {
      solution_id:  solution.solution_id,
      problem_id:   solution.problem_id,
      description:  solution.description.clone(),
      author:       users.get(&solution.author_id).map(User::profile),
      upvotes:      solution.upvotes.iter().copied().collect(),
      upvote_count: solution.upvote_count(),
      comments:     solution
        .comments
        .iter()
        .map(|c| CommentView {
          author:     users.get(&c.author_id).map(User::comment_author),
          text:       c.text.clone(),
          created_at: c.created_at,
        })
        .collect(),
      created_at:   solution.created_at,
      updated_at:   solution.updated_at,
    }
  }
}
