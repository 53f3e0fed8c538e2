//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so that lexical order equals chronological order.
//! Embedded collections (upvotes, comments) are stored as compact JSON.
//! UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use crowdsolve_core::{
  problem::{Problem, ProblemStatus},
  solution::{Comment, Solution},
  user::User,
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

// ─── ProblemStatus ────────────────────────────────────────────────────────────

pub fn decode_status(s: &str) -> Result<ProblemStatus> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown problem status: {s:?}")))
}

// ─── Embedded collections ─────────────────────────────────────────────────────

pub fn encode_upvotes(solution: &Solution) -> Result<String> {
  Ok(serde_json::to_string(solution.upvotes())?)
}

pub fn encode_comments(comments: &[Comment]) -> Result<String> {
  Ok(serde_json::to_string(comments)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str = "user_id, name, email, avatar, created_at";

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:    String,
  pub name:       String,
  pub email:      String,
  pub avatar:     String,
  pub created_at: String,
}

impl RawUser {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:    row.get(0)?,
      name:       row.get(1)?,
      email:      row.get(2)?,
      avatar:     row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:    decode_uuid(&self.user_id)?,
      name:       self.name,
      email:      self.email,
      avatar:     self.avatar,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const PROBLEM_COLUMNS: &str = "problem_id, title, description, location, \
  image, owner_id, status, solutions_count, created_at, updated_at";

/// Raw strings read directly from a `problems` row.
pub struct RawProblem {
  pub problem_id:      String,
  pub title:           String,
  pub description:     String,
  pub location:        String,
  pub image:           String,
  pub owner_id:        String,
  pub status:          String,
  pub solutions_count: i64,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawProblem {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      problem_id:      row.get(0)?,
      title:           row.get(1)?,
      description:     row.get(2)?,
      location:        row.get(3)?,
      image:           row.get(4)?,
      owner_id:        row.get(5)?,
      status:          row.get(6)?,
      solutions_count: row.get(7)?,
      created_at:      row.get(8)?,
      updated_at:      row.get(9)?,
    })
  }

  pub fn into_problem(self) -> Result<Problem> {
    let solutions_count = u32::try_from(self.solutions_count).map_err(|_| {
      Error::Decode(format!("solutions_count out of range: {}", self.solutions_count))
    })?;

    Ok(Problem {
      problem_id: decode_uuid(&self.problem_id)?,
      title: self.title,
      description: self.description,
      location: self.location,
      image: self.image,
      owner_id: decode_uuid(&self.owner_id)?,
      status: decode_status(&self.status)?,
      solutions_count,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

pub const SOLUTION_COLUMNS: &str = "solution_id, problem_id, author_id, \
  description, upvotes, comments, created_at, updated_at";

/// Raw strings read directly from a `solutions` row. `upvote_count` is not
/// read back: it is derived from the decoded upvote set.
pub struct RawSolution {
  pub solution_id: String,
  pub problem_id:  String,
  pub author_id:   String,
  pub description: String,
  pub upvotes:     String,
  pub comments:    String,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawSolution {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      solution_id: row.get(0)?,
      problem_id:  row.get(1)?,
      author_id:   row.get(2)?,
      description: row.get(3)?,
      upvotes:     row.get(4)?,
      comments:    row.get(5)?,
      created_at:  row.get(6)?,
      updated_at:  row.get(7)?,
    })
  }

  pub fn into_solution(self) -> Result<Solution> {
    let upvotes: Vec<Uuid> = serde_json::from_str(&self.upvotes)?;
    let comments: Vec<Comment> = serde_json::from_str(&self.comments)?;

    Ok(Solution::from_parts(
      decode_uuid(&self.solution_id)?,
      decode_uuid(&self.problem_id)?,
      decode_uuid(&self.author_id)?,
      self.description,
      upvotes,
      comments,
      decode_dt(&self.created_at)?,
      decode_dt(&self.updated_at)?,
    ))
  }
}
