//! Problems: community-reported issues with a location and optional image.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  error::require,
  solution::SolutionView,
  user::UserProfile,
};

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ProblemStatus {
  #[default]
  Open,
  InProgress,
  Solved,
}

impl ProblemStatus {
  /// The string stored in the `status` column and used on the wire.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Open => "open",
      Self::InProgress => "in-progress",
      Self::Solved => "solved",
    }
  }
}

impl FromStr for ProblemStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "open" => Ok(Self::Open),
      "in-progress" => Ok(Self::InProgress),
      "solved" => Ok(Self::Solved),
      other => Err(Error::InvalidStatus(other.to_owned())),
    }
  }
}

impl fmt::Display for ProblemStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Problem ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
  pub problem_id:      Uuid,
  pub title:           String,
  pub description:     String,
  pub location:        String,
  /// Hosted image URL, or empty when no image was attached.
  pub image:           String,
  /// Set at creation; never changes.
  pub owner_id:        Uuid,
  pub status:          ProblemStatus,
  /// Denormalised count of solutions ever created against this problem.
  /// Only incremented, never recomputed.
  pub solutions_count: u32,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

impl Problem {
  /// Build a fresh problem from validated input: status `open`, zero
  /// solutions.
  pub fn new(input: NewProblem, owner_id: Uuid, now: DateTime<Utc>) -> Self {
    Self {
      problem_id: Uuid::new_v4(),
      title: input.title,
      description: input.description,
      location: input.location,
      image: input.image,
      owner_id,
      status: ProblemStatus::Open,
      solutions_count: 0,
      created_at: now,
      updated_at: now,
    }
  }
}

/// Owner gate for update and delete: plain identity equality.
pub fn is_owner(problem: &Problem, caller_id: Uuid) -> bool {
  problem.owner_id == caller_id
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`crate::store::CommunityStore::create_problem`].
#[derive(Debug, Clone)]
pub struct NewProblem {
  pub title:       String,
  pub description: String,
  pub location:    String,
  pub image:       String,
}

impl NewProblem {
  /// Validate the three required text fields. The title is trimmed.
  pub fn new(title: &str, description: &str, location: &str) -> Result<Self> {
    require("title", title)?;
    require("description", description)?;
    require("location", location)?;
    Ok(Self {
      title:       title.trim().to_owned(),
      description: description.to_owned(),
      location:    location.to_owned(),
      image:       String::new(),
    })
  }

  pub fn with_image(mut self, url: impl Into<String>) -> Self {
    self.image = url.into();
    self
  }
}

/// Owner-supplied changes to a problem. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemPatch {
  pub title:       Option<String>,
  pub description: Option<String>,
  pub location:    Option<String>,
  pub status:      Option<ProblemStatus>,
  pub image:       Option<String>,
}

impl ProblemPatch {
  /// Return a patched copy of `problem`, re-validated. `problem` itself is
  /// never modified, so a rejected patch leaves the stored record intact.
  pub fn apply(&self, problem: &Problem, now: DateTime<Utc>) -> Result<Problem> {
    let mut next = problem.clone();
    if let Some(title) = &self.title {
      next.title = title.trim().to_owned();
    }
    if let Some(description) = &self.description {
      next.description = description.clone();
    }
    if let Some(location) = &self.location {
      next.location = location.clone();
    }
    if let Some(status) = self.status {
      next.status = status;
    }
    if let Some(image) = &self.image {
      next.image = image.clone();
    }

    require("title", &next.title)?;
    require("description", &next.description)?;
    require("location", &next.location)?;

    next.updated_at = now;
    Ok(next)
  }
}

// ─── Filtering ───────────────────────────────────────────────────────────────

/// Parameters for [`crate::store::CommunityStore::list_problems`].
#[derive(Debug, Clone, Default)]
pub struct ProblemFilter {
  pub status:   Option<ProblemStatus>,
  /// Case-insensitive substring matched against `location`.
  pub location: Option<String>,
}

impl ProblemFilter {
  /// Build a filter from raw query-string values. Empty strings count as
  /// absent; an unknown status is rejected.
  pub fn parse(status: Option<&str>, location: Option<&str>) -> Result<Self> {
    let status = status
      .filter(|s| !s.is_empty())
      .map(str::parse::<ProblemStatus>)
      .transpose()?;
    let location = location
      .filter(|l| !l.trim().is_empty())
      .map(str::to_owned);
    Ok(Self { status, location })
  }

  pub fn matches(&self, problem: &Problem) -> bool {
    if self.status.is_some_and(|s| s != problem.status) {
      return false;
    }
    match &self.location {
      Some(needle) => problem
        .location
        .to_lowercase()
        .contains(&needle.to_lowercase()),
      None => true,
    }
  }
}

// ─── Read models ─────────────────────────────────────────────────────────────

/// A problem with its owner expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemView {
  #[serde(flatten)]
  pub problem: Problem,
  /// `None` only if the owning user record has vanished.
  pub owner:   Option<UserProfile>,
}

/// The detail read model: a problem plus every solution proposed for it,
/// most-upvoted first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDetail {
  pub problem:   ProblemView,
  pub solutions: Vec<SolutionView>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn problem() -> Problem {
    Problem::new(
      NewProblem::new("Pothole on Elm St", "Large pothole", "Springfield")
        .unwrap(),
      Uuid::new_v4(),
      Utc::now(),
    )
  }

  #[test]
  fn new_problem_is_open_with_no_solutions() {
    let p = problem();
    assert_eq!(p.status, ProblemStatus::Open);
    assert_eq!(p.solutions_count, 0);
    assert_eq!(p.image, "");
    assert_eq!(p.created_at, p.updated_at);
  }

  #[test]
  fn new_problem_rejects_blank_fields() {
    assert!(matches!(
      NewProblem::new("", "d", "l"),
      Err(Error::MissingField("title"))
    ));
    assert!(matches!(
      NewProblem::new("t", "  ", "l"),
      Err(Error::MissingField("description"))
    ));
    assert!(matches!(
      NewProblem::new("t", "d", ""),
      Err(Error::MissingField("location"))
    ));
  }

  #[test]
  fn title_is_trimmed() {
    let input = NewProblem::new("  Broken light  ", "d", "l").unwrap();
    assert_eq!(input.title, "Broken light");
  }

  #[test]
  fn status_wire_format() {
    assert_eq!(
      serde_json::to_string(&ProblemStatus::InProgress).unwrap(),
      "\"in-progress\""
    );
    assert_eq!(
      "in-progress".parse::<ProblemStatus>().unwrap(),
      ProblemStatus::InProgress
    );
    assert!(matches!(
      "closed".parse::<ProblemStatus>(),
      Err(Error::InvalidStatus(_))
    ));
  }

  #[test]
  fn patch_applies_fields_and_bumps_updated_at() {
    let p = problem();
    let later = p.updated_at + chrono::Duration::seconds(5);
    let patch = ProblemPatch {
      status: Some(ProblemStatus::Solved),
      location: Some("Shelbyville".into()),
      ..Default::default()
    };
    let next = patch.apply(&p, later).unwrap();
    assert_eq!(next.status, ProblemStatus::Solved);
    assert_eq!(next.location, "Shelbyville");
    assert_eq!(next.title, p.title);
    assert_eq!(next.owner_id, p.owner_id);
    assert_eq!(next.updated_at, later);
  }

  #[test]
  fn patch_that_blanks_a_field_is_rejected() {
    let p = problem();
    let patch = ProblemPatch {
      title: Some("   ".into()),
      ..Default::default()
    };
    assert!(matches!(
      patch.apply(&p, Utc::now()),
      Err(Error::MissingField("title"))
    ));
  }

  #[test]
  fn filter_matches_location_case_insensitively() {
    let p = problem();
    let filter = ProblemFilter::parse(None, Some("spring")).unwrap();
    assert!(filter.matches(&p));
    let filter = ProblemFilter::parse(None, Some("FIELD")).unwrap();
    assert!(filter.matches(&p));
    let filter = ProblemFilter::parse(None, Some("shelby")).unwrap();
    assert!(!filter.matches(&p));
  }

  #[test]
  fn filter_matches_status_exactly() {
    let p = problem();
    assert!(ProblemFilter::parse(Some("open"), None).unwrap().matches(&p));
    assert!(!ProblemFilter::parse(Some("solved"), None).unwrap().matches(&p));
    assert!(ProblemFilter::parse(Some(""), Some("")).unwrap().matches(&p));
    assert!(ProblemFilter::parse(Some("bogus"), None).is_err());
  }

  #[test]
  fn ownership_is_identity_equality() {
    let p = problem();
    assert!(is_owner(&p, p.owner_id));
    assert!(!is_owner(&p, Uuid::new_v4()));
  }
}
