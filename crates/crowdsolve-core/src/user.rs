//! Users: the identities that own problems and author solutions.
//!
//! The core never mutates a user after registration; problems and solutions
//! only hold the user's UUID and expand it into a profile on read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Result, error::require};

/// A registered user. The password hash is deliberately not part of this
/// type; it only travels through [`NewUser`] and the store's credential
/// lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub user_id:    Uuid,
  pub name:       String,
  pub email:      String,
  /// URL of the avatar image, or empty.
  pub avatar:     String,
  pub created_at: DateTime<Utc>,
}

impl User {
  pub fn profile(&self) -> UserProfile {
    UserProfile {
      user_id: self.user_id,
      name:    self.name.clone(),
      email:   self.email.clone(),
      avatar:  self.avatar.clone(),
    }
  }

  pub fn comment_author(&self) -> CommentAuthor {
    CommentAuthor {
      user_id: self.user_id,
      name:    self.name.clone(),
      avatar:  self.avatar.clone(),
    }
  }
}

/// The public projection of a user embedded in problems and solutions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
  pub user_id: Uuid,
  pub name:    String,
  pub email:   String,
  pub avatar:  String,
}

/// The narrower projection embedded in comments (no email).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentAuthor {
  pub user_id: Uuid,
  pub name:    String,
  pub avatar:  String,
}

/// Input to [`crate::store::CommunityStore::create_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub name:          String,
  pub email:         String,
  pub avatar:        String,
  /// PHC string produced by the identity layer; opaque to the core.
  pub password_hash: String,
}

impl NewUser {
  /// Normalise and validate a registration. The email is trimmed and
  /// lowercased so lookups are case-insensitive.
  pub fn new(
    name: &str,
    email: &str,
    avatar: Option<String>,
    password_hash: String,
  ) -> Result<Self> {
    require("name", name)?;
    require("email", email)?;
    Ok(Self {
      name: name.trim().to_owned(),
      email: normalize_email(email),
      avatar: avatar.unwrap_or_default(),
      password_hash,
    })
  }
}

pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }
