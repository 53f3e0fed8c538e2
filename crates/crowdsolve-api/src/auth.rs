//! Session identity.
//!
//! Passwords are stored as argon2 PHC strings. A successful register or login
//! issues an HS256 token carried in the HttpOnly `token` cookie; the
//! [`CurrentUser`] extractor turns that cookie back into a [`User`].

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderValue, request::Parts},
};
use chrono::{DateTime, Duration, Utc};
use crowdsolve_core::{media::ImageHost, store::CommunityStore, user::User};
use headers::{Cookie, HeaderMapExt as _};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// Name of the session cookie.
pub const COOKIE_NAME: &str = "token";

/// Claims embedded in a session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
  pub sub: Uuid,
  pub iat: i64,
  pub exp: i64,
}

/// Token signing keys and cookie policy for this server instance.
#[derive(Clone)]
pub struct AuthConfig {
  encoding:      EncodingKey,
  decoding:      DecodingKey,
  token_ttl:     Duration,
  cookie_secure: bool,
}

impl AuthConfig {
  pub fn new(secret: &[u8], token_ttl: Duration, cookie_secure: bool) -> Self {
    Self {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      token_ttl,
      cookie_secure,
    }
  }

  /// Sign a session token for `user_id`, valid from `now` for the
  /// configured lifetime.
  pub fn issue(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<String, ApiError> {
    let claims = Claims {
      sub: user_id,
      iat: now.timestamp(),
      exp: (now + self.token_ttl).timestamp(),
    };
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
      .map_err(ApiError::internal)
  }

  /// Verify signature and expiry. Returns `None` for any invalid token.
  pub fn verify(&self, token: &str) -> Option<Claims> {
    match jsonwebtoken::decode::<Claims>(
      token,
      &self.decoding,
      &Validation::new(Algorithm::HS256),
    ) {
      Ok(data) => Some(data.claims),
      Err(error) => {
        tracing::debug!(error = %error, "rejected session token");
        None
      }
    }
  }

  /// `Set-Cookie` value carrying `token`.
  pub fn session_cookie(&self, token: &str) -> Result<HeaderValue, ApiError> {
    self.cookie(token, self.token_ttl.num_seconds())
  }

  /// `Set-Cookie` value that removes the session cookie.
  pub fn cleared_cookie(&self) -> Result<HeaderValue, ApiError> {
    self.cookie("", 0)
  }

  fn cookie(&self, value: &str, max_age: i64) -> Result<HeaderValue, ApiError> {
    let secure = if self.cookie_secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
      "{COOKIE_NAME}={value}; HttpOnly; SameSite=Strict; Path=/; \
       Max-Age={max_age}{secure}"
    ))
    .map_err(ApiError::internal)
  }
}

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Hash `password` with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(ApiError::internal)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
  PasswordHash::new(hash).is_ok_and(|parsed| {
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .is_ok()
  })
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The authenticated caller. Rejects with 401 when the cookie is missing,
/// the token does not verify, or the user no longer exists.
pub struct CurrentUser(pub User);

impl<S, I> FromRequestParts<AppState<S, I>> for CurrentUser
where
  S: CommunityStore + 'static,
  I: ImageHost + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, I>,
  ) -> Result<Self, Self::Rejection> {
    let token = parts
      .headers
      .typed_get::<Cookie>()
      .and_then(|cookie| cookie.get(COOKIE_NAME).map(str::to_owned))
      .filter(|token| !token.is_empty())
      .ok_or(ApiError::Unauthorized("not authorized, no token"))?;

    let claims = state
      .auth
      .verify(&token)
      .ok_or(ApiError::Unauthorized("not authorized, token failed"))?;

    let user = state
      .store
      .get_user(claims.sub)
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::Unauthorized("user not found"))?;

    Ok(Self(user))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn config() -> AuthConfig {
    AuthConfig::new(b"test-secret", Duration::days(30), false)
  }

  #[test]
  fn issued_token_verifies() {
    let auth = config();
    let user_id = Uuid::new_v4();
    let token = auth.issue(user_id, Utc::now()).unwrap();

    let claims = auth.verify(&token).unwrap();
    assert_eq!(claims.sub, user_id);
    assert_eq!(claims.exp - claims.iat, Duration::days(30).num_seconds());
  }

  #[test]
  fn expired_token_is_rejected() {
    let auth = config();
    let token = auth
      .issue(Uuid::new_v4(), Utc::now() - Duration::days(40))
      .unwrap();
    assert!(auth.verify(&token).is_none());
  }

  #[test]
  fn token_signed_with_another_secret_is_rejected() {
    let other = AuthConfig::new(b"other-secret", Duration::days(30), false);
    let token = other.issue(Uuid::new_v4(), Utc::now()).unwrap();
    assert!(config().verify(&token).is_none());
    assert!(config().verify("not-a-token").is_none());
  }

  #[test]
  fn cookie_attributes() {
    let cookie = config().session_cookie("abc").unwrap();
    let cookie = cookie.to_str().unwrap();
    assert!(cookie.starts_with("token=abc;"));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(!cookie.contains("Secure"));

    let secure = AuthConfig::new(b"s", Duration::days(1), true);
    let cleared = secure.cleared_cookie().unwrap();
    let cleared = cleared.to_str().unwrap();
    assert!(cleared.starts_with("token=;"));
    assert!(cleared.contains("Max-Age=0"));
    assert!(cleared.ends_with("; Secure"));
  }

  #[test]
  fn password_round_trip() {
    let hash = hash_password("hunter2").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password("hunter2", &hash));
    assert!(!verify_password("hunter3", &hash));
    assert!(!verify_password("hunter2", "not a phc string"));
  }
}
