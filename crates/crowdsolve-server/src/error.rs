//! Error type for assembling and configuring the server.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("configuration error: {0}")]
  Config(#[from] config::ConfigError),

  #[error("jwt_secret must be set to a non-empty value")]
  MissingSecret,

  /// The origin is not a valid header value, or is the `*` wildcard, which
  /// cannot be combined with credentialed requests.
  #[error("invalid CORS origin: {0:?}")]
  InvalidCorsOrigin(String),
}
