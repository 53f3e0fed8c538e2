//! The image-hosting seam.
//!
//! Problem images are never stored locally: the raw upload is handed to an
//! [`ImageHost`] and only the durable URL it returns is persisted.

use std::future::Future;

/// A raw image as received from the client.
#[derive(Debug, Clone)]
pub struct ImageUpload {
  pub bytes:        Vec<u8>,
  pub file_name:    Option<String>,
  pub content_type: Option<String>,
}

/// Abstraction over a third-party image host.
pub trait ImageHost: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Upload `image` and return its absolute, durable URL.
  fn upload(
    &self,
    image: ImageUpload,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;
}
