//! Cloudinary-backed [`ImageHost`].
//!
//! Uploads are signed: the signed parameters are sorted by name, joined as
//! `k=v&k=v`, suffixed with the API secret and hashed with SHA-256.

use std::time::Duration;

use chrono::Utc;
use crowdsolve_core::media::{ImageHost, ImageUpload};
use reqwest::{
  Client, StatusCode,
  multipart::{Form, Part},
};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Credentials for a Cloudinary account, from the `cloudinary` config table.
#[derive(Deserialize, Clone)]
pub struct CloudinaryConfig {
  pub cloud_name: String,
  pub api_key:    String,
  pub api_secret: String,
  /// Folder uploaded images are placed in.
  #[serde(default)]
  pub folder:     Option<String>,
}

#[derive(Debug, Error)]
pub enum UploadError {
  #[error("image host request failed: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("image host responded {status}: {body}")]
  Rejected { status: StatusCode, body: String },

  #[error("image uploads are not configured on this server")]
  Disabled,
}

#[derive(Deserialize)]
struct UploadResponse {
  secure_url: String,
}

/// Sign `params` with `api_secret`, returning the lowercase hex digest.
pub fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
  let mut sorted = params.to_vec();
  sorted.sort_by(|a, b| a.0.cmp(b.0));
  let joined = sorted
    .iter()
    .map(|(k, v)| format!("{k}={v}"))
    .collect::<Vec<_>>()
    .join("&");

  let mut hasher = Sha256::new();
  hasher.update(joined.as_bytes());
  hasher.update(api_secret.as_bytes());
  hex::encode(hasher.finalize())
}

// ─── Cloudinary ──────────────────────────────────────────────────────────────

/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct CloudinaryHost {
  client:   Client,
  config:   CloudinaryConfig,
  endpoint: String,
}

impl CloudinaryHost {
  pub fn new(config: CloudinaryConfig) -> Result<Self, UploadError> {
    let endpoint = format!(
      "https://api.cloudinary.com/v1_1/{}/image/upload",
      config.cloud_name
    );
    Self::with_endpoint(config, endpoint)
  }

  fn with_endpoint(
    config: CloudinaryConfig,
    endpoint: String,
  ) -> Result<Self, UploadError> {
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self { client, config, endpoint })
  }
}

impl ImageHost for CloudinaryHost {
  type Error = UploadError;

  async fn upload(&self, image: ImageUpload) -> Result<String, UploadError> {
    let timestamp = Utc::now().timestamp().to_string();
    let mut params = vec![("timestamp", timestamp.as_str())];
    if let Some(folder) = &self.config.folder {
      params.push(("folder", folder.as_str()));
    }
    let signature = sign(&params, &self.config.api_secret);

    let size = image.bytes.len();
    let file_name = image.file_name.unwrap_or_else(|| "upload".to_owned());
    let mut form = Form::new()
      .part("file", Part::bytes(image.bytes).file_name(file_name))
      .text("api_key", self.config.api_key.clone())
      .text("signature", signature)
      .text("signature_algorithm", "sha256");
    for (key, value) in params {
      form = form.text(key, value.to_owned());
    }

    tracing::debug!(
      size,
      content_type = image.content_type.as_deref().unwrap_or("unknown"),
      "uploading image"
    );
    let resp = self.client.post(&self.endpoint).multipart(form).send().await?;

    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(UploadError::Rejected { status, body });
    }
    let body: UploadResponse = resp.json().await?;
    Ok(body.secure_url)
  }
}

// ─── Selection ───────────────────────────────────────────────────────────────

/// The image host chosen by configuration. Without Cloudinary credentials
/// every upload fails, while image-less submissions still work.
#[derive(Clone)]
pub enum ConfiguredImageHost {
  Cloudinary(CloudinaryHost),
  Disabled,
}

impl ConfiguredImageHost {
  pub fn from_config(config: Option<CloudinaryConfig>) -> Result<Self, UploadError> {
    match config {
      Some(config) => Ok(Self::Cloudinary(CloudinaryHost::new(config)?)),
      None => Ok(Self::Disabled),
    }
  }
}

impl ImageHost for ConfiguredImageHost {
  type Error = UploadError;

  async fn upload(&self, image: ImageUpload) -> Result<String, UploadError> {
    match self {
      Self::Cloudinary(host) => host.upload(image).await,
      Self::Disabled => Err(UploadError::Disabled),
    }
  }
}
