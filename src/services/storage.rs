// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile image storage.
//!
//! Images go to Firebase Storage under `profile_images/{user_id}` when a
//! bucket is configured. Without a bucket they are inlined into the profile
//! document as a base64 `data:` URL.

use crate::config::Config;
use crate::error::AppError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;

const FIREBASE_STORAGE_URL: &str = "https://firebasestorage.googleapis.com";

/// Inline images must fit in a Firestore document (1 MiB) with the rest of the profile.
pub const INLINE_IMAGE_MAX_BYTES: usize = 700 * 1024;

/// Where profile images end up.
#[derive(Clone)]
pub enum ImageStorage {
    /// Base64 `data:` URL stored in the profile document.
    Inline,
    /// Firebase Storage object, referenced by its download URL.
    Bucket {
        http: reqwest::Client,
        base_url: String,
        bucket: String,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    name: String,
    #[serde(default)]
    download_tokens: Option<String>,
}

/// Validates and stores profile images.
#[derive(Clone)]
pub struct StorageService {
    mode: ImageStorage,
    max_bytes: usize,
}

impl StorageService {
    pub fn new(mode: ImageStorage, max_bytes: usize) -> Self {
        Self { mode, max_bytes }
    }

    /// Build from config: bucket mode when `FIREBASE_STORAGE_BUCKET` is set.
    pub fn from_config(config: &Config) -> Self {
        let mode = match &config.storage_bucket {
            Some(bucket) => {
                let base_url = match &config.storage_emulator_host {
                    Some(host) => format!("http://{}", host),
                    None => FIREBASE_STORAGE_URL.to_string(),
                };
                tracing::info!(bucket = %bucket, base_url = %base_url, "Profile images stored in bucket");
                ImageStorage::Bucket {
                    http: reqwest::Client::new(),
                    base_url,
                    bucket: bucket.clone(),
                }
            }
            None => {
                tracing::info!("No storage bucket configured, profile images stored inline");
                ImageStorage::Inline
            }
        };
        Self::new(mode, config.max_upload_bytes)
    }

    /// Whether uploads need the user's Firebase ID token.
    pub fn requires_id_token(&self) -> bool {
        matches!(self.mode, ImageStorage::Bucket { .. })
    }

    /// Effective size cap for the configured mode.
    pub fn max_bytes(&self) -> usize {
        match self.mode {
            ImageStorage::Inline => self.max_bytes.min(INLINE_IMAGE_MAX_BYTES),
            ImageStorage::Bucket { .. } => self.max_bytes,
        }
    }

    /// Reject empty, oversized or non-image uploads before any backend call.
    pub fn validate(&self, content_type: Option<&str>, bytes: &[u8]) -> Result<String, AppError> {
        let content_type = content_type
            .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase())
            .filter(|ct| ct.starts_with("image/"))
            .ok_or_else(|| AppError::Validation("Please select an image.".to_string()))?;

        if bytes.is_empty() {
            return Err(AppError::Validation("Please select an image.".to_string()));
        }

        let max = self.max_bytes();
        if bytes.len() > max {
            return Err(AppError::PayloadTooLarge(format!(
                "File size must be less than {}.",
                format_size(max)
            )));
        }

        Ok(content_type)
    }

    /// Store an already validated image and return the avatar reference.
    pub async fn store_profile_image(
        &self,
        user_id: &str,
        content_type: &str,
        bytes: Vec<u8>,
        id_token: Option<&str>,
    ) -> Result<String, AppError> {
        match &self.mode {
            ImageStorage::Inline => Ok(format!(
                "data:{};base64,{}",
                content_type,
                STANDARD.encode(&bytes)
            )),
            ImageStorage::Bucket {
                http,
                base_url,
                bucket,
            } => {
                let id_token = id_token.ok_or(AppError::Unauthorized)?;
                let object_name = format!("profile_images/{}", user_id);
                let url = format!("{}/v0/b/{}/o", base_url, bucket);

                let response = http
                    .post(&url)
                    .query(&[("uploadType", "media"), ("name", object_name.as_str())])
                    .header(reqwest::header::AUTHORIZATION, format!("Firebase {}", id_token))
                    .header(reqwest::header::CONTENT_TYPE, content_type)
                    .body(bytes)
                    .send()
                    .await
                    .map_err(|e| AppError::Storage(format!("Upload request failed: {}", e)))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(AppError::Storage(format!("HTTP {}: {}", status, body)));
                }

                let uploaded: UploadResponse = response
                    .json()
                    .await
                    .map_err(|e| AppError::Storage(format!("JSON parse error: {}", e)))?;

                tracing::info!(user_id, object = %uploaded.name, "Profile image uploaded");
                Ok(download_url(
                    base_url,
                    bucket,
                    &uploaded.name,
                    uploaded.download_tokens.as_deref(),
                ))
            }
        }
    }
}

/// Public download URL for a Firebase Storage object.
pub fn download_url(base_url: &str, bucket: &str, object: &str, token: Option<&str>) -> String {
    let mut url = format!(
        "{}/v0/b/{}/o/{}?alt=media",
        base_url,
        bucket,
        urlencoding::encode(object)
    );
    // Several tokens may be comma-separated; any one works.
    if let Some(token) = token.and_then(|t| t.split(',').next()) {
        url.push_str("&token=");
        url.push_str(token);
    }
    url
}

fn format_size(bytes: usize) -> String {
    if bytes >= 1024 * 1024 && bytes % (1024 * 1024) == 0 {
        format!("{}MB", bytes / (1024 * 1024))
    } else {
        format!("{}KB", bytes / 1024)
    }
}
