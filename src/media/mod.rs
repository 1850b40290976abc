//! Media Uploader
//!
//! Forwards binary uploads to object storage and hands back public URLs.
//! The store is constructed once at startup and injected through app state,
//! so handlers never touch storage configuration. Uploads block the request
//! until the store acknowledges; there is no retry or backoff.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::config::MediaConfig;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("upload rejected: {0}")]
    Rejected(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Binary object storage behind the handlers.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store an object under `key` and return its public URL.
    async fn put(&self, key: &str, data: Bytes, content_type: &str)
        -> Result<String, MediaError>;
}

/// Build the configured store.
pub fn from_config(config: &MediaConfig) -> Arc<dyn MediaStore> {
    match config {
        MediaConfig::Bucket {
            endpoint,
            bucket,
            token,
        } => Arc::new(BucketMediaStore::new(endpoint, bucket, token)),
        MediaConfig::Local { dir, base_url } => {
            Arc::new(FsMediaStore::new(dir.clone(), base_url.clone()))
        }
    }
}

/// Object key for a post image: `posts/{timestamp}-{name}`.
pub fn post_image_key(filename: &str) -> String {
    format!("posts/{}-{}", Utc::now().timestamp_millis(), filename)
}

/// Object key for an avatar: `avatars/{user_id}-{timestamp}.jpg`.
pub fn avatar_key(user_id: &str) -> String {
    format!("avatars/{}-{}.jpg", user_id, Utc::now().timestamp_millis())
}

/// S3-compatible bucket over HTTP: `PUT {endpoint}/{bucket}/{key}` with a
/// public-read ACL. Objects are world-readable at the same URL.
pub struct BucketMediaStore {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
    token: String,
}

impl BucketMediaStore {
    pub fn new(endpoint: &str, bucket: &str, token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            token: token.to_string(),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key)
    }
}

#[async_trait]
impl MediaStore for BucketMediaStore {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<String, MediaError> {
        let url = self.object_url(key);
        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .header("x-amz-acl", "public-read")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MediaError::Rejected(format!(
                "{} for {}",
                response.status(),
                key
            )));
        }

        info!("[Media] Stored {}", key);
        Ok(url)
    }
}

/// Local-directory store. The test double behind the same interface, also
/// the default in development when no bucket is configured.
pub struct FsMediaStore {
    dir: PathBuf,
    base_url: String,
}

impl FsMediaStore {
    pub fn new(dir: PathBuf, base_url: String) -> Self {
        Self {
            dir,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MediaStore for FsMediaStore {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> Result<String, MediaError> {
        let path = self.dir.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &data).await?;

        info!("[Media] Stored {} at {:?}", key, path);
        Ok(format!("{}/{}", self.base_url, key))
    }
}
