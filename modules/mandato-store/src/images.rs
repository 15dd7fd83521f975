//! Image re-hosting through the object-storage bucket.
//!
//! News and post images are downloaded and re-uploaded so the portal serves
//! stable URLs instead of hotlinking providers. Every failure falls back to
//! the original URL; callers never lose an image over a storage hiccup.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use mandato_common::content_hash;

pub const DEFAULT_BUCKET: &str = "portal";

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Images larger than this are not re-hosted.
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct ImageStore {
    http: reqwest::Client,
    config: Option<StorageConfig>,
    bucket: String,
}

#[derive(Clone)]
struct StorageConfig {
    base_url: String,
    key: String,
}

impl ImageStore {
    pub fn new(storage_url: Option<String>, storage_key: Option<String>) -> Self {
        let config = match (storage_url, storage_key) {
            (Some(base_url), Some(key)) => Some(StorageConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                key,
            }),
            _ => {
                info!("Object storage not configured, images keep their original URLs");
                None
            }
        };

        Self {
            http: reqwest::Client::builder()
                .timeout(DOWNLOAD_TIMEOUT)
                .build()
                .expect("failed to build storage HTTP client"),
            config,
            bucket: DEFAULT_BUCKET.to_string(),
        }
    }

    pub fn with_bucket(mut self, bucket: &str) -> Self {
        self.bucket = bucket.to_string();
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Download an image and re-host it under `folder` in the bucket.
    /// Returns the public URL, or the original URL on any failure or when
    /// storage is unconfigured.
    pub async fn upload_from_url(&self, image_url: &str, folder: &str) -> String {
        let config = match &self.config {
            Some(config) => config,
            None => return image_url.to_string(),
        };

        if image_url.starts_with(&config.base_url) {
            // Already ours.
            return image_url.to_string();
        }

        match self.try_upload(config, image_url, folder).await {
            Ok(public_url) => public_url,
            Err(e) => {
                warn!(image_url, error = %e, "Image upload failed, keeping original URL");
                image_url.to_string()
            }
        }
    }

    async fn try_upload(
        &self,
        config: &StorageConfig,
        image_url: &str,
        folder: &str,
    ) -> Result<String> {
        let response = self
            .http
            .get(image_url)
            .send()
            .await
            .context("image download failed")?;
        if !response.status().is_success() {
            return Err(anyhow!("image download returned {}", response.status()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .split(';')
            .next()
            .unwrap_or("image/jpeg")
            .to_string();
        let bytes = response.bytes().await.context("image body read failed")?;
        if bytes.is_empty() || bytes.len() > MAX_IMAGE_BYTES {
            return Err(anyhow!("image size {} out of bounds", bytes.len()));
        }

        let filename = format!("{:016x}.{}", content_hash(image_url), ext_for(&content_type));
        let object_path = format!("{}/{}/{}", self.bucket, folder, filename);
        let upload_url = format!("{}/object/{}", config.base_url, object_path);

        let upload = self
            .http
            .post(&upload_url)
            .bearer_auth(&config.key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(bytes.to_vec())
            .send()
            .await
            .context("image upload failed")?;

        if !upload.status().is_success() {
            return Err(anyhow!("image upload returned {}", upload.status()));
        }

        Ok(format!("{}/object/public/{}", config.base_url, object_path))
    }
}

fn ext_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn unconfigured_store_passes_url_through() {
        let store = ImageStore::new(None, None);
        assert!(!store.is_enabled());
        let url = store.upload_from_url("https://cdn.example.com/a.jpg", "news").await;
        assert_eq!(url, "https://cdn.example.com/a.jpg");
    }

    #[tokio::test]
    async fn uploads_and_returns_public_url() {
        let provider = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![0xFFu8; 64])
                    .insert_header("content-type", "image/png"),
            )
            .mount(&provider)
            .await;

        let storage = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/object/portal/news/[0-9a-f]{16}\.png$"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&storage)
            .await;

        let store = ImageStore::new(Some(storage.uri()), Some("secret".to_string()));
        let image_url = format!("{}/img.png", provider.uri());
        let public = store.upload_from_url(&image_url, "news").await;

        assert!(public.starts_with(&format!("{}/object/public/portal/news/", storage.uri())));
        assert!(public.ends_with(".png"));
    }

    #[tokio::test]
    async fn failed_upload_falls_back_to_original() {
        let provider = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 16]))
            .mount(&provider)
            .await;

        let storage = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&storage)
            .await;

        let store = ImageStore::new(Some(storage.uri()), Some("secret".to_string()));
        let image_url = format!("{}/img.jpg", provider.uri());
        let result = store.upload_from_url(&image_url, "news").await;
        assert_eq!(result, image_url);
    }

    #[tokio::test]
    async fn unreachable_provider_falls_back() {
        let storage = MockServer::start().await;
        let store = ImageStore::new(Some(storage.uri()), Some("secret".to_string()));
        let result = store
            .upload_from_url("http://127.0.0.1:1/none.jpg", "news")
            .await;
        assert_eq!(result, "http://127.0.0.1:1/none.jpg");
    }
}
