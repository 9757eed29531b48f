use crate::config::StorageConfig;
use crate::errors::ServiceError;
use regex::Regex;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Client for the image store behind the booking flow.
///
/// The store exposes a Supabase-style object API: authenticated uploads into
/// a bucket, public read URLs, and bulk deletion by key list. The physical
/// store is an external collaborator; this client only shapes requests and
/// derives object keys from stored public URLs.
#[derive(Clone)]
pub struct ImageStore {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    service_key: Option<String>,
    key_pattern: Regex,
}

#[derive(Debug, Serialize)]
struct RemoveRequest<'a> {
    prefixes: &'a [String],
}

impl ImageStore {
    pub fn new(cfg: &StorageConfig) -> Self {
        let key_pattern = Regex::new(&format!(r"{}/(.+)$", regex::escape(&cfg.bucket)))
            .expect("bucket name escapes into a valid pattern");

        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(cfg.request_timeout_secs))
                .build()
                .expect("reqwest client construction cannot fail with static options"),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            bucket: cfg.bucket.clone(),
            service_key: cfg.service_key.clone(),
            key_pattern,
        }
    }

    /// Public read URL for an object key.
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/object/public/{}/{}", self.base_url, self.bucket, key)
    }

    /// Extracts the object key out of a stored public URL.
    ///
    /// Returns `None` for URLs that do not point into this bucket, so stale
    /// rows with foreign URLs never turn into deletion calls.
    pub fn object_key_from_url(&self, url: &str) -> Option<String> {
        self.key_pattern
            .captures(url)
            .and_then(|captures| captures.get(1))
            .map(|key| key.as_str().to_string())
    }

    /// Uploads one object and returns its public URL.
    #[instrument(skip(self, bytes), fields(key = %key, size = bytes.len()))]
    pub async fn upload(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ServiceError> {
        let url = format!("{}/object/{}/{}", self.base_url, self.bucket, key);

        let mut request = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(reqwest::header::CACHE_CONTROL, "3600")
            .body(bytes);

        if let Some(service_key) = &self.service_key {
            request = request.bearer_auth(service_key);
        }

        let response = request.send().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("Image upload failed: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "Image store rejected upload with status {}",
                response.status()
            )));
        }

        debug!("Uploaded image object");
        Ok(self.public_url(key))
    }

    /// Bulk-deletes objects by key.
    #[instrument(skip(self), fields(count = keys.len()))]
    pub async fn remove(&self, keys: &[String]) -> Result<(), ServiceError> {
        if keys.is_empty() {
            return Ok(());
        }

        let url = format!("{}/object/{}", self.base_url, self.bucket);

        let mut request = self
            .client
            .delete(&url)
            .json(&RemoveRequest { prefixes: keys });

        if let Some(service_key) = &self.service_key {
            request = request.bearer_auth(service_key);
        }

        let response = request.send().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("Image deletion failed: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "Image store rejected deletion with status {}",
                response.status()
            )));
        }

        Ok(())
    }

    /// Best-effort cleanup for a set of stored public URLs.
    ///
    /// Used where image removal is a nicety rather than a correctness
    /// requirement (archival, appointment deletion): failures are logged and
    /// swallowed so they never change the outcome of the surrounding
    /// operation.
    pub async fn remove_urls_best_effort(&self, urls: &[String]) {
        let keys: Vec<String> = urls
            .iter()
            .filter_map(|url| self.object_key_from_url(url))
            .collect();

        if keys.is_empty() {
            return;
        }

        if let Err(err) = self.remove(&keys).await {
            warn!(error = %err, count = keys.len(), "Image cleanup failed; continuing");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store_for(base_url: &str) -> ImageStore {
        ImageStore::new(&StorageConfig {
            base_url: base_url.to_string(),
            bucket: "damage-images".to_string(),
            service_key: Some("service-key".to_string()),
            request_timeout_secs: 5,
        })
    }

    #[test]
    fn derives_object_keys_from_public_urls() {
        let store = store_for("http://localhost:54321/storage/v1");

        assert_eq!(
            store.object_key_from_url(
                "http://localhost:54321/storage/v1/object/public/damage-images/TRACK1/a.jpg"
            ),
            Some("TRACK1/a.jpg".to_string())
        );
        assert_eq!(
            store.object_key_from_url("https://elsewhere.example.com/other-bucket/a.jpg"),
            None
        );
    }

    #[test]
    fn public_url_round_trips_through_key_derivation() {
        let store = store_for("http://localhost:54321/storage/v1");
        let url = store.public_url("TRACK1/photo.png");
        assert_eq!(
            store.object_key_from_url(&url),
            Some("TRACK1/photo.png".to_string())
        );
    }

    #[tokio::test]
    async fn upload_posts_to_bucket_and_returns_public_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/object/damage-images/TRACK1/a.jpg"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_for(&server.uri());
        let url = store
            .upload("TRACK1/a.jpg", "image/jpeg", vec![1, 2, 3])
            .await
            .unwrap();

        assert!(url.ends_with("/object/public/damage-images/TRACK1/a.jpg"));
    }

    #[tokio::test]
    async fn remove_sends_bulk_delete() {
        let server = MockServer::start().await;
        let keys = vec!["TRACK1/a.jpg".to_string(), "TRACK1/b.jpg".to_string()];
        Mock::given(method("DELETE"))
            .and(path("/object/damage-images"))
            .and(body_json(serde_json::json!({ "prefixes": keys })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_for(&server.uri());
        store.remove(&keys).await.unwrap();
    }

    #[tokio::test]
    async fn best_effort_cleanup_swallows_failures() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/object/damage-images"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let store = store_for(&server.uri());
        let url = store.public_url("TRACK1/a.jpg");
        // Must not panic or propagate the failure
        store.remove_urls_best_effort(&[url]).await;
    }

    #[tokio::test]
    async fn remove_with_no_keys_is_a_no_op() {
        // No mock server mounted: a request would fail loudly
        let store = store_for("http://127.0.0.1:1");
        store.remove(&[]).await.unwrap();
    }
}
