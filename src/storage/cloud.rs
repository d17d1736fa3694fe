//! Cloud bucket store. Blobs are PUT to an HTTP-addressed bucket and served
//! back from its public base URL.

use super::BlobStore;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::info;

pub struct CloudBucketStore {
    bucket_url: String,
    public_base_url: Option<String>,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl CloudBucketStore {
    pub fn new(
        bucket_url: impl Into<String>,
        public_base_url: Option<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            bucket_url: bucket_url.into(),
            public_base_url,
            api_key,
            http: reqwest::Client::new(),
        }
    }

    fn object_url(&self, folder: &str, name: &str) -> String {
        format!("{}/{}/{}", self.bucket_url, folder, name)
    }

    fn public_url(&self, folder: &str, name: &str) -> String {
        let base = self.public_base_url.as_deref().unwrap_or(&self.bucket_url);
        format!("{}/{}/{}", base, folder, name)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("Authorization", format!("Bearer {}", key)),
            None => request,
        }
    }
}

#[async_trait]
impl BlobStore for CloudBucketStore {
    async fn save(&self, folder: &str, name: &str, content: &[u8]) -> Result<String> {
        let url = self.object_url(folder, name);
        let response = self
            .authorize(self.http.put(&url).body(content.to_vec()))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Bucket upload to {} returned {}",
                url,
                response.status()
            ));
        }

        info!("Uploaded {} bytes to {}", content.len(), url);
        Ok(self.public_url(folder, name))
    }

    async fn load(&self, folder: &str, name: &str) -> Result<Option<Vec<u8>>> {
        let url = self.object_url(folder, name);
        let response = self.authorize(self.http.get(&url)).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.bytes().await?.to_vec())),
            status => Err(anyhow!("Bucket fetch from {} returned {}", url, status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_url_prefers_the_public_base() {
        let store = CloudBucketStore::new(
            "https://bucket.internal/app",
            Some("https://cdn.example".into()),
            None,
        );
        assert_eq!(
            store.public_url("audio", "out.mp3"),
            "https://cdn.example/audio/out.mp3"
        );
        assert_eq!(
            store.object_url("audio", "out.mp3"),
            "https://bucket.internal/app/audio/out.mp3"
        );
    }

    #[test]
    fn public_url_falls_back_to_bucket() {
        let store = CloudBucketStore::new("https://bucket.internal/app", None, None);
        assert_eq!(
            store.public_url("audio", "out.mp3"),
            "https://bucket.internal/app/audio/out.mp3"
        );
    }
}
