//! # Storage Module
//!
//! Persistence for transcripts and synthesized audio artifacts. One blob
//! store interface with two implementations, the local filesystem and an
//! HTTP-addressed cloud bucket, selected by the `storage.backend`
//! configuration value. The HTTP handlers stay identical in either
//! deployment.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;

pub mod cloud; // HTTP-addressed bucket
pub mod local; // filesystem under the static dir

pub use cloud::CloudBucketStore;
pub use local::LocalStore;

use crate::config::StorageConfig;

/// Key-value blob store keyed by `folder/name`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist `content`, returning the URL it can be fetched from.
    async fn save(&self, folder: &str, name: &str, content: &[u8]) -> Result<String>;

    /// Load a previously saved blob. `Ok(None)` when it does not exist.
    async fn load(&self, folder: &str, name: &str) -> Result<Option<Vec<u8>>>;
}

/// Build the store the configuration selects.
pub fn from_config(config: &StorageConfig) -> Result<Arc<dyn BlobStore>> {
    match config.backend.as_str() {
        "local" => Ok(Arc::new(LocalStore::new(config.static_dir.clone()))),
        "cloud" => Ok(Arc::new(CloudBucketStore::new(
            config.bucket_url.clone(),
            config.public_base_url.clone(),
            config.api_key.clone(),
        ))),
        other => Err(anyhow!("Unknown storage backend: {}", other)),
    }
}
