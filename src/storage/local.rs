//! Local filesystem store. Blobs live under the configured static directory
//! and are served back as `/static/...` URLs.

use super::BlobStore;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::info;

pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, folder: &str, name: &str) -> PathBuf {
        self.root.join(folder).join(name)
    }
}

#[async_trait]
impl BlobStore for LocalStore {
    async fn save(&self, folder: &str, name: &str, content: &[u8]) -> Result<String> {
        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let path = self.path_for(folder, name);
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!("Saved {} bytes to {}", content.len(), path.display());
        Ok(format!("/static/{}/{}", folder, name))
    }

    async fn load(&self, folder: &str, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(folder, name);
        match tokio::fs::read(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("Failed to read {}", path.display()))
            }
        }
    }
}
