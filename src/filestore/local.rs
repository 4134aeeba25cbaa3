//! Local Filesystem File Storage
//!
//! Stores artifact bodies as flat files under a base directory, created on
//! demand.

use super::FileStorage;
use crate::error::{RegistryError, RegistryResult};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

pub struct LocalFileStorage {
    base_path: PathBuf,
}

impl LocalFileStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn resolve(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn upload(&self, contents: &[u8], name: &str) -> RegistryResult<String> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| RegistryError::Io {
                message: format!("failed to create file store directory: {}", e),
            })?;

        let path = self.resolve(name);
        fs::write(&path, contents)
            .await
            .map_err(|e| RegistryError::Io {
                message: format!("failed to write {}: {}", path.display(), e),
            })?;

        Ok(path.to_string_lossy().into_owned())
    }

    async fn download(&self, name: &str) -> RegistryResult<Vec<u8>> {
        let path = self.resolve(name);
        fs::read(&path).await.map_err(|e| RegistryError::Io {
            message: format!("failed to read {}: {}", path.display(), e),
        })
    }
}
