//! File Store Port
//!
//! Blob storage for serializer/deserializer artifact bodies. The registry
//! addresses artifacts by the name it generated at upload time; the stored
//! path returned by `upload` is informational.

pub mod local;

use crate::error::RegistryResult;
use async_trait::async_trait;

pub use local::LocalFileStorage;

/// Blob store the registry uploads serdes artifacts to.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store `contents` under `name`, returning the stored path.
    async fn upload(&self, contents: &[u8], name: &str) -> RegistryResult<String>;

    /// Fetch the bytes previously stored under `name`.
    async fn download(&self, name: &str) -> RegistryResult<Vec<u8>>;
}
