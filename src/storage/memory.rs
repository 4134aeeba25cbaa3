//! In-Memory Storage Manager
//!
//! Record store implementation suitable for embedding and tests. All data is
//! held in memory and lost when the process terminates.

use super::{row_matches, QueryParam, Row, StorableKey, StorageManager};
use crate::error::{RegistryError, RegistryResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory record store: one row vector per namespace plus a per-namespace
/// id counter.
pub struct InMemoryStorageManager {
    namespaces: RwLock<HashMap<String, Vec<Row>>>,
    sequences: RwLock<HashMap<String, i64>>,
}

impl InMemoryStorageManager {
    pub fn new() -> Self {
        Self {
            namespaces: RwLock::new(HashMap::new()),
            sequences: RwLock::new(HashMap::new()),
        }
    }

    fn lock_error() -> RegistryError {
        RegistryError::Io {
            message: "storage lock poisoned".to_string(),
        }
    }
}

impl Default for InMemoryStorageManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageManager for InMemoryStorageManager {
    async fn next_id(&self, namespace: &str) -> RegistryResult<i64> {
        let mut sequences = self.sequences.write().map_err(|_| Self::lock_error())?;
        let next = sequences.entry(namespace.to_string()).or_insert(0);
        *next += 1;
        Ok(*next)
    }

    async fn get(&self, key: &StorableKey) -> RegistryResult<Option<Row>> {
        let namespaces = self.namespaces.read().map_err(|_| Self::lock_error())?;
        let rows = match namespaces.get(&key.namespace) {
            Some(rows) => rows,
            None => return Ok(None),
        };

        Ok(rows.iter().find(|row| row_matches(row, &key.fields)).cloned())
    }

    async fn find(&self, namespace: &str, params: &[QueryParam]) -> RegistryResult<Vec<Row>> {
        let namespaces = self.namespaces.read().map_err(|_| Self::lock_error())?;
        let rows = match namespaces.get(namespace) {
            Some(rows) => rows,
            None => return Ok(Vec::new()),
        };

        Ok(rows
            .iter()
            .filter(|row| row_matches(row, params))
            .cloned()
            .collect())
    }

    async fn list(&self, namespace: &str) -> RegistryResult<Vec<Row>> {
        let namespaces = self.namespaces.read().map_err(|_| Self::lock_error())?;
        Ok(namespaces.get(namespace).cloned().unwrap_or_default())
    }

    async fn add(&self, namespace: &str, row: Row) -> RegistryResult<()> {
        let mut namespaces = self.namespaces.write().map_err(|_| Self::lock_error())?;
        namespaces
            .entry(namespace.to_string())
            .or_insert_with(Vec::new)
            .push(row);
        Ok(())
    }
}
