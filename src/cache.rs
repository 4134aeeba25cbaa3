//! Schema Version Cache
//!
//! Bounded, expiring map from `(schemaName, version)` to the stored version
//! row, backed by a single-flight loader against storage. Version rows are
//! immutable, so the cache is read-through only: expired entries are simply
//! reloaded and no invalidation API exists.

use crate::error::RegistryResult;
use crate::types::{SchemaVersionInfo, SchemaVersionKey};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OnceCell, RwLock};

/// Loads a version row on cache miss.
#[async_trait]
pub trait SchemaVersionLoader: Send + Sync {
    async fn load(&self, key: &SchemaVersionKey) -> RegistryResult<SchemaVersionInfo>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    info: SchemaVersionInfo,
    created_at: Instant,
    last_accessed: Instant,
}

/// Cache access counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

type InFlight = Arc<OnceCell<RegistryResult<SchemaVersionInfo>>>;

pub struct SchemaVersionCache {
    entries: RwLock<HashMap<SchemaVersionKey, CacheEntry>>,
    /// One slot per key currently being loaded; concurrent misses share the
    /// slot so the loader runs exactly once and every waiter observes the
    /// same result or error. Slots are dropped once the miss group disperses,
    /// so failures are never retained.
    inflight: Mutex<HashMap<SchemaVersionKey, InFlight>>,
    stats: RwLock<CacheStats>,
    loader: Arc<dyn SchemaVersionLoader>,
    max_entries: usize,
    ttl: Duration,
}

impl SchemaVersionCache {
    pub fn new(loader: Arc<dyn SchemaVersionLoader>, max_entries: usize, ttl_secs: u64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
            stats: RwLock::new(CacheStats::default()),
            loader,
            max_entries,
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    /// Cached lookup, loading through on miss.
    pub async fn get(&self, key: &SchemaVersionKey) -> RegistryResult<SchemaVersionInfo> {
        if let Some(info) = self.lookup(key).await {
            self.stats.write().await.hits += 1;
            return Ok(info);
        }
        self.stats.write().await.misses += 1;

        let cell = {
            let mut inflight = self.inflight.lock().await;
            inflight
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let result = cell
            .get_or_init(|| async {
                log::debug!(
                    "loading schema version [{}:{}] from storage",
                    key.schema_name,
                    key.version
                );
                self.loader.load(key).await
            })
            .await
            .clone();

        {
            let mut inflight = self.inflight.lock().await;
            if let Some(current) = inflight.get(key) {
                if Arc::ptr_eq(current, &cell) {
                    inflight.remove(key);
                }
            }
        }

        if let Ok(info) = &result {
            self.insert(key.clone(), info.clone()).await;
        }

        result
    }

    pub async fn stats(&self) -> CacheStats {
        self.stats.read().await.clone()
    }

    async fn lookup(&self, key: &SchemaVersionKey) -> Option<SchemaVersionInfo> {
        let mut entries = self.entries.write().await;

        if let Some(entry) = entries.get_mut(key) {
            if entry.created_at.elapsed() <= self.ttl {
                entry.last_accessed = Instant::now();
                return Some(entry.info.clone());
            }
        } else {
            return None;
        }

        entries.remove(key);
        self.stats.write().await.evictions += 1;
        None
    }

    async fn insert(&self, key: SchemaVersionKey, info: SchemaVersionInfo) {
        let mut entries = self.entries.write().await;

        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            let mut evicted = 0u64;
            entries.retain(|_, entry| {
                let keep = entry.created_at.elapsed() <= self.ttl;
                if !keep {
                    evicted += 1;
                }
                keep
            });

            if entries.len() >= self.max_entries {
                if let Some(lru_key) = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_accessed)
                    .map(|(key, _)| key.clone())
                {
                    entries.remove(&lru_key);
                    evicted += 1;
                }
            }

            if evicted > 0 {
                self.stats.write().await.evictions += evicted;
            }
        }

        let now = Instant::now();
        entries.insert(
            key,
            CacheEntry {
                info,
                created_at: now,
                last_accessed: now,
            },
        );
    }
}
