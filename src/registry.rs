//! Schema Lifecycle Engine
//!
//! The write path (dedup by fingerprint, version assignment, compatibility
//! check, field indexing) serializes on a single process-wide gate: version
//! numbering and dedup are read-modify-write sequences across several storage
//! rows that the storage port does not transactionalize. The read path takes
//! no lock; version lookups go through the bounded single-flight cache.

use crate::cache::{CacheStats, SchemaVersionCache, SchemaVersionLoader};
use crate::config::RegistryOptions;
use crate::error::{RegistryError, RegistryResult};
use crate::filestore::FileStorage;
use crate::provider::{ProviderRegistry, SchemaProvider};
use crate::storage::{
    from_row, to_row, QueryParam, StorableKey, StorageManager, SCHEMA_FIELD_NAMESPACE,
    SCHEMA_METADATA_NAMESPACE, SCHEMA_SERDES_MAPPING_NAMESPACE, SCHEMA_VERSION_NAMESPACE,
    SERDES_INFO_NAMESPACE,
};
use crate::types::{
    SchemaFieldQuery, SchemaFieldRecord, SchemaMetadata, SchemaMetadataInfo, SchemaSerDesMapping,
    SchemaVersionInfo, SchemaVersionKey, SerDesInfo, SerDesInfoRecord,
};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Cache loader resolving a `(name, version)` key to its stored row.
struct VersionRowLoader {
    storage: Arc<dyn StorageManager>,
}

#[async_trait]
impl SchemaVersionLoader for VersionRowLoader {
    async fn load(&self, key: &SchemaVersionKey) -> RegistryResult<SchemaVersionInfo> {
        let metadata_key = StorableKey::new(
            SCHEMA_METADATA_NAMESPACE,
            vec![QueryParam::new("name", &key.schema_name)],
        );
        let metadata: SchemaMetadataInfo = match self.storage.get(&metadata_key).await? {
            Some(row) => from_row(row)?,
            None => {
                return Err(RegistryError::SchemaNotFound {
                    message: format!("no schema metadata with name: {}", key.schema_name),
                })
            }
        };

        let rows = self
            .storage
            .find(
                SCHEMA_VERSION_NAMESPACE,
                &[
                    QueryParam::new("schema_metadata_id", metadata.id),
                    QueryParam::new("version", key.version),
                ],
            )
            .await?;

        if rows.len() > 1 {
            warn!(
                "more than one schema version with metadata id [{}] and version [{}]",
                metadata.id, key.version
            );
        }

        match rows.into_iter().next() {
            Some(row) => from_row(row),
            None => Err(RegistryError::SchemaNotFound {
                message: format!(
                    "no version {} of schema [{}]",
                    key.version, key.schema_name
                ),
            }),
        }
    }
}

/// The registry: schema lifecycle engine plus serdes binding manager.
pub struct SchemaRegistry {
    storage: Arc<dyn StorageManager>,
    file_storage: Arc<dyn FileStorage>,
    providers: ProviderRegistry,
    version_cache: SchemaVersionCache,
    write_gate: Mutex<()>,
}

impl SchemaRegistry {
    pub fn new(
        storage: Arc<dyn StorageManager>,
        file_storage: Arc<dyn FileStorage>,
        providers: Vec<Arc<dyn SchemaProvider>>,
        options: RegistryOptions,
    ) -> Self {
        let loader = Arc::new(VersionRowLoader {
            storage: storage.clone(),
        });
        let version_cache = SchemaVersionCache::new(
            loader,
            options.max_schema_cache_size(),
            options.schema_expiry_secs(),
        );

        Self {
            storage,
            file_storage,
            providers: ProviderRegistry::new(providers),
            version_cache,
            write_gate: Mutex::new(()),
        }
    }

    /// Registered dialect tags.
    pub fn schema_types(&self) -> Vec<String> {
        self.providers.schema_types()
    }

    /// Version cache counters.
    pub async fn cache_stats(&self) -> CacheStats {
        self.version_cache.stats().await
    }

    // ---- write path ----

    /// Create the metadata row for a logical schema, or return the existing
    /// row's id when the name is already registered.
    pub async fn add_schema_metadata(
        &self,
        schema_metadata: &SchemaMetadata,
    ) -> RegistryResult<i64> {
        let _gate = self.write_gate.lock().await;
        self.register_schema_metadata(schema_metadata).await
    }

    /// Register a new version of a logical schema, creating the metadata row
    /// on first use. Identical text (by fingerprint) returns the existing
    /// version number without writing anything.
    pub async fn add_schema_version(
        &self,
        schema_metadata: &SchemaMetadata,
        schema_text: &str,
        description: &str,
    ) -> RegistryResult<i32> {
        let _gate = self.write_gate.lock().await;

        match self.lookup_schema_metadata(&schema_metadata.name).await? {
            // The stored policy governs evolution of an existing schema.
            Some(existing) => {
                self.create_schema_version(
                    &existing.schema_metadata,
                    existing.id,
                    schema_text,
                    description,
                )
                .await
            }
            None => {
                let schema_metadata_id = self.register_schema_metadata(schema_metadata).await?;
                self.create_schema_version(
                    schema_metadata,
                    schema_metadata_id,
                    schema_text,
                    description,
                )
                .await
            }
        }
    }

    /// As `add_schema_version`, but fails when no metadata exists for the name.
    pub async fn add_schema_version_by_name(
        &self,
        schema_name: &str,
        schema_text: &str,
        description: &str,
    ) -> RegistryResult<i32> {
        let _gate = self.write_gate.lock().await;

        let metadata = self.lookup_schema_metadata(schema_name).await?.ok_or_else(|| {
            RegistryError::SchemaNotFound {
                message: format!("no schema metadata with name: {}", schema_name),
            }
        })?;

        self.create_schema_version(
            &metadata.schema_metadata,
            metadata.id,
            schema_text,
            description,
        )
        .await
    }

    async fn register_schema_metadata(
        &self,
        schema_metadata: &SchemaMetadata,
    ) -> RegistryResult<i64> {
        if let Some(existing) = self.lookup_schema_metadata(&schema_metadata.name).await? {
            return Ok(existing.id);
        }

        let id = self.storage.next_id(SCHEMA_METADATA_NAMESPACE).await?;
        let info = SchemaMetadataInfo {
            id,
            timestamp: Utc::now().timestamp_millis(),
            schema_metadata: schema_metadata.clone(),
        };
        self.storage
            .add(SCHEMA_METADATA_NAMESPACE, to_row(&info)?)
            .await?;
        Ok(id)
    }

    /// Version-creation procedure, entered with the write gate held. Nothing
    /// is persisted unless the candidate passes the compatibility check.
    async fn create_schema_version(
        &self,
        schema_metadata: &SchemaMetadata,
        schema_metadata_id: i64,
        schema_text: &str,
        description: &str,
    ) -> RegistryResult<i32> {
        let schema_type = schema_metadata.schema_type.as_str();

        // Fingerprinting parses the text, so this also rejects invalid schemas.
        let fingerprint = self.providers.fingerprint_hex(schema_type, schema_text)?;

        // Dedup before allocating an id so a replayed text never burns a
        // sequence slot.
        if let Some(version) = self
            .version_by_fingerprint(schema_metadata_id, &fingerprint)
            .await?
        {
            return Ok(version);
        }

        let latest = self
            .latest_version_row(&schema_metadata.name)
            .await?;

        if let Some(latest) = &latest {
            let compatible = self.providers.is_compatible(
                schema_type,
                schema_text,
                std::slice::from_ref(&latest.schema_text),
                schema_metadata.compatibility,
            )?;
            if !compatible {
                return Err(RegistryError::IncompatibleSchema {
                    message: format!(
                        "schema is not compatible with version {} of [{}]",
                        latest.version, schema_metadata.name
                    ),
                });
            }
        }

        let version = latest.map(|l| l.version).unwrap_or(0) + 1;
        let schema_version_id = self.storage.next_id(SCHEMA_VERSION_NAMESPACE).await?;
        let now = Utc::now().timestamp_millis();
        let info = SchemaVersionInfo {
            id: schema_version_id,
            schema_metadata_id,
            name: schema_metadata.name.clone(),
            version,
            schema_text: schema_text.to_string(),
            fingerprint,
            description: description.to_string(),
            timestamp: now,
        };
        self.storage
            .add(SCHEMA_VERSION_NAMESPACE, to_row(&info)?)
            .await?;

        for field in self.providers.generate_fields(schema_type, schema_text)? {
            let field_id = self.storage.next_id(SCHEMA_FIELD_NAMESPACE).await?;
            let record = SchemaFieldRecord {
                id: field_id,
                schema_version_id,
                timestamp: now,
                field,
            };
            self.storage
                .add(SCHEMA_FIELD_NAMESPACE, to_row(&record)?)
                .await?;
        }

        Ok(version)
    }

    // ---- read path ----

    /// Metadata row for a name, if any.
    pub async fn get_schema_metadata(
        &self,
        schema_name: &str,
    ) -> RegistryResult<Option<SchemaMetadataInfo>> {
        self.lookup_schema_metadata(schema_name).await
    }

    /// Metadata rows matching `filters` (all rows when empty), projected to
    /// name, dialect and group.
    pub async fn find_schema_metadata(
        &self,
        filters: &[QueryParam],
    ) -> RegistryResult<Vec<SchemaMetadata>> {
        let rows = if filters.is_empty() {
            self.storage.list(SCHEMA_METADATA_NAMESPACE).await?
        } else {
            self.storage.find(SCHEMA_METADATA_NAMESPACE, filters).await?
        };

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            let info: SchemaMetadataInfo = from_row(row)?;
            result.push(
                SchemaMetadata::new(info.schema_metadata.name, info.schema_metadata.schema_type)
                    .with_group(info.schema_metadata.schema_group),
            );
        }
        Ok(result)
    }

    /// All stored versions of a logical schema, in no particular order.
    pub async fn find_all_versions(
        &self,
        schema_name: &str,
    ) -> RegistryResult<Vec<SchemaVersionInfo>> {
        let rows = self
            .storage
            .find(
                SCHEMA_VERSION_NAMESPACE,
                &[QueryParam::new("name", schema_name)],
            )
            .await?;

        rows.into_iter().map(from_row).collect()
    }

    /// The version row with the greatest version number, if any exist.
    pub async fn get_latest_schema_version_info(
        &self,
        schema_name: &str,
    ) -> RegistryResult<Option<SchemaVersionInfo>> {
        self.latest_version_row(schema_name).await
    }

    /// Version number previously assigned to `schema_text`.
    pub async fn get_schema_version(
        &self,
        schema_name: &str,
        schema_text: &str,
    ) -> RegistryResult<i32> {
        let metadata = self.lookup_schema_metadata(schema_name).await?.ok_or_else(|| {
            RegistryError::SchemaNotFound {
                message: format!("no schema metadata with name: {}", schema_name),
            }
        })?;

        let fingerprint = self
            .providers
            .fingerprint_hex(&metadata.schema_metadata.schema_type, schema_text)?;
        debug!(
            "fingerprint of the given schema text for [{}] is [{}]",
            schema_name, fingerprint
        );

        self.version_by_fingerprint(metadata.id, &fingerprint)
            .await?
            .ok_or_else(|| RegistryError::SchemaNotFound {
                message: format!("no version of [{}] matches the given text", schema_name),
            })
    }

    /// Version row for a `(name, version)` key, served through the cache.
    pub async fn get_schema_version_info(
        &self,
        key: &SchemaVersionKey,
    ) -> RegistryResult<SchemaVersionInfo> {
        self.version_cache.get(key).await
    }

    /// `(name, version)` pairs whose field index matches the query. A version
    /// appears at most once even when several of its fields match.
    pub async fn find_schemas_with_fields(
        &self,
        query: &SchemaFieldQuery,
    ) -> RegistryResult<Vec<SchemaVersionKey>> {
        let mut params = Vec::with_capacity(3);
        if let Some(name) = &query.name {
            params.push(QueryParam::new("name", name));
        }
        if let Some(namespace) = &query.namespace {
            params.push(QueryParam::new("namespace", namespace));
        }
        if let Some(field_type) = &query.field_type {
            params.push(QueryParam::new("type", field_type));
        }

        let field_rows = self.storage.find(SCHEMA_FIELD_NAMESPACE, &params).await?;

        let mut keys: Vec<SchemaVersionKey> = Vec::new();
        for row in field_rows {
            let record: SchemaFieldRecord = from_row(row)?;
            let version_rows = self
                .storage
                .find(
                    SCHEMA_VERSION_NAMESPACE,
                    &[QueryParam::new("id", record.schema_version_id)],
                )
                .await?;

            if let Some(version_row) = version_rows.into_iter().next() {
                let info: SchemaVersionInfo = from_row(version_row)?;
                let key = SchemaVersionKey::new(info.name, info.version);
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }

    /// Whether `schema_text` is compatible with every stored version of the
    /// schema, under the policy on its metadata. The write path checks only
    /// the latest version; this answers the stricter question.
    pub async fn is_compatible(
        &self,
        schema_name: &str,
        schema_text: &str,
    ) -> RegistryResult<bool> {
        let metadata = self.lookup_schema_metadata(schema_name).await?.ok_or_else(|| {
            RegistryError::SchemaNotFound {
                message: format!("no schema metadata with name: {}", schema_name),
            }
        })?;

        let existing: Vec<String> = self
            .find_all_versions(schema_name)
            .await?
            .into_iter()
            .map(|info| info.schema_text)
            .collect();

        self.providers.is_compatible(
            &metadata.schema_metadata.schema_type,
            schema_text,
            &existing,
            metadata.schema_metadata.compatibility,
        )
    }

    /// Whether `schema_text` is compatible with exactly one stored version.
    pub async fn is_compatible_with_version(
        &self,
        key: &SchemaVersionKey,
        schema_text: &str,
    ) -> RegistryResult<bool> {
        let version = self.get_schema_version_info(key).await?;
        let metadata = self
            .lookup_schema_metadata(&key.schema_name)
            .await?
            .ok_or_else(|| RegistryError::SchemaNotFound {
                message: format!("no schema metadata with name: {}", key.schema_name),
            })?;

        self.providers.is_compatible(
            &metadata.schema_metadata.schema_type,
            schema_text,
            std::slice::from_ref(&version.schema_text),
            metadata.schema_metadata.compatibility,
        )
    }

    // ---- serdes binding manager ----

    /// Store an artifact body under a fresh opaque id and return the id.
    /// Callers resolve by this id on download; the stored path is discarded.
    pub async fn upload_file(&self, contents: &[u8]) -> RegistryResult<String> {
        let file_id = Uuid::new_v4().to_string();
        self.file_storage.upload(contents, &file_id).await?;
        Ok(file_id)
    }

    pub async fn download_file(&self, file_id: &str) -> RegistryResult<Vec<u8>> {
        self.file_storage.download(file_id).await
    }

    pub async fn add_serdes_info(&self, serdes: &SerDesInfo) -> RegistryResult<i64> {
        let id = self.storage.next_id(SERDES_INFO_NAMESPACE).await?;
        let record = SerDesInfoRecord {
            id,
            timestamp: Utc::now().timestamp_millis(),
            serdes: serdes.clone(),
        };
        self.storage
            .add(SERDES_INFO_NAMESPACE, to_row(&record)?)
            .await?;
        Ok(id)
    }

    pub async fn get_serdes_info(
        &self,
        serdes_id: i64,
    ) -> RegistryResult<Option<SerDesInfoRecord>> {
        let key = StorableKey::new(
            SERDES_INFO_NAMESPACE,
            vec![QueryParam::new("id", serdes_id)],
        );
        match self.storage.get(&key).await? {
            Some(row) => Ok(Some(from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Artifact body of a bound serdes.
    pub async fn download_jar(&self, serdes_id: i64) -> RegistryResult<Vec<u8>> {
        let record = self.get_serdes_info(serdes_id).await?.ok_or_else(|| {
            RegistryError::SerDesNotFound {
                message: format!("no serdes with id: {}", serdes_id),
            }
        })?;
        self.file_storage.download(&record.serdes.file_id).await
    }

    /// Bind a serdes to a schema. The serdes must already be registered.
    pub async fn map_serdes_with_schema(
        &self,
        schema_metadata_id: i64,
        serdes_id: i64,
    ) -> RegistryResult<()> {
        let _gate = self.write_gate.lock().await;

        if self.get_serdes_info(serdes_id).await?.is_none() {
            return Err(RegistryError::SerDesNotFound {
                message: format!("serdes with id {} does not exist", serdes_id),
            });
        }

        let mapping = SchemaSerDesMapping {
            schema_metadata_id,
            serdes_id,
        };
        self.storage
            .add(SCHEMA_SERDES_MAPPING_NAMESPACE, to_row(&mapping)?)
            .await
    }

    pub async fn get_schema_serializers(
        &self,
        schema_metadata_id: i64,
    ) -> RegistryResult<Vec<SerDesInfoRecord>> {
        self.serdes_bound_to_schema(schema_metadata_id, true).await
    }

    pub async fn get_schema_deserializers(
        &self,
        schema_metadata_id: i64,
    ) -> RegistryResult<Vec<SerDesInfoRecord>> {
        self.serdes_bound_to_schema(schema_metadata_id, false).await
    }

    // ---- internals ----

    async fn lookup_schema_metadata(
        &self,
        schema_name: &str,
    ) -> RegistryResult<Option<SchemaMetadataInfo>> {
        let key = StorableKey::new(
            SCHEMA_METADATA_NAMESPACE,
            vec![QueryParam::new("name", schema_name)],
        );
        match self.storage.get(&key).await? {
            Some(row) => Ok(Some(from_row(row)?)),
            None => Ok(None),
        }
    }

    async fn latest_version_row(
        &self,
        schema_name: &str,
    ) -> RegistryResult<Option<SchemaVersionInfo>> {
        let versions = self.find_all_versions(schema_name).await?;
        Ok(versions.into_iter().max_by_key(|info| info.version))
    }

    async fn version_by_fingerprint(
        &self,
        schema_metadata_id: i64,
        fingerprint: &str,
    ) -> RegistryResult<Option<i32>> {
        let rows = self
            .storage
            .find(
                SCHEMA_VERSION_NAMESPACE,
                &[
                    QueryParam::new("schema_metadata_id", schema_metadata_id),
                    QueryParam::new("fingerprint", fingerprint),
                ],
            )
            .await?;

        if rows.len() > 1 {
            warn!(
                "more than one schema version with metadata id [{}] and fingerprint [{}]",
                schema_metadata_id, fingerprint
            );
        }

        match rows.into_iter().next() {
            Some(row) => {
                let info: SchemaVersionInfo = from_row(row)?;
                Ok(Some(info.version))
            }
            None => Ok(None),
        }
    }

    async fn serdes_bound_to_schema(
        &self,
        schema_metadata_id: i64,
        is_serializer: bool,
    ) -> RegistryResult<Vec<SerDesInfoRecord>> {
        let mappings = self
            .storage
            .find(
                SCHEMA_SERDES_MAPPING_NAMESPACE,
                &[QueryParam::new("schema_metadata_id", schema_metadata_id)],
            )
            .await?;

        let mut result = Vec::new();
        for row in mappings {
            let mapping: SchemaSerDesMapping = from_row(row)?;
            if let Some(record) = self.get_serdes_info(mapping.serdes_id).await? {
                if record.serdes.is_serializer == is_serializer {
                    result.push(record);
                }
            }
        }
        Ok(result)
    }
}
