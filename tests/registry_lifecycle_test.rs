//! Integration tests for the schema lifecycle engine
//!
//! These tests drive the registry end-to-end against the in-memory record
//! store, with a deterministic stub dialect: fingerprint is SHA-256 of the
//! text, and any candidate is compatible unless it carries an "incompatible"
//! marker.

use schema_registry::{
    AvroSchemaProvider, InMemoryStorageManager, LocalFileStorage, RegistryError, RegistryOptions,
    RegistryResult, SchemaCompatibility, SchemaField, SchemaFieldQuery, SchemaMetadata,
    SchemaProvider, SchemaRegistry, SchemaVersionKey,
};
use sha2::{Digest, Sha256};
use std::sync::Arc;

const STUB_TYPE: &str = "stub";

/// Dialect stub: fingerprint = SHA-256(text); a candidate containing the
/// string "incompatible" is rejected against any existing version; texts
/// shaped as "name:type" pairs separated by commas produce fields.
struct StubProvider;

impl SchemaProvider for StubProvider {
    fn schema_type(&self) -> &str {
        STUB_TYPE
    }

    fn fingerprint(&self, schema_text: &str) -> RegistryResult<Vec<u8>> {
        if schema_text.is_empty() {
            return Err(RegistryError::InvalidSchema {
                message: "empty schema text".to_string(),
            });
        }
        Ok(Sha256::digest(schema_text.as_bytes()).to_vec())
    }

    fn generate_fields(&self, schema_text: &str) -> RegistryResult<Vec<SchemaField>> {
        Ok(schema_text
            .split(',')
            .filter_map(|part| {
                let (name, field_type) = part.split_once(':')?;
                Some(SchemaField::new(name.trim(), "stub.ns", field_type.trim()))
            })
            .collect())
    }

    fn is_compatible(
        &self,
        candidate: &str,
        _existing: &[String],
        policy: SchemaCompatibility,
    ) -> bool {
        policy == SchemaCompatibility::None || !candidate.contains("incompatible")
    }
}

fn registry_with(dir: &tempfile::TempDir) -> SchemaRegistry {
    SchemaRegistry::new(
        Arc::new(InMemoryStorageManager::new()),
        Arc::new(LocalFileStorage::new(dir.path())),
        vec![Arc::new(StubProvider), Arc::new(AvroSchemaProvider::new())],
        RegistryOptions::default(),
    )
}

fn order_metadata() -> SchemaMetadata {
    SchemaMetadata::new("Order", STUB_TYPE).with_compatibility(SchemaCompatibility::Backward)
}

#[tokio::test]
async fn test_first_write_returns_version_one() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with(&dir);

    let version = registry
        .add_schema_version(&order_metadata(), "id:long", "v1")
        .await
        .unwrap();
    assert_eq!(version, 1);

    let versions = registry.find_all_versions("Order").await.unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].version, 1);
    assert_eq!(versions[0].schema_text, "id:long");
}

#[tokio::test]
async fn test_schema_without_fields_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with(&dir);

    let version = registry
        .add_schema_version(&order_metadata(), "opaque payload", "v1")
        .await
        .unwrap();
    assert_eq!(version, 1);

    let keys = registry
        .find_schemas_with_fields(&SchemaFieldQuery::by_name("opaque payload"))
        .await
        .unwrap();
    assert!(keys.is_empty());
}

#[tokio::test]
async fn test_identical_text_is_deduplicated() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with(&dir);
    let metadata = order_metadata();

    let first = registry
        .add_schema_version(&metadata, "id:long", "v1")
        .await
        .unwrap();
    let second = registry
        .add_schema_version(&metadata, "id:long", "replayed")
        .await
        .unwrap();

    assert_eq!(first, 1);
    assert_eq!(second, 1);
    assert_eq!(registry.find_all_versions("Order").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_incompatible_text_commits_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with(&dir);
    let metadata = order_metadata();

    registry
        .add_schema_version(&metadata, "id:long", "v1")
        .await
        .unwrap();

    let err = registry
        .add_schema_version(&metadata, "id:long, incompatible:marker", "v2")
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::IncompatibleSchema { .. }));

    let versions = registry.find_all_versions("Order").await.unwrap();
    assert_eq!(versions.len(), 1);
}

#[tokio::test]
async fn test_compatible_evolution_increments_version() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with(&dir);
    let metadata = order_metadata();

    registry
        .add_schema_version(&metadata, "id:long", "v1")
        .await
        .unwrap();
    let version = registry
        .add_schema_version(&metadata, "id:long, customer:string", "v2")
        .await
        .unwrap();
    assert_eq!(version, 2);

    let latest = registry
        .get_latest_schema_version_info("Order")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.version, 2);
}

#[tokio::test]
async fn test_unknown_name_fails_for_name_only_form() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with(&dir);

    let err = registry
        .add_schema_version_by_name("Ghost", "id:long", "v1")
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::SchemaNotFound { .. }));
}

#[tokio::test]
async fn test_name_only_form_appends_to_existing_schema() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with(&dir);

    registry
        .add_schema_version(&order_metadata(), "id:long", "v1")
        .await
        .unwrap();
    let version = registry
        .add_schema_version_by_name("Order", "id:long, total:double", "v2")
        .await
        .unwrap();
    assert_eq!(version, 2);
}

#[tokio::test]
async fn test_field_search_finds_registered_schema() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with(&dir);

    registry
        .add_schema_version(&order_metadata(), "id:long, customer:string", "v1")
        .await
        .unwrap();

    let query = SchemaFieldQuery::by_name("id").with_field_type("long");
    let keys = registry.find_schemas_with_fields(&query).await.unwrap();
    assert!(keys.contains(&SchemaVersionKey::new("Order", 1)));

    let miss = SchemaFieldQuery::by_name("id").with_field_type("string");
    assert!(registry
        .find_schemas_with_fields(&miss)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_single_writer_versions_are_sequential() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with(&dir);
    let metadata = order_metadata();

    for expected in 1..=5 {
        let version = registry
            .add_schema_version(&metadata, &format!("id:long, rev{}:int", expected), "")
            .await
            .unwrap();
        assert_eq!(version, expected);
    }

    let mut versions: Vec<i32> = registry
        .find_all_versions("Order")
        .await
        .unwrap()
        .into_iter()
        .map(|info| info.version)
        .collect();
    versions.sort_unstable();
    assert_eq!(versions, vec![1, 2, 3, 4, 5]);

    let latest = registry
        .get_latest_schema_version_info("Order")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.version, 5);
}

#[tokio::test]
async fn test_text_round_trips_to_its_version() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with(&dir);
    let metadata = order_metadata();

    for (text, expected) in [("id:long", 1), ("id:long, a:int", 2), ("id:long, b:int", 3)] {
        let version = registry
            .add_schema_version(&metadata, text, "")
            .await
            .unwrap();
        assert_eq!(version, expected);
        assert_eq!(
            registry.get_schema_version("Order", text).await.unwrap(),
            expected
        );
    }

    let err = registry
        .get_schema_version("Order", "never:registered")
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::SchemaNotFound { .. }));
}

#[tokio::test]
async fn test_version_info_reads_through_cache() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with(&dir);

    registry
        .add_schema_version(&order_metadata(), "id:long", "v1")
        .await
        .unwrap();

    let key = SchemaVersionKey::new("Order", 1);
    let info = registry.get_schema_version_info(&key).await.unwrap();
    assert_eq!(info.version, 1);
    assert_eq!(info.schema_text, "id:long");

    registry.get_schema_version_info(&key).await.unwrap();
    let stats = registry.cache_stats().await;
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);

    let err = registry
        .get_schema_version_info(&SchemaVersionKey::new("Order", 99))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::SchemaNotFound { .. }));
}

#[tokio::test]
async fn test_read_path_compatibility_predicts_write_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with(&dir);
    let metadata = order_metadata();

    registry
        .add_schema_version(&metadata, "id:long", "v1")
        .await
        .unwrap();

    let bad = "incompatible:marker";
    assert!(!registry.is_compatible("Order", bad).await.unwrap());

    let err = registry
        .add_schema_version(&metadata, bad, "v2")
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::IncompatibleSchema { .. }));
    assert_eq!(registry.find_all_versions("Order").await.unwrap().len(), 1);

    assert!(registry.is_compatible("Order", "id:long, ok:int").await.unwrap());
    assert!(registry
        .is_compatible_with_version(&SchemaVersionKey::new("Order", 1), "id:long, ok:int")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_invalid_text_is_rejected_before_any_write() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with(&dir);

    let err = registry
        .add_schema_version(&order_metadata(), "", "v1")
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::InvalidSchema { .. }));
    assert!(registry.find_all_versions("Order").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_dialect_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with(&dir);

    let mut types = registry.schema_types();
    types.sort_unstable();
    assert_eq!(types, vec!["avro".to_string(), STUB_TYPE.to_string()]);

    let metadata = SchemaMetadata::new("Order", "proto3");
    let err = registry
        .add_schema_version(&metadata, "id:long", "v1")
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Configuration { .. }));
}

#[tokio::test]
async fn test_metadata_registration_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with(&dir);
    let metadata = order_metadata();

    let first = registry.add_schema_metadata(&metadata).await.unwrap();
    let second = registry.add_schema_metadata(&metadata).await.unwrap();
    assert_eq!(first, second);

    let info = registry.get_schema_metadata("Order").await.unwrap().unwrap();
    assert_eq!(info.id, first);
    assert_eq!(info.schema_metadata.schema_type, STUB_TYPE);
}

#[tokio::test]
async fn test_find_schema_metadata_projects_from_metadata_rows() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with(&dir);

    registry
        .add_schema_metadata(&SchemaMetadata::new("Order", STUB_TYPE).with_group("sales"))
        .await
        .unwrap();
    registry
        .add_schema_metadata(&SchemaMetadata::new("Invoice", STUB_TYPE).with_group("billing"))
        .await
        .unwrap();

    let all = registry.find_schema_metadata(&[]).await.unwrap();
    assert_eq!(all.len(), 2);

    let billing = registry
        .find_schema_metadata(&[schema_registry::QueryParam::new("group", "billing")])
        .await
        .unwrap();
    assert_eq!(billing.len(), 1);
    assert_eq!(billing[0].name, "Invoice");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_assign_dense_versions() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(registry_with(&dir));
    let metadata = order_metadata();

    let writers: Vec<_> = (0..8)
        .map(|worker| {
            let registry = registry.clone();
            let metadata = metadata.clone();
            tokio::spawn(async move {
                registry
                    .add_schema_version(&metadata, &format!("id:long, w{}:int", worker), "")
                    .await
            })
        })
        .collect();

    let mut versions = Vec::new();
    for handle in writers {
        versions.push(handle.await.unwrap().unwrap());
    }
    versions.sort_unstable();
    assert_eq!(versions, (1..=8).collect::<Vec<i32>>());

    let stored: Vec<i32> = registry
        .find_all_versions("Order")
        .await
        .unwrap()
        .into_iter()
        .map(|info| info.version)
        .collect();
    assert_eq!(stored.len(), 8);
}

#[tokio::test]
async fn test_avro_schemas_evolve_through_the_registry() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with(&dir);
    let metadata = SchemaMetadata::new("avro-orders", "avro")
        .with_compatibility(SchemaCompatibility::Backward);

    let v1 = r#"
    {
        "type": "record",
        "name": "Order",
        "namespace": "com.shop",
        "fields": [{"name": "id", "type": "long"}]
    }
    "#;
    let v2 = r#"
    {
        "type": "record",
        "name": "Order",
        "namespace": "com.shop",
        "fields": [
            {"name": "id", "type": "long"},
            {"name": "note", "type": ["null", "string"], "default": null}
        ]
    }
    "#;
    let breaking = r#"
    {
        "type": "record",
        "name": "Order",
        "namespace": "com.shop",
        "fields": [
            {"name": "id", "type": "long"},
            {"name": "note", "type": "string"}
        ]
    }
    "#;

    assert_eq!(registry.add_schema_version(&metadata, v1, "").await.unwrap(), 1);
    assert_eq!(registry.add_schema_version(&metadata, v2, "").await.unwrap(), 2);

    let err = registry
        .add_schema_version(&metadata, breaking, "")
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::IncompatibleSchema { .. }));

    let keys = registry
        .find_schemas_with_fields(&SchemaFieldQuery::by_name("id").with_field_type("long"))
        .await
        .unwrap();
    assert!(keys.contains(&SchemaVersionKey::new("avro-orders", 1)));
    assert!(keys.contains(&SchemaVersionKey::new("avro-orders", 2)));
}
