//! Schema Registry
//!
//! A server-side authority for the evolution history of structured-data
//! schemas. Producers register schema texts and get stable, monotonically
//! increasing version numbers back; consumers fetch schemas by name and
//! version to deserialize data written against a known schema identity.
//!
//! ## Key Components
//!
//! - **SchemaRegistry**: the lifecycle engine: fingerprint dedup, version
//!   assignment, compatibility enforcement, field indexing, serdes bindings
//! - **SchemaProvider**: pluggable dialect capability (parse, fingerprint,
//!   field extraction, compatibility); an Avro provider ships in-tree
//! - **SchemaVersionCache**: bounded TTL cache with single-flight loads
//! - **StorageManager / FileStorage**: ports to the record store and the
//!   artifact blob store, with in-memory and local-filesystem implementations
//!
//! ## Example
//!
//! ```rust,no_run
//! use schema_registry::{
//!     AvroSchemaProvider, InMemoryStorageManager, LocalFileStorage, RegistryOptions,
//!     SchemaMetadata, SchemaRegistry,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = SchemaRegistry::new(
//!         Arc::new(InMemoryStorageManager::new()),
//!         Arc::new(LocalFileStorage::new("/var/lib/registry/files")),
//!         vec![Arc::new(AvroSchemaProvider::new())],
//!         RegistryOptions::default(),
//!     );
//!
//!     let metadata = SchemaMetadata::new("orders", "avro");
//!     let schema_text = r#"{"type": "record", "name": "Order", "fields": []}"#;
//!     let version = registry
//!         .add_schema_version(&metadata, schema_text, "initial")
//!         .await?;
//!     println!("registered version {}", version);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod filestore;
pub mod provider;
pub mod registry;
pub mod storage;
pub mod types;

pub use cache::{CacheStats, SchemaVersionCache, SchemaVersionLoader};
pub use config::RegistryOptions;
pub use error::{RegistryError, RegistryResult};
pub use filestore::{FileStorage, LocalFileStorage};
pub use provider::{AvroSchemaProvider, ProviderRegistry, SchemaProvider};
pub use registry::SchemaRegistry;
pub use storage::{InMemoryStorageManager, QueryParam, Row, StorableKey, StorageManager};
pub use types::{
    SchemaCompatibility, SchemaField, SchemaFieldQuery, SchemaFieldRecord, SchemaMetadata,
    SchemaMetadataInfo, SchemaSerDesMapping, SchemaVersionInfo, SchemaVersionKey, SerDesInfo,
    SerDesInfoRecord,
};
