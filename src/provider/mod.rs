//! Schema Dialect Providers
//!
//! A dialect provider knows how to parse, fingerprint, extract fields from,
//! and compatibility-check schemas of one dialect. Providers are registered
//! once at registry construction and the mapping is read-only afterward.

pub mod avro;

use crate::error::{RegistryError, RegistryResult};
use crate::types::{SchemaCompatibility, SchemaField};
use std::collections::HashMap;
use std::sync::Arc;

pub use avro::AvroSchemaProvider;

/// Capability set of one schema dialect.
pub trait SchemaProvider: Send + Sync {
    /// Stable dialect tag, e.g. "avro".
    fn schema_type(&self) -> &str;

    /// Deterministic content digest of the schema text. Equal digests imply
    /// semantically equal schemas within the dialect. Parsing doubles as
    /// validation; unparseable text fails with `InvalidSchema`.
    fn fingerprint(&self, schema_text: &str) -> RegistryResult<Vec<u8>>;

    /// Extract `(name, namespace, type)` triples for the field index.
    fn generate_fields(&self, schema_text: &str) -> RegistryResult<Vec<SchemaField>>;

    /// Whether `candidate` is an acceptable successor to `existing` texts
    /// under `policy`. Unparseable inputs are not compatible.
    fn is_compatible(
        &self,
        candidate: &str,
        existing: &[String],
        policy: SchemaCompatibility,
    ) -> bool;
}

/// Dialect tag to provider mapping, populated once at init.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn SchemaProvider>>,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<Arc<dyn SchemaProvider>>) -> Self {
        let providers = providers
            .into_iter()
            .map(|provider| (provider.schema_type().to_string(), provider))
            .collect();
        Self { providers }
    }

    fn provider(&self, schema_type: &str) -> RegistryResult<&Arc<dyn SchemaProvider>> {
        self.providers
            .get(schema_type)
            .ok_or_else(|| RegistryError::Configuration {
                message: format!("no schema provider registered for type: {}", schema_type),
            })
    }

    /// Registered dialect tags.
    pub fn schema_types(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    /// Fingerprint `schema_text`, hex-encoded for storage.
    pub fn fingerprint_hex(&self, schema_type: &str, schema_text: &str) -> RegistryResult<String> {
        let digest = self.provider(schema_type)?.fingerprint(schema_text)?;
        Ok(hex::encode(digest))
    }

    pub fn generate_fields(
        &self,
        schema_type: &str,
        schema_text: &str,
    ) -> RegistryResult<Vec<SchemaField>> {
        self.provider(schema_type)?.generate_fields(schema_text)
    }

    pub fn is_compatible(
        &self,
        schema_type: &str,
        candidate: &str,
        existing: &[String],
        policy: SchemaCompatibility,
    ) -> RegistryResult<bool> {
        Ok(self
            .provider(schema_type)?
            .is_compatible(candidate, existing, policy))
    }
}
