//! Core Registry Types
//!
//! DTOs shared by the lifecycle engine, the storage layer, and the dialect
//! providers. Persisted types derive `Serialize`/`Deserialize`; nested DTOs
//! flatten so filterable attributes land as top-level storage columns.

use serde::{Deserialize, Serialize};

/// Compatibility policy under which a candidate text is accepted as a
/// successor to prior versions. The engine routes the policy through to the
/// dialect provider unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaCompatibility {
    /// No compatibility checking
    None,
    /// New version can read data written with the prior version
    Backward,
    /// Prior version can read data written with the new version
    Forward,
    /// Backward and forward
    Full,
    /// Alias kept for dialects that enumerate both directions separately
    Both,
}

impl Default for SchemaCompatibility {
    fn default() -> Self {
        SchemaCompatibility::Backward
    }
}

/// Logical identity of an evolving schema: name, dialect, group, policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaMetadata {
    pub name: String,
    /// Dialect tag, e.g. "avro"
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(rename = "group")]
    pub schema_group: String,
    pub compatibility: SchemaCompatibility,
    pub description: String,
}

impl SchemaMetadata {
    pub fn new(name: impl Into<String>, schema_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema_type: schema_type.into(),
            schema_group: String::new(),
            compatibility: SchemaCompatibility::default(),
            description: String::new(),
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.schema_group = group.into();
        self
    }

    pub fn with_compatibility(mut self, compatibility: SchemaCompatibility) -> Self {
        self.compatibility = compatibility;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A persisted schema metadata row: surrogate id plus the client-supplied
/// metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaMetadataInfo {
    pub id: i64,
    /// Creation time, epoch millis
    pub timestamp: i64,
    #[serde(flatten)]
    pub schema_metadata: SchemaMetadata,
}

/// Natural key of one schema revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaVersionKey {
    pub schema_name: String,
    pub version: i32,
}

impl SchemaVersionKey {
    pub fn new(schema_name: impl Into<String>, version: i32) -> Self {
        Self {
            schema_name: schema_name.into(),
            version,
        }
    }
}

/// One immutable revision of a logical schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaVersionInfo {
    pub id: i64,
    pub schema_metadata_id: i64,
    pub name: String,
    pub version: i32,
    pub schema_text: String,
    /// Hex-encoded content digest from the dialect provider
    pub fingerprint: String,
    pub description: String,
    pub timestamp: i64,
}

/// A `(name, namespace, type)` triple extracted from a schema text by its
/// dialect provider. Persisted per version to back structural search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    pub namespace: String,
    #[serde(rename = "type")]
    pub field_type: String,
}

impl SchemaField {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        field_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            field_type: field_type.into(),
        }
    }
}

/// A persisted field-index row. Committed in the same critical section as
/// its version row; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaFieldRecord {
    pub id: i64,
    pub schema_version_id: i64,
    pub timestamp: i64,
    #[serde(flatten)]
    pub field: SchemaField,
}

/// Structural search query. Only the populated members become filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaFieldQuery {
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub field_type: Option<String>,
}

impl SchemaFieldQuery {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_field_type(mut self, field_type: impl Into<String>) -> Self {
        self.field_type = Some(field_type.into());
        self
    }
}

/// Descriptor of an uploaded serializer/deserializer artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerDesInfo {
    pub name: String,
    pub description: String,
    /// Entry-point class inside the artifact
    pub class_name: String,
    /// File-store id of the uploaded artifact body
    pub file_id: String,
    pub is_serializer: bool,
}

/// A persisted serdes row: surrogate id plus the descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerDesInfoRecord {
    pub id: i64,
    pub timestamp: i64,
    #[serde(flatten)]
    pub serdes: SerDesInfo,
}

/// N:M link row between a schema metadata row and a serdes row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSerDesMapping {
    pub schema_metadata_id: i64,
    pub serdes_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_builder_defaults() {
        let meta = SchemaMetadata::new("orders", "avro");
        assert_eq!(meta.compatibility, SchemaCompatibility::Backward);
        assert!(meta.schema_group.is_empty());

        let meta = meta
            .with_group("kafka")
            .with_compatibility(SchemaCompatibility::Full)
            .with_description("order events");
        assert_eq!(meta.schema_group, "kafka");
        assert_eq!(meta.compatibility, SchemaCompatibility::Full);
    }

    #[test]
    fn test_metadata_row_flattens_filterable_columns() {
        let info = SchemaMetadataInfo {
            id: 7,
            timestamp: 1,
            schema_metadata: SchemaMetadata::new("orders", "avro"),
        };

        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["name"], "orders");
        assert_eq!(value["type"], "avro");
        assert_eq!(value["id"], 7);

        let back: SchemaMetadataInfo = serde_json::from_value(value).unwrap();
        assert_eq!(back, info);
    }

    #[test]
    fn test_field_query_builder() {
        let query = SchemaFieldQuery::by_name("id").with_field_type("long");
        assert_eq!(query.name.as_deref(), Some("id"));
        assert_eq!(query.field_type.as_deref(), Some("long"));
        assert!(query.namespace.is_none());
    }
}
