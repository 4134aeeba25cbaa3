//! Storage Port
//!
//! The registry persists its entities through a generic record store offering
//! namespaced collections with monotonic id allocation, primary-key get,
//! filtered find, and insert. Rows are plain JSON objects; filterable
//! attributes are top-level columns matched by string equality.

pub mod memory;

use crate::error::RegistryResult;
use async_trait::async_trait;
use serde_json::Value;

pub use memory::InMemoryStorageManager;

/// Namespace of schema metadata rows
pub const SCHEMA_METADATA_NAMESPACE: &str = "schema_metadata_info";
/// Namespace of schema version rows
pub const SCHEMA_VERSION_NAMESPACE: &str = "schema_version_info";
/// Namespace of field-index rows
pub const SCHEMA_FIELD_NAMESPACE: &str = "schema_field_info";
/// Namespace of serdes descriptor rows
pub const SERDES_INFO_NAMESPACE: &str = "serdes_info";
/// Namespace of schema-to-serdes mapping rows
pub const SCHEMA_SERDES_MAPPING_NAMESPACE: &str = "schema_serdes_mapping";

/// A persisted record: column name to JSON value.
pub type Row = serde_json::Map<String, Value>;

/// One `(column, value)` equality predicate. A filter list is conjoined with
/// AND; values compare against the string form of the stored column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParam {
    pub column: String,
    pub value: String,
}

impl QueryParam {
    pub fn new(column: impl Into<String>, value: impl ToString) -> Self {
        Self {
            column: column.into(),
            value: value.to_string(),
        }
    }
}

/// Primary-key address of a record: namespace plus key columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorableKey {
    pub namespace: String,
    pub fields: Vec<QueryParam>,
}

impl StorableKey {
    pub fn new(namespace: impl Into<String>, fields: Vec<QueryParam>) -> Self {
        Self {
            namespace: namespace.into(),
            fields,
        }
    }
}

/// Generic record store the registry runs against. All operations are durable
/// on return; `get` never fails for absent keys.
#[async_trait]
pub trait StorageManager: Send + Sync {
    /// Allocate the next id in a namespace. Ids are monotonically increasing
    /// non-negative integers, unique within the namespace for the lifetime of
    /// the store.
    async fn next_id(&self, namespace: &str) -> RegistryResult<i64>;

    /// Primary-key lookup. Returns `None` when no record matches.
    async fn get(&self, key: &StorableKey) -> RegistryResult<Option<Row>>;

    /// Equality-filtered scan of a namespace. Result order is unspecified.
    async fn find(&self, namespace: &str, params: &[QueryParam]) -> RegistryResult<Vec<Row>>;

    /// All records of a namespace.
    async fn list(&self, namespace: &str) -> RegistryResult<Vec<Row>>;

    /// Insert a record.
    async fn add(&self, namespace: &str, row: Row) -> RegistryResult<()>;
}

/// Serialize an entity into a storage row.
pub fn to_row<T: serde::Serialize>(entity: &T) -> RegistryResult<Row> {
    match serde_json::to_value(entity)? {
        Value::Object(map) => Ok(map),
        other => Err(crate::error::RegistryError::Io {
            message: format!("entity did not serialize to a record: {}", other),
        }),
    }
}

/// Deserialize an entity out of a storage row.
pub fn from_row<T: serde::de::DeserializeOwned>(row: Row) -> RegistryResult<T> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

/// String form of a stored column used for filter comparison.
pub(crate) fn column_as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Whether a row satisfies every predicate in `params`.
pub(crate) fn row_matches(row: &Row, params: &[QueryParam]) -> bool {
    params.iter().all(|param| {
        row.get(&param.column)
            .map(|value| column_as_string(value) == param.value)
            .unwrap_or(false)
    })
}
