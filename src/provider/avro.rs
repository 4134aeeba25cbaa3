//! Avro Dialect Provider
//!
//! Fingerprints Avro schemas by SHA-256 over the parsing canonical form,
//! extracts record fields for the structural index, and evaluates
//! compatibility with directional reader/writer checks.

use super::SchemaProvider;
use crate::error::{RegistryError, RegistryResult};
use crate::types::{SchemaCompatibility, SchemaField};
use apache_avro::schema_compatibility::SchemaCompatibility as AvroCompat;
use apache_avro::Schema;
use sha2::{Digest, Sha256};

pub const AVRO_TYPE: &str = "avro";

pub struct AvroSchemaProvider;

impl AvroSchemaProvider {
    pub fn new() -> Self {
        Self
    }

    fn parse(&self, schema_text: &str) -> RegistryResult<Schema> {
        Schema::parse_str(schema_text).map_err(|e| RegistryError::InvalidSchema {
            message: format!("failed to parse avro schema: {}", e),
        })
    }
}

impl Default for AvroSchemaProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaProvider for AvroSchemaProvider {
    fn schema_type(&self) -> &str {
        AVRO_TYPE
    }

    fn fingerprint(&self, schema_text: &str) -> RegistryResult<Vec<u8>> {
        let schema = self.parse(schema_text)?;
        let canonical = schema.canonical_form();
        Ok(Sha256::digest(canonical.as_bytes()).to_vec())
    }

    fn generate_fields(&self, schema_text: &str) -> RegistryResult<Vec<SchemaField>> {
        let schema = self.parse(schema_text)?;
        let mut fields = Vec::new();
        collect_fields(&schema, &mut fields);
        Ok(fields)
    }

    fn is_compatible(
        &self,
        candidate: &str,
        existing: &[String],
        policy: SchemaCompatibility,
    ) -> bool {
        if policy == SchemaCompatibility::None {
            return true;
        }

        let candidate = match self.parse(candidate) {
            Ok(schema) => schema,
            Err(_) => return false,
        };

        existing.iter().all(|text| match self.parse(text) {
            Ok(prior) => match policy {
                SchemaCompatibility::None => true,
                SchemaCompatibility::Backward => AvroCompat::can_read(&prior, &candidate),
                SchemaCompatibility::Forward => AvroCompat::can_read(&candidate, &prior),
                SchemaCompatibility::Full | SchemaCompatibility::Both => {
                    AvroCompat::can_read(&prior, &candidate)
                        && AvroCompat::can_read(&candidate, &prior)
                }
            },
            Err(_) => false,
        })
    }
}

/// Walk a parsed schema, emitting one entry per record field. Fields carry
/// the namespace of their enclosing record; nested records, arrays, maps and
/// unions are traversed.
fn collect_fields(schema: &Schema, out: &mut Vec<SchemaField>) {
    match schema {
        Schema::Record { name, fields, .. } => {
            let namespace = name.namespace.clone().unwrap_or_default();
            for field in fields {
                out.push(SchemaField::new(
                    field.name.clone(),
                    namespace.clone(),
                    type_tag(&field.schema),
                ));
                collect_fields(&field.schema, out);
            }
        }
        Schema::Array(inner) | Schema::Map(inner) => collect_fields(inner, out),
        Schema::Union(union) => {
            for variant in union.variants() {
                collect_fields(variant, out);
            }
        }
        _ => {}
    }
}

fn type_tag(schema: &Schema) -> String {
    match schema {
        Schema::Null => "null".to_string(),
        Schema::Boolean => "boolean".to_string(),
        Schema::Int => "int".to_string(),
        Schema::Long => "long".to_string(),
        Schema::Float => "float".to_string(),
        Schema::Double => "double".to_string(),
        Schema::Bytes => "bytes".to_string(),
        Schema::String => "string".to_string(),
        Schema::Array(_) => "array".to_string(),
        Schema::Map(_) => "map".to_string(),
        Schema::Union(_) => "union".to_string(),
        Schema::Record { .. } => "record".to_string(),
        Schema::Enum { .. } => "enum".to_string(),
        Schema::Fixed { .. } => "fixed".to_string(),
        _ => "logical".to_string(),
    }
}
