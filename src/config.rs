//! Registry Configuration
//!
//! A small typed view over a string-keyed property map. Unknown keys are
//! ignored; missing or mistyped values fall back to defaults.

use serde_json::Value;
use std::collections::HashMap;

/// Max entries held by the schema version cache
pub const SCHEMA_CACHE_SIZE: &str = "schema.cache.size";
/// Per-entry TTL of the schema version cache, in seconds
pub const SCHEMA_CACHE_EXPIRY_INTERVAL_SECS: &str = "schema.cache.expiry.interval";

pub const DEFAULT_SCHEMA_CACHE_SIZE: usize = 10_000;
pub const DEFAULT_SCHEMA_CACHE_EXPIRY_INTERVAL_SECS: u64 = 60 * 60;

/// Typed accessor over registry properties.
#[derive(Debug, Clone, Default)]
pub struct RegistryOptions {
    props: HashMap<String, Value>,
}

impl RegistryOptions {
    pub fn new(props: HashMap<String, Value>) -> Self {
        Self { props }
    }

    pub fn max_schema_cache_size(&self) -> usize {
        self.props
            .get(SCHEMA_CACHE_SIZE)
            .and_then(Value::as_u64)
            .map(|v| v as usize)
            .unwrap_or(DEFAULT_SCHEMA_CACHE_SIZE)
    }

    pub fn schema_expiry_secs(&self) -> u64 {
        self.props
            .get(SCHEMA_CACHE_EXPIRY_INTERVAL_SECS)
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_SCHEMA_CACHE_EXPIRY_INTERVAL_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_when_empty() {
        let options = RegistryOptions::default();
        assert_eq!(options.max_schema_cache_size(), DEFAULT_SCHEMA_CACHE_SIZE);
        assert_eq!(
            options.schema_expiry_secs(),
            DEFAULT_SCHEMA_CACHE_EXPIRY_INTERVAL_SECS
        );
    }

    #[test]
    fn test_configured_values_override_defaults() {
        let mut props = HashMap::new();
        props.insert(SCHEMA_CACHE_SIZE.to_string(), json!(42));
        props.insert(SCHEMA_CACHE_EXPIRY_INTERVAL_SECS.to_string(), json!(5));
        props.insert("some.unknown.key".to_string(), json!("ignored"));

        let options = RegistryOptions::new(props);
        assert_eq!(options.max_schema_cache_size(), 42);
        assert_eq!(options.schema_expiry_secs(), 5);
    }

    #[test]
    fn test_mistyped_value_falls_back_to_default() {
        let mut props = HashMap::new();
        props.insert(SCHEMA_CACHE_SIZE.to_string(), json!("not a number"));

        let options = RegistryOptions::new(props);
        assert_eq!(options.max_schema_cache_size(), DEFAULT_SCHEMA_CACHE_SIZE);
    }
}
