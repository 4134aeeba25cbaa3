//! Registry Error Types
//!
//! This module defines the error taxonomy for all registry operations.

/// Error types for schema registry operations
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryError {
    /// No metadata for the given name, or no version matching the requested key/text
    SchemaNotFound { message: String },
    /// The schema text failed dialect parsing or validation
    InvalidSchema { message: String },
    /// The compatibility predicate rejected the candidate text
    IncompatibleSchema { message: String },
    /// A referenced serializer/deserializer id does not exist
    SerDesNotFound { message: String },
    /// Unknown dialect tag or invalid registry setup
    Configuration { message: String },
    /// Storage or file-store failure, wrapping the underlying cause
    Io { message: String },
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::SchemaNotFound { message } => {
                write!(f, "Schema not found: {}", message)
            }
            RegistryError::InvalidSchema { message } => {
                write!(f, "Invalid schema: {}", message)
            }
            RegistryError::IncompatibleSchema { message } => {
                write!(f, "Incompatible schema: {}", message)
            }
            RegistryError::SerDesNotFound { message } => {
                write!(f, "SerDes not found: {}", message)
            }
            RegistryError::Configuration { message } => {
                write!(f, "Registry configuration error: {}", message)
            }
            RegistryError::Io { message } => write!(f, "Registry I/O error: {}", message),
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<std::io::Error> for RegistryError {
    fn from(e: std::io::Error) -> Self {
        RegistryError::Io {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(e: serde_json::Error) -> Self {
        RegistryError::Io {
            message: format!("record conversion failed: {}", e),
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;
