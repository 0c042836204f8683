//! Error types for registration, serialization and deserialization.

use std::path::PathBuf;

use thiserror::Error;

use crate::api_error::{CombinedError, ErrorDocument, JsonApiError};
use crate::types::ErrorDocumentOptions;

/// Errors raised while registering or looking up resource descriptors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{name} is not a valid {kind} name")]
    InvalidName { kind: &'static str, name: String },

    #[error("resource type '{wire_type}' is already registered")]
    DuplicateType { wire_type: String },

    #[error("{type_name} is not registered as a resource")]
    NotRegistered { type_name: String },

    #[error("'{wire_type}' describes {expected}, not the value it was given")]
    WrongType {
        wire_type: String,
        expected: &'static str,
    },

    #[error("identity field '{field}' of '{wire_type}' must be a string, got {actual}")]
    IdentityType {
        wire_type: String,
        field: String,
        actual: &'static str,
    },

    #[error("identity field '{field}' of '{wire_type}' could not be read")]
    IdentityUnreadable {
        wire_type: String,
        field: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors during serialization. There is never a partial document.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("only registered resources can be serialized, got {type_name}")]
    NotAResource { type_name: String },

    #[error("include path nests deeper than {max_depth} levels at '{path}'")]
    CyclicInclude { path: String, max_depth: usize },

    #[error("cannot serialize attribute '{name}' of '{wire_type}': {source}")]
    Attribute {
        wire_type: String,
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors during deserialization.
#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },

    #[error("validation failed with {} error(s)", .0.errors.len())]
    Invalid(CombinedError),
}

/// Errors while loading a document from disk or text.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
}

/// Single violation reported by a schema evaluator.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Violation {
    /// JSON Pointer (RFC 6901) into the document; `/` for the root.
    pub pointer: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.pointer, self.message)
    }
}

impl RegistryError {
    /// HTTP status reported when this error reaches the wire.
    pub fn status(&self) -> u16 {
        500
    }
}

impl SerializeError {
    /// HTTP status reported when this error reaches the wire.
    pub fn status(&self) -> u16 {
        match self {
            SerializeError::Registry(e) => e.status(),
            _ => 500,
        }
    }

    /// Render as a one-element error document.
    pub fn to_document(&self, options: &ErrorDocumentOptions) -> ErrorDocument {
        JsonApiError::new("Serialization Error", self.to_string(), self.status()).to_document(options)
    }
}

impl DeserializeError {
    /// HTTP status reported when this error reaches the wire.
    pub fn status(&self) -> u16 {
        match self {
            DeserializeError::Registry(e) => e.status(),
            DeserializeError::InvalidSchema { .. } => 500,
            DeserializeError::Invalid(combined) => combined.status,
        }
    }

    /// Render as an error document. Validation failures keep every violation.
    pub fn to_document(&self, options: &ErrorDocumentOptions) -> ErrorDocument {
        match self {
            DeserializeError::Invalid(combined) => combined.to_document(options),
            other => JsonApiError::new("Deserialization Error", other.to_string(), other.status())
                .to_document(options),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_name_display() {
        let err = RegistryError::InvalidName {
            kind: "attribute",
            name: "_secret".into(),
        };
        assert_eq!(err.to_string(), "_secret is not a valid attribute name");
    }

    #[test]
    fn statuses() {
        let err = SerializeError::NotAResource {
            type_name: "u32".into(),
        };
        assert_eq!(err.status(), 500);

        let err = DeserializeError::Invalid(CombinedError::validation(vec![Violation {
            pointer: "/data".into(),
            message: "should be object".into(),
        }]));
        assert_eq!(err.status(), 400);
        assert_eq!(err.to_string(), "validation failed with 1 error(s)");
    }

    #[test]
    fn violation_display() {
        let v = Violation {
            pointer: "/data/type".into(),
            message: "should be 'post'".into(),
        };
        assert_eq!(v.to_string(), "/data/type: should be 'post'");
    }

    #[test]
    fn serialize_error_document() {
        let err = SerializeError::CyclicInclude {
            path: "parent.parent".into(),
            max_depth: 1,
        };
        let doc = err.to_document(&ErrorDocumentOptions::new());
        assert_eq!(doc.errors.len(), 1);
        assert_eq!(doc.errors[0].status, "500");
        assert!(doc.errors[0].source.is_none());
    }
}
