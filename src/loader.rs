//! Document loading from files and strings.

use std::path::Path;

use serde_json::Value;

use crate::error::LoadError;

/// Load a JSON document from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_document(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_document_str(&content)
}

/// Load a JSON document from a string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't valid JSON.
pub fn load_document_str(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}
