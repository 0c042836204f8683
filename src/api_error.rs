//! Wire-facing errors and their JSON:API error document form.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::error::Violation;
use crate::types::{ErrorDocumentOptions, JsonApiObject};

/// Title used for every inbound document violation.
pub const VALIDATION_TITLE: &str = "Validation Error";

/// A single error that can be reported to a client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{description}")]
pub struct JsonApiError {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: u16,
    pub pointer: Option<String>,
}

impl JsonApiError {
    /// Create an error with a fresh random id and no pointer.
    pub fn new(title: impl Into<String>, description: impl Into<String>, status: u16) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            description: description.into(),
            status,
            pointer: None,
        }
    }

    pub fn with_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.pointer = Some(pointer.into());
        self
    }

    pub fn to_document(&self, options: &ErrorDocumentOptions) -> ErrorDocument {
        error_to_document(self.clone(), options)
    }
}

/// Several errors reported together under one status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} error(s)", errors.len())]
pub struct CombinedError {
    pub status: u16,
    pub errors: Vec<JsonApiError>,
}

impl CombinedError {
    pub fn new(status: u16, errors: Vec<JsonApiError>) -> Self {
        Self { status, errors }
    }

    /// One `400 Validation Error` per violation, in order.
    pub fn validation(violations: Vec<Violation>) -> Self {
        let errors = violations
            .into_iter()
            .map(|v| JsonApiError::new(VALIDATION_TITLE, v.message, 400).with_pointer(v.pointer))
            .collect();
        Self::new(400, errors)
    }

    pub fn to_document(&self, options: &ErrorDocumentOptions) -> ErrorDocument {
        error_to_document(self.clone(), options)
    }
}

impl From<JsonApiError> for CombinedError {
    fn from(error: JsonApiError) -> Self {
        Self {
            status: error.status,
            errors: vec![error],
        }
    }
}

/// `source` member of an error object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorSource {
    pub pointer: String,
}

/// One entry of the top-level `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorObject {
    pub id: String,
    pub status: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
}

/// A JSON:API error document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDocument {
    pub errors: Vec<ErrorObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jsonapi: Option<JsonApiObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

/// Convert a single or combined error into an error document.
pub fn error_to_document(
    error: impl Into<CombinedError>,
    options: &ErrorDocumentOptions,
) -> ErrorDocument {
    let combined = error.into();
    let errors = combined
        .errors
        .into_iter()
        .map(|err| ErrorObject {
            id: err.id,
            status: err.status.to_string(),
            title: err.title,
            description: err.description,
            source: err.pointer.map(|pointer| ErrorSource { pointer }),
        })
        .collect();

    ErrorDocument {
        errors,
        jsonapi: options.version.map(|version| JsonApiObject { version }),
        meta: options.meta.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JsonApiVersion;
    use serde_json::json;

    fn fixed(id: &str, pointer: Option<&str>) -> JsonApiError {
        JsonApiError {
            id: id.into(),
            title: "Validation Error".into(),
            description: "should be object".into(),
            status: 400,
            pointer: pointer.map(String::from),
        }
    }

    #[test]
    fn single_error() {
        let doc = error_to_document(fixed("abc", Some("/data")), &ErrorDocumentOptions::new());
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({
                "errors": [{
                    "id": "abc",
                    "status": "400",
                    "title": "Validation Error",
                    "description": "should be object",
                    "source": { "pointer": "/data" }
                }]
            })
        );
    }

    #[test]
    fn source_omitted_without_pointer() {
        let doc = error_to_document(fixed("abc", None), &ErrorDocumentOptions::new());
        let value = serde_json::to_value(&doc).unwrap();
        assert!(value["errors"][0].get("source").is_none());
    }

    #[test]
    fn combined_keeps_order() {
        let combined = CombinedError::new(422, vec![fixed("one", None), fixed("two", Some("/"))]);
        let doc = error_to_document(combined, &ErrorDocumentOptions::new());
        let ids: Vec<_> = doc.errors.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["one", "two"]);
        assert_eq!(doc.errors[0].status, "400");
    }

    #[test]
    fn version_and_meta() {
        let mut meta = Map::new();
        meta.insert("requestId".into(), json!("r-1"));
        let options = ErrorDocumentOptions::new()
            .version(JsonApiVersion::V1_0)
            .meta(meta);

        let value = serde_json::to_value(fixed("abc", None).to_document(&options)).unwrap();
        assert_eq!(value["jsonapi"], json!({ "version": "1.0" }));
        assert_eq!(value["meta"], json!({ "requestId": "r-1" }));
    }

    #[test]
    fn validation_errors_get_unique_ids() {
        let combined = CombinedError::validation(vec![
            Violation {
                pointer: "/data".into(),
                message: "should have required property 'type'".into(),
            },
            Violation {
                pointer: "/data/attributes".into(),
                message: "should be object".into(),
            },
        ]);
        assert_eq!(combined.status, 400);
        assert_eq!(combined.errors[0].title, VALIDATION_TITLE);
        assert_ne!(combined.errors[0].id, combined.errors[1].id);
        assert_eq!(combined.errors[1].pointer.as_deref(), Some("/data/attributes"));
    }
}
