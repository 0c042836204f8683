//! JSON:API Marshal
//!
//! Maps typed object graphs to and from JSON:API documents.
//!
//! Resource types are registered once in a [`Registry`]. The registry then drives
//! [`serialize`] (object graph to compound document, with `include` paths, sparse
//! fieldsets and deduplicated `included` resources) and [`deserialize`] (schema
//! validated document to typed object, with identity-only relationship stubs).
//!
//! # Example
//!
//! ```
//! use jsonapi_marshal::{serialize, Registry, ResourceBuilder, SerializeOptions};
//! use serde::Serialize;
//! use serde_json::json;
//!
//! #[derive(Serialize)]
//! struct Greeting {
//!     id: Option<String>,
//!     message: Option<String>,
//! }
//!
//! let mut registry = Registry::new();
//! registry
//!     .register(
//!         ResourceBuilder::new(
//!             "greeting",
//!             "/greetings",
//!             |id| Greeting { id, message: None },
//!             |g| &g.id,
//!         )
//!         .attribute("message", |g| &g.message, |g| &mut g.message),
//!     )
//!     .unwrap();
//!
//! let greeting = Greeting {
//!     id: Some("abc-123".into()),
//!     message: Some("Hello, world!".into()),
//! };
//! let document = serialize(&registry, &greeting, &SerializeOptions::new()).unwrap();
//!
//! assert_eq!(
//!     serde_json::to_value(&document).unwrap(),
//!     json!({
//!         "data": {
//!             "id": "abc-123",
//!             "type": "greeting",
//!             "attributes": { "message": "Hello, world!" },
//!             "links": { "self": "/greetings/abc-123" }
//!         }
//!     })
//! );
//! ```
//!
//! # Inbound Violations
//!
//! | Problem | Description | Pointer |
//! |---------|-------------|---------|
//! | `data` is not an object | `should be object` | `/data` |
//! | wrong resource type | `should be 'post'` | `/data/type` |
//! | required attribute missing | `should have required property 'title'` | `/data/attributes` |
//! | enum attribute mismatch | `should be one of ['a', 'b']` | `/data/attributes/<name>` |

mod api_error;
mod deserializer;
mod document;
mod error;
mod linter;
mod loader;
mod registry;
mod schema;
mod serializer;
mod types;
mod validator;

pub use api_error::{
    error_to_document, CombinedError, ErrorDocument, ErrorObject, ErrorSource, JsonApiError,
    VALIDATION_TITLE,
};
pub use deserializer::{deserialize, deserialize_many, Deserializer};
pub use document::{
    Document, Linkage, PrimaryData, RelationshipLinks, RelationshipObject, Relationships,
    ResourceIdentifier, ResourceLinks, ResourceObject,
};
pub use error::{DeserializeError, LoadError, RegistryError, SerializeError, Violation};
pub use linter::{
    lint, lint_document, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity,
    LINT_TITLE,
};
pub use loader::{load_document, load_document_str};
pub use registry::{
    AttributeDescriptor, AttributeOptions, Cardinality, Related, Registry, RelationshipDescriptor,
    RelationshipOptions, ResourceBuilder, ResourceDescriptor,
};
pub use schema::{build_schema, document_schema};
pub use serializer::{serialize, serialize_list, serialize_many};
pub use types::{
    is_valid_member_name, DeserializeOptions, ErrorDocumentOptions, JsonApiObject, JsonApiVersion,
    SerializeOptions,
};
pub use validator::{validate_against_schema, JsonSchemaEvaluator, SchemaEvaluator};
