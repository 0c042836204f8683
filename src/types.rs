//! Core types shared by the serializer and deserializer.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default cap on nested inclusion levels during serialization.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Check a JSON:API member name: alphanumeric first and last character,
/// with `_` and `-` allowed in between.
pub fn is_valid_member_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return false;
    };

    first.is_ascii_alphanumeric()
        && last.is_ascii_alphanumeric()
        && bytes
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || *b == b'_' || *b == b'-')
}

/// Supported values of the top-level `jsonapi.version` member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JsonApiVersion {
    #[serde(rename = "1.0")]
    V1_0,
    #[serde(rename = "1.1")]
    V1_1,
}

impl JsonApiVersion {
    /// Parse a version string.
    ///
    /// Returns `None` for anything other than `"1.0"` or `"1.1"`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1.0" => Some(JsonApiVersion::V1_0),
            "1.1" => Some(JsonApiVersion::V1_1),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JsonApiVersion::V1_0 => "1.0",
            JsonApiVersion::V1_1 => "1.1",
        }
    }
}

/// The top-level `jsonapi` member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonApiObject {
    pub version: JsonApiVersion,
}

/// Options for serializing a resource or a list of resources.
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// Prefix for every generated link.
    pub base_url: String,
    /// Dotted relationship paths to expand into `included`.
    pub include: Vec<String>,
    /// Sparse fieldsets: wire type to the member names emitted for it.
    pub fields: BTreeMap<String, BTreeSet<String>>,
    pub version: Option<JsonApiVersion>,
    pub meta: Option<Map<String, Value>>,
    /// Maximum number of nested inclusion levels before serialization fails.
    pub max_depth: usize,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            include: Vec::new(),
            fields: BTreeMap::new(),
            version: None,
            meta: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl SerializeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Add include paths such as `"author"` or `"comments.author"`.
    pub fn include<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Restrict the members emitted for resources of `wire_type`.
    pub fn fields<I, S>(mut self, wire_type: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields
            .entry(wire_type.into())
            .or_default()
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn version(mut self, version: JsonApiVersion) -> Self {
        self.version = Some(version);
        self
    }

    pub fn meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Whether `name` survives the sparse fieldset configured for `wire_type`.
    pub(crate) fn selects(&self, wire_type: &str, name: &str) -> bool {
        self.fields
            .get(wire_type)
            .map(|names| names.contains(name))
            .unwrap_or(true)
    }
}

/// Options for deserializing an inbound document.
#[derive(Debug, Clone, Default)]
pub struct DeserializeOptions {
    /// Wire names of attributes and relationships that must be present.
    /// A non-empty list also enforces members marked required at registration.
    pub required: Vec<String>,
}

impl DeserializeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(names.into_iter().map(Into::into));
        self
    }

    pub(crate) fn enforce_required(&self) -> bool {
        !self.required.is_empty()
    }
}

/// Options for rendering an error document.
#[derive(Debug, Clone, Default)]
pub struct ErrorDocumentOptions {
    pub version: Option<JsonApiVersion>,
    pub meta: Option<Map<String, Value>>,
}

impl ErrorDocumentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(mut self, version: JsonApiVersion) -> Self {
        self.version = Some(version);
        self
    }

    pub fn meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = Some(meta);
        self
    }
}
