//! Outbound JSON:API document model.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::types::JsonApiObject;

/// A compound document: primary data plus deduplicated `included` resources.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub data: PrimaryData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub included: Option<Vec<ResourceObject>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jsonapi: Option<JsonApiObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

impl Document {
    /// Included resources, empty when none were requested.
    pub fn included(&self) -> &[ResourceObject] {
        self.included.as_deref().unwrap_or_default()
    }
}

/// Top-level `data`: one resource or an ordered list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PrimaryData {
    One(ResourceObject),
    Many(Vec<ResourceObject>),
}

/// A serialized resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceObject {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Relationships>,
    pub links: ResourceLinks,
}

impl ResourceObject {
    pub fn identifier(&self) -> ResourceIdentifier {
        ResourceIdentifier {
            id: self.id.clone(),
            resource_type: self.resource_type.clone(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.as_ref()?.get(name)
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipObject> {
        self.relationships.as_ref()?.get(name)
    }
}

/// `links` of a resource object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceLinks {
    #[serde(rename = "self")]
    pub self_link: String,
}

/// Relationship members in registration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Relationships(Vec<(String, RelationshipObject)>);

impl Relationships {
    pub fn get(&self, name: &str) -> Option<&RelationshipObject> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn push(&mut self, name: String, relationship: RelationshipObject) {
        self.0.push((name, relationship));
    }
}

impl Serialize for Relationships {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, relationship) in &self.0 {
            map.serialize_entry(name, relationship)?;
        }
        map.end()
    }
}

/// A relationship member: linkage plus optional links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipObject {
    pub data: Linkage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<RelationshipLinks>,
}

/// Resource linkage: `null`/identifier for to-one, an array for to-many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Linkage {
    One(Option<ResourceIdentifier>),
    Many(Vec<ResourceIdentifier>),
}

/// `links` of a relationship member.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RelationshipLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related: Option<String>,
    #[serde(rename = "self", skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
}

/// The `(type, id)` pair identifying a resource on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ResourceIdentifier {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
}
