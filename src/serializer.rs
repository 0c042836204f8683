//! Serialization - turns registered object graphs into compound documents.

use std::any::{type_name, Any};
use std::collections::HashSet;

use serde_json::Map;
use tracing::{debug, trace};

use crate::document::{
    Document, Linkage, PrimaryData, RelationshipLinks, RelationshipObject, Relationships,
    ResourceIdentifier, ResourceLinks, ResourceObject,
};
use crate::error::SerializeError;
use crate::registry::{Related, Registry, RelationshipDescriptor, ResourceDescriptor};
use crate::types::{JsonApiObject, SerializeOptions};

/// Serialize a single resource.
///
/// # Errors
///
/// Returns `SerializeError::NotAResource` if `resource` (or any included resource)
/// has no registered descriptor, `SerializeError::CyclicInclude` if the include
/// paths nest deeper than `options.max_depth`, or a registry error for identities
/// that are not strings.
pub fn serialize<T: Any>(
    registry: &Registry,
    resource: &T,
    options: &SerializeOptions,
) -> Result<Document, SerializeError> {
    let walker = Walker { registry, options };
    let (data, included) =
        walker.resource(resource, type_name::<T>(), &options.include, "", 0)?;
    Ok(walker.finish(PrimaryData::One(data), included))
}

/// Serialize a list of resources of one type, preserving order.
pub fn serialize_many<T: Any>(
    registry: &Registry,
    resources: &[T],
    options: &SerializeOptions,
) -> Result<Document, SerializeError> {
    let walker = Walker { registry, options };
    let mut data = Vec::with_capacity(resources.len());
    let mut included = Vec::new();

    for resource in resources {
        let (single, nested) =
            walker.resource(resource, type_name::<T>(), &options.include, "", 0)?;
        data.push(single);
        included.extend(nested);
    }

    Ok(walker.finish(PrimaryData::Many(data), included))
}

/// Serialize a list of resources that may differ in type.
pub fn serialize_list(
    registry: &Registry,
    resources: &[&dyn Any],
    options: &SerializeOptions,
) -> Result<Document, SerializeError> {
    let walker = Walker { registry, options };
    let mut data = Vec::with_capacity(resources.len());
    let mut included = Vec::new();

    for resource in resources {
        let (single, nested) =
            walker.resource(*resource, "dyn Any", &options.include, "", 0)?;
        data.push(single);
        included.extend(nested);
    }

    Ok(walker.finish(PrimaryData::Many(data), included))
}

struct Walker<'a> {
    registry: &'a Registry,
    options: &'a SerializeOptions,
}

impl Walker<'_> {
    fn finish(&self, data: PrimaryData, included: Vec<ResourceObject>) -> Document {
        let included = dedup(included);
        debug!(included = included.len(), "serialized document");

        Document {
            data,
            included: (!included.is_empty()).then_some(included),
            jsonapi: self.options.version.map(|version| JsonApiObject { version }),
            meta: self.options.meta.clone(),
        }
    }

    /// Serialize one resource, returning it and everything it includes.
    fn resource(
        &self,
        resource: &dyn Any,
        type_name: &str,
        include: &[String],
        trail: &str,
        depth: usize,
    ) -> Result<(ResourceObject, Vec<ResourceObject>), SerializeError> {
        let descriptor = self.descriptor(resource, type_name)?;
        let wire_type = descriptor.wire_type();
        let id = descriptor.identity_of(resource)?;
        let self_url = format!(
            "{}{}/{}",
            self.options.base_url,
            descriptor.base_path(),
            id
        );
        trace!(wire_type, id = %id, depth, "serializing resource");

        let mut attributes = Map::new();
        for attribute in descriptor.attributes() {
            if !self.options.selects(wire_type, attribute.wire_name()) {
                continue;
            }
            let value = attribute
                .read(resource)
                .ok_or_else(|| not_a_resource(descriptor.type_name()))?
                .map_err(|source| SerializeError::Attribute {
                    wire_type: wire_type.to_string(),
                    name: attribute.wire_name().to_string(),
                    source,
                })?;
            attributes.insert(attribute.wire_name().to_string(), value);
        }

        let mut relationships = Relationships::default();
        let mut included = Vec::new();
        for relationship in descriptor.relationships() {
            let name = relationship.wire_name();
            if !self.options.selects(wire_type, name) {
                continue;
            }
            let related = relationship
                .related(resource)
                .ok_or_else(|| not_a_resource(descriptor.type_name()))?;

            relationships.push(
                name.to_string(),
                RelationshipObject {
                    data: self.linkage(relationship, &related)?,
                    links: relationship_links(relationship, &self_url),
                },
            );

            if !includes(include, name) {
                continue;
            }
            let path = if trail.is_empty() {
                name.to_string()
            } else {
                format!("{}.{}", trail, name)
            };
            if depth >= self.options.max_depth {
                return Err(SerializeError::CyclicInclude {
                    path,
                    max_depth: self.options.max_depth,
                });
            }

            let nested_include = narrow(include, name);
            let targets = match related {
                Related::One(Some(target)) => vec![target],
                Related::One(None) => Vec::new(),
                Related::Many(targets) => targets,
            };
            for target in targets {
                let (data, nested) = self.resource(
                    target,
                    relationship.target_name(),
                    &nested_include,
                    &path,
                    depth + 1,
                )?;
                included.push(data);
                included.extend(nested);
            }
        }

        let object = ResourceObject {
            id,
            resource_type: wire_type.to_string(),
            attributes: (!attributes.is_empty()).then_some(attributes),
            relationships: (!relationships.is_empty()).then_some(relationships),
            links: ResourceLinks { self_link: self_url },
        };
        Ok((object, included))
    }

    fn linkage(
        &self,
        relationship: &RelationshipDescriptor,
        related: &Related<'_>,
    ) -> Result<Linkage, SerializeError> {
        match related {
            Related::One(None) => Ok(Linkage::One(None)),
            Related::One(Some(target)) => Ok(Linkage::One(Some(
                self.identifier(*target, relationship.target_name())?,
            ))),
            Related::Many(targets) => targets
                .iter()
                .map(|target| self.identifier(*target, relationship.target_name()))
                .collect::<Result<Vec<_>, _>>()
                .map(Linkage::Many),
        }
    }

    fn identifier(
        &self,
        resource: &dyn Any,
        type_name: &str,
    ) -> Result<ResourceIdentifier, SerializeError> {
        let descriptor = self.descriptor(resource, type_name)?;
        Ok(ResourceIdentifier {
            id: descriptor.identity_of(resource)?,
            resource_type: descriptor.wire_type().to_string(),
        })
    }

    fn descriptor(
        &self,
        resource: &dyn Any,
        type_name: &str,
    ) -> Result<&ResourceDescriptor, SerializeError> {
        self.registry
            .descriptor_of(resource)
            .ok_or_else(|| not_a_resource(type_name))
    }
}

fn not_a_resource(type_name: &str) -> SerializeError {
    SerializeError::NotAResource {
        type_name: type_name.to_string(),
    }
}

fn relationship_links(
    relationship: &RelationshipDescriptor,
    self_url: &str,
) -> Option<RelationshipLinks> {
    if !relationship.related_link() && !relationship.self_link() {
        return None;
    }
    let name = relationship.wire_name();
    Some(RelationshipLinks {
        related: relationship
            .related_link()
            .then(|| format!("{}/{}", self_url, name)),
        self_link: relationship
            .self_link()
            .then(|| format!("{}/relationships/{}", self_url, name)),
    })
}

/// Whether some include path names `name` as its first segment.
fn includes(include: &[String], name: &str) -> bool {
    include.iter().any(|path| {
        path == name
            || path
                .strip_prefix(name)
                .map_or(false, |rest| rest.starts_with('.'))
    })
}

/// Include paths below `name`, with the `name.` prefix removed.
fn narrow(include: &[String], name: &str) -> Vec<String> {
    include
        .iter()
        .filter_map(|path| path.strip_prefix(name)?.strip_prefix('.'))
        .map(String::from)
        .collect()
}

/// Keep the first resource for every `(type, id)` pair.
fn dedup(included: Vec<ResourceObject>) -> Vec<ResourceObject> {
    let mut seen = HashSet::new();
    included
        .into_iter()
        .filter(|r| seen.insert((r.resource_type.clone(), r.id.clone())))
        .collect()
}
