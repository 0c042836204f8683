//! Schema derivation - builds the JSON Schema an inbound document must satisfy.

use serde_json::{json, Map, Value};

use crate::error::RegistryError;
use crate::registry::{Cardinality, Registry, ResourceDescriptor};

/// Build the schema for a single resource object of `descriptor`'s type.
///
/// When `enforce_required` is set, attributes and relationships that are marked
/// required at registration or named in `required` must be present, and so must
/// the `attributes`/`relationships` members that contain them.
///
/// # Errors
///
/// Returns `RegistryError::NotRegistered` if a relationship targets an
/// unregistered type.
pub fn build_schema(
    registry: &Registry,
    descriptor: &ResourceDescriptor,
    enforce_required: bool,
    required: &[String],
) -> Result<Value, RegistryError> {
    let is_required = |marked: bool, name: &str| {
        enforce_required && (marked || required.iter().any(|r| r == name))
    };

    let mut attribute_properties = Map::new();
    let mut required_attributes = Vec::new();
    for attribute in descriptor.attributes() {
        let constraint = match attribute.schema() {
            Some(custom) => nullable(custom.clone()),
            None => json!({}),
        };
        attribute_properties.insert(attribute.wire_name().to_string(), constraint);
        if is_required(attribute.required(), attribute.wire_name()) {
            required_attributes.push(attribute.wire_name().to_string());
        }
    }

    let mut relationship_properties = Map::new();
    let mut required_relationships = Vec::new();
    for relationship in descriptor.relationships() {
        let target = registry.target_of(relationship)?;
        let identifier = identifier_schema(target.wire_type());
        let data = match relationship.cardinality() {
            Cardinality::ToOne => nullable(identifier),
            Cardinality::ToMany => json!({ "type": "array", "items": identifier }),
        };
        let constraint = nullable(json!({
            "type": "object",
            "required": ["data"],
            "properties": { "data": data }
        }));
        relationship_properties.insert(relationship.wire_name().to_string(), constraint);
        if is_required(relationship.required(), relationship.wire_name()) {
            required_relationships.push(relationship.wire_name().to_string());
        }
    }

    let mut resource_required = vec!["type".to_string()];
    if !required_attributes.is_empty() {
        resource_required.push("attributes".to_string());
    }
    if !required_relationships.is_empty() {
        resource_required.push("relationships".to_string());
    }

    Ok(json!({
        "type": "object",
        "required": resource_required,
        "properties": {
            "id": { "type": "string" },
            "type": { "type": "string", "enum": [descriptor.wire_type()] },
            "attributes": object_schema(attribute_properties, required_attributes),
            "relationships": object_schema(relationship_properties, required_relationships)
        }
    }))
}

/// Wrap a resource schema into a top-level document schema.
///
/// With `many`, `data` must be an array of resources instead of a single one.
pub fn document_schema(resource_schema: Value, many: bool) -> Value {
    let data = if many {
        json!({ "type": "array", "items": resource_schema })
    } else {
        resource_schema
    };

    json!({
        "type": "object",
        "required": ["data"],
        "properties": { "data": data }
    })
}

fn identifier_schema(wire_type: &str) -> Value {
    json!({
        "type": "object",
        "required": ["id", "type"],
        "properties": {
            "id": { "type": "string" },
            "type": { "type": "string", "enum": [wire_type] }
        }
    })
}

fn object_schema(properties: Map<String, Value>, required: Vec<String>) -> Value {
    let mut schema = Map::new();
    schema.insert("type".to_string(), json!("object"));
    if !required.is_empty() {
        schema.insert("required".to_string(), json!(required));
    }
    schema.insert("properties".to_string(), Value::Object(properties));
    Value::Object(schema)
}

/// Accept `null` in addition to `schema`. Non-null values report the inner
/// schema's violations unchanged.
fn nullable(schema: Value) -> Value {
    json!({
        "if": { "type": "null" },
        "else": schema
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{AttributeOptions, RelationshipOptions, ResourceBuilder};
    use serde::Serialize;

    #[derive(Debug, Default, Serialize)]
    struct Person {
        id: Option<String>,
    }

    #[derive(Debug, Default, Serialize)]
    struct Post {
        id: Option<String>,
        title: Option<String>,
        deck: Option<String>,
        author: Option<Person>,
        editors: Option<Vec<Person>>,
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register(ResourceBuilder::new("person", "/people", |id| Person { id }, |p| &p.id))
            .unwrap()
            .register(
                ResourceBuilder::new(
                    "post",
                    "/posts",
                    |id| Post {
                        id,
                        ..Default::default()
                    },
                    |p| &p.id,
                )
                .attribute_with(
                    "title",
                    |p| &p.title,
                    |p| &mut p.title,
                    AttributeOptions::new().required().schema(json!({ "type": "string" })),
                )
                .attribute("deck", |p| &p.deck, |p| &mut p.deck)
                .to_one_with(
                    "author",
                    |p| p.author.as_ref(),
                    |p, v| p.author = Some(v),
                    RelationshipOptions::new().required(),
                )
                .to_many("editors", |p| p.editors.as_deref(), |p, v| p.editors = Some(v)),
            )
            .unwrap();
        registry
    }

    #[test]
    fn resource_schema_shape() {
        let registry = registry();
        let post = registry.lookup::<Post>().unwrap();
        let schema = build_schema(&registry, post, false, &[]).unwrap();

        assert_eq!(schema["required"], json!(["type"]));
        assert_eq!(schema["properties"]["type"]["enum"], json!(["post"]));
        assert_eq!(schema["properties"]["attributes"]["properties"]["deck"], json!({}));
        assert_eq!(
            schema["properties"]["attributes"]["properties"]["title"],
            json!({ "if": { "type": "null" }, "else": { "type": "string" } })
        );
        assert!(schema["properties"]["attributes"].get("required").is_none());
    }

    #[test]
    fn relationship_linkage_schemas() {
        let registry = registry();
        let post = registry.lookup::<Post>().unwrap();
        let schema = build_schema(&registry, post, false, &[]).unwrap();
        let relationships = &schema["properties"]["relationships"]["properties"];

        let author_data = &relationships["author"]["else"]["properties"]["data"];
        assert_eq!(author_data["else"]["properties"]["type"]["enum"], json!(["person"]));

        let editors_data = &relationships["editors"]["else"]["properties"]["data"];
        assert_eq!(editors_data["type"], json!("array"));
        assert_eq!(editors_data["items"]["required"], json!(["id", "type"]));
    }

    #[test]
    fn required_members_propagate() {
        let registry = registry();
        let post = registry.lookup::<Post>().unwrap();
        let schema = build_schema(&registry, post, true, &["deck".to_string()]).unwrap();

        assert_eq!(schema["required"], json!(["type", "attributes", "relationships"]));
        assert_eq!(
            schema["properties"]["attributes"]["required"],
            json!(["title", "deck"])
        );
        assert_eq!(
            schema["properties"]["relationships"]["required"],
            json!(["author"])
        );
    }

    #[test]
    fn unregistered_target() {
        let mut registry = Registry::new();
        registry
            .register(
                ResourceBuilder::new(
                    "post",
                    "/posts",
                    |id| Post {
                        id,
                        ..Default::default()
                    },
                    |p| &p.id,
                )
                .to_one("author", |p| p.author.as_ref(), |p, v| p.author = Some(v)),
            )
            .unwrap();
        let post = registry.lookup::<Post>().unwrap();
        assert!(matches!(
            build_schema(&registry, post, false, &[]),
            Err(RegistryError::NotRegistered { .. })
        ));
    }

    #[test]
    fn document_wrapping() {
        let single = document_schema(json!({ "type": "object" }), false);
        assert_eq!(single["properties"]["data"], json!({ "type": "object" }));

        let many = document_schema(json!({ "type": "object" }), true);
        assert_eq!(many["properties"]["data"]["type"], json!("array"));
        assert_eq!(many["required"], json!(["data"]));
    }
}
