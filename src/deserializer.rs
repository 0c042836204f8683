//! Deserialization - validates inbound documents and rebuilds typed resources.
//!
//! Related resources are never resolved: every relationship becomes an
//! identity-only stub built by the target type's constructor.

use std::any::{type_name, Any};

use serde_json::{Map, Value};
use tracing::debug;

use crate::api_error::CombinedError;
use crate::error::{DeserializeError, RegistryError, Violation};
use crate::registry::{Cardinality, Registry, RelationshipDescriptor, ResourceDescriptor, Stubs};
use crate::schema::{build_schema, document_schema};
use crate::types::DeserializeOptions;
use crate::validator::{JsonSchemaEvaluator, SchemaEvaluator};

/// Deserialize a document whose `data` is a single resource of type `T`.
///
/// # Errors
///
/// Returns `DeserializeError::Invalid` with every violation found, or a registry
/// error if `T` (or a relationship target) is not registered.
pub fn deserialize<T: Any>(
    registry: &Registry,
    document: &Value,
    options: &DeserializeOptions,
) -> Result<T, DeserializeError> {
    Deserializer::new(registry).deserialize(document, options)
}

/// Deserialize a document whose `data` is an array of resources of type `T`.
pub fn deserialize_many<T: Any>(
    registry: &Registry,
    document: &Value,
    options: &DeserializeOptions,
) -> Result<Vec<T>, DeserializeError> {
    Deserializer::new(registry).deserialize_many(document, options)
}

/// Inbound path with a pluggable schema evaluator.
pub struct Deserializer<'r, E = JsonSchemaEvaluator> {
    registry: &'r Registry,
    evaluator: E,
}

impl<'r> Deserializer<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            evaluator: JsonSchemaEvaluator,
        }
    }
}

impl<'r, E: SchemaEvaluator> Deserializer<'r, E> {
    pub fn with_evaluator<F: SchemaEvaluator>(self, evaluator: F) -> Deserializer<'r, F> {
        Deserializer {
            registry: self.registry,
            evaluator,
        }
    }

    pub fn deserialize<T: Any>(
        &self,
        document: &Value,
        options: &DeserializeOptions,
    ) -> Result<T, DeserializeError> {
        let descriptor = self.registry.lookup::<T>()?;
        self.validate(document, descriptor, options, false)?;

        let mut violations = Vec::new();
        let resource = self.reconstruct(descriptor, &document["data"], "/data", &mut violations)?;
        reject(descriptor, violations)?;

        debug!(wire_type = descriptor.wire_type(), "deserialized resource");
        downcast(resource)
    }

    pub fn deserialize_many<T: Any>(
        &self,
        document: &Value,
        options: &DeserializeOptions,
    ) -> Result<Vec<T>, DeserializeError> {
        let descriptor = self.registry.lookup::<T>()?;
        self.validate(document, descriptor, options, true)?;

        let items = document["data"].as_array().map(Vec::as_slice).unwrap_or(&[]);
        let mut violations = Vec::new();
        let mut resources = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let pointer = format!("/data/{}", index);
            resources.push(self.reconstruct(descriptor, item, &pointer, &mut violations)?);
        }
        reject(descriptor, violations)?;

        debug!(
            wire_type = descriptor.wire_type(),
            count = resources.len(),
            "deserialized resources"
        );
        resources.into_iter().map(downcast::<T>).collect()
    }

    fn validate(
        &self,
        document: &Value,
        descriptor: &ResourceDescriptor,
        options: &DeserializeOptions,
        many: bool,
    ) -> Result<(), DeserializeError> {
        let resource_schema = build_schema(
            self.registry,
            descriptor,
            options.enforce_required(),
            &options.required,
        )?;
        let schema = document_schema(resource_schema, many);
        let violations = self.evaluator.evaluate(&schema, document)?;
        reject(descriptor, violations)
    }

    fn reconstruct(
        &self,
        descriptor: &ResourceDescriptor,
        resource: &Value,
        pointer: &str,
        violations: &mut Vec<Violation>,
    ) -> Result<Box<dyn Any>, DeserializeError> {
        let id = resource.get("id").and_then(Value::as_str).map(String::from);
        let mut result = descriptor.construct(id);

        if let Some(Value::Object(attributes)) = resource.get("attributes") {
            for attribute in descriptor.attributes() {
                let Some(value) = attributes.get(attribute.wire_name()) else {
                    continue;
                };
                match attribute.write(&mut *result, value.clone()) {
                    Some(Ok(())) => {}
                    Some(Err(e)) => violations.push(Violation {
                        pointer: format!("{}/attributes/{}", pointer, attribute.wire_name()),
                        message: e.to_string(),
                    }),
                    None => return Err(mismatch(descriptor.type_name())),
                }
            }
        }

        if let Some(Value::Object(relationships)) = resource.get("relationships") {
            for relationship in descriptor.relationships() {
                self.assign_stubs(relationship, relationships, &mut *result)?;
            }
        }

        Ok(result)
    }

    fn assign_stubs(
        &self,
        relationship: &RelationshipDescriptor,
        relationships: &Map<String, Value>,
        resource: &mut dyn Any,
    ) -> Result<(), DeserializeError> {
        let Some(data) = relationships
            .get(relationship.wire_name())
            .and_then(|member| member.get("data"))
        else {
            return Ok(());
        };
        let target = self.registry.target_of(relationship)?;
        let stub = |identifier: &Value| {
            let id = identifier.get("id").and_then(Value::as_str).map(String::from);
            target.construct(id)
        };

        let stubs = match (relationship.cardinality(), data) {
            (Cardinality::ToOne, Value::Object(_)) => Stubs::One(stub(data)),
            (Cardinality::ToMany, Value::Array(items)) => {
                Stubs::Many(items.iter().map(stub).collect())
            }
            _ => return Ok(()),
        };

        relationship
            .assign(resource, stubs)
            .ok_or_else(|| mismatch(relationship.target_name()))
    }
}

fn reject(descriptor: &ResourceDescriptor, violations: Vec<Violation>) -> Result<(), DeserializeError> {
    if violations.is_empty() {
        return Ok(());
    }
    debug!(
        wire_type = descriptor.wire_type(),
        violations = violations.len(),
        "rejected inbound document"
    );
    Err(DeserializeError::Invalid(CombinedError::validation(violations)))
}

fn downcast<T: Any>(resource: Box<dyn Any>) -> Result<T, DeserializeError> {
    resource
        .downcast::<T>()
        .map(|r| *r)
        .map_err(|_| mismatch(type_name::<T>()))
}

fn mismatch(type_name: &str) -> DeserializeError {
    DeserializeError::Registry(RegistryError::NotRegistered {
        type_name: type_name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ResourceBuilder;
    use serde::Serialize;
    use serde_json::json;

    #[derive(Debug, Default, Serialize)]
    struct Tag {
        id: Option<String>,
        label: Option<String>,
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register(
                ResourceBuilder::new(
                    "tag",
                    "/tags",
                    |id| Tag {
                        id,
                        ..Default::default()
                    },
                    |t| &t.id,
                )
                .attribute("label", |t| &t.label, |t| &mut t.label),
            )
            .unwrap();
        registry
    }

    struct RejectAll;

    impl SchemaEvaluator for RejectAll {
        fn evaluate(&self, _: &Value, _: &Value) -> Result<Vec<Violation>, DeserializeError> {
            Ok(vec![Violation {
                pointer: "/".into(),
                message: "rejected".into(),
            }])
        }
    }

    #[test]
    fn uses_custom_evaluator() {
        let registry = registry();
        let result = Deserializer::new(&registry)
            .with_evaluator(RejectAll)
            .deserialize::<Tag>(&json!({ "data": { "type": "tag" } }), &DeserializeOptions::new());

        match result {
            Err(DeserializeError::Invalid(combined)) => {
                assert_eq!(combined.errors[0].description, "rejected");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn unconvertible_attribute_is_a_violation() {
        let registry = registry();
        let result = deserialize::<Tag>(
            &registry,
            &json!({ "data": { "type": "tag", "attributes": { "label": 42 } } }),
            &DeserializeOptions::new(),
        );

        match result {
            Err(DeserializeError::Invalid(combined)) => {
                assert_eq!(combined.errors.len(), 1);
                assert_eq!(
                    combined.errors[0].pointer.as_deref(),
                    Some("/data/attributes/label")
                );
            }
            other => panic!("expected invalid attribute, got {:?}", other),
        }
    }

    #[test]
    fn violations_in_arrays_carry_index() {
        let registry = registry();
        let result = deserialize_many::<Tag>(
            &registry,
            &json!({ "data": [
                { "type": "tag", "attributes": { "label": "ok" } },
                { "type": "tag", "attributes": { "label": [] } }
            ] }),
            &DeserializeOptions::new(),
        );

        match result {
            Err(DeserializeError::Invalid(combined)) => assert_eq!(
                combined.errors[0].pointer.as_deref(),
                Some("/data/1/attributes/label")
            ),
            other => panic!("expected invalid attribute, got {:?}", other),
        }
    }

    #[test]
    fn unregistered_target_type() {
        let registry = Registry::new();
        let result = deserialize::<Tag>(
            &registry,
            &json!({ "data": { "type": "tag" } }),
            &DeserializeOptions::new(),
        );
        assert!(matches!(
            result,
            Err(DeserializeError::Registry(RegistryError::NotRegistered { .. }))
        ));
    }
}
