//! Inbound document validation against derived schemas.

use jsonschema::error::{TypeKind, ValidationErrorKind};
use jsonschema::ValidationError;
use serde_json::Value;

use crate::api_error::CombinedError;
use crate::error::{DeserializeError, Violation};

/// Evaluates a JSON Schema against an instance.
///
/// Implementations must report every violation, not just the first.
pub trait SchemaEvaluator {
    /// Returns an empty list when `instance` conforms to `schema`.
    ///
    /// # Errors
    ///
    /// Returns `DeserializeError::InvalidSchema` if the schema cannot be compiled.
    fn evaluate(&self, schema: &Value, instance: &Value) -> Result<Vec<Violation>, DeserializeError>;
}

/// [`SchemaEvaluator`] backed by the `jsonschema` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaEvaluator;

impl SchemaEvaluator for JsonSchemaEvaluator {
    fn evaluate(&self, schema: &Value, instance: &Value) -> Result<Vec<Violation>, DeserializeError> {
        let validator =
            jsonschema::validator_for(schema).map_err(|e| DeserializeError::InvalidSchema {
                message: e.to_string(),
            })?;

        Ok(validator
            .iter_errors(instance)
            .map(|e| Violation {
                pointer: pointer_from_path(&e.instance_path.to_string()),
                message: message_from_error(&e),
            })
            .collect())
    }
}

/// Validate an instance against a schema with the default evaluator.
///
/// # Errors
///
/// Returns `DeserializeError::InvalidSchema` if the schema cannot be compiled, or
/// `DeserializeError::Invalid` with one entry per violation.
pub fn validate_against_schema(schema: &Value, instance: &Value) -> Result<(), DeserializeError> {
    let violations = JsonSchemaEvaluator.evaluate(schema, instance)?;
    if violations.is_empty() {
        Ok(())
    } else {
        Err(DeserializeError::Invalid(CombinedError::validation(violations)))
    }
}

/// Render a violation in the `should be ...` form clients expect.
fn message_from_error(error: &ValidationError<'_>) -> String {
    match &error.kind {
        ValidationErrorKind::Type {
            kind: TypeKind::Single(expected),
        } => format!("should be {}", expected),
        ValidationErrorKind::Type {
            kind: TypeKind::Multiple(types),
        } => format!(
            "should be {}",
            types
                .into_iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(",")
        ),
        ValidationErrorKind::Required { property } => format!(
            "should have required property '{}'",
            display_value(property)
        ),
        ValidationErrorKind::Enum { options } => match options.as_array() {
            Some(values) if values.len() == 1 => {
                format!("should be '{}'", display_value(&values[0]))
            }
            Some(values) => format!(
                "should be one of [{}]",
                values
                    .iter()
                    .map(|v| format!("'{}'", display_value(v)))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            None => error.to_string(),
        },
        ValidationErrorKind::Constant { .. } => "should be equal to constant".to_string(),
        ValidationErrorKind::MinLength { limit } => {
            format!("should NOT be shorter than {} characters", limit)
        }
        ValidationErrorKind::MaxLength { limit } => {
            format!("should NOT be longer than {} characters", limit)
        }
        ValidationErrorKind::MinItems { limit } => {
            format!("should NOT have fewer than {} items", limit)
        }
        ValidationErrorKind::MaxItems { limit } => {
            format!("should NOT have more than {} items", limit)
        }
        ValidationErrorKind::Minimum { limit } => format!("should be >= {}", limit),
        ValidationErrorKind::Maximum { limit } => format!("should be <= {}", limit),
        ValidationErrorKind::ExclusiveMinimum { limit } => format!("should be > {}", limit),
        ValidationErrorKind::ExclusiveMaximum { limit } => format!("should be < {}", limit),
        ValidationErrorKind::Pattern { pattern } => {
            format!("should match pattern \"{}\"", pattern)
        }
        ValidationErrorKind::AdditionalProperties { .. } => {
            "should NOT have additional properties".to_string()
        }
        _ => error.to_string(),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The document root is reported as `/`.
fn pointer_from_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn violations(schema: Value, instance: Value) -> Vec<Violation> {
        JsonSchemaEvaluator.evaluate(&schema, &instance).unwrap()
    }

    #[test]
    fn valid_instance() {
        let schema = json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "required": ["name"]
        });
        assert!(validate_against_schema(&schema, &json!({ "name": "test" })).is_ok());
    }

    #[test]
    fn root_type_mismatch_points_at_root() {
        let found = violations(json!({ "type": "object" }), json!(false));
        assert_eq!(
            found,
            vec![Violation {
                pointer: "/".into(),
                message: "should be object".into(),
            }]
        );
    }

    #[test]
    fn missing_required_property() {
        let found = violations(
            json!({ "type": "object", "properties": { "data": {} }, "required": ["data"] }),
            json!({}),
        );
        assert_eq!(found[0].message, "should have required property 'data'");
        assert_eq!(found[0].pointer, "/");
    }

    #[test]
    fn single_enum_value() {
        let schema = json!({
            "type": "object",
            "properties": { "type": { "type": "string", "enum": ["post"] } }
        });
        let found = violations(schema, json!({ "type": "garbage" }));
        assert_eq!(found[0].message, "should be 'post'");
        assert_eq!(found[0].pointer, "/type");
    }

    #[test]
    fn multiple_enum_values() {
        let schema = json!({ "enum": ["jsonapi", "typescript", "api"] });
        let found = violations(schema, json!("garbage"));
        assert_eq!(found[0].message, "should be one of ['jsonapi', 'typescript', 'api']");
    }

    #[test]
    fn several_allowed_types() {
        // Types are listed in a fixed order, not schema order.
        let found = violations(json!({ "type": ["string", "number"] }), json!(true));
        assert_eq!(found[0].message, "should be number,string");
        assert_eq!(found[0].pointer, "/");
    }

    #[test]
    fn string_length_limits() {
        let schema = json!({
            "type": "object",
            "properties": {
                "code": { "type": "string", "minLength": 3 },
                "tag": { "type": "string", "maxLength": 4 }
            }
        });
        let found = violations(schema, json!({ "code": "ab", "tag": "longer" }));
        assert_eq!(found.len(), 2);
        assert!(found.contains(&Violation {
            pointer: "/code".into(),
            message: "should NOT be shorter than 3 characters".into(),
        }));
        assert!(found.contains(&Violation {
            pointer: "/tag".into(),
            message: "should NOT be longer than 4 characters".into(),
        }));
    }

    #[test]
    fn numeric_and_array_limits() {
        let found = violations(json!({ "minimum": 1 }), json!(0));
        assert_eq!(found[0].message, "should be >= 1");

        let found = violations(json!({ "exclusiveMaximum": 10 }), json!(10));
        assert_eq!(found[0].message, "should be < 10");

        let found = violations(json!({ "maxItems": 1 }), json!([1, 2]));
        assert_eq!(found[0].message, "should NOT have more than 1 items");
    }

    #[test]
    fn pattern_and_extra_properties() {
        let found = violations(json!({ "pattern": "^[a-z]+$" }), json!("ABC"));
        assert_eq!(found[0].message, r#"should match pattern "^[a-z]+$""#);

        let schema = json!({ "type": "object", "additionalProperties": false });
        let found = violations(schema, json!({ "stray": 1 }));
        assert_eq!(found[0].message, "should NOT have additional properties");
    }

    #[test]
    fn nested_pointer() {
        let schema = json!({
            "type": "object",
            "properties": {
                "items": { "type": "array", "items": { "type": "string" } }
            }
        });
        let found = violations(schema, json!({ "items": ["a", 2] }));
        assert_eq!(found[0].pointer, "/items/1");
        assert_eq!(found[0].message, "should be string");
    }

    #[test]
    fn collects_multiple_errors() {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "age": { "type": "number" }
            },
            "required": ["name", "age"]
        });
        match validate_against_schema(&schema, &json!({})) {
            Err(DeserializeError::Invalid(combined)) => assert_eq!(combined.errors.len(), 2),
            other => panic!("expected 2 violations, got {:?}", other),
        }
    }

    #[test]
    fn invalid_schema() {
        let result = JsonSchemaEvaluator.evaluate(&json!({ "type": 12 }), &json!(null));
        assert!(matches!(result, Err(DeserializeError::InvalidSchema { .. })));
    }
}
