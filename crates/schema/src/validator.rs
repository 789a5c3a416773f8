use std::fmt;
use std::sync::Arc;

use jsonschema::error::{TypeKind, ValidationErrorKind};
use jsonschema::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::Schema;

/// One broken constraint.
///
/// Serializes as `{"instancePath": "/amount", "message": "must be number"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// JSON Pointer to the offending value; the root is `""`.
    #[serde(rename = "instancePath")]
    pub instance_path: String,
    pub message: String,
}

impl Violation {
    pub fn new(instance_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            instance_path: instance_path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{} {}", self.instance_path, self.message)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(Vec<Violation>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            ValidationResult::Valid => &[],
            ValidationResult::Invalid(violations) => violations,
        }
    }
}

/// Validates candidate records against one shared, immutable schema.
///
/// Cloning is cheap; every clone reads the same compiled schema.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    schema: Arc<Schema>,
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new(Schema::normalized_record())
    }
}

/// Report position of one violation. Derived ordering is report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
    Required(usize),
    Property(usize, u8),
    Additional,
}

impl SchemaValidator {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema: Arc::new(schema),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Collects every violation in one pass.
    ///
    /// Order: missing required members, then per-property checks, both in
    /// declaration order, then unexpected members. A property whose type is
    /// wrong gets only the type violation.
    pub fn validate(&self, document: &Value) -> ValidationResult {
        if !document.is_object() {
            return ValidationResult::Invalid(vec![Violation::new("", "must be object")]);
        }

        let mut ranked: Vec<(Rank, Violation)> = Vec::new();
        for error in self.schema.validator.iter_errors(document) {
            self.describe(error, &mut ranked);
        }
        if ranked.is_empty() {
            return ValidationResult::Valid;
        }

        ranked.sort_by_key(|(rank, _)| *rank);
        ValidationResult::Invalid(ranked.into_iter().map(|(_, v)| v).collect())
    }

    // Messages are built from the schema side only; instance values never
    // reach the report.
    fn describe(&self, error: ValidationError<'_>, out: &mut Vec<(Rank, Violation)>) {
        let path = error.instance_path.to_string();
        let property = self.property_rank(&path);

        let (rank, message) = match error.kind {
            ValidationErrorKind::Required { property: name } => {
                let name = name.as_str().map(str::to_string).unwrap_or_else(|| name.to_string());
                let index = self.schema.required_index(&name).unwrap_or(usize::MAX);
                (
                    Rank::Required(index),
                    format!("must have required property '{name}'"),
                )
            }
            ValidationErrorKind::AdditionalProperties { unexpected } => {
                for _ in unexpected {
                    out.push((
                        Rank::Additional,
                        Violation::new(path.clone(), "must NOT have additional properties"),
                    ));
                }
                return;
            }
            ValidationErrorKind::Type { kind } => {
                (Rank::Property(property, 0), format!("must be {}", type_names(kind)))
            }
            ValidationErrorKind::MinLength { limit } => (
                Rank::Property(property, 1),
                format!("must NOT have fewer than {limit} characters"),
            ),
            ValidationErrorKind::Pattern { pattern } => (
                Rank::Property(property, 2),
                format!("must match pattern \"{pattern}\""),
            ),
            ValidationErrorKind::Minimum { limit } => {
                (Rank::Property(property, 3), format!("must be >= {limit}"))
            }
            ValidationErrorKind::MaxLength { limit } => (
                Rank::Property(property, 4),
                format!("must NOT have more than {limit} characters"),
            ),
            ValidationErrorKind::Maximum { limit } => {
                (Rank::Property(property, 4), format!("must be <= {limit}"))
            }
            ValidationErrorKind::Enum { .. } => (
                Rank::Property(property, 4),
                "must be equal to one of the allowed values".to_string(),
            ),
            _ => {
                let schema_path = error.schema_path.to_string();
                let keyword = schema_path.rsplit('/').next().unwrap_or_default();
                (
                    Rank::Property(property, 4),
                    format!("must pass \"{keyword}\" keyword validation"),
                )
            }
        };
        out.push((rank, Violation::new(path, message)));
    }

    /// Declaration index of the top-level member a pointer starts in.
    fn property_rank(&self, path: &str) -> usize {
        path.strip_prefix('/')
            .map(|rest| rest.split('/').next().unwrap_or_default())
            .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
            .and_then(|name| self.schema.property_index(&name))
            .unwrap_or(usize::MAX)
    }
}

fn type_names(kind: TypeKind) -> String {
    match kind {
        TypeKind::Single(single) => single.to_string(),
        TypeKind::Multiple(types) => types
            .into_iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(","),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn messages(result: &ValidationResult) -> Vec<(&str, &str)> {
        result
            .violations()
            .iter()
            .map(|v| (v.instance_path.as_str(), v.message.as_str()))
            .collect()
    }

    #[test]
    fn accepts_complete_record() {
        let validator = SchemaValidator::default();
        let record = json!({
            "transaction_id": "ch_98765",
            "reason": "fraudulent",
            "currency": "USD",
            "amount": 25.99,
            "provider": "stripe"
        });
        assert_eq!(validator.validate(&record), ValidationResult::Valid);
    }

    #[test]
    fn reports_every_missing_required_field_in_order() {
        let validator = SchemaValidator::default();
        let result = validator.validate(&json!({"amount": 10, "provider": "stripe"}));
        assert_eq!(
            messages(&result),
            [
                ("", "must have required property 'transaction_id'"),
                ("", "must have required property 'reason'"),
                ("", "must have required property 'currency'"),
            ]
        );
    }

    #[test]
    fn type_mismatch_suppresses_other_constraints() {
        let validator = SchemaValidator::default();
        let result = validator.validate(&json!({
            "transaction_id": "",
            "reason": "fraudulent",
            "currency": 840,
            "amount": "25.99",
            "provider": "stripe"
        }));
        assert_eq!(
            messages(&result),
            [
                ("/transaction_id", "must NOT have fewer than 1 characters"),
                ("/currency", "must be string"),
                ("/amount", "must be number"),
            ]
        );
    }

    #[test]
    fn required_violations_come_before_property_violations() {
        let validator = SchemaValidator::default();
        let result = validator.validate(&json!({"currency": "usd", "amount": 1}));
        assert_eq!(
            messages(&result),
            [
                ("", "must have required property 'transaction_id'"),
                ("", "must have required property 'reason'"),
                ("", "must have required property 'provider'"),
                ("/currency", "must match pattern \"^[A-Z]{3}$\""),
            ]
        );
    }

    #[test]
    fn non_object_document() {
        let validator = SchemaValidator::default();
        for doc in [json!(null), json!([]), json!("record")] {
            assert_eq!(messages(&validator.validate(&doc)), [("", "must be object")]);
        }
    }

    #[test]
    fn minimum_and_additional_properties() {
        let schema = Schema::from_value(&json!({
            "type": "object",
            "properties": {"amount": {"type": "number", "minimum": 0}},
            "additionalProperties": false
        }))
        .unwrap();
        let validator = SchemaValidator::new(schema);
        let result = validator.validate(&json!({"amount": -1.5, "extra": true}));
        assert_eq!(
            messages(&result),
            [
                ("/amount", "must be >= 0"),
                ("", "must NOT have additional properties"),
            ]
        );
    }

    #[test]
    fn paths_are_escaped() {
        let schema = Schema::from_value(&json!({
            "type": "object",
            "properties": {
                "plain": {"type": "string"},
                "a/b~c": {"type": "string"}
            }
        }))
        .unwrap();
        let result = SchemaValidator::new(schema).validate(&json!({"a/b~c": 1, "plain": 2}));
        assert_eq!(
            messages(&result),
            [("/plain", "must be string"), ("/a~1b~0c", "must be string")]
        );
    }

    #[test]
    fn violations_never_echo_instance_values() {
        let schema = Schema::from_value(&json!({
            "type": "object",
            "properties": {"reason": {"type": "string", "maxLength": 3, "enum": ["a", "b"]}}
        }))
        .unwrap();
        let result = SchemaValidator::new(schema).validate(&json!({"reason": "card-4111"}));
        assert!(!result.is_valid());
        let mut reported = messages(&result);
        reported.sort();
        assert_eq!(
            reported,
            [
                ("/reason", "must NOT have more than 3 characters"),
                ("/reason", "must be equal to one of the allowed values"),
            ]
        );
        for violation in result.violations() {
            assert_eq!(violation.instance_path, "/reason");
            assert!(!violation.message.contains("card-4111"), "{violation}");
        }
    }

    #[test]
    fn violation_serializes_with_instance_path() {
        let violation = Violation::new("/amount", "must be number");
        assert_eq!(
            serde_json::to_value(&violation).unwrap(),
            json!({"instancePath": "/amount", "message": "must be number"})
        );
    }

    #[test]
    fn validation_does_not_mutate_document() {
        let validator = SchemaValidator::default();
        let doc = json!({"amount": "1"});
        let before = doc.clone();
        let _ = validator.validate(&doc);
        assert_eq!(doc, before);
    }
}
