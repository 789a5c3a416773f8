//! Compiled schema definitions.
//!
//! A schema is compiled once into a [`jsonschema::Validator`]; the member
//! names it declares are kept alongside so violations can be reported in
//! declaration order.

use std::fmt;
use std::fs;
use std::path::Path;

use jsonschema::Validator;
use serde_json::Value;

use crate::error::SchemaError;

/// Source of the built-in normalized-record schema.
pub const NORMALIZED_RECORD_SCHEMA: &str = include_str!("../schemas/normalized-record.json");

/// An immutable, compiled object schema.
pub struct Schema {
    pub(crate) validator: Validator,
    pub(crate) required: Vec<String>,
    pub(crate) properties: Vec<String>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("required", &self.required)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

impl Schema {
    /// The built-in schema for normalized dispute records.
    pub fn normalized_record() -> Self {
        Self::from_json_str(NORMALIZED_RECORD_SCHEMA).expect("built-in schema is valid")
    }

    pub fn from_json_str(source: &str) -> Result<Self, SchemaError> {
        let value: Value = serde_json::from_str(source)?;
        Self::from_value(&value)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|e| SchemaError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&source)
    }

    /// Compiles a schema document. Keyword values and patterns are checked
    /// here, so a bad schema fails at load time instead of during validation.
    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        let Some(root) = value.as_object() else {
            return Err(SchemaError::NotAnObjectSchema);
        };
        if root.get("type").is_some_and(|kind| *kind != "object") {
            return Err(SchemaError::NotAnObjectSchema);
        }

        let validator =
            jsonschema::validator_for(value).map_err(|e| SchemaError::Invalid(e.to_string()))?;

        let required = root
            .get("required")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let properties = root
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| props.keys().cloned().collect())
            .unwrap_or_default();

        Ok(Self {
            validator,
            required,
            properties,
        })
    }

    /// Required member names, in declaration order.
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Declared property names, in declaration order.
    pub fn properties(&self) -> &[String] {
        &self.properties
    }

    pub(crate) fn property_index(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p == name)
    }

    pub(crate) fn required_index(&self, name: &str) -> Option<usize> {
        self.required.iter().position(|r| r == name)
    }
}
