use thiserror::Error;

/// Errors raised while building a [`Schema`](crate::Schema).
///
/// Schemas are loaded once at startup, so every variant is fatal there and
/// none of them can surface per request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaError {
    #[error("schema is not valid JSON: {0}")]
    Parse(String),
    #[error("schema root must be an object with type \"object\"")]
    NotAnObjectSchema,
    /// The document is JSON but not a usable JSON Schema (bad keyword
    /// value, unknown type name, uncompilable pattern, ...).
    #[error("invalid schema: {0}")]
    Invalid(String),
    #[error("failed to read schema file {path}: {message}")]
    Io { path: String, message: String },
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        SchemaError::Parse(err.to_string())
    }
}
