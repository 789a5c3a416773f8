//! Dispute normalizer schema gate.
//!
//! Every candidate record produced by a provider mapping passes through a
//! [`SchemaValidator`] before it leaves the pipeline. The validator never
//! coerces or mutates; it only reports.
//!
//! Schemas are ordinary JSON Schema documents compiled with the
//! [`jsonschema`] crate. Violations use the ajv message wording and JSON
//! Pointer paths, so clients that already parse ajv output can consume
//! them unchanged. Required members come first, then per-property
//! violations in declaration order.

mod error;
mod schema;
mod validator;

pub use crate::error::SchemaError;
pub use crate::schema::{Schema, NORMALIZED_RECORD_SCHEMA};
pub use crate::validator::{SchemaValidator, ValidationResult, Violation};
