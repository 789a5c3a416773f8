//! Workspace umbrella crate for the dispute normalizer.
//!
//! This crate stitches together the provider registry, the mapping
//! evaluator and the schema gate so a transport layer can turn any
//! provider's chargeback webhook into one normalized record with a single
//! call to [`Pipeline::process`].
//!
//! ```rust
//! use normalizer::{EvalConfig, Pipeline, RegistryBuilder, SchemaValidator};
//! use serde_json::json;
//!
//! let mut providers = RegistryBuilder::new();
//! providers
//!     .register_source(
//!         "stripe",
//!         r#"{
//!             "transaction_id": data.object.charge,
//!             "reason": data.object.reason,
//!             "currency": $uppercase(data.object.currency),
//!             "amount": data.object.amount / 100,
//!             "provider": "stripe"
//!         }"#,
//!     )
//!     .unwrap();
//! let pipeline = Pipeline::new(providers.build(), SchemaValidator::default(), EvalConfig::default());
//!
//! let payload = json!({"data": {"object": {
//!     "charge": "ch_1", "reason": "fraudulent", "currency": "usd", "amount": 2599
//! }}});
//! let outcome = pipeline.process("stripe", &payload);
//! assert_eq!(outcome.record().unwrap().amount(), Some(25.99));
//! ```

mod config;
mod outcome;
mod pipeline;

pub use crate::config::{ConfigLoadError, MAX_TIMEOUT_MS, PipelineConfig};
pub use crate::outcome::{
    ErrorKind, EVALUATION_FAILED_MESSAGE, NormalizedRecord, PipelineFailure, PipelineOutcome,
    TIMEOUT_MESSAGE, UNKNOWN_PROVIDER_MESSAGE,
};
pub use crate::pipeline::{Pipeline, PipelineMetrics};

pub use mapping::{
    CompileError, CompiledExpression, DEFAULT_TIMEOUT_MS, Document, EvalConfig, EvaluationError,
    compile, lookup,
};
pub use registry::{
    DEFAULT_EXTENSION, ProviderKey, ProviderRegistry, RegistryBuilder, RegistryError, load_dir,
};
pub use schema::{Schema, SchemaError, SchemaValidator, ValidationResult, Violation};

use std::error::Error;
use std::fmt;

/// Errors that can occur while constructing a pipeline.
///
/// Per-request problems never show up here; they are folded into
/// [`PipelineOutcome`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    Registry(RegistryError),
    Schema(SchemaError),
    InvalidConfig(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Registry(err) => write!(f, "provider registry failure: {err}"),
            PipelineError::Schema(err) => write!(f, "schema failure: {err}"),
            PipelineError::InvalidConfig(msg) => write!(f, "invalid pipeline configuration: {msg}"),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::Registry(err) => Some(err),
            PipelineError::Schema(err) => Some(err),
            PipelineError::InvalidConfig(_) => None,
        }
    }
}

impl From<RegistryError> for PipelineError {
    fn from(value: RegistryError) -> Self {
        PipelineError::Registry(value)
    }
}

impl From<SchemaError> for PipelineError {
    fn from(value: SchemaError) -> Self {
        PipelineError::Schema(value)
    }
}
