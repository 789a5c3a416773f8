//! Tagged results of one pipeline run.

use std::fmt;

use schema::Violation;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Caller-facing message for a payload whose mapping faulted.
pub const EVALUATION_FAILED_MESSAGE: &str = "failed to transform payload";
/// Caller-facing message for a mapping that exceeded its time budget.
pub const TIMEOUT_MESSAGE: &str = "payload transformation timed out";
/// Caller-facing message for an unregistered provider key. The key itself
/// is only logged.
pub const UNKNOWN_PROVIDER_MESSAGE: &str = "unknown provider";

/// How a pipeline run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// The mapped record passed validation.
    Succeeded(NormalizedRecord),
    /// The pipeline ran to completion but the record does not conform.
    Rejected(Vec<Violation>),
    /// The pipeline could not run to completion.
    Failed(PipelineFailure),
}

impl PipelineOutcome {
    pub fn is_succeeded(&self) -> bool {
        matches!(self, PipelineOutcome::Succeeded(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, PipelineOutcome::Rejected(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PipelineOutcome::Failed(_))
    }

    /// Stable lowercase label, used for logs and metric labels.
    pub fn label(&self) -> &'static str {
        match self {
            PipelineOutcome::Succeeded(_) => "succeeded",
            PipelineOutcome::Rejected(_) => "rejected",
            PipelineOutcome::Failed(_) => "failed",
        }
    }

    pub fn record(&self) -> Option<&NormalizedRecord> {
        match self {
            PipelineOutcome::Succeeded(record) => Some(record),
            _ => None,
        }
    }

    pub fn violations(&self) -> Option<&[Violation]> {
        match self {
            PipelineOutcome::Rejected(violations) => Some(violations),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&PipelineFailure> {
        match self {
            PipelineOutcome::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Why a run ended in [`PipelineOutcome::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownProvider,
    Evaluation,
    Timeout,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::UnknownProvider => "unknown_provider",
            ErrorKind::Evaluation => "evaluation",
            ErrorKind::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure kind plus the stable message returned to callers.
///
/// The message never carries payload contents or internal fault detail;
/// that goes to the operator log instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl PipelineFailure {
    pub fn unknown_provider() -> Self {
        Self {
            kind: ErrorKind::UnknownProvider,
            message: UNKNOWN_PROVIDER_MESSAGE.to_string(),
        }
    }

    pub fn evaluation() -> Self {
        Self {
            kind: ErrorKind::Evaluation,
            message: EVALUATION_FAILED_MESSAGE.to_string(),
        }
    }

    pub fn timeout() -> Self {
        Self {
            kind: ErrorKind::Timeout,
            message: TIMEOUT_MESSAGE.to_string(),
        }
    }
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// A record that passed schema validation.
///
/// Member order is the order the provider mapping produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedRecord(Map<String, Value>);

impl NormalizedRecord {
    pub(crate) fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.0.get("transaction_id").and_then(Value::as_str)
    }

    pub fn reason(&self) -> Option<&str> {
        self.0.get("reason").and_then(Value::as_str)
    }

    pub fn currency(&self) -> Option<&str> {
        self.0.get("currency").and_then(Value::as_str)
    }

    pub fn amount(&self) -> Option<f64> {
        self.0.get("amount").and_then(Value::as_f64)
    }

    pub fn provider(&self) -> Option<&str> {
        self.0.get("provider").and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}
