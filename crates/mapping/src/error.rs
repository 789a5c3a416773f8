//! Error types produced by the mapping crate.
//!
//! Two phases, two error types:
//!
//! | Error | Phase | Description |
//! |-------|-------|-------------|
//! | [`CompileError`] | startup | Source text could not be turned into a program |
//! | [`EvaluationError`] | per request | A compiled program failed against one payload |
//!
//! Evaluation errors never carry payload values, only type names and
//! operator or function names, so their `Display` output is safe to log.

use thiserror::Error;

/// Errors raised while compiling mapping source text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CompileError {
    /// The source text is not a well-formed expression.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// A `$name(...)` call names a function outside the allow-list.
    #[error("unknown function '${0}'")]
    UnknownFunction(String),

    /// An allow-listed function was called with the wrong number of arguments.
    #[error("function '${function}' expects {expected} argument(s), found {found}")]
    Arity {
        function: String,
        expected: String,
        found: usize,
    },

    /// An object constructor declares the same key twice.
    #[error("duplicate key '{0}' in object constructor")]
    DuplicateKey(String),

    /// Brackets, conditionals or operator chains nest deeper than the
    /// compiler accepts.
    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),

    /// Nothing to compile.
    #[error("expression source is empty")]
    Empty,
}

/// Errors raised while evaluating a compiled expression against a payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EvaluationError {
    /// The evaluation deadline passed before the program finished.
    #[error("evaluation exceeded {limit_ms}ms")]
    Timeout { limit_ms: u64 },

    /// An operator or function received a value of the wrong type.
    #[error("{operation} expects {expected}, found {found}")]
    Type {
        operation: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// `$number` could not cast its argument.
    #[error("{function} could not cast a {found} value to a number")]
    InvalidNumber {
        function: &'static str,
        found: &'static str,
    },

    /// Arithmetic produced infinity or NaN.
    #[error("{operation} produced a non-finite number")]
    NonFinite { operation: &'static str },
}

impl EvaluationError {
    /// Returns true for deadline failures.
    pub fn is_timeout(&self) -> bool {
        matches!(self, EvaluationError::Timeout { .. })
    }
}
