use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;

use crate::ast::Expr;
use crate::config::EvalConfig;
use crate::error::{CompileError, EvaluationError};
use crate::eval::Evaluation;
use crate::parser::parse_program;

/// A parsed and checked mapping program.
///
/// Compiled once, evaluated many times. Cloning shares the tree, and the
/// type is `Send + Sync` so one instance may serve concurrent evaluations.
#[derive(Clone)]
pub struct CompiledExpression {
    root: Arc<Expr>,
    source_len: usize,
}

/// Compiles mapping source text.
///
/// ```rust
/// use mapping::{compile, EvalConfig};
/// use serde_json::json;
///
/// let program = compile(r#"{"currency": $uppercase(data.currency)}"#).unwrap();
/// let out = program
///     .evaluate(&json!({"data": {"currency": "usd"}}), &EvalConfig::default())
///     .unwrap();
/// assert_eq!(out, json!({"currency": "USD"}));
/// ```
pub fn compile(source: &str) -> Result<CompiledExpression, CompileError> {
    let root = parse_program(source)?;
    Ok(CompiledExpression {
        root: Arc::new(root),
        source_len: source.len(),
    })
}

impl CompiledExpression {
    /// Evaluates the program against one input document.
    ///
    /// A top-level absent result is returned as `null`. Missing source
    /// paths are not errors; object members bound to them are omitted.
    pub fn evaluate(&self, input: &Value, cfg: &EvalConfig) -> Result<Value, EvaluationError> {
        Evaluation::new(input, cfg)
            .eval(&self.root)
            .map(Option::unwrap_or_default)
    }

    /// The checked expression tree.
    pub fn ast(&self) -> &Expr {
        &self.root
    }
}

impl fmt::Debug for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpression")
            .field("source_len", &self.source_len)
            .finish_non_exhaustive()
    }
}

impl FromStr for CompiledExpression {
    type Err = CompileError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        compile(source)
    }
}
