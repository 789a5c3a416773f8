//! Dispute normalizer mapping layer.
//!
//! Each payment provider ships its dispute webhooks in its own shape. This
//! crate turns a small declarative expression, written per provider, into a
//! program that reshapes one raw payload into a candidate normalized record.
//!
//! ## What we do
//!
//! - Parse mapping source once into a checked tree ([`compile`])
//! - Evaluate it against arbitrary JSON input ([`CompiledExpression::evaluate`])
//! - Navigate nested fields safely: a missing key is absent, never a fault
//! - Offer a fixed allow-list of functions (`$uppercase`, `$number`, ...)
//!
//! ## Sandbox guarantees
//!
//! Programs cannot touch files, the network, the clock or process state.
//! Evaluation is bounded by [`EvalConfig::timeout_ms`]; a zero budget always
//! times out. The input document is only ever borrowed.
//!
//! ## Missing data
//!
//! When a path resolves to nothing, the object member bound to it is left
//! out of the output. Arithmetic or function calls on an absent value are
//! absent too. Catching incomplete records is the validator's job.

mod ast;
mod builtins;
mod config;
mod document;
mod error;
mod eval;
mod expression;
mod parser;

pub use crate::ast::{BinaryOp, Expr, Function, Step};
pub use crate::config::{EvalConfig, DEFAULT_TIMEOUT_MS};
pub use crate::document::{lookup, type_name, Document};
pub use crate::error::{CompileError, EvaluationError};
pub use crate::expression::{compile, CompiledExpression};
pub use crate::parser::{MAX_DEPTH, MAX_NESTING};
