//! Tree-walking evaluator.
//!
//! Each call to [`CompiledExpression::evaluate`](crate::CompiledExpression::evaluate)
//! builds a fresh [`Evaluation`] holding only the input reference and the
//! deadline. Nothing is cached between calls, so concurrent evaluations of
//! one compiled program cannot observe each other.

use std::cmp::Ordering;
use std::time::Instant;

use serde_json::{Map, Value};

use crate::ast::{BinaryOp, Expr, Step};
use crate::builtins;
use crate::config::EvalConfig;
use crate::document::{
    member, number_value, position, select_index, stringify, truthy, type_name, values_equal,
};
use crate::error::EvaluationError;

/// Absent-or-present intermediate result.
type Eval = Result<Option<Value>, EvaluationError>;

/// Elements cloned between deadline checks when a selection is returned.
const MATERIALIZE_CHUNK: usize = 1024;

/// Values selected by a path so far, borrowed from the document.
///
/// `Many` is what a field step over an array yields; later steps treat it
/// as an array.
#[derive(Debug)]
enum Selection<'v> {
    Empty,
    One(&'v Value),
    Many(Vec<&'v Value>),
}

impl<'v> From<Option<&'v Value>> for Selection<'v> {
    fn from(value: Option<&'v Value>) -> Self {
        value.map_or(Selection::Empty, Selection::One)
    }
}

pub(crate) struct Evaluation<'a> {
    input: &'a Value,
    /// `None` when the budget overflows `Instant`, i.e. effectively unbounded.
    deadline: Option<Instant>,
    limit_ms: u64,
}

impl<'a> Evaluation<'a> {
    pub(crate) fn new(input: &'a Value, cfg: &EvalConfig) -> Self {
        Self {
            input,
            deadline: Instant::now().checked_add(cfg.timeout()),
            limit_ms: cfg.timeout_ms,
        }
    }

    /// Cooperative deadline check, run at every node and array element.
    fn tick(&self) -> Result<(), EvaluationError> {
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(EvaluationError::Timeout {
                limit_ms: self.limit_ms,
            });
        }
        Ok(())
    }

    pub(crate) fn eval(&self, expr: &Expr) -> Eval {
        self.tick()?;
        match expr {
            Expr::Literal(value) => Ok(Some(value.clone())),
            Expr::Context => Ok(Some(self.input.clone())),
            Expr::Path { base, steps } => self.eval_path(base, steps),
            Expr::Object(members) => {
                let mut object = Map::with_capacity(members.len());
                for (key, member) in members {
                    if let Some(value) = self.eval(member)? {
                        object.insert(key.clone(), value);
                    }
                }
                Ok(Some(Value::Object(object)))
            }
            Expr::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(value) = self.eval(item)? {
                        values.push(value);
                    }
                }
                Ok(Some(Value::Array(values)))
            }
            Expr::Negate(inner) => match self.eval(inner)? {
                Some(value) => {
                    let number = expect_number(&value, "'-'")?;
                    finite(-number, "'-'")
                }
                None => Ok(None),
            },
            Expr::Binary { op, left, right } => self.eval_binary(*op, left, right),
            Expr::Conditional {
                test,
                then,
                otherwise,
            } => {
                if truthy(self.eval(test)?.as_ref()) {
                    self.eval(then)
                } else if let Some(otherwise) = otherwise {
                    self.eval(otherwise)
                } else {
                    Ok(None)
                }
            }
            Expr::Call { function, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                builtins::call(*function, values)
            }
        }
    }

    /// Walks a path by reference; only the final selection is cloned.
    fn eval_path(&self, base: &Expr, steps: &[Step]) -> Eval {
        if steps.is_empty() {
            return self.eval(base);
        }
        let owned;
        let root = match base {
            Expr::Context => self.input,
            other => match self.eval(other)? {
                Some(value) => {
                    owned = value;
                    &owned
                }
                None => return Ok(None),
            },
        };

        let mut current = Selection::One(root);
        for step in steps {
            current = self.apply(current, step)?;
            if matches!(current, Selection::Empty) {
                return Ok(None);
            }
        }
        self.materialize(current)
    }

    fn apply<'v>(
        &self,
        current: Selection<'v>,
        step: &Step,
    ) -> Result<Selection<'v>, EvaluationError> {
        self.tick()?;
        match (step, current) {
            (_, Selection::Empty) => Ok(Selection::Empty),
            (Step::Field(name), Selection::One(value)) => self.field(value, name),
            (Step::Field(name), Selection::Many(values)) => self.fan_out(values, name),
            (Step::Index(index), Selection::One(value)) => {
                Ok(Selection::from(select_index(value, *index)))
            }
            (Step::Index(index), Selection::Many(values)) => Ok(Selection::from(
                position(values.len(), *index).map(|i| values[i]),
            )),
        }
    }

    /// A field step maps over arrays, splicing array results one level.
    fn field<'v>(&self, value: &'v Value, name: &str) -> Result<Selection<'v>, EvaluationError> {
        match value {
            Value::Array(items) => self.fan_out(items, name),
            other => Ok(Selection::from(member(other, name))),
        }
    }

    fn fan_out<'v, I>(&self, items: I, name: &str) -> Result<Selection<'v>, EvaluationError>
    where
        I: IntoIterator<Item = &'v Value>,
    {
        let mut selected = Vec::new();
        for item in items {
            self.tick()?;
            match self.field(item, name)? {
                Selection::Empty => {}
                Selection::One(Value::Array(inner)) => selected.extend(inner),
                Selection::One(found) => selected.push(found),
                Selection::Many(found) => selected.extend(found),
            }
        }
        Ok(match selected.len() {
            0 => Selection::Empty,
            1 => Selection::One(selected[0]),
            _ => Selection::Many(selected),
        })
    }

    fn materialize(&self, selection: Selection<'_>) -> Eval {
        match selection {
            Selection::Empty => Ok(None),
            Selection::One(value) => Ok(Some(value.clone())),
            Selection::Many(values) => {
                let mut out = Vec::with_capacity(values.len());
                for chunk in values.chunks(MATERIALIZE_CHUNK) {
                    self.tick()?;
                    out.extend(chunk.iter().map(|v| (*v).clone()));
                }
                Ok(Some(Value::Array(out)))
            }
        }
    }

    fn operands(&self, left: &Expr, right: &Expr) -> Result<(Option<Value>, Option<Value>), EvaluationError> {
        Ok((self.eval(left)?, self.eval(right)?))
    }

    fn eval_binary(&self, op: BinaryOp, left: &Expr, right: &Expr) -> Eval {
        match op {
            BinaryOp::And => {
                if !truthy(self.eval(left)?.as_ref()) {
                    return Ok(Some(Value::Bool(false)));
                }
                Ok(Some(Value::Bool(truthy(self.eval(right)?.as_ref()))))
            }
            BinaryOp::Or => {
                if truthy(self.eval(left)?.as_ref()) {
                    return Ok(Some(Value::Bool(true)));
                }
                Ok(Some(Value::Bool(truthy(self.eval(right)?.as_ref()))))
            }
            BinaryOp::Coalesce => match self.eval(left)? {
                Some(value) => Ok(Some(value)),
                None => self.eval(right),
            },
            BinaryOp::Concat => {
                let (l, r) = self.operands(left, right)?;
                let mut text = l.as_ref().map(stringify).unwrap_or_default();
                text.push_str(&r.as_ref().map(stringify).unwrap_or_default());
                Ok(Some(Value::String(text)))
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                let (l, r) = self.operands(left, right)?;
                let result = match (l, r) {
                    (Some(a), Some(b)) => values_equal(&a, &b) == (op == BinaryOp::Eq),
                    _ => false,
                };
                Ok(Some(Value::Bool(result)))
            }
            BinaryOp::Lt => self.compare(op, left, right, Ordering::is_lt),
            BinaryOp::Le => self.compare(op, left, right, Ordering::is_le),
            BinaryOp::Gt => self.compare(op, left, right, Ordering::is_gt),
            BinaryOp::Ge => self.compare(op, left, right, Ordering::is_ge),
            BinaryOp::Add => self.arithmetic(op, left, right, |a, b| a + b),
            BinaryOp::Sub => self.arithmetic(op, left, right, |a, b| a - b),
            BinaryOp::Mul => self.arithmetic(op, left, right, |a, b| a * b),
            BinaryOp::Div => self.arithmetic(op, left, right, |a, b| a / b),
            BinaryOp::Rem => self.arithmetic(op, left, right, |a, b| a % b),
        }
    }

    fn arithmetic(
        &self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        apply: fn(f64, f64) -> f64,
    ) -> Eval {
        let (Some(l), Some(r)) = self.operands(left, right)? else {
            return Ok(None);
        };
        let a = expect_number(&l, op.symbol())?;
        let b = expect_number(&r, op.symbol())?;
        finite(apply(a, b), op.symbol())
    }

    fn compare(
        &self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        accept: fn(Ordering) -> bool,
    ) -> Eval {
        let (Some(l), Some(r)) = self.operands(left, right)? else {
            return Ok(Some(Value::Bool(false)));
        };
        let ordering = match (&l, &r) {
            (Value::Number(a), Value::Number(b)) => a.as_f64().partial_cmp(&b.as_f64()),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Number(_) | Value::String(_), other) | (other, _) => {
                return Err(EvaluationError::Type {
                    operation: op.symbol(),
                    expected: "two numbers or two strings",
                    found: type_name(other),
                })
            }
        };
        Ok(Some(Value::Bool(ordering.is_some_and(accept))))
    }
}

fn expect_number(value: &Value, operation: &'static str) -> Result<f64, EvaluationError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or(EvaluationError::NonFinite { operation }),
        other => Err(EvaluationError::Type {
            operation,
            expected: "number",
            found: type_name(other),
        }),
    }
}

fn finite(value: f64, operation: &'static str) -> Eval {
    number_value(value)
        .map(Some)
        .ok_or(EvaluationError::NonFinite { operation })
}
