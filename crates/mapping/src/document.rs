//! Untyped payload documents and safe navigation over them.
//!
//! Webhook payloads have no fixed shape, so they are carried as
//! [`serde_json::Value`]. The helpers here never fault on a missing or
//! wrong-typed intermediate key; they return `None`, the absent-value
//! marker the evaluator propagates.

use serde_json::{Number, Value};

/// A raw provider payload or a mapped candidate record.
pub type Document = Value;

/// Name of a value's JSON type, as used in error messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Follows a chain of object keys. Any missing key or non-object
/// intermediate yields `None`.
///
/// ```rust
/// use mapping::lookup;
/// use serde_json::json;
///
/// let doc = json!({"data": {"object": {"charge": "ch_1"}}});
/// assert_eq!(lookup(&doc, &["data", "object", "charge"]), Some(&json!("ch_1")));
/// assert_eq!(lookup(&doc, &["data", "missing", "charge"]), None);
/// assert_eq!(lookup(&doc, &["data", "object", "charge", "deeper"]), None);
/// ```
pub fn lookup<'a>(doc: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(doc, |current, key| current.as_object()?.get(*key))
}

/// Member of an object; absent for anything else.
pub(crate) fn member<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    value.as_object()?.get(name)
}

/// Applies one index step. Non-arrays behave as one-element arrays.
pub(crate) fn select_index(value: &Value, index: i64) -> Option<&Value> {
    match value {
        Value::Array(items) => position(items.len(), index).and_then(|i| items.get(i)),
        other => position(1, index).map(|_| other),
    }
}

/// Resolves a possibly negative index against a sequence length.
pub(crate) fn position(len: usize, index: i64) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let position = if index < 0 { len + index } else { index };
    (0..len).contains(&position).then_some(position as usize)
}

/// Truthiness used by `and`, `or` and conditionals.
pub(crate) fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => items.iter().any(|item| truthy(Some(item))),
        Some(Value::Object(_)) => true,
    }
}

/// Converts an arithmetic result back into a JSON number.
///
/// Integral values inside the exactly-representable range become JSON
/// integers so that `1000 / 100` serializes as `10`, not `10.0`.
pub(crate) fn number_value(value: f64) -> Option<Value> {
    if !value.is_finite() {
        return None;
    }
    const EXACT: f64 = 9_007_199_254_740_992.0;
    if value.fract() == 0.0 && value.abs() < EXACT {
        return Some(Value::from(value as i64));
    }
    Number::from_f64(value).map(Value::Number)
}

/// String form used by `&` and `$string`.
pub(crate) fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64().and_then(number_value) {
            Some(Value::Number(normalized)) => normalized.to_string(),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Value equality with numeric comparison for numbers.
pub(crate) fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (a, b) => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn member_of_non_objects_is_absent() {
        assert_eq!(member(&json!("text"), "a"), None);
        assert_eq!(member(&json!(12), "a"), None);
        assert_eq!(member(&json!(null), "a"), None);
        assert_eq!(member(&json!([{"a": 1}]), "a"), None);
        assert_eq!(member(&json!({"b": 1}), "a"), None);
        assert_eq!(member(&json!({"a": 1}), "a"), Some(&json!(1)));
    }

    #[test]
    fn index_step_handles_negatives_and_singletons() {
        let doc = json!(["a", "b", "c"]);
        assert_eq!(select_index(&doc, 0), Some(&json!("a")));
        assert_eq!(select_index(&doc, -1), Some(&json!("c")));
        assert_eq!(select_index(&doc, 3), None);
        assert_eq!(select_index(&doc, -4), None);
        assert_eq!(select_index(&json!("solo"), 0), Some(&json!("solo")));
        assert_eq!(select_index(&json!("solo"), -1), Some(&json!("solo")));
        assert_eq!(select_index(&json!("solo"), 1), None);
    }

    #[test]
    fn truthiness() {
        assert!(!truthy(None));
        assert!(!truthy(Some(&json!(null))));
        assert!(!truthy(Some(&json!(0))));
        assert!(!truthy(Some(&json!(""))));
        assert!(!truthy(Some(&json!([]))));
        assert!(truthy(Some(&json!({}))));
        assert!(truthy(Some(&json!("x"))));
        assert!(truthy(Some(&json!([0, 1]))));
    }

    #[test]
    fn integral_numbers_become_integers() {
        assert_eq!(number_value(10.0), Some(json!(10)));
        assert_eq!(number_value(25.99), Some(json!(25.99)));
        assert_eq!(number_value(f64::INFINITY), None);
        assert_eq!(number_value(f64::NAN), None);
    }

    #[test]
    fn stringify_normalizes_numbers() {
        assert_eq!(stringify(&json!(10.0)), "10");
        assert_eq!(stringify(&json!(1.5)), "1.5");
        assert_eq!(stringify(&json!("s")), "s");
        assert_eq!(stringify(&json!(true)), "true");
        assert_eq!(stringify(&json!({"a": 1})), r#"{"a":1}"#);
    }

    #[test]
    fn numeric_equality_ignores_representation() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(!values_equal(&json!(1), &json!("1")));
    }
}
