//! Allow-listed functions callable from mapping expressions.

use serde_json::Value;

use crate::ast::Function;
use crate::document::{number_value, stringify, type_name};
use crate::error::EvaluationError;

/// Applies `function` to already-evaluated arguments.
///
/// An absent first argument yields an absent result, except for
/// `$exists` which reports it.
pub(crate) fn call(
    function: Function,
    args: Vec<Option<Value>>,
) -> Result<Option<Value>, EvaluationError> {
    let mut args = args.into_iter();
    let first = args.next().flatten();

    if function == Function::Exists {
        return Ok(Some(Value::Bool(first.is_some())));
    }
    let Some(first) = first else {
        return Ok(None);
    };
    let second = args.next().flatten();
    let third = args.next().flatten();

    match function {
        Function::Uppercase => {
            let text = string_arg(&first, function)?;
            Ok(Some(Value::String(text.to_uppercase())))
        }
        Function::Lowercase => {
            let text = string_arg(&first, function)?;
            Ok(Some(Value::String(text.to_lowercase())))
        }
        Function::Trim => {
            let text = string_arg(&first, function)?;
            Ok(Some(Value::String(text.trim().to_string())))
        }
        Function::String => Ok(Some(Value::String(stringify(&first)))),
        Function::Number => to_number(&first).map(Some),
        Function::Round => {
            let number = number_arg(&first, function)?;
            let precision = match second {
                Some(p) => number_arg(&p, function)?.trunc() as i32,
                None => 0,
            };
            finite(round_half_even(number, precision), function).map(Some)
        }
        Function::Substring => {
            let text = string_arg(&first, function)?;
            let Some(start) = second else {
                return Ok(None);
            };
            let start = number_arg(&start, function)?.trunc() as i64;
            let length = match third {
                Some(l) => Some(number_arg(&l, function)?.trunc() as i64),
                None => None,
            };
            Ok(Some(Value::String(substring(text, start, length))))
        }
        Function::Contains => {
            let text = string_arg(&first, function)?;
            let Some(needle) = second else {
                return Ok(None);
            };
            let needle = string_arg(&needle, function)?;
            Ok(Some(Value::Bool(text.contains(needle))))
        }
        Function::Exists => Ok(Some(Value::Bool(true))),
    }
}

fn string_arg(value: &Value, function: Function) -> Result<&str, EvaluationError> {
    match value {
        Value::String(s) => Ok(s.as_str()),
        other => Err(EvaluationError::Type {
            operation: function.name(),
            expected: "string",
            found: type_name(other),
        }),
    }
}

fn number_arg(value: &Value, function: Function) -> Result<f64, EvaluationError> {
    match value {
        Value::Number(n) => n.as_f64().ok_or(EvaluationError::NonFinite {
            operation: function.name(),
        }),
        other => Err(EvaluationError::Type {
            operation: function.name(),
            expected: "number",
            found: type_name(other),
        }),
    }
}

fn finite(value: f64, function: Function) -> Result<Value, EvaluationError> {
    number_value(value).ok_or(EvaluationError::NonFinite {
        operation: function.name(),
    })
}

/// `$number`: numbers pass through, decimal strings parse, booleans map to 1/0.
fn to_number(value: &Value) -> Result<Value, EvaluationError> {
    let invalid = |found| EvaluationError::InvalidNumber {
        function: Function::Number.name(),
        found,
    };
    match value {
        Value::Number(_) => Ok(value.clone()),
        Value::Bool(b) => Ok(Value::from(u8::from(*b))),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(number_value)
            .ok_or_else(|| invalid("string")),
        other => Err(invalid(type_name(other))),
    }
}

fn round_half_even(value: f64, precision: i32) -> f64 {
    let factor = 10f64.powi(precision);
    let scaled = value * factor;
    let rounded = if (scaled - scaled.trunc()).abs() == 0.5 {
        2.0 * (scaled / 2.0).round()
    } else {
        scaled.round()
    };
    rounded / factor
}

/// Character-based substring; negative `start` counts from the end.
fn substring(text: &str, start: i64, length: Option<i64>) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len() as i64;
    let start = if start < 0 { (len + start).max(0) } else { start.min(len) };
    let end = match length {
        Some(l) if l <= 0 => start,
        Some(l) => start.saturating_add(l).min(len),
        None => len,
    };
    chars[start as usize..end as usize].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call1(function: Function, arg: Value) -> Result<Option<Value>, EvaluationError> {
        call(function, vec![Some(arg)])
    }

    #[test]
    fn case_conversion() {
        assert_eq!(
            call1(Function::Uppercase, json!("usd")).unwrap(),
            Some(json!("USD"))
        );
        assert_eq!(
            call1(Function::Lowercase, json!("EUR")).unwrap(),
            Some(json!("eur"))
        );
        let err = call1(Function::Uppercase, json!(12)).unwrap_err();
        assert_eq!(
            err,
            EvaluationError::Type {
                operation: "$uppercase",
                expected: "string",
                found: "number",
            }
        );
    }

    #[test]
    fn absent_argument_propagates() {
        assert_eq!(call(Function::Uppercase, vec![None]).unwrap(), None);
        assert_eq!(call(Function::Number, vec![None]).unwrap(), None);
        assert_eq!(
            call(Function::Exists, vec![None]).unwrap(),
            Some(json!(false))
        );
        assert_eq!(
            call(Function::Exists, vec![Some(json!(null))]).unwrap(),
            Some(json!(true))
        );
    }

    #[test]
    fn number_casts() {
        assert_eq!(
            call1(Function::Number, json!(" 25.99 ")).unwrap(),
            Some(json!(25.99))
        );
        assert_eq!(call1(Function::Number, json!("100")).unwrap(), Some(json!(100)));
        assert_eq!(call1(Function::Number, json!(true)).unwrap(), Some(json!(1)));
        assert_eq!(call1(Function::Number, json!(7.5)).unwrap(), Some(json!(7.5)));
        for bad in [json!("abc"), json!("inf"), json!("NaN")] {
            assert!(matches!(
                call1(Function::Number, bad),
                Err(EvaluationError::InvalidNumber { found: "string", .. })
            ));
        }
        assert!(matches!(
            call1(Function::Number, json!({"a": 1})),
            Err(EvaluationError::InvalidNumber { found: "object", .. })
        ));
    }

    #[test]
    fn round_is_half_even() {
        let round = |n: f64, p: i64| {
            call(Function::Round, vec![Some(json!(n)), Some(json!(p))])
                .unwrap()
                .unwrap()
        };
        assert_eq!(round(2.5, 0), json!(2));
        assert_eq!(round(3.5, 0), json!(4));
        assert_eq!(round(-2.5, 0), json!(-2));
        assert_eq!(round(1.234, 2), json!(1.23));
        assert_eq!(
            call(Function::Round, vec![Some(json!(2.6))]).unwrap(),
            Some(json!(3))
        );
    }

    #[test]
    fn substring_semantics() {
        assert_eq!(substring("chargeback", 0, Some(6)), "charge");
        assert_eq!(substring("chargeback", -4, None), "back");
        assert_eq!(substring("chargeback", 20, None), "");
        assert_eq!(substring("chargeback", 2, Some(0)), "");
        assert_eq!(substring("héllo", 1, Some(2)), "él");
    }

    #[test]
    fn contains_and_trim() {
        assert_eq!(
            call(Function::Contains, vec![Some(json!("fraudulent")), Some(json!("fraud"))])
                .unwrap(),
            Some(json!(true))
        );
        assert_eq!(
            call(Function::Contains, vec![Some(json!("fraudulent")), None]).unwrap(),
            None
        );
        assert_eq!(
            call1(Function::Trim, json!("  ch_1 ")).unwrap(),
            Some(json!("ch_1"))
        );
    }

    #[test]
    fn string_conversion() {
        assert_eq!(call1(Function::String, json!(10.0)).unwrap(), Some(json!("10")));
        assert_eq!(call1(Function::String, json!(false)).unwrap(), Some(json!("false")));
    }
}
