//! Nom parser for mapping source text.
//!
//! Every token parser consumes the whitespace and `/* */` comments that
//! follow it, so the grammar functions below only deal with tokens.
//! Precedence, lowest first: conditional, `??`, `or`, `and`, comparison,
//! `&`, `+ -`, `* / %`, unary minus, path steps.

use std::collections::HashSet;

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_until},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace1, one_of, satisfy},
    combinator::{all_consuming, cut, map, map_res, not, opt, recognize, value},
    error::{convert_error, VerboseError, VerboseErrorKind},
    multi::{many0, many0_count, separated_list0},
    sequence::{delimited, pair, preceded, separated_pair, terminated, tuple},
    IResult,
};
use serde_json::Value;

use crate::ast::{BinaryOp, Expr, Function, Step};
use crate::document::number_value;
use crate::error::CompileError;

type Res<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// Brackets and conditionals may nest at most this deep.
pub const MAX_NESTING: usize = 64;

/// Deepest expression tree the compiler builds, counting operator chains.
pub const MAX_DEPTH: usize = 256;

const UNKNOWN_FUNCTION: &str = "unknown function";
const TOO_DEEP: &str = "too deep";

/// Parses and checks a complete program.
pub(crate) fn parse_program(source: &str) -> Result<Expr, CompileError> {
    if source.trim().is_empty() {
        return Err(CompileError::Empty);
    }
    if nesting_depth(source) > MAX_NESTING {
        return Err(CompileError::TooDeep(MAX_NESTING));
    }

    let expr = match all_consuming(preceded(skip, expression))(source) {
        Ok((_, expr)) => expr,
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => return Err(describe(source, e)),
        Err(nom::Err::Incomplete(_)) => {
            return Err(CompileError::Syntax("incomplete input".to_string()))
        }
    };

    if expr.depth() > MAX_DEPTH {
        return Err(CompileError::TooDeep(MAX_DEPTH));
    }
    check(&expr)?;
    Ok(expr)
}

fn describe(source: &str, err: VerboseError<&str>) -> CompileError {
    for (at, kind) in &err.errors {
        match kind {
            VerboseErrorKind::Context(ctx) if *ctx == UNKNOWN_FUNCTION => {
                let name: String = at
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                    .collect();
                return CompileError::UnknownFunction(name);
            }
            VerboseErrorKind::Context(ctx) if *ctx == TOO_DEEP => {
                return CompileError::TooDeep(MAX_DEPTH);
            }
            _ => {}
        }
    }
    CompileError::Syntax(convert_error(source, err))
}

fn too_deep(at: &str) -> nom::Err<VerboseError<&str>> {
    nom::Err::Failure(VerboseError {
        errors: vec![(at, VerboseErrorKind::Context(TOO_DEEP))],
    })
}

/// Deepest nesting of brackets and conditionals outside string literals.
///
/// The parser recurses once per level of either, so this bounds its stack
/// before it runs. A conditional's branches run to the next `,` or closing
/// bracket, so `a ? b : c ? d : e` counts two levels.
fn nesting_depth(source: &str) -> usize {
    // Open conditionals per bracket level.
    let mut open: Vec<usize> = vec![0];
    let mut depth = 0usize;
    let mut deepest = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' && q != '`' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '(' | '[' | '{' => {
                open.push(0);
                depth += 1;
                deepest = deepest.max(depth);
            }
            ')' | ']' | '}' if open.len() > 1 => {
                let conditionals = open.pop().unwrap_or(0);
                depth = depth.saturating_sub(conditionals + 1);
            }
            '?' if chars.peek() == Some(&'?') => {
                chars.next();
            }
            '?' => {
                if let Some(level) = open.last_mut() {
                    *level += 1;
                }
                depth += 1;
                deepest = deepest.max(depth);
            }
            ',' => {
                if let Some(level) = open.last_mut() {
                    depth = depth.saturating_sub(std::mem::take(level));
                }
            }
            _ => {}
        }
    }
    deepest
}

/// Post-parse checks: function arity and duplicate object keys.
fn check(expr: &Expr) -> Result<(), CompileError> {
    match expr {
        Expr::Literal(_) | Expr::Context => Ok(()),
        Expr::Path { base, .. } => check(base),
        Expr::Object(members) => {
            let mut seen = HashSet::with_capacity(members.len());
            for (key, member) in members {
                if !seen.insert(key.as_str()) {
                    return Err(CompileError::DuplicateKey(key.clone()));
                }
                check(member)?;
            }
            Ok(())
        }
        Expr::Array(items) => items.iter().try_for_each(check),
        Expr::Negate(inner) => check(inner),
        Expr::Binary { left, right, .. } => {
            check(left)?;
            check(right)
        }
        Expr::Conditional {
            test,
            then,
            otherwise,
        } => {
            check(test)?;
            check(then)?;
            otherwise.as_deref().map_or(Ok(()), check)
        }
        Expr::Call { function, args } => {
            let (min, max) = function.arity();
            if args.len() < min || args.len() > max {
                let expected = if min == max {
                    min.to_string()
                } else {
                    format!("{min}-{max}")
                };
                return Err(CompileError::Arity {
                    function: function.name().trim_start_matches('$').to_string(),
                    expected,
                    found: args.len(),
                });
            }
            args.iter().try_for_each(check)
        }
    }
}

// ============================================================================
// Lexical helpers
// ============================================================================

fn skip(input: &str) -> Res<'_, ()> {
    value((), many0_count(alt((multispace1, comment))))(input)
}

fn comment(input: &str) -> Res<'_, &str> {
    recognize(tuple((tag("/*"), take_until("*/"), tag("*/"))))(input)
}

fn token<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> Res<'a, O>
where
    F: FnMut(&'a str) -> Res<'a, O>,
{
    terminated(inner, skip)
}

fn symbol<'a>(text: &'static str) -> impl FnMut(&'a str) -> Res<'a, &'a str> {
    token(tag(text))
}

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> Res<'a, &'a str> {
    token(terminated(tag(word), not(ident_char)))
}

fn ident_char(input: &str) -> Res<'_, char> {
    satisfy(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

fn identifier(input: &str) -> Res<'_, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(input)
}

/// A field name: bare identifier or `backtick quoted`.
fn name(input: &str) -> Res<'_, String> {
    token(alt((
        map(identifier, str::to_string),
        map(delimited(char('`'), is_not("`"), char('`')), str::to_string),
    )))(input)
}

fn escape(input: &str) -> Res<'_, &str> {
    alt((
        value("\\", char('\\')),
        value("\"", char('"')),
        value("'", char('\'')),
        value("/", char('/')),
        value("\n", char('n')),
        value("\r", char('r')),
        value("\t", char('t')),
    ))(input)
}

fn double_quoted(input: &str) -> Res<'_, String> {
    delimited(
        char('"'),
        map(
            opt(escaped_transform(is_not("\"\\"), '\\', escape)),
            Option::unwrap_or_default,
        ),
        char('"'),
    )(input)
}

fn single_quoted(input: &str) -> Res<'_, String> {
    delimited(
        char('\''),
        map(
            opt(escaped_transform(is_not("'\\"), '\\', escape)),
            Option::unwrap_or_default,
        ),
        char('\''),
    )(input)
}

fn string_literal(input: &str) -> Res<'_, String> {
    token(alt((double_quoted, single_quoted)))(input)
}

fn number(input: &str) -> Res<'_, Value> {
    token(map_res(
        recognize(tuple((
            digit1,
            opt(pair(char('.'), digit1)),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        parse_number,
    ))(input)
}

fn parse_number(text: &str) -> Result<Value, String> {
    if !text.contains(['.', 'e', 'E']) {
        if let Ok(int) = text.parse::<i64>() {
            return Ok(Value::from(int));
        }
    }
    let float: f64 = text.parse().map_err(|e| format!("{e}"))?;
    number_value(float).ok_or_else(|| "number literal out of range".to_string())
}

fn signed_integer(input: &str) -> Res<'_, i64> {
    token(map_res(
        recognize(pair(opt(char('-')), digit1)),
        str::parse::<i64>,
    ))(input)
}

// ============================================================================
// Grammar
// ============================================================================

fn expression(input: &str) -> Res<'_, Expr> {
    let (input, test) = coalesce(input)?;
    let (input, branches) = opt(preceded(
        symbol("?"),
        cut(pair(expression, opt(preceded(symbol(":"), expression)))),
    ))(input)?;

    let expr = match branches {
        Some((then, otherwise)) => Expr::Conditional {
            test: Box::new(test),
            then: Box::new(then),
            otherwise: otherwise.map(Box::new),
        },
        None => test,
    };
    Ok((input, expr))
}

/// One precedence level of left-associative operators.
///
/// Chains like `1 + 1 + ...` grow the tree without brackets, so the depth
/// is tracked as the chain is folded and the parse fails once it passes
/// [`MAX_DEPTH`].
fn left_assoc<'a>(
    input: &'a str,
    operand: fn(&'a str) -> Res<'a, Expr>,
    operator: fn(&'a str) -> Res<'a, BinaryOp>,
) -> Res<'a, Expr> {
    let (mut input, mut expr) = operand(input)?;
    let mut depth = None;
    loop {
        match pair(operator, operand)(input) {
            Ok((rest, (op, right))) => {
                let left = depth.unwrap_or_else(|| expr.depth());
                let next = left.max(right.depth()) + 1;
                if next > MAX_DEPTH {
                    return Err(too_deep(input));
                }
                depth = Some(next);
                expr = Expr::binary(op, expr, right);
                input = rest;
            }
            Err(nom::Err::Error(_)) => return Ok((input, expr)),
            Err(e) => return Err(e),
        }
    }
}

fn coalesce(input: &str) -> Res<'_, Expr> {
    left_assoc(input, disjunction, |i| {
        value(BinaryOp::Coalesce, symbol("??"))(i)
    })
}

fn disjunction(input: &str) -> Res<'_, Expr> {
    left_assoc(input, conjunction, |i| value(BinaryOp::Or, keyword("or"))(i))
}

fn conjunction(input: &str) -> Res<'_, Expr> {
    left_assoc(input, comparison, |i| value(BinaryOp::And, keyword("and"))(i))
}

fn comparison(input: &str) -> Res<'_, Expr> {
    let (input, left) = concatenation(input)?;
    let (input, rest) = opt(pair(comparison_op, concatenation))(input)?;
    let expr = match rest {
        Some((op, right)) => Expr::binary(op, left, right),
        None => left,
    };
    Ok((input, expr))
}

fn comparison_op(input: &str) -> Res<'_, BinaryOp> {
    alt((
        value(BinaryOp::Ne, symbol("!=")),
        value(BinaryOp::Le, symbol("<=")),
        value(BinaryOp::Ge, symbol(">=")),
        value(BinaryOp::Eq, symbol("=")),
        value(BinaryOp::Lt, symbol("<")),
        value(BinaryOp::Gt, symbol(">")),
    ))(input)
}

fn concatenation(input: &str) -> Res<'_, Expr> {
    left_assoc(input, additive, |i| value(BinaryOp::Concat, symbol("&"))(i))
}

fn additive(input: &str) -> Res<'_, Expr> {
    left_assoc(input, multiplicative, |i| {
        alt((
            value(BinaryOp::Add, symbol("+")),
            value(BinaryOp::Sub, symbol("-")),
        ))(i)
    })
}

fn multiplicative(input: &str) -> Res<'_, Expr> {
    left_assoc(input, unary, |i| {
        alt((
            value(BinaryOp::Mul, symbol("*")),
            value(BinaryOp::Div, symbol("/")),
            value(BinaryOp::Rem, symbol("%")),
        ))(i)
    })
}

fn unary(input: &str) -> Res<'_, Expr> {
    let start = input;
    let (input, negations) = many0_count(symbol("-"))(input)?;
    if negations >= MAX_DEPTH {
        return Err(too_deep(start));
    }
    let (input, operand) = postfix(input)?;
    if negations > 0 && operand.depth() + negations > MAX_DEPTH {
        return Err(too_deep(start));
    }
    let expr = (0..negations).fold(operand, |inner, _| Expr::Negate(Box::new(inner)));
    Ok((input, expr))
}

fn postfix(input: &str) -> Res<'_, Expr> {
    let (input, base) = primary(input)?;
    let (input, steps) = many0(step)(input)?;
    Ok((input, base.with_steps(steps)))
}

fn step(input: &str) -> Res<'_, Step> {
    alt((
        map(preceded(symbol("."), cut(name)), Step::Field),
        map(
            delimited(symbol("["), cut(signed_integer), cut(symbol("]"))),
            Step::Index,
        ),
    ))(input)
}

fn primary(input: &str) -> Res<'_, Expr> {
    alt((
        map(number, Expr::Literal),
        map(string_literal, |s| Expr::Literal(Value::String(s))),
        literal_keyword,
        call,
        value(Expr::Context, token(terminated(char('$'), not(ident_char)))),
        object,
        array,
        delimited(symbol("("), cut(expression), cut(symbol(")"))),
        map(name, Expr::field),
    ))(input)
}

fn literal_keyword(input: &str) -> Res<'_, Expr> {
    alt((
        value(Expr::Literal(Value::Bool(true)), keyword("true")),
        value(Expr::Literal(Value::Bool(false)), keyword("false")),
        value(Expr::Literal(Value::Null), keyword("null")),
    ))(input)
}

fn call(input: &str) -> Res<'_, Expr> {
    let (input, _) = char('$')(input)?;
    let name_at = input;
    let (input, function_name) = identifier(input)?;
    let (input, _) = skip(input)?;
    let (input, _) = symbol("(")(input)?;

    let function = Function::from_name(function_name).ok_or_else(|| {
        nom::Err::Failure(VerboseError {
            errors: vec![(name_at, VerboseErrorKind::Context(UNKNOWN_FUNCTION))],
        })
    })?;

    let (input, args) = cut(terminated(
        separated_list0(symbol(","), expression),
        symbol(")"),
    ))(input)?;
    Ok((input, Expr::Call { function, args }))
}

fn object(input: &str) -> Res<'_, Expr> {
    let (input, _) = symbol("{")(input)?;
    let (input, members) = cut(terminated(
        separated_list0(symbol(","), member),
        pair(opt(symbol(",")), symbol("}")),
    ))(input)?;
    Ok((input, Expr::Object(members)))
}

fn member(input: &str) -> Res<'_, (String, Expr)> {
    separated_pair(alt((string_literal, name)), symbol(":"), cut(expression))(input)
}

fn array(input: &str) -> Res<'_, Expr> {
    let (input, _) = symbol("[")(input)?;
    let (input, items) = cut(terminated(
        separated_list0(symbol(","), expression),
        pair(opt(symbol(",")), symbol("]")),
    ))(input)?;
    Ok((input, Expr::Array(items)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field_path(names: &[&str]) -> Expr {
        Expr::Path {
            base: Box::new(Expr::Context),
            steps: names.iter().map(|n| Step::Field(n.to_string())).collect(),
        }
    }

    #[test]
    fn parses_dotted_paths() {
        let expr = parse_program("data.object.charge").unwrap();
        assert_eq!(expr, field_path(&["data", "object", "charge"]));
    }

    #[test]
    fn parses_root_reference_and_backticks() {
        let expr = parse_program("$.`event-type`[0]").unwrap();
        assert_eq!(
            expr,
            Expr::Path {
                base: Box::new(Expr::Context),
                steps: vec![Step::Field("event-type".into()), Step::Index(0)],
            }
        );
        assert_eq!(parse_program("$").unwrap(), Expr::Context);
    }

    #[test]
    fn arithmetic_precedence() {
        let expr = parse_program("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOp::Add,
                Expr::Literal(json!(1)),
                Expr::binary(BinaryOp::Mul, Expr::Literal(json!(2)), Expr::Literal(json!(3))),
            )
        );
    }

    #[test]
    fn subtraction_is_left_associative() {
        let expr = parse_program("10 - 4 - 3").unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOp::Sub,
                Expr::binary(BinaryOp::Sub, Expr::Literal(json!(10)), Expr::Literal(json!(4))),
                Expr::Literal(json!(3)),
            )
        );
    }

    #[test]
    fn parses_object_constructor_with_comments_and_trailing_comma() {
        let source = r#"
            /* stripe dispute */
            {
              "transaction_id": data.object.charge,
              amount: data.object.amount / 100,
              'provider': "stripe",
            }
        "#;
        let expr = parse_program(source).unwrap();
        match expr {
            Expr::Object(members) => {
                let keys: Vec<&str> = members.iter().map(|(k, _)| k.as_str()).collect();
                assert_eq!(keys, vec!["transaction_id", "amount", "provider"]);
            }
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn parses_function_calls() {
        let expr = parse_program("$uppercase(data.object.currency)").unwrap();
        assert_eq!(
            expr,
            Expr::Call {
                function: Function::Uppercase,
                args: vec![field_path(&["data", "object", "currency"])],
            }
        );
    }

    #[test]
    fn parses_conditional_and_coalesce() {
        let expr = parse_program("a ?? b ? 'yes' : 'no'").unwrap();
        match expr {
            Expr::Conditional { test, otherwise, .. } => {
                assert!(matches!(
                    *test,
                    Expr::Binary {
                        op: BinaryOp::Coalesce,
                        ..
                    }
                ));
                assert!(otherwise.is_some());
            }
            other => panic!("expected conditional, got {other:?}"),
        }
    }

    #[test]
    fn keywords_need_word_boundaries() {
        let expr = parse_program("trueValue and nullable").unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOp::And,
                field_path(&["trueValue"]),
                field_path(&["nullable"]),
            )
        );
    }

    #[test]
    fn string_escapes() {
        let expr = parse_program(r#""a\"b\n""#).unwrap();
        assert_eq!(expr, Expr::Literal(json!("a\"b\n")));
        assert_eq!(parse_program("''").unwrap(), Expr::Literal(json!("")));
    }

    #[test]
    fn rejects_unknown_function() {
        let err = parse_program("$eval('1')").unwrap_err();
        assert_eq!(err, CompileError::UnknownFunction("eval".into()));
    }

    #[test]
    fn rejects_wrong_arity() {
        let err = parse_program("$uppercase(a, b)").unwrap_err();
        assert!(matches!(err, CompileError::Arity { found: 2, .. }));
        let err = parse_program("$substring(a)").unwrap_err();
        assert!(matches!(err, CompileError::Arity { ref expected, .. } if expected == "2-3"));
    }

    #[test]
    fn rejects_duplicate_keys() {
        let err = parse_program(r#"{"a": 1, "a": 2}"#).unwrap_err();
        assert_eq!(err, CompileError::DuplicateKey("a".into()));
    }

    #[test]
    fn rejects_malformed_source() {
        for source in ["{", "a +", "(a", "data.", "{\"a\" 1}", "a b", "1 = = 2"] {
            let err = parse_program(source).unwrap_err();
            assert!(
                matches!(err, CompileError::Syntax(_)),
                "{source:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn rejects_empty_and_deep_sources() {
        assert_eq!(parse_program("  \n "), Err(CompileError::Empty));
        let deep = format!("{}1{}", "(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1));
        assert_eq!(parse_program(&deep), Err(CompileError::TooDeep(MAX_NESTING)));
    }

    #[test]
    fn nesting_ignores_brackets_in_strings() {
        assert_eq!(nesting_depth(r#"{"a": "((((", b: [1]}"#), 2);
    }

    #[test]
    fn nesting_counts_chained_conditionals() {
        assert_eq!(nesting_depth("a ?? b ?? c"), 0);
        assert_eq!(nesting_depth("a ? b : c ? d : e"), 2);
        assert_eq!(nesting_depth("{x: a ? 1 : 2, y: b ? 3 : 4}"), 2);
        assert_eq!(nesting_depth("(a ? 1 : 2) & (b ? 3 : 4)"), 2);
        assert_eq!(nesting_depth("'?' & \"??\""), 0);
    }

    #[test]
    fn long_operator_chains_are_rejected_without_overflowing() {
        for source in [
            format!("1{}", " + 1".repeat(20_000)),
            format!("a{}", " ?? a".repeat(20_000)),
            format!("a{}", " and a".repeat(20_000)),
            format!("{}1", "-".repeat(20_000)),
            format!("{}1", "- ".repeat(MAX_DEPTH)),
            format!("{{x: 1{}}}", " & 'x'".repeat(20_000)),
        ] {
            assert_eq!(
                parse_program(&source),
                Err(CompileError::TooDeep(MAX_DEPTH)),
                "{}...",
                &source[..20]
            );
        }
    }

    #[test]
    fn long_conditional_chains_are_rejected_without_overflowing() {
        let source = format!("{}0", "a ? 1 : ".repeat(20_000));
        assert_eq!(parse_program(&source), Err(CompileError::TooDeep(MAX_NESTING)));

        let nested = format!("{}0", "a ? ".repeat(20_000));
        assert_eq!(parse_program(&nested), Err(CompileError::TooDeep(MAX_NESTING)));
    }

    #[test]
    fn chains_within_the_limit_still_compile() {
        let source = format!("1{}", " + 1".repeat(MAX_DEPTH - 2));
        let expr = parse_program(&source).unwrap();
        assert_eq!(expr.depth(), MAX_DEPTH - 1);

        let ternaries = format!("{}0", "a ? 1 : ".repeat(MAX_NESTING));
        assert!(parse_program(&ternaries).is_ok());
    }
}
