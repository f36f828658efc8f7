//! Standard operator catalog: comparison, logic, arithmetic, strings,
//! collections, type predicates, and positional arguments.
//!
//! Arguments arrive already cast to their declared kind, so every value is
//! either of that kind or null.

use crate::cast::{ValueKind, number_value, parse_strict_number};
use crate::error::ErrorKind;
use crate::registry::{OperatorResult, Operators, Signature};
use crate::runtime::Context;
use serde_json::Value;

pub fn register_standard(ops: &mut Operators) {
    use ValueKind::{Any, Boolean, Number, String};

    ops.define("equals", Signature::new(&[String, String], Boolean), op_equals);
    ops.define("notEquals", Signature::new(&[String, String], Boolean), op_not_equals);
    ops.define("lessThan", Signature::new(&[Number, Number], Boolean), op_less_than);
    ops.define("greaterThan", Signature::new(&[Number, Number], Boolean), op_greater_than);
    ops.define("lessThanEq", Signature::new(&[Number, Number], Boolean), op_less_than_eq);
    ops.define("greaterThanEq", Signature::new(&[Number, Number], Boolean), op_greater_than_eq);

    ops.define("and", Signature::new(&[Boolean], Boolean).spreading(), op_and);
    ops.define("or", Signature::new(&[Boolean], Boolean).spreading(), op_or);
    ops.define("not", Signature::new(&[Boolean], Boolean), op_not);
    ops.define(
        "if",
        Signature::new(&[Boolean, Any, String, Any], Any).min_args(2),
        op_if,
    );

    ops.define("add", Signature::new(&[Number, Number], Number).spreading(), op_add);
    ops.define("subtract", Signature::new(&[Number, Number], Number), op_subtract);
    ops.define("multiply", Signature::new(&[Number, Number], Number).spreading(), op_multiply);
    ops.define("divide", Signature::new(&[Number, Number], Number), op_divide);
    ops.define("round", Signature::new(&[Number, Number], Number).min_args(1), op_round);

    ops.define("concat", Signature::new(&[String], String).spreading().min_args(0), op_concat);
    ops.define("lowerCase", Signature::new(&[String], String), op_lower_case);
    ops.define("upperCase", Signature::new(&[String], String), op_upper_case);
    ops.define("lowerCaseFirst", Signature::new(&[String], String), op_lower_case_first);
    ops.define("upperCaseFirst", Signature::new(&[String], String), op_upper_case_first);
    ops.define("length", Signature::new(&[String], Number), op_length);
    ops.define("contains", Signature::new(&[String, String], Boolean), op_contains);
    ops.define("notContains", Signature::new(&[String, String], Boolean), op_not_contains);
    ops.define("startsWith", Signature::new(&[String, String], Boolean), op_starts_with);
    ops.define("endsWith", Signature::new(&[String, String], Boolean), op_ends_with);
    ops.define("commaContains", Signature::new(&[String, String], Boolean), op_comma_contains);
    ops.define("stringIndexOf", Signature::new(&[String, String], Number), op_string_index_of);
    ops.define(
        "stringSlice",
        Signature::new(&[String, Number, Number], String).min_args(2),
        op_string_slice,
    );
    ops.define(
        "stringReplace",
        Signature::new(&[String, String, String], String),
        op_string_replace,
    );

    ops.define("count", Signature::new(&[Any], Number).spreading().min_args(0), op_count);
    ops.define("isEmpty", Signature::new(&[Any], Boolean), op_is_empty);
    ops.define("isNumber", Signature::new(&[Any], Boolean), op_is_number);
    ops.define("isString", Signature::new(&[Any], Boolean), op_is_string);

    ops.define("argv", Signature::new(&[Number], Any), op_argv);
}

fn str_arg(args: &[Value], index: usize) -> Option<&str> {
    args.get(index).and_then(Value::as_str)
}

fn num_arg(args: &[Value], index: usize) -> Option<f64> {
    args.get(index).and_then(Value::as_f64)
}

fn is_true(value: &Value) -> bool {
    value.as_bool() == Some(true)
}

/// All operands as numbers, or `None` if any is null.
fn numbers(args: &[Value]) -> Option<Vec<f64>> {
    args.iter().map(Value::as_f64).collect()
}

fn compare(args: &[Value], accept: fn(f64, f64) -> bool) -> OperatorResult {
    let out = match (num_arg(args, 0), num_arg(args, 1)) {
        (Some(a), Some(b)) => accept(a, b),
        _ => false,
    };
    Ok(Value::Bool(out))
}

fn op_equals(args: &[Value], _ctx: &Context) -> OperatorResult {
    Ok(Value::Bool(args[0] == args[1]))
}

fn op_not_equals(args: &[Value], _ctx: &Context) -> OperatorResult {
    Ok(Value::Bool(args[0] != args[1]))
}

fn op_less_than(args: &[Value], _ctx: &Context) -> OperatorResult {
    compare(args, |a, b| a < b)
}

fn op_greater_than(args: &[Value], _ctx: &Context) -> OperatorResult {
    compare(args, |a, b| a > b)
}

fn op_less_than_eq(args: &[Value], _ctx: &Context) -> OperatorResult {
    compare(args, |a, b| a <= b)
}

fn op_greater_than_eq(args: &[Value], _ctx: &Context) -> OperatorResult {
    compare(args, |a, b| a >= b)
}

fn op_and(args: &[Value], _ctx: &Context) -> OperatorResult {
    Ok(Value::Bool(args.iter().all(is_true)))
}

fn op_or(args: &[Value], _ctx: &Context) -> OperatorResult {
    Ok(Value::Bool(args.iter().any(is_true)))
}

fn op_not(args: &[Value], _ctx: &Context) -> OperatorResult {
    Ok(Value::Bool(!is_true(&args[0])))
}

/// `["if", cond, then]` or `["if", cond, then, "else", otherwise]`.
///
/// Both branches have been evaluated by the time this runs.
fn op_if(args: &[Value], _ctx: &Context) -> OperatorResult {
    let otherwise = match args.len() {
        2 => Value::Null,
        4 if str_arg(args, 2) == Some("else") => args[3].clone(),
        _ => {
            return Err(ErrorKind::invalid(
                "if",
                "expected [\"if\", condition, then] or [\"if\", condition, then, \"else\", otherwise]",
            ));
        }
    };
    if is_true(&args[0]) {
        Ok(args[1].clone())
    } else {
        Ok(otherwise)
    }
}

fn op_add(args: &[Value], _ctx: &Context) -> OperatorResult {
    Ok(numbers(args).map_or(Value::Null, |n| number_value(n.iter().sum())))
}

fn op_subtract(args: &[Value], _ctx: &Context) -> OperatorResult {
    Ok(match (num_arg(args, 0), num_arg(args, 1)) {
        (Some(a), Some(b)) => number_value(a - b),
        _ => Value::Null,
    })
}

fn op_multiply(args: &[Value], _ctx: &Context) -> OperatorResult {
    Ok(numbers(args).map_or(Value::Null, |n| number_value(n.iter().product())))
}

fn op_divide(args: &[Value], _ctx: &Context) -> OperatorResult {
    match (num_arg(args, 0), num_arg(args, 1)) {
        (Some(_), Some(b)) if b == 0.0 => Err(ErrorKind::DivisionByZero),
        (Some(a), Some(b)) => Ok(number_value(a / b)),
        _ => Ok(Value::Null),
    }
}

fn op_round(args: &[Value], _ctx: &Context) -> OperatorResult {
    let Some(n) = num_arg(args, 0) else {
        return Ok(Value::Null);
    };
    let decimals = num_arg(args, 1).unwrap_or(0.0);
    if decimals < 0.0 || decimals.fract() != 0.0 || decimals > 15.0 {
        return Err(ErrorKind::invalid(
            "round",
            format!("decimal places must be a whole number from 0 to 15, got {decimals}"),
        ));
    }
    let factor = 10f64.powi(decimals as i32);
    // Ties round away from zero.
    Ok(number_value((n * factor).round() / factor))
}

fn op_concat(args: &[Value], _ctx: &Context) -> OperatorResult {
    let mut out = String::new();
    for arg in args {
        if let Value::String(s) = arg {
            out.push_str(s);
        }
    }
    Ok(Value::String(out))
}

fn map_str(args: &[Value], f: impl FnOnce(&str) -> String) -> OperatorResult {
    Ok(str_arg(args, 0).map_or(Value::Null, |s| Value::String(f(s))))
}

fn op_lower_case(args: &[Value], _ctx: &Context) -> OperatorResult {
    map_str(args, str::to_lowercase)
}

fn op_upper_case(args: &[Value], _ctx: &Context) -> OperatorResult {
    map_str(args, str::to_uppercase)
}

fn op_lower_case_first(args: &[Value], _ctx: &Context) -> OperatorResult {
    map_str(args, |s| {
        let mut chars = s.chars();
        match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => String::new(),
        }
    })
}

fn op_upper_case_first(args: &[Value], _ctx: &Context) -> OperatorResult {
    map_str(args, |s| {
        let mut chars = s.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    })
}

fn op_length(args: &[Value], _ctx: &Context) -> OperatorResult {
    Ok(Value::from(str_arg(args, 0).map_or(0, |s| s.chars().count())))
}

fn op_contains(args: &[Value], _ctx: &Context) -> OperatorResult {
    Ok(Value::Bool(match (str_arg(args, 0), str_arg(args, 1)) {
        (Some(hay), Some(needle)) => hay.contains(needle),
        _ => false,
    }))
}

fn op_not_contains(args: &[Value], ctx: &Context) -> OperatorResult {
    let contains = op_contains(args, ctx)?;
    Ok(Value::Bool(!is_true(&contains)))
}

fn op_starts_with(args: &[Value], _ctx: &Context) -> OperatorResult {
    Ok(Value::Bool(match (str_arg(args, 0), str_arg(args, 1)) {
        (Some(s), Some(prefix)) => s.starts_with(prefix),
        _ => false,
    }))
}

fn op_ends_with(args: &[Value], _ctx: &Context) -> OperatorResult {
    Ok(Value::Bool(match (str_arg(args, 0), str_arg(args, 1)) {
        (Some(s), Some(suffix)) => s.ends_with(suffix),
        _ => false,
    }))
}

fn op_comma_contains(args: &[Value], _ctx: &Context) -> OperatorResult {
    Ok(Value::Bool(match (str_arg(args, 0), str_arg(args, 1)) {
        (Some(list), Some(item)) => list.split(',').any(|entry| entry.trim() == item),
        _ => false,
    }))
}

fn op_string_index_of(args: &[Value], _ctx: &Context) -> OperatorResult {
    let (Some(s), Some(needle)) = (str_arg(args, 0), str_arg(args, 1)) else {
        return Ok(Value::Null);
    };
    let index = match s.find(needle) {
        Some(byte) => s[..byte].chars().count() as i64,
        None => -1,
    };
    Ok(Value::from(index))
}

/// `["stringSlice", s, start, length?]`, counting characters.
/// A negative start counts from the end.
fn op_string_slice(args: &[Value], _ctx: &Context) -> OperatorResult {
    let Some(s) = str_arg(args, 0) else {
        return Ok(Value::Null);
    };
    let start = num_arg(args, 1).unwrap_or(0.0);
    let length = num_arg(args, 2);
    if start.fract() != 0.0 || length.is_some_and(|l| l < 0.0 || l.fract() != 0.0) {
        return Err(ErrorKind::invalid(
            "stringSlice",
            "start must be a whole number and length a non-negative whole number",
        ));
    }

    let chars: Vec<char> = s.chars().collect();
    let total = chars.len() as i64;
    let start = start as i64;
    let from = if start < 0 {
        total.saturating_add(start).max(0)
    } else {
        start.min(total)
    };
    let from = from as usize;
    let to = length.map_or(chars.len(), |l| {
        from.saturating_add(l.min(chars.len() as f64) as usize)
            .min(chars.len())
    });
    Ok(Value::String(chars[from..to].iter().collect()))
}

fn op_string_replace(args: &[Value], _ctx: &Context) -> OperatorResult {
    let Some(s) = str_arg(args, 0) else {
        return Ok(Value::Null);
    };
    let search = str_arg(args, 1).unwrap_or_default();
    if search.is_empty() {
        return Ok(Value::String(s.to_string()));
    }
    let replacement = str_arg(args, 2).unwrap_or_default();
    Ok(Value::String(s.replace(search, replacement)))
}

fn op_count(args: &[Value], _ctx: &Context) -> OperatorResult {
    Ok(Value::from(args.iter().filter(|v| !v.is_null()).count()))
}

fn op_is_empty(args: &[Value], _ctx: &Context) -> OperatorResult {
    Ok(Value::Bool(match &args[0] {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }))
}

fn op_is_number(args: &[Value], _ctx: &Context) -> OperatorResult {
    Ok(Value::Bool(match &args[0] {
        Value::Number(_) => true,
        Value::String(s) => parse_strict_number(s).is_some(),
        _ => false,
    }))
}

fn op_is_string(args: &[Value], _ctx: &Context) -> OperatorResult {
    Ok(Value::Bool(args[0].is_string()))
}

fn op_argv(args: &[Value], ctx: &Context) -> OperatorResult {
    let index = num_arg(args, 0)
        .filter(|i| *i >= 0.0 && i.fract() == 0.0)
        .ok_or_else(|| ErrorKind::invalid("argv", "index must be a non-negative whole number"))?
        as usize;
    let available = ctx.positional_arguments.unwrap_or_default();
    available
        .get(index)
        .cloned()
        .ok_or(ErrorKind::PositionalArgument {
            index,
            available: available.len(),
        })
}

#[cfg(test)]
mod tests {
    use crate::config::EvalConfig;
    use crate::context::{NoSources, NodeLocation};
    use crate::engine::Engine;
    use crate::error::ErrorKind;
    use serde_json::{Value, json};

    fn eval(expr: Value) -> Value {
        Engine::new()
            .evaluate(&expr, &NoSources, &NodeLocation::Detached, None)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    fn eval_err(expr: Value) -> ErrorKind {
        Engine::new()
            .evaluate(&expr, &NoSources, &NodeLocation::Detached, None)
            .unwrap_err()
            .kind
    }

    #[test]
    fn equality_compares_as_strings() {
        assert_eq!(eval(json!(["equals", 1, "1"])), json!(true));
        assert_eq!(eval(json!(["equals", true, "TRUE"])), json!(true));
        assert_eq!(eval(json!(["equals", null, "null"])), json!(true));
        assert_eq!(eval(json!(["equals", "a", "b"])), json!(false));
        assert_eq!(eval(json!(["notEquals", 2.5, "2.5"])), json!(false));
    }

    #[test]
    fn numeric_comparisons_treat_null_as_false() {
        assert_eq!(eval(json!(["lessThan", 1, "2"])), json!(true));
        assert_eq!(eval(json!(["greaterThanEq", 2, 2])), json!(true));
        assert_eq!(eval(json!(["greaterThan", null, 2])), json!(false));
        assert_eq!(eval(json!(["lessThanEq", 3, null])), json!(false));
    }

    #[test]
    fn logic() {
        assert_eq!(eval(json!(["and", true, "true", 1])), json!(true));
        assert_eq!(eval(json!(["and", true, null])), json!(false));
        assert_eq!(eval(json!(["or", false, "0", ["not", false]])), json!(true));
        assert_eq!(eval(json!(["not", null])), json!(true));
        assert!(matches!(
            eval_err(json!(["and"])),
            ErrorKind::ArgumentCount { min: 1, max: None, actual: 0, .. }
        ));
    }

    #[test]
    fn conditional_forms() {
        assert_eq!(eval(json!(["if", true, "yes"])), json!("yes"));
        assert_eq!(eval(json!(["if", false, "yes"])), Value::Null);
        assert_eq!(eval(json!(["if", false, "yes", "else", "no"])), json!("no"));
        assert!(matches!(
            eval_err(json!(["if", false, "yes", "otherwise", "no"])),
            ErrorKind::InvalidArgument { .. }
        ));
        assert!(matches!(
            eval_err(json!(["if", false, "yes", "else"])),
            ErrorKind::InvalidArgument { .. }
        ));
    }

    #[test]
    fn arithmetic() {
        assert_eq!(eval(json!(["add", 1, 2, "3"])), json!(6));
        assert_eq!(eval(json!(["add", 0.5, 0.25])), json!(0.75));
        assert_eq!(eval(json!(["subtract", 10, 4])), json!(6));
        assert_eq!(eval(json!(["multiply", 2, 3, 4])), json!(24));
        assert_eq!(eval(json!(["divide", 7, 2])), json!(3.5));
        assert_eq!(eval(json!(["add", 1, null])), Value::Null);
        assert_eq!(eval_err(json!(["divide", 1, 0])), ErrorKind::DivisionByZero);
        assert_eq!(eval(json!(["round", 2.346, 2])), json!(2.35));
        assert_eq!(eval(json!(["round", "2.5"])), json!(3));
        assert_eq!(eval(json!(["round", -2.5])), json!(-3));
        assert_eq!(eval(json!(["round", -0.5])), json!(-1));
        assert!(matches!(
            eval_err(json!(["round", 1, 1.5])),
            ErrorKind::InvalidArgument { .. }
        ));
    }

    #[test]
    fn strings() {
        assert_eq!(eval(json!(["concat", "a", null, 1, true])), json!("a1true"));
        assert_eq!(eval(json!(["concat"])), json!(""));
        assert_eq!(eval(json!(["lowerCase", "ÆBC"])), json!("æbc"));
        assert_eq!(eval(json!(["upperCase", null])), Value::Null);
        assert_eq!(eval(json!(["upperCaseFirst", "ola"])), json!("Ola"));
        assert_eq!(eval(json!(["lowerCaseFirst", "Ola"])), json!("ola"));
        assert_eq!(eval(json!(["length", "blåbær"])), json!(6));
        assert_eq!(eval(json!(["length", null])), json!(0));
        assert_eq!(eval(json!(["contains", "hello", "ell"])), json!(true));
        assert_eq!(eval(json!(["notContains", "hello", "xyz"])), json!(true));
        assert_eq!(eval(json!(["startsWith", "hello", "he"])), json!(true));
        assert_eq!(eval(json!(["endsWith", null, "lo"])), json!(false));
        assert_eq!(eval(json!(["commaContains", "a, b,c", "b"])), json!(true));
        assert_eq!(eval(json!(["stringIndexOf", "blåbær", "bær"])), json!(3));
        assert_eq!(eval(json!(["stringIndexOf", "abc", "z"])), json!(-1));
        assert_eq!(eval(json!(["stringSlice", "abcdef", 1, 3])), json!("bcd"));
        assert_eq!(eval(json!(["stringSlice", "abcdef", -2])), json!("ef"));
    }

    #[test]
    fn string_slice_clamps_out_of_range_bounds() {
        assert_eq!(eval(json!(["stringSlice", "abc", 1, 1e20])), json!("bc"));
        assert_eq!(eval(json!(["stringSlice", "abc", 5, 2])), json!(""));
        assert_eq!(eval(json!(["stringSlice", "abc", -1e20, 1])), json!("a"));
        assert_eq!(eval(json!(["stringSlice", "abc", 1e20])), json!(""));
        assert_eq!(eval(json!(["stringReplace", "a-b-c", "-", "+"])), json!("a+b+c"));
    }

    #[test]
    fn collections_and_predicates() {
        assert_eq!(eval(json!(["count", 1, null, "x"])), json!(2));
        assert_eq!(eval(json!(["count"])), json!(0));
        assert_eq!(eval(json!(["isEmpty", ""])), json!(true));
        assert_eq!(eval(json!(["isEmpty", null])), json!(true));
        assert_eq!(eval(json!(["isEmpty", 0])), json!(false));
        assert_eq!(eval(json!(["isNumber", "12.5"])), json!(true));
        assert_eq!(eval(json!(["isNumber", "12a"])), json!(false));
        assert_eq!(eval(json!(["isString", "12"])), json!(true));
        assert_eq!(eval(json!(["isString", 12])), json!(false));
    }

    #[test]
    fn positional_arguments() {
        let engine = Engine::new();
        let config = EvalConfig {
            positional_arguments: Some(vec![json!("first"), json!(2)]),
            ..EvalConfig::default()
        };
        let out = engine
            .evaluate(
                &json!(["concat", ["argv", 0], ["argv", "1"]]),
                &NoSources,
                &NodeLocation::Detached,
                Some(&config),
            )
            .unwrap();
        assert_eq!(out, json!("first2"));

        assert_eq!(
            eval_err(json!(["argv", 0])),
            ErrorKind::PositionalArgument {
                index: 0,
                available: 0
            }
        );
    }
}
