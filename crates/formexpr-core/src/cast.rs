//! Value kinds and the coercion table between them.
//!
//! Every operator parameter and return position is annotated with one
//! [`ValueKind`]. The evaluator moves values between positions through a
//! [`CastTable`], which holds one [`CastRule`] per target kind.

use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::fmt;

/// The closed set of expression value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Boolean,
    String,
    Number,
    Any,
}

impl ValueKind {
    pub const ALL: [ValueKind; 4] = [
        ValueKind::Boolean,
        ValueKind::String,
        ValueKind::Number,
        ValueKind::Any,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Boolean => "boolean",
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Any => "any",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "boolean" => Some(ValueKind::Boolean),
            "string" => Some(ValueKind::String),
            "number" => Some(ValueKind::Number),
            "any" => Some(ValueKind::Any),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind detected on a runtime JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeKind {
    Null,
    Known(ValueKind),
    /// Arrays and objects, which have no expression kind.
    Unsupported(&'static str),
}

impl RuntimeKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => RuntimeKind::Null,
            Value::Bool(_) => RuntimeKind::Known(ValueKind::Boolean),
            Value::Number(_) => RuntimeKind::Known(ValueKind::Number),
            Value::String(_) => RuntimeKind::Known(ValueKind::String),
            Value::Array(_) => RuntimeKind::Unsupported("array"),
            Value::Object(_) => RuntimeKind::Unsupported("object"),
        }
    }

    fn name(self) -> &'static str {
        match self {
            RuntimeKind::Null => "null",
            RuntimeKind::Known(kind) => kind.as_str(),
            RuntimeKind::Unsupported(name) => name,
        }
    }
}

/// Pure coercion from an accepted, non-null source value.
pub type Coercion = fn(&Value) -> Option<Value>;

/// How values are cast into one target kind.
#[derive(Debug, Clone)]
pub struct CastRule {
    pub nullable: bool,
    pub accepts: Vec<ValueKind>,
    pub coerce: Coercion,
}

/// Coercion rules keyed by target kind.
#[derive(Debug, Clone)]
pub struct CastTable {
    rules: HashMap<ValueKind, CastRule>,
}

impl CastTable {
    /// Table with no rules; every cast fails with `UnknownTargetType`.
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// The four standard rules.
    pub fn standard() -> Self {
        let mut table = Self::empty();
        let all = ValueKind::ALL.to_vec();
        table.insert(
            ValueKind::Boolean,
            CastRule {
                nullable: true,
                accepts: all.clone(),
                coerce: coerce_boolean,
            },
        );
        table.insert(
            ValueKind::String,
            CastRule {
                nullable: true,
                accepts: all.clone(),
                coerce: coerce_string,
            },
        );
        table.insert(
            ValueKind::Number,
            CastRule {
                nullable: true,
                accepts: all.clone(),
                coerce: coerce_number,
            },
        );
        table.insert(
            ValueKind::Any,
            CastRule {
                nullable: true,
                accepts: all,
                coerce: |value| Some(value.clone()),
            },
        );
        table
    }

    pub fn insert(&mut self, kind: ValueKind, rule: CastRule) -> Option<CastRule> {
        self.rules.insert(kind, rule)
    }

    pub fn remove(&mut self, kind: ValueKind) -> Option<CastRule> {
        self.rules.remove(&kind)
    }

    pub fn get(&self, kind: ValueKind) -> Option<&CastRule> {
        self.rules.get(&kind)
    }

    pub fn cast(&self, value: &Value, target: ValueKind) -> Result<Value, ErrorKind> {
        let rule = self
            .get(target)
            .ok_or(ErrorKind::UnknownTargetType { kind: target })?;

        let source = RuntimeKind::of(value);
        match source {
            RuntimeKind::Null if rule.nullable => return Ok(Value::Null),
            RuntimeKind::Known(kind) if rule.accepts.contains(&kind) => {}
            other => {
                return Err(ErrorKind::UnknownSourceType {
                    found: other.name().to_string(),
                    target,
                });
            }
        }

        (rule.coerce)(value).ok_or_else(|| ErrorKind::UnexpectedType {
            target,
            value: value.clone(),
        })
    }
}

impl Default for CastTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn coerce_boolean(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(b) => Some(Value::Bool(*b)),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(Value::Bool(true)),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(Value::Bool(false)),
        Value::String(s) => parse_strict_number(s).and_then(|n| bool_from_number(&n)),
        Value::Number(_) => bool_from_number(value),
        _ => None,
    }
}

fn bool_from_number(value: &Value) -> Option<Value> {
    let n = value.as_f64()?;
    if n == 1.0 {
        Some(Value::Bool(true))
    } else if n == 0.0 {
        Some(Value::Bool(false))
    } else {
        None
    }
}

fn coerce_string(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) if s.eq_ignore_ascii_case("null") => Some(Value::Null),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(Value::String("true".into())),
        Value::String(s) if s.eq_ignore_ascii_case("false") => {
            Some(Value::String("false".into()))
        }
        Value::String(s) => Some(Value::String(s.clone())),
        Value::Bool(b) => Some(Value::String(b.to_string())),
        Value::Number(n) => Some(Value::String(format_number(n))),
        _ => None,
    }
}

fn coerce_number(value: &Value) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value.clone()),
        Value::String(s) => parse_strict_number(s),
        _ => None,
    }
}

/// Parse `-?[0-9]+(\.[0-9]+)?`. Integers become JSON integers when they fit.
pub fn parse_strict_number(input: &str) -> Option<Value> {
    let unsigned = input.strip_prefix('-').unwrap_or(input);
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (unsigned, None),
    };
    if !is_digits(whole) || fraction.is_some_and(|f| !is_digits(f)) {
        return None;
    }
    if fraction.is_none() {
        if let Ok(n) = input.parse::<i64>() {
            return Some(Value::from(n));
        }
    }
    input.parse::<f64>().ok().map(number_value)
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Build a JSON number, folding integral floats into integers.
///
/// Non-finite results have no JSON form and become null.
pub fn number_value(f: f64) -> Value {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15 {
        return Value::from(f as i64);
    }
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

/// JSON-style number text: integral values print without a fraction.
pub fn format_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) => format_f64(f),
        None => n.to_string(),
    }
}

/// Shortest round-trip digits laid out the way JSON producers print
/// numbers: plain notation from `1e-6` up to `1e21`, exponent form outside.
pub(crate) fn format_f64(f: f64) -> String {
    if !f.is_finite() {
        return f.to_string();
    }
    if f == 0.0 {
        return "0".to_string();
    }
    let sci = format!("{:e}", f.abs());
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return f.to_string();
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return f.to_string();
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    // Position of the decimal point relative to the first digit.
    let n = exp + 1;

    let body = if k <= n && n <= 21 {
        format!("{digits}{}", "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        let (int, frac) = digits.split_at(n as usize);
        format!("{int}.{frac}")
    } else if -6 < n && n <= 0 {
        format!("0.{}{digits}", "0".repeat(n.unsigned_abs() as usize))
    } else {
        let (first, rest) = digits.split_at(1);
        let rest = if rest.is_empty() {
            String::new()
        } else {
            format!(".{rest}")
        };
        let sign = if n > 0 { '+' } else { '-' };
        format!("{first}{rest}e{sign}{}", (n - 1).unsigned_abs())
    };
    if f < 0.0 { format!("-{body}") } else { body }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cast(value: Value, kind: ValueKind) -> Result<Value, ErrorKind> {
        CastTable::standard().cast(&value, kind)
    }

    #[test]
    fn number_cast_follows_strict_grammar() {
        assert_eq!(cast(json!("42"), ValueKind::Number).unwrap(), json!(42));
        assert_eq!(cast(json!("-3.5"), ValueKind::Number).unwrap(), json!(-3.5));
        assert_eq!(cast(json!(7.25), ValueKind::Number).unwrap(), json!(7.25));
        for bad in ["3.", ".5", "abc", "1e3", "+1", "", "-", "1.2.3", " 4"] {
            assert!(
                matches!(
                    cast(json!(bad), ValueKind::Number),
                    Err(ErrorKind::UnexpectedType { target: ValueKind::Number, .. })
                ),
                "{bad:?} should not cast to number"
            );
        }
        assert!(matches!(
            cast(json!(true), ValueKind::Number),
            Err(ErrorKind::UnexpectedType { .. })
        ));
    }

    #[test]
    fn boolean_cast_accepts_words_and_unit_numbers() {
        assert_eq!(cast(json!("true"), ValueKind::Boolean).unwrap(), json!(true));
        assert_eq!(cast(json!("FALSE"), ValueKind::Boolean).unwrap(), json!(false));
        assert_eq!(cast(json!(1), ValueKind::Boolean).unwrap(), json!(true));
        assert_eq!(cast(json!(0), ValueKind::Boolean).unwrap(), json!(false));
        assert_eq!(cast(json!("1"), ValueKind::Boolean).unwrap(), json!(true));
        assert_eq!(cast(json!("0"), ValueKind::Boolean).unwrap(), json!(false));
        assert!(cast(json!(2), ValueKind::Boolean).is_err());
        assert!(cast(json!("yes"), ValueKind::Boolean).is_err());
    }

    #[test]
    fn string_cast_normalizes_keywords() {
        assert_eq!(cast(json!(5), ValueKind::String).unwrap(), json!("5"));
        assert_eq!(cast(json!(2.0), ValueKind::String).unwrap(), json!("2"));
        assert_eq!(cast(json!(0.5), ValueKind::String).unwrap(), json!("0.5"));
        assert_eq!(cast(json!("NULL"), ValueKind::String).unwrap(), Value::Null);
        assert_eq!(cast(json!(true), ValueKind::String).unwrap(), json!("true"));
        assert_eq!(cast(json!("TrUe"), ValueKind::String).unwrap(), json!("true"));
        assert_eq!(cast(json!("hello"), ValueKind::String).unwrap(), json!("hello"));
    }

    #[test]
    fn string_cast_uses_json_number_text() {
        assert_eq!(cast(json!(1e21), ValueKind::String).unwrap(), json!("1e+21"));
        assert_eq!(cast(json!(1e-7), ValueKind::String).unwrap(), json!("1e-7"));
        assert_eq!(cast(json!(-2.5e-9), ValueKind::String).unwrap(), json!("-2.5e-9"));
        assert_eq!(
            cast(json!(1.2345678901234568e20), ValueKind::String).unwrap(),
            json!("123456789012345680000")
        );
        assert_eq!(cast(json!(1e20), ValueKind::String).unwrap(), json!("100000000000000000000"));
        assert_eq!(cast(json!(0.000001), ValueKind::String).unwrap(), json!("0.000001"));
        assert_eq!(cast(json!(123.456), ValueKind::String).unwrap(), json!("123.456"));
        assert_eq!(cast(json!(-0.0), ValueKind::String).unwrap(), json!("0"));
    }

    #[test]
    fn null_short_circuits_for_nullable_targets() {
        for kind in ValueKind::ALL {
            assert_eq!(cast(Value::Null, kind).unwrap(), Value::Null);
        }
    }

    #[test]
    fn same_kind_cast_is_stable() {
        assert_eq!(cast(json!(false), ValueKind::Boolean).unwrap(), json!(false));
        assert_eq!(cast(json!(-12), ValueKind::Number).unwrap(), json!(-12));
        assert_eq!(cast(json!("abc"), ValueKind::Any).unwrap(), json!("abc"));
    }

    #[test]
    fn arrays_and_objects_are_unknown_sources() {
        let err = cast(json!({"a": 1}), ValueKind::Any).unwrap_err();
        assert_eq!(
            err,
            ErrorKind::UnknownSourceType {
                found: "object".into(),
                target: ValueKind::Any,
            }
        );
        assert!(matches!(
            cast(json!([1]), ValueKind::String),
            Err(ErrorKind::UnknownSourceType { .. })
        ));
    }

    #[test]
    fn missing_rule_is_unknown_target() {
        let mut table = CastTable::standard();
        table.remove(ValueKind::Number);
        assert_eq!(
            table.cast(&json!("1"), ValueKind::Number).unwrap_err(),
            ErrorKind::UnknownTargetType {
                kind: ValueKind::Number
            }
        );
    }

    #[test]
    fn restricted_accept_set_rejects_source_kind() {
        let mut table = CastTable::standard();
        table.insert(
            ValueKind::Number,
            CastRule {
                nullable: false,
                accepts: vec![ValueKind::Number],
                coerce: |v| Some(v.clone()),
            },
        );
        assert!(matches!(
            table.cast(&json!("1"), ValueKind::Number),
            Err(ErrorKind::UnknownSourceType { .. })
        ));
        assert!(matches!(
            table.cast(&Value::Null, ValueKind::Number),
            Err(ErrorKind::UnknownSourceType { .. })
        ));
    }
}
