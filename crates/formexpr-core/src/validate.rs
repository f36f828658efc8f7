//! Static checks over an expression tree, without evaluating it.
//!
//! Reports every problem found rather than stopping at the first one. A tree
//! that passes can still fail at runtime on data-dependent casts.

use crate::cast::CastTable;
use crate::error::{ErrorKind, format_path};
use crate::registry::Operators;
use crate::runtime::split_call;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const UNKNOWN_OPERATOR: &str = "FORMEXPR_E_UNKNOWN_OPERATOR";
pub const ARGUMENT_COUNT: &str = "FORMEXPR_E_ARGUMENT_COUNT";
pub const DEPTH_EXCEEDED: &str = "FORMEXPR_E_DEPTH";
pub const INVALID_LITERAL: &str = "FORMEXPR_E_LITERAL";

/// Structured validation issue produced before evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code} at {}: {message}", format_path(.path))]
pub struct ValidationError {
    pub code: String,
    pub message: String,
    pub path: Vec<usize>,
    pub operator: Option<String>,
}

impl ValidationError {
    fn new(code: &str, kind: &ErrorKind, path: &[usize]) -> Self {
        Self {
            code: code.to_string(),
            message: kind.to_string(),
            path: path.to_vec(),
            operator: None,
        }
    }

    fn operator(mut self, name: &str) -> Self {
        self.operator = Some(name.to_string());
        self
    }
}

pub fn validate(
    expr: &Value,
    operators: &Operators,
    casts: &CastTable,
    max_depth: usize,
) -> Result<(), Vec<ValidationError>> {
    let mut issues = Vec::new();
    let mut path = Vec::new();
    walk(expr, operators, casts, max_depth, &mut path, &mut issues);
    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

fn walk(
    expr: &Value,
    operators: &Operators,
    casts: &CastTable,
    max_depth: usize,
    path: &mut Vec<usize>,
    issues: &mut Vec<ValidationError>,
) {
    let Value::Array(items) = expr else {
        return;
    };
    if path.len() > max_depth {
        let kind = ErrorKind::DepthExceeded { limit: max_depth };
        issues.push(ValidationError::new(DEPTH_EXCEEDED, &kind, path));
        return;
    }

    let (name, args) = match split_call(items) {
        Ok(call) => call,
        Err(kind) => {
            issues.push(ValidationError::new(UNKNOWN_OPERATOR, &kind, path));
            return;
        }
    };
    let Some(def) = operators.get(name) else {
        let kind = ErrorKind::UnknownOperator {
            name: name.to_string(),
        };
        issues.push(ValidationError::new(UNKNOWN_OPERATOR, &kind, path).operator(name));
        // Nested calls are still worth checking.
        for (index, arg) in args.iter().enumerate() {
            path.push(index + 1);
            walk(arg, operators, casts, max_depth, path, issues);
            path.pop();
        }
        return;
    };

    let signature = &def.signature;
    if let Err(kind) = signature.check_arity(name, args.len()) {
        issues.push(ValidationError::new(ARGUMENT_COUNT, &kind, path).operator(name));
    }

    for (index, arg) in args.iter().enumerate() {
        path.push(index + 1);
        if arg.is_array() {
            walk(arg, operators, casts, max_depth, path, issues);
        } else if let Ok(kind) = signature.arg_kind(name, index)
            && let Err(err) = casts.cast(arg, kind)
        {
            issues.push(ValidationError::new(INVALID_LITERAL, &err, path).operator(name));
        }
        path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(expr: Value) -> Result<(), Vec<ValidationError>> {
        validate(&expr, &Operators::new(), &CastTable::standard(), 8)
    }

    #[test]
    fn well_formed_tree_passes() {
        let expr = json!(["if", ["greaterThan", ["dataModel", "age"], "17"], "adult", "else", "minor"]);
        assert!(check(expr).is_ok());
        assert!(check(json!("plain literal")).is_ok());
    }

    #[test]
    fn reports_every_unknown_operator_with_its_path() {
        let issues = check(json!(["and", ["nope", 1], ["not", ["alsoNope"]]])).unwrap_err();
        let found: Vec<(&str, Vec<usize>)> = issues
            .iter()
            .map(|i| (i.code.as_str(), i.path.clone()))
            .collect();
        assert_eq!(
            found,
            vec![(UNKNOWN_OPERATOR, vec![1]), (UNKNOWN_OPERATOR, vec![2, 1])]
        );
        assert_eq!(issues[0].operator.as_deref(), Some("nope"));
    }

    #[test]
    fn uncastable_literals_are_reported() {
        let issues = check(json!(["add", 1, "twelve", {"k": 1}])).unwrap_err();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].code, INVALID_LITERAL);
        assert_eq!(issues[0].path, vec![2]);
        assert_eq!(issues[1].path, vec![3]);
    }

    #[test]
    fn arity_is_reported_at_the_call() {
        let issues = check(json!(["not", ["divide", 1]])).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, ARGUMENT_COUNT);
        assert_eq!(issues[0].path, vec![1]);
        assert_eq!(issues[0].to_string().split(':').next(), Some("FORMEXPR_E_ARGUMENT_COUNT at [1]"));
    }

    #[test]
    fn deep_trees_are_reported_once() {
        let mut expr = json!(true);
        for _ in 0..20 {
            expr = json!(["not", expr]);
        }
        let issues = check(expr).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, DEPTH_EXCEEDED);
        assert_eq!(issues[0].path.len(), 9);
    }
}
