//! Error taxonomy, provenance, and the host-facing formatted error.

use crate::cast::ValueKind;
use serde_json::Value;
use thiserror::Error;

/// What went wrong, without saying where.
///
/// Operator implementations and the cast table return this; the evaluator
/// wraps it in an [`EvalError`] carrying the failing frame's provenance.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    #[error("unknown function '{name}'")]
    UnknownOperator { name: String },

    #[error("no cast rule for target type '{kind}'")]
    UnknownTargetType { kind: ValueKind },

    #[error("cannot cast a value of type '{found}' to '{target}'")]
    UnknownSourceType { found: String, target: ValueKind },

    #[error("expected {target}, got value {value}")]
    UnexpectedType { target: ValueKind, value: Value },

    #[error("division by zero")]
    DivisionByZero,

    #[error("unable to find component '{id}' from the current context")]
    NodeNotFoundWithoutContext { id: String },

    #[error("'{operator}' expects {}, got {actual}", arity_text(.min, .max))]
    ArgumentCount {
        operator: String,
        min: usize,
        max: Option<usize>,
        actual: usize,
    },

    #[error("'{operator}' declares no parameter type for argument {index}")]
    UndeclaredArgument { operator: String, index: usize },

    #[error("{operator}: {message}")]
    InvalidArgument { operator: String, message: String },

    #[error("positional argument {index} is out of range ({available} available)")]
    PositionalArgument { index: usize, available: usize },

    #[error("expression nesting exceeds the limit of {limit}")]
    DepthExceeded { limit: usize },
}

impl ErrorKind {
    pub(crate) fn invalid(operator: &str, message: impl Into<String>) -> Self {
        ErrorKind::InvalidArgument {
            operator: operator.to_string(),
            message: message.into(),
        }
    }
}

fn arity_text(min: &usize, max: &Option<usize>) -> String {
    match max {
        Some(max) if max == min => format!("{min} argument(s)"),
        Some(max) => format!("{min} to {max} arguments"),
        None => format!("at least {min} argument(s)"),
    }
}

/// Where a failure happened: the innermost sub-expression and its path.
#[derive(Debug, Clone, PartialEq)]
pub struct Provenance {
    pub expression: Value,
    pub path: Vec<usize>,
}

/// A failure propagating through the evaluator.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}")]
pub struct EvalError {
    pub kind: ErrorKind,
    pub provenance: Option<Provenance>,
}

impl EvalError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            provenance: None,
        }
    }

    /// Attach provenance unless a deeper frame already did.
    pub fn at(mut self, expression: &Value, path: &[usize]) -> Self {
        if self.provenance.is_none() {
            self.provenance = Some(Provenance {
                expression: expression.clone(),
                path: path.to_vec(),
            });
        }
        self
    }

    pub fn path(&self) -> Option<&[usize]> {
        self.provenance.as_ref().map(|p| p.path.as_slice())
    }
}

impl From<ErrorKind> for EvalError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// The formatted error surfaced to the host when no default is configured.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ExpressionError {
    pub kind: ErrorKind,
    pub path: Vec<usize>,
    /// The innermost failing sub-expression.
    pub sub_expression: Value,
    /// The root expression handed to `evaluate`.
    pub expression: Value,
    pub message: String,
}

impl ExpressionError {
    pub fn new(error: EvalError, root: &Value, intro: Option<&str>) -> Self {
        let error = error.at(root, &[]);
        let Provenance { expression, path } = error.provenance.unwrap_or_else(|| Provenance {
            expression: root.clone(),
            path: Vec::new(),
        });
        let message = format!(
            "{}: {}\n  at {}\n  in {}\n  failing {}",
            intro.unwrap_or("Evaluated expression"),
            error.kind,
            format_path(&path),
            root,
            expression,
        );
        Self {
            kind: error.kind,
            path,
            sub_expression: expression,
            expression: root.clone(),
            message,
        }
    }
}

/// Render a path as `[2][1]`, or `root` when empty.
pub fn format_path(path: &[usize]) -> String {
    if path.is_empty() {
        return "root".to_string();
    }
    path.iter().map(|step| format!("[{step}]")).collect()
}
