//! Recursive tree-walking evaluator.
//!
//! A call is a JSON array `[operator, ...args]`. Arguments are evaluated and
//! cast left to right before the operator runs; nothing short-circuits.

use crate::cast::{CastTable, ValueKind};
use crate::context::{DataSources, NodeLocation};
use crate::error::{ErrorKind, EvalError};
use crate::registry::{OperatorDef, Operators};
use serde_json::Value;
use std::sync::Arc;

pub type EvalResult = Result<Value, EvalError>;

/// One operator invocation, as seen by instrumentation hooks.
#[derive(Debug, Clone, Copy)]
pub struct FunctionCall<'a> {
    pub path: &'a [usize],
    pub operator: &'a str,
    pub args: &'a [Value],
    /// Set for the after-hook only.
    pub result: Option<&'a Value>,
}

pub type CallHook = Arc<dyn Fn(&FunctionCall<'_>) + Send + Sync>;

/// Read-only environment shared by every frame of one evaluation.
pub struct Env<'a> {
    pub operators: &'a Operators,
    pub casts: &'a CastTable,
    pub max_depth: usize,
    pub before_call: Option<&'a CallHook>,
    pub after_call: Option<&'a CallHook>,
}

/// Evaluation state of one call frame.
///
/// Frames are never mutated. [`Context::child`] builds a new frame with its
/// own extended path.
pub struct Context<'a> {
    pub expression: &'a Value,
    pub path: Vec<usize>,
    pub node: &'a NodeLocation,
    pub sources: &'a dyn DataSources,
    pub positional_arguments: Option<&'a [Value]>,
    pub env: &'a Env<'a>,
}

impl<'a> Context<'a> {
    pub fn root(
        expression: &'a Value,
        node: &'a NodeLocation,
        sources: &'a dyn DataSources,
        positional_arguments: Option<&'a [Value]>,
        env: &'a Env<'a>,
    ) -> Self {
        Self {
            expression,
            path: Vec::new(),
            node,
            sources,
            positional_arguments,
            env,
        }
    }

    /// Frame for the argument at call position `position` (1-based).
    pub fn child(&self, position: usize, expression: &'a Value) -> Context<'a> {
        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.extend_from_slice(&self.path);
        path.push(position);
        Context {
            expression,
            path,
            node: self.node,
            sources: self.sources,
            positional_arguments: self.positional_arguments,
            env: self.env,
        }
    }

    /// Attach this frame's provenance to a failure.
    pub fn fail(&self, kind: impl Into<EvalError>) -> EvalError {
        kind.into().at(self.expression, &self.path)
    }

    pub fn cast(&self, value: &Value, kind: ValueKind) -> EvalResult {
        self.env.casts.cast(value, kind).map_err(|k| self.fail(k))
    }
}

/// Split a call into its operator name and raw arguments.
pub fn split_call(items: &[Value]) -> Result<(&str, &[Value]), ErrorKind> {
    match items.split_first() {
        Some((Value::String(name), args)) => Ok((name.as_str(), args)),
        Some((head, _)) => Err(ErrorKind::UnknownOperator {
            name: head.to_string(),
        }),
        None => Err(ErrorKind::UnknownOperator {
            name: String::new(),
        }),
    }
}

/// Resolve the operator a call expression names.
pub fn resolve<'o>(
    operators: &'o Operators,
    items: &[Value],
) -> Result<&'o OperatorDef, ErrorKind> {
    let (name, _) = split_call(items)?;
    operators.get(name).ok_or_else(|| ErrorKind::UnknownOperator {
        name: name.to_string(),
    })
}

pub fn evaluate<'a>(ctx: &Context<'a>) -> EvalResult {
    match ctx.expression {
        Value::Array(items) => evaluate_call(items, ctx),
        literal => Ok(literal.clone()),
    }
}

fn evaluate_call<'a>(items: &'a [Value], ctx: &Context<'a>) -> EvalResult {
    if ctx.path.len() > ctx.env.max_depth {
        return Err(ctx.fail(ErrorKind::DepthExceeded {
            limit: ctx.env.max_depth,
        }));
    }

    let (name, raw_args) = split_call(items).map_err(|k| ctx.fail(k))?;
    let def = ctx.env.operators.get(name).ok_or_else(|| {
        ctx.fail(ErrorKind::UnknownOperator {
            name: name.to_string(),
        })
    })?;
    let signature = &def.signature;
    signature
        .check_arity(name, raw_args.len())
        .map_err(|k| ctx.fail(k))?;

    let mut args = Vec::with_capacity(raw_args.len());
    for (index, raw) in raw_args.iter().enumerate() {
        let child = ctx.child(index + 1, raw);
        let value = evaluate(&child)?;
        let kind = signature
            .arg_kind(name, index)
            .map_err(|k| child.fail(k))?;
        args.push(child.cast(&value, kind)?);
    }

    if let Some(hook) = ctx.env.before_call {
        hook(&FunctionCall {
            path: &ctx.path,
            operator: name,
            args: &args,
            result: None,
        });
    }

    tracing::trace!(operator = name, path = ?ctx.path, "calling operator");
    let raw = (def.implementation)(&args, ctx).map_err(|k| ctx.fail(k))?;
    let result = ctx.cast(&raw, signature.returns)?;

    if let Some(hook) = ctx.env.after_call {
        hook(&FunctionCall {
            path: &ctx.path,
            operator: name,
            args: &args,
            result: Some(&result),
        });
    }

    Ok(result)
}
