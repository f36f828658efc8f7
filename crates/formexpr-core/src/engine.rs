use crate::cast::CastTable;
use crate::config::{DEFAULT_MAX_DEPTH, EvalConfig};
use crate::context::{DataSources, NodeLocation};
use crate::error::{ExpressionError, format_path};
use crate::registry::{Operator, OperatorDef, Operators, Signature};
use crate::runtime::{self, Context, Env, EvalResult};
use crate::validate::{self, ValidationError};
use serde_json::Value;
use std::sync::OnceLock;

/// Engine-scoped evaluation surface.
///
/// Registry and cast table are instance-local, so hosts can run engines with
/// different operator sets side by side. An engine is immutable once built
/// and can be shared across threads.
#[derive(Default)]
pub struct Engine {
    operators: Operators,
    casts: CastTable,
}

impl Engine {
    /// Create an engine with the standard catalog and cast table.
    pub fn new() -> Self {
        Self {
            operators: Operators::new(),
            casts: CastTable::standard(),
        }
    }

    pub fn with_parts(operators: Operators, casts: CastTable) -> Self {
        Self { operators, casts }
    }

    /// Register or replace an operator.
    pub fn register(&mut self, name: impl Into<String>, def: OperatorDef) -> Option<OperatorDef> {
        self.operators.register(name, def)
    }

    pub fn define(
        &mut self,
        name: &str,
        signature: Signature,
        implementation: Operator,
    ) -> Option<OperatorDef> {
        self.operators.define(name, signature, implementation)
    }

    pub fn operators(&self) -> &Operators {
        &self.operators
    }

    pub fn casts(&self) -> &CastTable {
        &self.casts
    }

    /// Static checks without evaluating anything.
    pub fn check(&self, expr: &Value) -> Result<(), Vec<ValidationError>> {
        validate::validate(expr, &self.operators, &self.casts, DEFAULT_MAX_DEPTH)
    }

    /// Evaluate one expression for `node`.
    ///
    /// Failures become an [`ExpressionError`], unless `config` carries a
    /// default value, in which case the diagnostic is logged and the default
    /// returned.
    pub fn evaluate(
        &self,
        expr: &Value,
        sources: &dyn DataSources,
        node: &NodeLocation,
        config: Option<&EvalConfig>,
    ) -> Result<Value, ExpressionError> {
        let fallback = EvalConfig::default();
        let config = config.unwrap_or(&fallback);

        let err = match self.evaluate_root(expr, sources, node, config) {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        let error = ExpressionError::new(err, expr, config.error_intro_text.as_deref());
        match &config.default_value {
            Some(default) => {
                let operator = error
                    .sub_expression
                    .as_array()
                    .and_then(|items| items.first())
                    .and_then(Value::as_str);
                tracing::warn!(
                    path = %format_path(&error.path),
                    operator = ?operator,
                    "{}",
                    error.message
                );
                Ok(default.clone())
            }
            None => Err(error),
        }
    }

    fn evaluate_root(
        &self,
        expr: &Value,
        sources: &dyn DataSources,
        node: &NodeLocation,
        config: &EvalConfig,
    ) -> EvalResult {
        let Value::Array(items) = expr else {
            return Ok(or_default(expr.clone(), config));
        };

        let env = Env {
            operators: &self.operators,
            casts: &self.casts,
            max_depth: config.max_depth(),
            before_call: config.on_before_function_call.as_ref(),
            after_call: config.on_after_function_call.as_ref(),
        };
        let ctx = Context::root(
            expr,
            node,
            sources,
            config.positional_arguments.as_deref(),
            &env,
        );

        let value = runtime::evaluate(&ctx)?;
        if value.is_null() {
            return Ok(or_default(value, config));
        }
        let Some(kind) = config.return_type else {
            return Ok(value);
        };
        let declared = runtime::resolve(&self.operators, items)
            .map_err(|k| ctx.fail(k))?
            .signature
            .returns;
        if declared == kind {
            return Ok(value);
        }
        let value = ctx.cast(&value, kind)?;
        Ok(or_default(value, config))
    }
}

fn or_default(value: Value, config: &EvalConfig) -> Value {
    match (&value, &config.default_value) {
        (Value::Null, Some(default)) => default.clone(),
        _ => value,
    }
}

static DEFAULT_ENGINE: OnceLock<Engine> = OnceLock::new();

/// Process-wide engine with the standard catalog.
pub fn default_engine() -> &'static Engine {
    DEFAULT_ENGINE.get_or_init(Engine::new)
}

/// Evaluate with [`default_engine`].
pub fn evaluate(
    expr: &Value,
    sources: &dyn DataSources,
    node: &NodeLocation,
    config: Option<&EvalConfig>,
) -> Result<Value, ExpressionError> {
    default_engine().evaluate(expr, sources, node, config)
}
