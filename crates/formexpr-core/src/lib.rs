//! formexpr core crate.
//!
//! Evaluates JSON form expressions such as
//! `["if", ["equals", ["dataModel", "a.b"], "yes"], "shown"]` against a
//! host-provided data adapter.
//!
//! - `cast`: the four value kinds and the coercion table between them.
//! - `registry` + `functions` + `lookups`: operator signatures and the
//!   standard catalog.
//! - `runtime`: the recursive evaluator and its per-frame context.
//! - `engine`: top-level policy (defaults, return type, formatted errors).
//! - `context`: the `DataSources` adapter trait and a static implementation.
//! - `validate`: static checks without evaluating.
//!
//! Evaluation is eager: every argument of a call is evaluated and cast
//! before the operator runs, so a failing branch of `if` still fails the
//! whole expression.

pub mod cast;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod functions;
pub mod lookups;
pub mod registry;
pub mod runtime;
pub mod validate;

pub use cast::{CastRule, CastTable, ValueKind};
pub use config::{DEFAULT_MAX_DEPTH, EvalConfig};
pub use context::{DataSources, NoSources, NodeLocation, StaticDataSources};
pub use engine::{Engine, default_engine, evaluate};
pub use error::{ErrorKind, EvalError, ExpressionError, Provenance};
pub use registry::{Operator, OperatorDef, OperatorResult, Operators, Signature};
pub use runtime::{CallHook, Context, FunctionCall};
pub use validate::ValidationError;
