//! Operator signatures and the name-keyed operator registry.

use crate::cast::ValueKind;
use crate::error::ErrorKind;
use crate::runtime::Context;
use serde_json::Value;
use std::collections::HashMap;

pub type OperatorResult = Result<Value, ErrorKind>;

/// Operator implementation.
///
/// Receives arguments already evaluated and cast to the declared kinds. The
/// raw return value is cast to the declared return kind by the evaluator.
pub type Operator = fn(args: &[Value], ctx: &Context) -> OperatorResult;

/// Parameter and return kinds for one operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub args: Vec<ValueKind>,
    pub min_args: usize,
    /// Extra arguments reuse the last declared kind.
    pub last_arg_spreads: bool,
    pub returns: ValueKind,
}

impl Signature {
    pub fn new(args: &[ValueKind], returns: ValueKind) -> Self {
        Self {
            min_args: args.len(),
            args: args.to_vec(),
            last_arg_spreads: false,
            returns,
        }
    }

    pub fn spreading(mut self) -> Self {
        self.last_arg_spreads = true;
        self
    }

    pub fn min_args(mut self, min: usize) -> Self {
        self.min_args = min;
        self
    }

    pub fn max_args(&self) -> Option<usize> {
        if self.last_arg_spreads {
            None
        } else {
            Some(self.args.len())
        }
    }

    pub fn check_arity(&self, operator: &str, actual: usize) -> Result<(), ErrorKind> {
        let max = self.max_args();
        if actual < self.min_args || max.is_some_and(|max| actual > max) {
            return Err(ErrorKind::ArgumentCount {
                operator: operator.to_string(),
                min: self.min_args,
                max,
                actual,
            });
        }
        Ok(())
    }

    /// Declared kind for zero-based argument `index`.
    pub fn arg_kind(&self, operator: &str, index: usize) -> Result<ValueKind, ErrorKind> {
        if let Some(kind) = self.args.get(index) {
            return Ok(*kind);
        }
        match self.args.last() {
            Some(last) if self.last_arg_spreads => Ok(*last),
            _ => Err(ErrorKind::UndeclaredArgument {
                operator: operator.to_string(),
                index,
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OperatorDef {
    pub signature: Signature,
    pub implementation: Operator,
}

impl OperatorDef {
    pub fn new(signature: Signature, implementation: Operator) -> Self {
        Self {
            signature,
            implementation,
        }
    }
}

pub struct Operators {
    ops: HashMap<String, OperatorDef>,
}

impl Operators {
    /// Registry preloaded with the standard catalog.
    pub fn new() -> Self {
        let mut operators = Self::empty();
        crate::functions::register_standard(&mut operators);
        crate::lookups::register_lookups(&mut operators);
        operators
    }

    pub fn empty() -> Self {
        Self {
            ops: HashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&OperatorDef> {
        self.ops.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    pub fn register(&mut self, name: impl Into<String>, def: OperatorDef) -> Option<OperatorDef> {
        self.ops.insert(name.into(), def)
    }

    pub fn define(
        &mut self,
        name: &str,
        signature: Signature,
        implementation: Operator,
    ) -> Option<OperatorDef> {
        self.register(name, OperatorDef::new(signature, implementation))
    }

    pub fn remove(&mut self, name: &str) -> Option<OperatorDef> {
        self.ops.remove(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.ops.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl Default for Operators {
    fn default() -> Self {
        Self::new()
    }
}
