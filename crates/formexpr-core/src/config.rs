use crate::cast::ValueKind;
use crate::runtime::CallHook;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Nesting limit applied when a call does not set `max_depth`.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Per-call evaluation options.
///
/// Supplying a `default_value` turns failures into a logged warning plus
/// the default. Without one, failures reach the caller.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EvalConfig {
    /// A present `null` is a real default, unlike an absent key.
    #[serde(deserialize_with = "present_value")]
    pub default_value: Option<Value>,
    pub return_type: Option<ValueKind>,
    pub error_intro_text: Option<String>,
    pub positional_arguments: Option<Vec<Value>>,
    pub max_depth: Option<usize>,
    #[serde(skip)]
    pub on_before_function_call: Option<CallHook>,
    #[serde(skip)]
    pub on_after_function_call: Option<CallHook>,
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl EvalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_return_type(mut self, kind: ValueKind) -> Self {
        self.return_type = Some(kind);
        self
    }

    pub fn with_intro(mut self, text: impl Into<String>) -> Self {
        self.error_intro_text = Some(text.into());
        self
    }

    pub fn with_positional_arguments(mut self, args: Vec<Value>) -> Self {
        self.positional_arguments = Some(args);
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth.unwrap_or(DEFAULT_MAX_DEPTH)
    }
}

impl fmt::Debug for EvalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalConfig")
            .field("default_value", &self.default_value)
            .field("return_type", &self.return_type)
            .field("error_intro_text", &self.error_intro_text)
            .field("positional_arguments", &self.positional_arguments)
            .field("max_depth", &self.max_depth)
            .field("on_before_function_call", &self.on_before_function_call.is_some())
            .field("on_after_function_call", &self.on_after_function_call.is_some())
            .finish()
    }
}
