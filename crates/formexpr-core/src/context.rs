//! Read-only data accessors supplied by the host.
//!
//! The evaluator never implements or owns these. It threads a
//! `&dyn DataSources` into operator implementations, which read through it.
//! Every method has a default so a host only backs what its forms use.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Identity of whatever owns the expression being evaluated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "id")]
pub enum NodeLocation {
    Component(String),
    Page(String),
    #[default]
    Detached,
}

impl NodeLocation {
    pub fn component_id(&self) -> Option<&str> {
        match self {
            NodeLocation::Component(id) => Some(id),
            _ => None,
        }
    }
}

/// A component resolved relative to the current node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRef {
    #[serde(default)]
    pub id: String,
    /// Data model path of the component's simple binding.
    #[serde(default)]
    pub binding: Option<String>,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceContext {
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub instance_owner_party_id: Option<String>,
    #[serde(default)]
    pub instance_owner_party_type: Option<String>,
    #[serde(default)]
    pub instance_owner_name: Option<String>,
    /// Element id of the process task the instance currently sits in.
    #[serde(default)]
    pub current_task_id: Option<String>,
}

impl InstanceContext {
    /// Look up one field by its expression key.
    ///
    /// `None` means the key is unknown; `Some(None)` means known but unset.
    pub fn field(&self, key: &str) -> Option<Option<&str>> {
        let field = match key {
            "instanceId" => &self.instance_id,
            "appId" => &self.app_id,
            "instanceOwnerPartyId" => &self.instance_owner_party_id,
            "instanceOwnerPartyType" => &self.instance_owner_party_type,
            "instanceOwnerName" => &self.instance_owner_name,
            "currentTaskId" => &self.current_task_id,
            _ => return None,
        };
        Some(field.as_deref())
    }
}

/// Actions the current user may perform on the current task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthContext {
    pub read: bool,
    pub write: bool,
    pub instantiate: bool,
    pub confirm: bool,
    pub sign: bool,
    pub reject: bool,
    pub complete: bool,
}

impl AuthContext {
    pub fn allows(&self, action: &str) -> Option<bool> {
        match action {
            "read" => Some(self.read),
            "write" => Some(self.write),
            "instantiate" => Some(self.instantiate),
            "confirm" => Some(self.confirm),
            "sign" => Some(self.sign),
            "reject" => Some(self.reject),
            "complete" => Some(self.complete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionItem {
    pub value: Value,
    pub label: String,
}

/// Option list for one node, possibly still being fetched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsLookup {
    #[serde(default)]
    pub options: Vec<OptionItem>,
    #[serde(default)]
    pub is_fetching: bool,
}

/// Host-side accessors available to operator implementations.
///
/// Implementations must be synchronous and must not change what they return
/// for the duration of one evaluation.
pub trait DataSources {
    fn form_data(&self, _path: &str) -> Option<Value> {
        None
    }

    fn attachments(&self, _node_id: &str) -> Vec<Attachment> {
        Vec::new()
    }

    fn instance(&self) -> Option<InstanceContext> {
        None
    }

    fn auth(&self) -> Option<AuthContext> {
        None
    }

    fn settings(&self, _key: &str) -> Option<Value> {
        None
    }

    fn options(&self, _node_id: &str) -> Option<OptionsLookup> {
        None
    }

    fn text(&self, _key: &str) -> Option<String> {
        None
    }

    /// Locale-aware number formatting; `None` falls back to plain JSON text.
    fn format_number(&self, _value: f64) -> Option<String> {
        None
    }

    fn language(&self) -> String {
        "nb".to_string()
    }

    fn resolve_component(&self, _id: &str, _from: &NodeLocation) -> Option<ComponentRef> {
        None
    }
}

/// Adapter with no data at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSources;

impl DataSources for NoSources {}

/// JSON-backed adapter for tests, fixtures, and the CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaticDataSources {
    pub form_data: Map<String, Value>,
    pub components: HashMap<String, ComponentRef>,
    pub attachments: HashMap<String, Vec<Attachment>>,
    pub instance: Option<InstanceContext>,
    pub auth: Option<AuthContext>,
    pub settings: Map<String, Value>,
    pub options: HashMap<String, OptionsLookup>,
    pub texts: HashMap<String, String>,
    pub language: Option<String>,
}

impl StaticDataSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn with_component(mut self, id: &str, binding: Option<&str>) -> Self {
        self.components.insert(
            id.to_string(),
            ComponentRef {
                id: id.to_string(),
                binding: binding.map(ToString::to_string),
                hidden: false,
            },
        );
        self
    }
}

impl DataSources for StaticDataSources {
    fn form_data(&self, path: &str) -> Option<Value> {
        map_get(&self.form_data, path)
    }

    fn attachments(&self, node_id: &str) -> Vec<Attachment> {
        self.attachments.get(node_id).cloned().unwrap_or_default()
    }

    fn instance(&self) -> Option<InstanceContext> {
        self.instance.clone()
    }

    fn auth(&self) -> Option<AuthContext> {
        self.auth
    }

    fn settings(&self, key: &str) -> Option<Value> {
        self.settings.get(key).cloned()
    }

    fn options(&self, node_id: &str) -> Option<OptionsLookup> {
        self.options.get(node_id).cloned()
    }

    fn text(&self, key: &str) -> Option<String> {
        self.texts.get(key).cloned()
    }

    fn language(&self) -> String {
        self.language.clone().unwrap_or_else(|| "nb".to_string())
    }

    fn resolve_component(&self, id: &str, _from: &NodeLocation) -> Option<ComponentRef> {
        self.components.get(id).map(|c| ComponentRef {
            id: id.to_string(),
            ..c.clone()
        })
    }
}

/// Read a dotted data model path such as `people[1].name` or `people.1.name`.
pub fn map_get(map: &Map<String, Value>, path: &str) -> Option<Value> {
    let normalized = path.replace('[', ".").replace(']', "");
    let mut parts = normalized.split('.').filter(|p| !p.is_empty());
    let first = parts.next()?;
    let mut current = map.get(first)?;
    for part in parts {
        match current {
            Value::Object(obj) => current = obj.get(part)?,
            Value::Array(arr) => {
                let idx = part.parse::<usize>().ok()?;
                current = arr.get(idx)?;
            }
            _ => return None,
        }
    }
    Some(current.clone())
}
