//! Operators that read through the host's [`DataSources`] rather than
//! computing from their arguments alone.

use crate::cast::{ValueKind, format_f64, format_number};
use crate::context::{ComponentRef, DataSources, NodeLocation};
use crate::error::ErrorKind;
use crate::registry::{OperatorResult, Operators, Signature};
use crate::runtime::Context;
use serde_json::Value;

pub fn register_lookups(ops: &mut Operators) {
    use ValueKind::{Any, Boolean, Number, String};

    ops.define("dataModel", Signature::new(&[String], Any), op_data_model);
    ops.define("component", Signature::new(&[String], Any), op_component);
    ops.define("value", Signature::new(&[], Any), op_value);
    ops.define("displayValue", Signature::new(&[String], String), op_display_value);
    ops.define("optionLabel", Signature::new(&[String, Any], String), op_option_label);
    ops.define("attachmentCount", Signature::new(&[String], Number), op_attachment_count);
    ops.define("instanceContext", Signature::new(&[String], String), op_instance_context);
    ops.define("authContext", Signature::new(&[String], Boolean), op_auth_context);
    ops.define("frontendSettings", Signature::new(&[String], Any), op_frontend_settings);
    ops.define("language", Signature::new(&[], String), op_language);
    ops.define("text", Signature::new(&[String], String), op_text);
    ops.define("formatNumber", Signature::new(&[Number], String), op_format_number);
}

fn key_arg<'v>(args: &'v [Value], operator: &str) -> Result<&'v str, ErrorKind> {
    args.first()
        .and_then(Value::as_str)
        .ok_or_else(|| ErrorKind::invalid(operator, "expected a non-null string argument"))
}

/// Find a component relative to the node that owns the expression.
fn find_component(ctx: &Context, id: &str) -> Result<ComponentRef, ErrorKind> {
    let not_found = || ErrorKind::NodeNotFoundWithoutContext { id: id.to_string() };
    if *ctx.node == NodeLocation::Detached {
        return Err(not_found());
    }
    ctx.sources.resolve_component(id, ctx.node).ok_or_else(not_found)
}

fn bound_value(sources: &dyn DataSources, component: &ComponentRef) -> Value {
    if component.hidden {
        return Value::Null;
    }
    component
        .binding
        .as_deref()
        .and_then(|path| sources.form_data(path))
        .unwrap_or(Value::Null)
}

fn plain_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(format_number(n)),
        other => Some(other.to_string()),
    }
}

/// Translate a text key, falling back to the key itself.
fn translate(sources: &dyn DataSources, key: &str) -> String {
    sources.text(key).unwrap_or_else(|| key.to_string())
}

fn op_data_model(args: &[Value], ctx: &Context) -> OperatorResult {
    let path = key_arg(args, "dataModel")?;
    Ok(ctx.sources.form_data(path).unwrap_or(Value::Null))
}

fn op_component(args: &[Value], ctx: &Context) -> OperatorResult {
    let id = key_arg(args, "component")?;
    let component = find_component(ctx, id)?;
    Ok(bound_value(ctx.sources, &component))
}

/// Value bound to the component that owns the expression.
fn op_value(_args: &[Value], ctx: &Context) -> OperatorResult {
    let Some(id) = ctx.node.component_id() else {
        return Err(ErrorKind::NodeNotFoundWithoutContext {
            id: "<current component>".to_string(),
        });
    };
    let component = find_component(ctx, id)?;
    Ok(bound_value(ctx.sources, &component))
}

/// Value as the user sees it: option labels replace option values.
fn op_display_value(args: &[Value], ctx: &Context) -> OperatorResult {
    let id = key_arg(args, "displayValue")?;
    let component = find_component(ctx, id)?;
    let raw = bound_value(ctx.sources, &component);
    let Some(text) = plain_text(&raw) else {
        return Ok(Value::Null);
    };
    if let Some(lookup) = ctx.sources.options(&component.id) {
        if let Some(option) = lookup
            .options
            .iter()
            .find(|o| plain_text(&o.value).as_deref() == Some(text.as_str()))
        {
            return Ok(Value::String(translate(ctx.sources, &option.label)));
        }
    }
    Ok(Value::String(text))
}

fn op_option_label(args: &[Value], ctx: &Context) -> OperatorResult {
    let id = key_arg(args, "optionLabel")?;
    let component = find_component(ctx, id)?;
    let Some(wanted) = args.get(1).and_then(plain_text) else {
        return Ok(Value::Null);
    };
    let Some(lookup) = ctx.sources.options(&component.id) else {
        return Ok(Value::Null);
    };
    if lookup.is_fetching {
        return Ok(Value::Null);
    }
    Ok(lookup
        .options
        .iter()
        .find(|o| plain_text(&o.value).as_deref() == Some(wanted.as_str()))
        .map(|o| Value::String(translate(ctx.sources, &o.label)))
        .unwrap_or(Value::Null))
}

fn op_attachment_count(args: &[Value], ctx: &Context) -> OperatorResult {
    let id = key_arg(args, "attachmentCount")?;
    let component = find_component(ctx, id)?;
    Ok(Value::from(ctx.sources.attachments(&component.id).len()))
}

fn op_instance_context(args: &[Value], ctx: &Context) -> OperatorResult {
    let key = key_arg(args, "instanceContext")?;
    let Some(instance) = ctx.sources.instance() else {
        return Ok(Value::Null);
    };
    match instance.field(key) {
        Some(value) => Ok(value.map_or(Value::Null, |v| Value::String(v.to_string()))),
        None => Err(ErrorKind::invalid(
            "instanceContext",
            format!("unknown key '{key}'"),
        )),
    }
}

fn op_auth_context(args: &[Value], ctx: &Context) -> OperatorResult {
    let action = key_arg(args, "authContext")?;
    let Some(auth) = ctx.sources.auth() else {
        return Ok(Value::Null);
    };
    auth.allows(action)
        .map(Value::Bool)
        .ok_or_else(|| ErrorKind::invalid("authContext", format!("unknown action '{action}'")))
}

fn op_frontend_settings(args: &[Value], ctx: &Context) -> OperatorResult {
    let key = key_arg(args, "frontendSettings")?;
    Ok(ctx.sources.settings(key).unwrap_or(Value::Null))
}

fn op_language(_args: &[Value], ctx: &Context) -> OperatorResult {
    Ok(Value::String(ctx.sources.language()))
}

fn op_text(args: &[Value], ctx: &Context) -> OperatorResult {
    Ok(args
        .first()
        .and_then(Value::as_str)
        .map_or(Value::Null, |key| Value::String(translate(ctx.sources, key))))
}

fn op_format_number(args: &[Value], ctx: &Context) -> OperatorResult {
    let Some(n) = args.first().and_then(Value::as_f64) else {
        return Ok(Value::Null);
    };
    let text = ctx.sources.format_number(n).unwrap_or_else(|| format_f64(n));
    Ok(Value::String(text))
}
