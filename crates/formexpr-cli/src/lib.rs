use formexpr_core::{
    Engine, EvalConfig, NodeLocation, StaticDataSources, ValidationError, ValueKind,
};
use serde_json::Value;
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
enum CliCommand {
    Eval {
        expr: String,
        data: Option<String>,
        node: NodeLocation,
        config: EvalArgs,
    },
    Check {
        expr: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
struct EvalArgs {
    default_value: Option<String>,
    return_type: Option<ValueKind>,
    args: Option<String>,
    intro: Option<String>,
}

pub fn run_from_env() -> Result<(), String> {
    run_from_args(env::args().skip(1).collect())
}

pub fn run_from_args(args: Vec<String>) -> Result<(), String> {
    let command = parse_command(args)?;
    tracing::debug!(?command, "parsed command");
    let engine = Engine::new();

    match command {
        CliCommand::Eval {
            expr,
            data,
            node,
            config,
        } => {
            let expression = resolve_expression(&load_json(&expr, "EXPR")?)?;
            let sources = match data {
                Some(data) => StaticDataSources::from_json(load_json(&data, "--data")?)
                    .map_err(|e| format!("invalid --data document: {e}"))?,
                None => StaticDataSources::new(),
            };
            let config = build_config(config)?;

            let output = engine
                .evaluate(&expression, &sources, &node, Some(&config))
                .map_err(|e| e.message)?;
            let pretty = serde_json::to_string_pretty(&output).map_err(|e| e.to_string())?;
            println!("{pretty}");
            Ok(())
        }
        CliCommand::Check { expr } => {
            let expression = resolve_expression(&load_json(&expr, "EXPR")?)?;
            match engine.check(&expression) {
                Ok(()) => {
                    println!("ok");
                    Ok(())
                }
                Err(issues) => Err(report_issues(&issues)),
            }
        }
    }
}

fn parse_command(args: Vec<String>) -> Result<CliCommand, String> {
    if args.is_empty() {
        return Err(help_text());
    }

    let cmd = args[0].as_str();
    match cmd {
        "eval" => parse_eval(args),
        "check" => parse_check(args),
        "help" | "--help" | "-h" => Err(help_text()),
        _ => Err(format!("unknown command: {cmd}\n\n{}", help_text())),
    }
}

fn flag_value(args: &[String], i: usize, flag: &str) -> Result<String, String> {
    args.get(i)
        .cloned()
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn parse_eval(args: Vec<String>) -> Result<CliCommand, String> {
    let mut expr: Option<String> = None;
    let mut data: Option<String> = None;
    let mut node = NodeLocation::Detached;
    let mut config = EvalArgs::default();

    let mut i = 1usize;
    while i < args.len() {
        let token = &args[i];
        match token.as_str() {
            "--data" => {
                i += 1;
                data = Some(flag_value(&args, i, "--data")?);
            }
            "--node" | "--page" => {
                if node != NodeLocation::Detached {
                    return Err("--node and --page may only be given once".to_string());
                }
                i += 1;
                let id = flag_value(&args, i, token)?;
                node = if token == "--page" {
                    NodeLocation::Page(id)
                } else {
                    NodeLocation::Component(id)
                };
            }
            "--default" => {
                i += 1;
                config.default_value = Some(flag_value(&args, i, "--default")?);
            }
            "--return-type" => {
                i += 1;
                let value = flag_value(&args, i, "--return-type")?;
                let kind = ValueKind::parse(&value)
                    .ok_or_else(|| format!("invalid return type: {value}"))?;
                config.return_type = Some(kind);
            }
            "--args" => {
                i += 1;
                config.args = Some(flag_value(&args, i, "--args")?);
            }
            "--intro" => {
                i += 1;
                config.intro = Some(flag_value(&args, i, "--intro")?);
            }
            x if x.starts_with("--") => return Err(format!("unknown flag: {x}")),
            _ => {
                if expr.is_some() {
                    return Err("only one EXPR positional argument is allowed".to_string());
                }
                expr = Some(token.clone());
            }
        }
        i += 1;
    }

    let expr = expr.ok_or_else(|| "eval requires EXPR".to_string())?;
    Ok(CliCommand::Eval {
        expr,
        data,
        node,
        config,
    })
}

fn parse_check(args: Vec<String>) -> Result<CliCommand, String> {
    let mut expr: Option<String> = None;
    for token in &args[1..] {
        if token.starts_with("--") {
            return Err(format!("unknown flag: {token}"));
        }
        if expr.is_some() {
            return Err("only one EXPR positional argument is allowed".to_string());
        }
        expr = Some(token.clone());
    }
    let expr = expr.ok_or_else(|| "check requires EXPR".to_string())?;
    Ok(CliCommand::Check { expr })
}

fn help_text() -> String {
    [
        "formexpr CLI",
        "",
        "Commands:",
        "  formexpr eval EXPR [--data JSON_OR_PATH] [--node ID | --page ID] [--default JSON]",
        "                [--return-type boolean|string|number|any] [--args JSON_ARRAY]",
        "                [--intro TEXT]",
        "  formexpr check EXPR",
        "",
        "EXPR is inline JSON or a path to a JSON file. Set RUST_LOG=warn to see",
        "recovered failures when --default is given.",
    ]
    .join("\n")
}

fn build_config(args: EvalArgs) -> Result<EvalConfig, String> {
    let mut config = EvalConfig::new();
    if let Some(raw) = args.default_value {
        let value = serde_json::from_str::<Value>(&raw)
            .map_err(|e| format!("invalid --default JSON: {e}"))?;
        config = config.with_default(value);
    }
    if let Some(kind) = args.return_type {
        config = config.with_return_type(kind);
    }
    if let Some(raw) = args.args {
        let values = serde_json::from_str::<Vec<Value>>(&raw)
            .map_err(|e| format!("invalid --args JSON array: {e}"))?;
        config = config.with_positional_arguments(values);
    }
    if let Some(intro) = args.intro {
        config = config.with_intro(intro);
    }
    Ok(config)
}

/// Inline JSON, or the contents of the file it names.
fn load_json(input: &str, what: &str) -> Result<Value, String> {
    let as_path = PathBuf::from(input);
    if as_path.is_file() {
        let content = fs::read_to_string(&as_path)
            .map_err(|e| format!("failed to read {}: {e}", as_path.display()))?;
        return serde_json::from_str::<Value>(&content)
            .map_err(|e| format!("invalid JSON in {}: {e}", as_path.display()));
    }

    serde_json::from_str::<Value>(input).map_err(|e| format!("invalid {what} JSON: {e}"))
}

/// Accept a bare expression, or a document wrapping it as `{"expr": ...}`.
fn resolve_expression(root: &Value) -> Result<Value, String> {
    let Some(obj) = root.as_object() else {
        return Ok(root.clone());
    };
    obj.get("expr").cloned().ok_or_else(|| {
        "no expression found (expected a top-level expression or an \"expr\" key)".to_string()
    })
}

fn report_issues(issues: &[ValidationError]) -> String {
    let lines: Vec<String> = issues.iter().map(ToString::to_string).collect();
    format!("{} issue(s) found\n{}", issues.len(), lines.join("\n"))
}
