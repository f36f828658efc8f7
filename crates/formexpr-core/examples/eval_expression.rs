//! Evaluate an expression file against a data document.
//!
//! Usage: cargo run -p formexpr-core --example eval_expression -- expr.json [data.json]

use formexpr_core::{EvalConfig, NodeLocation, StaticDataSources, evaluate};
use std::env;
use std::fs;
use std::process;

fn read_json(path: &str) -> serde_json::Value {
    let src = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("read {path}: {e}");
        process::exit(1);
    });
    serde_json::from_str(&src).unwrap_or_else(|e| {
        eprintln!("parse {path}: {e}");
        process::exit(1);
    })
}

fn main() {
    let mut args = env::args().skip(1);
    let Some(expr_path) = args.next() else {
        eprintln!("Usage: eval_expression <expr.json> [data.json]");
        process::exit(1);
    };
    let expr = read_json(&expr_path);
    let sources = match args.next() {
        Some(path) => StaticDataSources::from_json(read_json(&path)).unwrap_or_else(|e| {
            eprintln!("data {path}: {e}");
            process::exit(1);
        }),
        None => StaticDataSources::new(),
    };

    let config = EvalConfig::new().with_intro(format!("Evaluating {expr_path}"));
    match evaluate(&expr, &sources, &NodeLocation::Detached, Some(&config)) {
        Ok(value) => println!("value: {value}"),
        Err(err) => {
            eprintln!("{}", err.message);
            process::exit(1);
        }
    }
}
