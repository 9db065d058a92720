//! Display formatting for CLI output
//!
//! Status lines go to stderr so that stdout only carries JSON state or
//! rendered YAML.

use console::style;
use serde_json::Value as JsonValue;

use crate::error::Result;

pub fn step(message: &str) {
    eprintln!("{} {}", style("→").blue().bold(), message);
}

pub fn success(message: &str) {
    eprintln!("{} {}", style("✓").green().bold(), message);
}

pub fn warning(message: &str) {
    eprintln!("{} {}", style("⚠").yellow().bold(), message);
}

/// Print a JSON value to stdout
pub fn print_json(value: &JsonValue) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `Kind namespace/name` for a state value
pub fn describe(state: &JsonValue) -> String {
    let kind = state["kind"].as_str().unwrap_or("object");
    let name = state["metadata"]["name"].as_str().unwrap_or("?");
    match state["metadata"]["namespace"].as_str() {
        Some(ns) => format!("{} {}/{}", kind, style(ns).yellow(), style(name).cyan()),
        None => format!("{} {}", kind, style(name).cyan()),
    }
}
