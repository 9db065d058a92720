//! Shared utility functions for CLI commands

use serde_json::Value as JsonValue;
use std::path::Path;

use crate::error::{CliError, Result};

/// Read a YAML or JSON document
pub fn read_document(path: &Path) -> Result<JsonValue> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CliError::Io {
            message: format!("{}: {e}", path.display()),
        })?;
    parse_document(&content).map_err(|e| CliError::input(format!("{}: {e}", path.display())))
}

/// Parse YAML (a superset of JSON) into a JSON value
pub fn parse_document(content: &str) -> std::result::Result<JsonValue, serde_yaml::Error> {
    let value: JsonValue = serde_yaml::from_str(content)?;
    Ok(value)
}

/// Read tracked state if the file exists
pub fn read_state(path: &Path) -> Result<Option<JsonValue>> {
    if !path.exists() {
        return Ok(None);
    }
    read_document(path).map(Some)
}

/// Write tracked state as pretty JSON
pub fn write_state(path: &Path, state: &JsonValue) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut content = serde_json::to_string_pretty(state)?;
    content.push('\n');
    std::fs::write(path, content)?;
    Ok(())
}
