//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid ID '{id}': expected {expected}")]
    InvalidId { id: String, expected: &'static str },

    #[error("Invalid resource descriptor '{type_name}': {message}")]
    InvalidDescriptor { type_name: String, message: String },

    #[error("Invalid schema: {message}")]
    InvalidSchema { message: String },

    #[error("Validation failed for {type_name}:\n{}", format_errors(.errors))]
    Validation {
        type_name: String,
        errors: Vec<ValidationErrorInfo>,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing required field: {field}")]
    MissingField { field: String },
}

/// A single schema violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrorInfo {
    /// JSON pointer to the offending value, `(root)` for the top level
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ValidationErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

fn format_errors(errors: &[ValidationErrorInfo]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

impl CoreError {
    /// Whether this error comes from a malformed composite or import ID
    pub fn is_format(&self) -> bool {
        matches!(self, CoreError::InvalidId { .. })
    }

    /// Whether this error is a JSON/YAML marshalling failure
    pub fn is_serialization(&self) -> bool {
        matches!(self, CoreError::Yaml(_) | CoreError::Json(_))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
