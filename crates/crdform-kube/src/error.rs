//! Error types for crdform-kube

use std::time::Duration;

use crdform_core::{CoreError, ValidationErrorInfo};
use thiserror::Error;

/// Result type for crdform-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors surfaced by the dynamic client, the adapters and the provider
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Offline provider, unconfigured adapter, unknown type or bad provider config
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Malformed composite or import ID
    #[error("{0}")]
    Format(String),

    /// Network or authentication failure talking to the API server
    #[error("Kubernetes API error: {0}")]
    Transport(#[from] kube::Error),

    /// The object does not exist on the cluster
    #[error("{resource} '{key}' not found")]
    NotFound { resource: String, key: String },

    /// Server-side apply field ownership conflict
    #[error(
        "apply of {resource} '{key}' conflicts with field manager(s) {}: {message}\nHint: set force_conflicts = true to take ownership of the conflicting fields",
        .managers.join(", ")
    )]
    Conflict {
        resource: String,
        key: String,
        managers: Vec<String>,
        message: String,
    },

    /// JSON/YAML marshalling failure
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The spec does not match the declared schema
    #[error("{0}")]
    Validation(String),

    /// User input that cannot be acted on
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A wait_for condition was not met in time
    #[error(
        "timed out after {timeout:?} waiting for {jsonpath} on '{key}' (expected {expected}, last observed {observed})"
    )]
    WaitTimeout {
        key: String,
        jsonpath: String,
        expected: String,
        observed: String,
        timeout: Duration,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for KubeError {
    fn from(e: serde_json::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for KubeError {
    fn from(e: serde_yaml::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl From<CoreError> for KubeError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidId { .. } => KubeError::Format(e.to_string()),
            CoreError::Yaml(_) | CoreError::Json(_) => KubeError::Serialization(e.to_string()),
            CoreError::Validation { .. } => KubeError::Validation(e.to_string()),
            CoreError::MissingField { .. } => KubeError::InvalidInput(e.to_string()),
            CoreError::Io(io) => KubeError::Io(io),
            CoreError::InvalidDescriptor { .. } | CoreError::InvalidSchema { .. } => {
                KubeError::Configuration(e.to_string())
            }
        }
    }
}

impl KubeError {
    /// Build a validation error from schema violations
    pub fn validation(type_name: &str, errors: Vec<ValidationErrorInfo>) -> Self {
        CoreError::Validation {
            type_name: type_name.to_string(),
            errors,
        }
        .into()
    }

    /// Check if this is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, KubeError::NotFound { .. })
    }

    /// Check if this is a server-side apply conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, KubeError::Conflict { .. })
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, KubeError::Configuration(_))
    }

    pub fn is_format(&self) -> bool {
        matches!(self, KubeError::Format(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_message_names_managers() {
        let err = KubeError::Conflict {
            resource: "Widget".into(),
            key: "default/w".into(),
            managers: vec!["kubectl".into(), "helm".into()],
            message: "Apply failed with 2 conflicts".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("kubectl, helm"));
        assert!(msg.contains("force_conflicts"));
        assert!(err.is_conflict());
    }

    #[test]
    fn test_core_error_mapping() {
        let err: KubeError = crdform_core::id::decode("nope").unwrap_err().into();
        assert!(err.is_format());
        assert!(err.to_string().contains("namespace/name"));

        let err: KubeError = CoreError::MissingField {
            field: "metadata.name".into(),
        }
        .into();
        assert!(matches!(err, KubeError::InvalidInput(_)));
    }

    #[test]
    fn test_validation_error_lists_paths() {
        let err = KubeError::validation(
            "example_com_widget_v1",
            vec![ValidationErrorInfo {
                path: "/size".into(),
                message: "-1 is less than the minimum of 0".into(),
            }],
        );
        let msg = err.to_string();
        assert!(msg.contains("example_com_widget_v1"));
        assert!(msg.contains("/size"));
    }
}
