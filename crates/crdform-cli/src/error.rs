//! CLI error types with exit code handling
//!
//! Every library error is mapped to one variant here, which decides the
//! process exit code.

use crdform_kube::KubeError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("{message}")]
    #[diagnostic(code(crdform::cli::validation))]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(crdform::cli::configuration))]
    Configuration {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("{message}")]
    #[diagnostic(code(crdform::cli::not_found))]
    NotFound { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(crdform::cli::conflict),
        help("add `force_conflicts: true` to the input or provider config to take ownership")
    )]
    Conflict { message: String },

    #[error("{message}")]
    #[diagnostic(code(crdform::cli::timeout))]
    Timeout { message: String },

    #[error("Cluster error: {message}")]
    #[diagnostic(code(crdform::cli::cluster))]
    Cluster { message: String },

    /// Malformed IDs, input files or arguments
    #[error("Invalid input: {message}")]
    #[diagnostic(code(crdform::cli::input))]
    Input { message: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(crdform::cli::io))]
    Io { message: String },

    #[error("{message}")]
    #[diagnostic(code(crdform::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Configuration { .. } => exit_codes::CONFIG_ERROR,
            CliError::NotFound { .. } => exit_codes::NOT_FOUND,
            CliError::Conflict { .. } => exit_codes::CONFLICT,
            CliError::Timeout { .. } => exit_codes::TIMEOUT,
            CliError::Cluster { .. } | CliError::Other { .. } => exit_codes::ERROR,
            CliError::Input { .. } => exit_codes::USAGE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            help: None,
        }
    }

    pub fn configuration_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        let message = err.to_string();
        match err {
            // The CLI variant carries its own prefix
            KubeError::Configuration(inner) => CliError::Configuration {
                message: inner,
                help: Some("check --config, --catalog and the CRDFORM_* environment variables".into()),
            },
            KubeError::Validation(_) => CliError::Validation { message },
            KubeError::NotFound { .. } => CliError::NotFound { message },
            KubeError::Conflict { .. } => CliError::Conflict { message },
            KubeError::WaitTimeout { .. } => CliError::Timeout { message },
            KubeError::Transport(_) => CliError::Cluster { message },
            KubeError::Format(_) | KubeError::InvalidInput(_) => CliError::Input { message },
            KubeError::Io(_) => CliError::Io { message },
            _ => CliError::Other { message },
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Other {
            message: format!("serialization error: {err}"),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kube_error_exit_codes() {
        let cases = [
            (KubeError::Configuration("offline".into()), exit_codes::CONFIG_ERROR),
            (KubeError::Validation("bad".into()), exit_codes::VALIDATION_ERROR),
            (
                KubeError::NotFound {
                    resource: "Widget".into(),
                    key: "default/w".into(),
                },
                exit_codes::NOT_FOUND,
            ),
            (KubeError::Format("bad id".into()), exit_codes::USAGE_ERROR),
            (KubeError::Serialization("eof".into()), exit_codes::ERROR),
        ];
        for (err, code) in cases {
            assert_eq!(CliError::from(err).exit_code(), code);
        }
    }

    #[test]
    fn test_message_is_preserved() {
        let err = CliError::from(KubeError::NotFound {
            resource: "Widget".into(),
            key: "default/w".into(),
        });
        assert_eq!(err.to_string(), "Widget 'default/w' not found");
    }

    #[test]
    fn test_configuration_prefixed_once() {
        let err = CliError::from(KubeError::Configuration("provider is offline".into()));
        assert_eq!(err.to_string(), "Configuration error: provider is offline");
    }
}
