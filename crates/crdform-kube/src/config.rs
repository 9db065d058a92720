//! Provider configuration
//!
//! Stored in `~/.config/crdform/provider.yaml`. Every field can be
//! overridden from the environment (`CRDFORM_*`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{KubeError, Result};

/// Field manager used when neither the provider nor the resource sets one
pub const DEFAULT_FIELD_MANAGER: &str = "crdform";

pub const ENV_KUBECONFIG: &str = "CRDFORM_KUBECONFIG";
pub const ENV_CONTEXT: &str = "CRDFORM_CONTEXT";
pub const ENV_FIELD_MANAGER: &str = "CRDFORM_FIELD_MANAGER";
pub const ENV_FORCE_CONFLICTS: &str = "CRDFORM_FORCE_CONFLICTS";
pub const ENV_OFFLINE: &str = "CRDFORM_OFFLINE";

/// Provider-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Path to a kubeconfig file; inferred when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use instead of the current one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Default field manager for server-side apply
    pub field_manager: String,

    /// Default for taking ownership of conflicting fields
    pub force_conflicts: bool,

    /// Render manifests only; no cluster connection is made
    pub offline: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            context: None,
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
            force_conflicts: false,
            offline: false,
        }
    }
}

impl ProviderConfig {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| KubeError::Configuration(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| KubeError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Get default configuration path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            KubeError::Configuration("could not determine config directory".to_string())
        })?;
        Ok(config_dir.join("crdform").join("provider.yaml"))
    }

    /// Apply overrides from the process environment
    pub fn with_env(self) -> Result<Self> {
        self.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`; set variables win over file values
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_KUBECONFIG).filter(|v| !v.is_empty()) {
            self.kubeconfig = Some(PathBuf::from(path));
        }
        if let Some(context) = lookup(ENV_CONTEXT).filter(|v| !v.is_empty()) {
            self.context = Some(context);
        }
        if let Some(manager) = lookup(ENV_FIELD_MANAGER) {
            self.field_manager = manager;
        }
        if let Some(raw) = lookup(ENV_FORCE_CONFLICTS) {
            self.force_conflicts = parse_bool(ENV_FORCE_CONFLICTS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_OFFLINE) {
            self.offline = parse_bool(ENV_OFFLINE, &raw)?;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.field_manager.trim().is_empty() {
            return Err(KubeError::Configuration(
                "field_manager must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(KubeError::Configuration(format!(
            "{key}: expected a boolean, got '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ProviderConfig::default();
        assert_eq!(config.field_manager, "crdform");
        assert!(!config.force_conflicts);
        assert!(!config.offline);
        assert!(config.kubeconfig.is_none());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ProviderConfig::from_yaml("context: staging\n").unwrap();
        assert_eq!(config.context.as_deref(), Some("staging"));
        assert_eq!(config.field_manager, DEFAULT_FIELD_MANAGER);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("provider.yaml");
        std::fs::write(
            &path,
            "kubeconfig: /tmp/kubeconfig\nfield_manager: platform\nforce_conflicts: true\n",
        )
        .unwrap();

        let config = ProviderConfig::load_from(&path).unwrap();
        assert_eq!(config.kubeconfig, Some(PathBuf::from("/tmp/kubeconfig")));
        assert_eq!(config.field_manager, "platform");
        assert!(config.force_conflicts);
    }

    #[test]
    fn test_invalid_file_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("provider.yaml");
        std::fs::write(&path, "offline: [not, a, bool]\n").unwrap();

        let err = ProviderConfig::load_from(&path).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("provider.yaml"));
    }

    #[test]
    fn test_empty_field_manager_rejected() {
        assert!(ProviderConfig::from_yaml("field_manager: ''\n").is_err());
    }

    #[test]
    fn test_env_overrides_win() {
        let config = ProviderConfig::from_yaml("field_manager: from-file\noffline: false\n")
            .unwrap()
            .with_env_overrides(env(&[
                (ENV_FIELD_MANAGER, "from-env"),
                (ENV_OFFLINE, "1"),
                (ENV_FORCE_CONFLICTS, "TRUE"),
                (ENV_CONTEXT, "prod"),
            ]))
            .unwrap();

        assert_eq!(config.field_manager, "from-env");
        assert!(config.offline);
        assert!(config.force_conflicts);
        assert_eq!(config.context.as_deref(), Some("prod"));
    }

    #[test]
    fn test_env_without_overrides_is_identity() {
        let config = ProviderConfig::default().with_env_overrides(env(&[])).unwrap();
        assert_eq!(config, ProviderConfig::default());
    }

    #[test]
    fn test_env_bad_bool() {
        let err = ProviderConfig::default()
            .with_env_overrides(env(&[(ENV_OFFLINE, "maybe")]))
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains(ENV_OFFLINE));
    }
}
