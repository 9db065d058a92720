//! Shared provider connection
//!
//! Built once by `Provider::configure` and handed to every adapter. An
//! offline connection has no client at all, so lifecycle calls fail before
//! any network attempt.

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::sync::Arc;
use tracing::{debug, info};

use crdform_core::ManagedObject;

use crate::client::{ApplyParams, DynamicClient, KubeDynamicClient};
use crate::config::ProviderConfig;
use crate::error::{KubeError, Result};

pub struct ProviderConnection {
    client: Option<Arc<dyn DynamicClient>>,
    field_manager: String,
    force_conflicts: bool,
}

impl std::fmt::Debug for ProviderConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConnection")
            .field("offline", &self.is_offline())
            .field("field_manager", &self.field_manager)
            .field("force_conflicts", &self.force_conflicts)
            .finish()
    }
}

impl ProviderConnection {
    /// Connect to the cluster described by `config`
    ///
    /// Offline configurations return immediately without reading any
    /// kubeconfig.
    pub async fn connect(config: &ProviderConfig) -> Result<Self> {
        if config.offline {
            return Ok(Self::offline(config));
        }

        let kube_config = load_kube_config(config).await?;
        info!(cluster_url = %kube_config.cluster_url, "connecting to cluster");
        let client = Client::try_from(kube_config)
            .map_err(|e| KubeError::Configuration(format!("failed to create client: {e}")))?;

        Ok(Self::with_client(
            Arc::new(KubeDynamicClient::new(client)),
            config,
        ))
    }

    /// Use an existing client, e.g. a mock
    pub fn with_client(client: Arc<dyn DynamicClient>, config: &ProviderConfig) -> Self {
        Self {
            client: Some(client),
            field_manager: config.field_manager.clone(),
            force_conflicts: config.force_conflicts,
        }
    }

    pub fn offline(config: &ProviderConfig) -> Self {
        debug!("provider is offline, no cluster connection");
        Self {
            client: None,
            field_manager: config.field_manager.clone(),
            force_conflicts: config.force_conflicts,
        }
    }

    pub fn is_offline(&self) -> bool {
        self.client.is_none()
    }

    /// The cluster client; offline connections have none
    pub fn client(&self) -> Result<Arc<dyn DynamicClient>> {
        self.client.clone().ok_or_else(|| {
            KubeError::Configuration(
                "provider is offline; only manifest types are available".to_string(),
            )
        })
    }

    pub fn field_manager(&self) -> &str {
        &self.field_manager
    }

    /// Apply parameters for one object; per-resource settings win
    pub fn apply_params(&self, object: &ManagedObject) -> ApplyParams {
        ApplyParams {
            field_manager: object
                .field_manager
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| self.field_manager.clone()),
            force: object.force_conflicts.unwrap_or(self.force_conflicts),
        }
    }
}

async fn load_kube_config(config: &ProviderConfig) -> Result<Config> {
    let options = KubeConfigOptions {
        context: config.context.clone(),
        ..Default::default()
    };

    let result = match &config.kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                KubeError::Configuration(format!(
                    "failed to read kubeconfig {}: {e}",
                    path.display()
                ))
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &options)
                .await
                .map_err(|e| e.to_string())
        }
        None if config.context.is_some() => Config::from_kubeconfig(&options)
            .await
            .map_err(|e| e.to_string()),
        None => Config::infer().await.map_err(|e| e.to_string()),
    };

    result.map_err(|e| KubeError::Configuration(format!("failed to build client config: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDynamicClient;
    use crdform_core::ObjectMetadata;
    use serde_json::json;

    #[tokio::test]
    async fn test_offline_connect_needs_no_kubeconfig() {
        let config = ProviderConfig {
            offline: true,
            kubeconfig: Some("/nonexistent/kubeconfig".into()),
            ..Default::default()
        };
        let connection = ProviderConnection::connect(&config).await.unwrap();
        assert!(connection.is_offline());
        assert!(connection.client().err().unwrap().is_configuration());
    }

    #[tokio::test]
    async fn test_missing_kubeconfig_is_configuration_error() {
        let config = ProviderConfig {
            kubeconfig: Some("/nonexistent/kubeconfig".into()),
            ..Default::default()
        };
        let err = ProviderConnection::connect(&config).await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_apply_params_resource_overrides_provider() {
        let config = ProviderConfig {
            field_manager: "provider".into(),
            force_conflicts: false,
            ..Default::default()
        };
        let connection =
            ProviderConnection::with_client(Arc::new(MockDynamicClient::new()), &config);

        let mut object = ManagedObject::new(ObjectMetadata::new("w"), json!({}));
        assert_eq!(
            connection.apply_params(&object),
            ApplyParams {
                field_manager: "provider".into(),
                force: false
            }
        );

        object.field_manager = Some("team-a".into());
        object.force_conflicts = Some(true);
        assert_eq!(
            connection.apply_params(&object),
            ApplyParams {
                field_manager: "team-a".into(),
                force: true
            }
        );
    }

    #[test]
    fn test_debug_hides_client() {
        let connection = ProviderConnection::offline(&ProviderConfig::default());
        let debug = format!("{connection:?}");
        assert!(debug.contains("offline: true"));
    }
}
