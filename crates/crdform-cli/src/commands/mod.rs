//! CLI commands

pub mod apply;
pub mod data;
pub mod delete;
pub mod get;
pub mod import;
pub mod render;
pub mod schema;

use crdform_kube::{Provider, ProviderConfig, Registry};
use std::path::PathBuf;
use tracing::debug;

use crate::error::{CliError, Result};

/// Global options shared by every command
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub config: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
    pub offline: bool,
}

impl Context {
    /// Provider config: file, then environment, then `--offline`
    pub fn provider_config(&self) -> Result<ProviderConfig> {
        let config = match &self.config {
            Some(path) => ProviderConfig::load_from(path)?,
            None => ProviderConfig::load()?,
        };
        let mut config = config.with_env()?;
        if self.offline {
            config.offline = true;
        }
        Ok(config)
    }

    pub fn registry(&self) -> Result<Registry> {
        let path = self.catalog.as_ref().ok_or_else(|| {
            CliError::configuration_with_help(
                "no descriptor catalog given",
                "pass --catalog <FILE> or set CRDFORM_CATALOG",
            )
        })?;
        debug!(catalog = %path.display(), "loading descriptor catalog");
        Ok(Registry::from_file(path)?)
    }

    /// Provider with every type registered but no connection
    pub fn provider(&self) -> Result<Provider> {
        Ok(Provider::new(self.registry()?)?)
    }

    /// Provider bound to the cluster connection
    pub async fn connected_provider(&self) -> Result<Provider> {
        let config = self.provider_config()?;
        let mut provider = self.provider()?;
        provider.configure(&config).await?;
        Ok(provider)
    }
}
