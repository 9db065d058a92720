//! Read-only lookup of existing objects

use std::sync::{Arc, Weak};
use tracing::debug;

use crdform_core::{DataSourceObject, ResourceDescriptor};

use crate::client::ObjectRef;
use crate::connection::ProviderConnection;
use crate::error::{KubeError, Result};

/// Data source for one custom resource type
#[derive(Debug)]
pub struct DataSourceAdapter {
    descriptor: Arc<ResourceDescriptor>,
    connection: Option<Weak<ProviderConnection>>,
}

impl DataSourceAdapter {
    pub fn new(descriptor: Arc<ResourceDescriptor>) -> Self {
        Self {
            descriptor,
            connection: None,
        }
    }

    pub fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    pub fn configure(&mut self, connection: &Arc<ProviderConnection>) {
        self.connection = Some(Arc::downgrade(connection));
    }

    /// Look up the object named by `query.metadata`
    ///
    /// A missing object is an error: there is no prior state to drop.
    pub async fn read(&self, query: DataSourceObject) -> Result<DataSourceObject> {
        let connection = self
            .connection
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or_else(|| {
                KubeError::Configuration(format!(
                    "data source {} used before the provider was configured",
                    self.descriptor.type_name
                ))
            })?;
        let client = connection.client()?;

        let key = query.metadata.key(self.descriptor.scope)?;
        let target = ObjectRef::new(&self.descriptor, key.clone());
        debug!(target = %target, "reading data source");

        let raw = client.get(&target).await?;

        let mut object = query;
        object.merge_from_raw(&raw, &self.descriptor)?;
        object.id = Some(key.to_id());
        Ok(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::mock::MockDynamicClient;
    use crdform_core::{AttrType, Attribute, ObjectKey, ObjectMetadata};
    use serde_json::json;

    fn descriptor() -> Arc<ResourceDescriptor> {
        Arc::new(
            ResourceDescriptor::new(
                "example_com_widget_v1",
                "example.com",
                "v1",
                "Widget",
                "widgets",
                Attribute::object([("size".to_string(), Attribute::new(AttrType::Integer).optional())]),
            )
            .unwrap(),
        )
    }

    fn setup(client: &MockDynamicClient) -> (Arc<ProviderConnection>, DataSourceAdapter) {
        let connection = Arc::new(ProviderConnection::with_client(
            Arc::new(client.clone()),
            &ProviderConfig::default(),
        ));
        let mut adapter = DataSourceAdapter::new(descriptor());
        adapter.configure(&connection);
        (connection, adapter)
    }

    #[tokio::test]
    async fn test_read_existing() {
        let client = MockDynamicClient::new();
        client.seed(
            &ObjectRef::new(&descriptor(), ObjectKey::namespaced("default", "my-test")),
            json!({
                "apiVersion": "example.com/v1",
                "kind": "Widget",
                "metadata": {"name": "my-test", "namespace": "default", "labels": {"app": "web"}},
                "spec": {"size": 2, "undeclared": true}
            }),
            "someone",
        );
        let (_conn, adapter) = setup(&client);

        let query = DataSourceObject::lookup(ObjectMetadata::new("my-test").in_namespace("default"));
        let object = adapter.read(query).await.unwrap();

        assert_eq!(object.id.as_deref(), Some("default/my-test"));
        assert_eq!(object.kind, "Widget");
        assert_eq!(object.spec, json!({"size": 2}));
        assert_eq!(object.metadata.labels["app"], "web");
    }

    #[tokio::test]
    async fn test_read_missing_is_error() {
        let client = MockDynamicClient::new();
        let (_conn, adapter) = setup(&client);

        let query = DataSourceObject::lookup(ObjectMetadata::new("nope").in_namespace("default"));
        let err = adapter.read(query).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("default/nope"));
    }

    #[tokio::test]
    async fn test_offline_is_configuration_error() {
        let offline = Arc::new(ProviderConnection::offline(&ProviderConfig::default()));
        let mut adapter = DataSourceAdapter::new(descriptor());
        adapter.configure(&offline);

        let query = DataSourceObject::lookup(ObjectMetadata::new("w").in_namespace("default"));
        assert!(adapter.read(query).await.unwrap_err().is_configuration());
    }
}
