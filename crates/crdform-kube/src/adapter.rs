//! Generic resource lifecycle
//!
//! One [`ResourceAdapter`] serves one CRD kind/version, driven entirely by
//! its [`ResourceDescriptor`]. Creates and updates are the same
//! server-side apply; the server's response becomes the new state.

use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

use crdform_core::id;
use crdform_core::object::spec_for_validation;
use crdform_core::{ManagedObject, ObjectKey, ObjectMetadata, ResourceDescriptor, SchemaValidator};

use crate::client::ObjectRef;
use crate::connection::ProviderConnection;
use crate::error::{KubeError, Result};
use crate::wait::{DEFAULT_POLL_INTERVAL, JsonPath, Waiter};

/// Lifecycle adapter for one custom resource type
#[derive(Debug)]
pub struct ResourceAdapter {
    descriptor: Arc<ResourceDescriptor>,
    validator: SchemaValidator,
    connection: Option<Weak<ProviderConnection>>,
    wait_interval: Duration,
}

impl ResourceAdapter {
    pub fn new(descriptor: Arc<ResourceDescriptor>) -> Result<Self> {
        let validator = SchemaValidator::new(descriptor.schema.clone())?;
        Ok(Self {
            descriptor,
            validator,
            connection: None,
            wait_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_wait_interval(mut self, interval: Duration) -> Self {
        self.wait_interval = interval;
        self
    }

    pub fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    /// Bind the provider connection
    ///
    /// The adapter never keeps the connection alive on its own.
    pub fn configure(&mut self, connection: &Arc<ProviderConnection>) {
        debug!(
            type_name = %self.descriptor.type_name,
            offline = connection.is_offline(),
            "configuring resource adapter"
        );
        self.connection = Some(Arc::downgrade(connection));
    }

    pub fn is_configured(&self) -> bool {
        self.connection.is_some()
    }

    /// The bound connection, or a configuration error
    ///
    /// Offline connections are rejected here so that no lifecycle call
    /// reaches a client.
    fn connection(&self) -> Result<Arc<ProviderConnection>> {
        let weak = self.connection.as_ref().ok_or_else(|| {
            KubeError::Configuration(format!(
                "resource {} used before the provider was configured",
                self.descriptor.type_name
            ))
        })?;
        let connection = weak.upgrade().ok_or_else(|| {
            KubeError::Configuration("provider connection has been dropped".to_string())
        })?;
        if connection.is_offline() {
            return Err(KubeError::Configuration(format!(
                "provider is offline; resource {} cannot be managed, use {}_manifest instead",
                self.descriptor.type_name, self.descriptor.type_name
            )));
        }
        Ok(connection)
    }

    /// Create the object on the cluster
    pub async fn create(&self, desired: ManagedObject) -> Result<ManagedObject> {
        let connection = self.connection()?;
        self.validate(&desired)?;

        let key = self.key_of(&desired.metadata)?;
        info!(
            type_name = %self.descriptor.type_name,
            namespace = key.namespace.as_deref().unwrap_or(""),
            name = %key.name,
            "creating"
        );

        let mut created = self.apply(&connection, desired, &key).await?;
        created.id = Some(key.to_id());
        Ok(created)
    }

    /// Refresh tracked state from the cluster
    ///
    /// Returns `None` when the object no longer exists, meaning it should
    /// be dropped from state.
    pub async fn read(&self, tracked: ManagedObject) -> Result<Option<ManagedObject>> {
        let connection = self.connection()?;
        let client = connection.client()?;
        let key = self.tracked_key(&tracked)?;
        let target = ObjectRef::new(&self.descriptor, key);

        let raw = match client.get(&target).await {
            Ok(raw) => raw,
            Err(e) if e.is_not_found() => {
                warn!(target = %target, "object no longer exists, removing from state");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let mut current = tracked;
        current.stamp(&self.descriptor);
        current.merge_from_raw(&raw, &self.descriptor.schema)?;
        Ok(Some(current))
    }

    /// Apply changes to an existing object; the ID is carried over
    pub async fn update(&self, prior: &ManagedObject, desired: ManagedObject) -> Result<ManagedObject> {
        let connection = self.connection()?;
        self.validate(&desired)?;

        let key = self.key_of(&desired.metadata)?;
        let prior_key = self.tracked_key(prior)?;
        if key != prior_key {
            return Err(KubeError::InvalidInput(format!(
                "cannot change the identity of {} '{}' to '{}'; the object must be replaced",
                self.descriptor.kind, prior_key, key
            )));
        }

        info!(
            type_name = %self.descriptor.type_name,
            namespace = key.namespace.as_deref().unwrap_or(""),
            name = %key.name,
            "updating"
        );

        let mut updated = self.apply(&connection, desired, &key).await?;
        updated.id = prior.id.clone();
        Ok(updated)
    }

    /// Delete the object; a missing object is reported as `NotFound`
    pub async fn delete(&self, tracked: &ManagedObject) -> Result<()> {
        let connection = self.connection()?;
        let client = connection.client()?;
        let key = self.tracked_key(tracked)?;
        let target = ObjectRef::new(&self.descriptor, key);

        info!(target = %target, "deleting");
        client.delete(&target).await
    }

    /// Skeleton state for an imported object, hydrated by a later `read`
    pub fn import_state(&self, raw_id: &str) -> Result<ManagedObject> {
        self.connection()?;
        let key = id::decode_for_scope(raw_id, self.descriptor.scope)?;

        let metadata = ObjectMetadata {
            name: key.name.clone(),
            namespace: key.namespace.clone(),
            ..Default::default()
        };
        let mut object = ManagedObject::new(metadata, serde_json::Value::Null);
        object.stamp(&self.descriptor);
        object.id = Some(key.to_id());
        Ok(object)
    }

    fn validate(&self, desired: &ManagedObject) -> Result<()> {
        let result = self
            .validator
            .validate(&spec_for_validation(&desired.spec, &self.descriptor.schema));
        if !result.is_valid {
            return Err(KubeError::validation(&self.descriptor.type_name, result.errors));
        }
        // Checked here so a bad path never leaves an applied object behind
        for condition in &desired.wait_for {
            JsonPath::parse(&condition.jsonpath)?;
        }
        Ok(())
    }

    fn key_of(&self, metadata: &ObjectMetadata) -> Result<ObjectKey> {
        Ok(metadata.key(self.descriptor.scope)?)
    }

    /// Key of tracked state, preferring its ID
    fn tracked_key(&self, tracked: &ManagedObject) -> Result<ObjectKey> {
        match tracked.id.as_deref() {
            Some(raw) => Ok(id::decode_for_scope(raw, self.descriptor.scope)?),
            None => self.key_of(&tracked.metadata),
        }
    }

    async fn apply(
        &self,
        connection: &ProviderConnection,
        mut object: ManagedObject,
        key: &ObjectKey,
    ) -> Result<ManagedObject> {
        let client = connection.client()?;

        object.stamp(&self.descriptor);
        if !self.descriptor.is_namespaced() {
            object.metadata.namespace = None;
        }
        self.descriptor.schema.apply_defaults(&mut object.spec);

        let wire = object.to_wire(&self.descriptor).to_json()?;
        let params = connection.apply_params(&object);
        let target = ObjectRef::new(&self.descriptor, key.clone());

        let raw = client.apply(&target, &wire, &params).await?;
        object.merge_from_raw(&raw, &self.descriptor.schema)?;

        if !object.wait_for.is_empty() {
            Waiter::new(client)
                .with_interval(self.wait_interval)
                .wait_all(&target, &object.wait_for)
                .await?;
        }

        Ok(object)
    }
}
