//! Dynamic client facade
//!
//! One client serves every custom resource kind: objects are addressed by
//! GVR + kind + namespace + name and exchanged as raw JSON. Writes use
//! Server-Side Apply so that field ownership is tracked by the API server.
//!
//! The facade never retries; a failed call is reported immediately.

use async_trait::async_trait;
use kube::{
    Client,
    api::{Api, DeleteParams, DynamicObject, Patch, PatchParams},
    core::GroupVersionKind,
    discovery::ApiResource,
};
use serde_json::Value as JsonValue;
use tracing::debug;

use crdform_core::{Gvr, ObjectKey, ResourceDescriptor};

use crate::error::{KubeError, Result};

/// Fully-qualified address of one object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub gvr: Gvr,
    pub kind: String,
    pub key: ObjectKey,
}

impl ObjectRef {
    pub fn new(descriptor: &ResourceDescriptor, key: ObjectKey) -> Self {
        Self {
            gvr: descriptor.gvr(),
            kind: descriptor.kind.clone(),
            key,
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.key.namespace.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    fn not_found(&self) -> KubeError {
        KubeError::NotFound {
            resource: self.kind.clone(),
            key: self.key.to_id(),
        }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.key)
    }
}

/// Server-Side Apply parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyParams {
    pub field_manager: String,
    /// Take ownership of fields owned by other managers
    pub force: bool,
}

/// Uniform GET / apply / DELETE against any resource type
///
/// Implementations must be safe to share between adapters running
/// concurrently.
#[async_trait]
pub trait DynamicClient: Send + Sync {
    /// Fetch the live object
    async fn get(&self, target: &ObjectRef) -> Result<JsonValue>;

    /// Server-side apply `object`, returning the object as stored
    async fn apply(
        &self,
        target: &ObjectRef,
        object: &JsonValue,
        params: &ApplyParams,
    ) -> Result<JsonValue>;

    /// Delete the object
    async fn delete(&self, target: &ObjectRef) -> Result<()>;
}

/// [`DynamicClient`] backed by a real API server
#[derive(Clone)]
pub struct KubeDynamicClient {
    client: Client,
}

impl KubeDynamicClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create an Api client for a target, without discovery
    fn api_for(&self, target: &ObjectRef) -> Api<DynamicObject> {
        let gvk = GroupVersionKind::gvk(&target.gvr.group, &target.gvr.version, &target.kind);
        let api_resource = ApiResource::from_gvk_with_plural(&gvk, &target.gvr.resource);
        match target.namespace() {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &api_resource),
            None => Api::all_with(self.client.clone(), &api_resource),
        }
    }
}

#[async_trait]
impl DynamicClient for KubeDynamicClient {
    async fn get(&self, target: &ObjectRef) -> Result<JsonValue> {
        debug!(target = %target, "GET");
        let obj = self
            .api_for(target)
            .get(target.name())
            .await
            .map_err(|e| classify_error(e, target))?;
        Ok(serde_json::to_value(obj)?)
    }

    async fn apply(
        &self,
        target: &ObjectRef,
        object: &JsonValue,
        params: &ApplyParams,
    ) -> Result<JsonValue> {
        debug!(
            target = %target,
            field_manager = %params.field_manager,
            force = params.force,
            "server-side apply"
        );

        let mut patch_params = PatchParams::apply(&params.field_manager);
        if params.force {
            patch_params = patch_params.force();
        }

        let obj = self
            .api_for(target)
            .patch(target.name(), &patch_params, &Patch::Apply(object))
            .await
            .map_err(|e| classify_error(e, target))?;
        Ok(serde_json::to_value(obj)?)
    }

    async fn delete(&self, target: &ObjectRef) -> Result<()> {
        debug!(target = %target, "DELETE");
        self.api_for(target)
            .delete(target.name(), &DeleteParams::default())
            .await
            .map_err(|e| classify_error(e, target))?;
        Ok(())
    }
}

/// Map API errors onto the error taxonomy
fn classify_error(err: kube::Error, target: &ObjectRef) -> KubeError {
    match err {
        kube::Error::Api(resp) if resp.code == 404 => target.not_found(),
        kube::Error::Api(resp) if resp.code == 409 && resp.reason == "Conflict" => {
            KubeError::Conflict {
                resource: target.kind.clone(),
                key: target.key.to_id(),
                managers: parse_conflict_managers(&resp.message),
                message: resp.message,
            }
        }
        other => KubeError::Transport(other),
    }
}

/// Extract the field managers named in a Server-Side Apply conflict message
///
/// The API server reports conflicts as
/// `Apply failed with 1 conflict: conflict with "kubectl" using v1: .spec.x`.
pub fn parse_conflict_managers(message: &str) -> Vec<String> {
    const MARKER: &str = "with \"";

    let mut managers: Vec<String> = Vec::new();
    let mut rest = message;
    while let Some(start) = rest.find(MARKER) {
        rest = &rest[start + MARKER.len()..];
        let Some(end) = rest.find('"') else { break };
        let manager = &rest[..end];
        if !manager.is_empty() && !managers.iter().any(|m| m == manager) {
            managers.push(manager.to_string());
        }
        rest = &rest[end + 1..];
    }
    managers
}
