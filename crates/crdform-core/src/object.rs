//! Tracked object shapes
//!
//! These are the values that cross the Terraform boundary (snake_case
//! attribute names) and the wire object sent to the API server (camelCase).

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::descriptor::{ResourceDescriptor, Scope};
use crate::error::{CoreError, Result};
use crate::id::ObjectKey;
use crate::schema::{AttrType, Attribute};

/// Default timeout of a wait condition
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// The subset of object metadata tracked in state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl ObjectMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Extract the tracked metadata fields from a raw server object
    ///
    /// Server-managed fields (uid, resourceVersion, managedFields, ...) are
    /// dropped.
    pub fn from_raw(raw: &JsonValue) -> Result<Self> {
        let metadata = raw.get("metadata").cloned().unwrap_or(JsonValue::Null);
        if metadata.is_null() {
            return Err(CoreError::MissingField {
                field: "metadata".to_string(),
            });
        }
        Ok(serde_json::from_value(metadata)?)
    }

    /// Object key for a kind of the given scope
    pub fn key(&self, scope: Scope) -> Result<ObjectKey> {
        if self.name.is_empty() {
            return Err(CoreError::MissingField {
                field: "metadata.name".to_string(),
            });
        }
        match scope {
            Scope::Cluster => Ok(ObjectKey::cluster(&self.name)),
            Scope::Namespaced => match self.namespace.as_deref() {
                Some(ns) if !ns.is_empty() => Ok(ObjectKey::namespaced(ns, &self.name)),
                _ => Err(CoreError::MissingField {
                    field: "metadata.namespace".to_string(),
                }),
            },
        }
    }
}

/// Post-apply condition to wait for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitCondition {
    /// JSONPath into the live object, e.g. `.status.phase`
    pub jsonpath: String,

    /// Expected value; any non-null value matches when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(with = "humantime_serde", default = "default_wait_timeout")]
    pub timeout: Duration,
}

fn default_wait_timeout() -> Duration {
    DEFAULT_WAIT_TIMEOUT
}

impl WaitCondition {
    pub fn new(jsonpath: impl Into<String>, value: Option<String>) -> Self {
        Self {
            jsonpath: jsonpath.into(),
            value,
            timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A custom resource managed through the resource lifecycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManagedObject {
    /// Composite ID, computed on create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub api_version: String,

    #[serde(default)]
    pub kind: String,

    pub metadata: ObjectMetadata,

    #[serde(default, skip_serializing_if = "JsonValue::is_null")]
    pub spec: JsonValue,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_manager: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_conflicts: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub wait_for: Vec<WaitCondition>,
}

impl ManagedObject {
    pub fn new(metadata: ObjectMetadata, spec: JsonValue) -> Self {
        Self {
            metadata,
            spec,
            ..Default::default()
        }
    }

    /// Stamp `apiVersion` and `kind` from the descriptor
    pub fn stamp(&mut self, descriptor: &ResourceDescriptor) {
        self.api_version = descriptor.api_version();
        self.kind = descriptor.kind.clone();
    }

    /// The object as sent to the API server; local-only fields are left out
    pub fn to_wire(&self, descriptor: &ResourceDescriptor) -> WireObject {
        WireObject::new(descriptor, self.metadata.clone(), self.spec.clone())
    }

    /// Overwrite `metadata` and `spec` with what the server returned
    ///
    /// `id`, `field_manager`, `force_conflicts` and `wait_for` are kept.
    pub fn merge_from_raw(&mut self, raw: &JsonValue, schema: &Attribute) -> Result<()> {
        let (metadata, spec) = split_raw(raw, schema)?;
        self.metadata = metadata;
        self.spec = spec;
        Ok(())
    }
}

/// A custom resource read through a data source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSourceObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub api_version: String,

    #[serde(default)]
    pub kind: String,

    pub metadata: ObjectMetadata,

    #[serde(default, skip_serializing_if = "JsonValue::is_null")]
    pub spec: JsonValue,
}

impl DataSourceObject {
    pub fn lookup(metadata: ObjectMetadata) -> Self {
        Self {
            metadata,
            ..Default::default()
        }
    }

    /// Fill everything but the lookup key from a raw server object
    pub fn merge_from_raw(&mut self, raw: &JsonValue, descriptor: &ResourceDescriptor) -> Result<()> {
        let (metadata, spec) = split_raw(raw, &descriptor.schema)?;
        self.api_version = descriptor.api_version();
        self.kind = descriptor.kind.clone();
        self.metadata = metadata;
        self.spec = spec;
        Ok(())
    }
}

/// User input and output of a manifest-only type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestObject {
    pub metadata: ObjectMetadata,

    #[serde(default, skip_serializing_if = "JsonValue::is_null")]
    pub spec: JsonValue,

    /// Rendered YAML, computed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yaml: Option<String>,
}

/// Kubernetes representation of a custom resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireObject {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMetadata,
    #[serde(default, skip_serializing_if = "JsonValue::is_null")]
    pub spec: JsonValue,
}

impl WireObject {
    pub fn new(descriptor: &ResourceDescriptor, metadata: ObjectMetadata, spec: JsonValue) -> Self {
        Self {
            api_version: descriptor.api_version(),
            kind: descriptor.kind.clone(),
            metadata,
            spec,
        }
    }

    pub fn to_json(&self) -> Result<JsonValue> {
        Ok(serde_json::to_value(self)?)
    }
}

/// The value validated against a descriptor's schema
///
/// A missing spec is validated as an empty object when the schema
/// declares one, so required attributes are still reported.
pub fn spec_for_validation(spec: &JsonValue, schema: &Attribute) -> JsonValue {
    if spec.is_null() && schema.attr_type == AttrType::Object {
        JsonValue::Object(serde_json::Map::new())
    } else {
        spec.clone()
    }
}

fn split_raw(raw: &JsonValue, schema: &Attribute) -> Result<(ObjectMetadata, JsonValue)> {
    let metadata = ObjectMetadata::from_raw(raw)?;
    let spec = raw
        .get("spec")
        .map(|s| schema.project(s))
        .unwrap_or(JsonValue::Null);
    Ok((metadata, spec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn widget() -> ResourceDescriptor {
        ResourceDescriptor::new(
            "example_com_widget_v1",
            "example.com",
            "v1",
            "Widget",
            "widgets",
            Attribute::object([(
                "size".to_string(),
                Attribute::new(AttrType::Integer).optional(),
            )]),
        )
        .unwrap()
    }

    #[test]
    fn test_metadata_from_raw_drops_server_fields() {
        let raw = json!({
            "metadata": {
                "name": "w",
                "namespace": "default",
                "uid": "1234",
                "resourceVersion": "42",
                "labels": {"app": "web"},
                "managedFields": [{"manager": "crdform"}]
            }
        });
        let metadata = ObjectMetadata::from_raw(&raw).unwrap();
        assert_eq!(metadata.name, "w");
        assert_eq!(metadata.namespace.as_deref(), Some("default"));
        assert_eq!(metadata.labels.get("app").map(String::as_str), Some("web"));
        assert!(metadata.annotations.is_empty());
    }

    #[test]
    fn test_metadata_from_raw_requires_metadata() {
        assert!(ObjectMetadata::from_raw(&json!({"spec": {}})).is_err());
    }

    #[test]
    fn test_metadata_key() {
        let metadata = ObjectMetadata::new("w").in_namespace("default");
        assert_eq!(metadata.key(Scope::Namespaced).unwrap().to_id(), "default/w");
        assert_eq!(metadata.key(Scope::Cluster).unwrap().to_id(), "w");

        let no_ns = ObjectMetadata::new("w");
        assert!(no_ns.key(Scope::Namespaced).is_err());
        assert!(ObjectMetadata::default().key(Scope::Cluster).is_err());
    }

    #[test]
    fn test_wait_condition_default_timeout() {
        let condition: WaitCondition =
            serde_json::from_value(json!({"jsonpath": ".status.phase", "value": "Ready"})).unwrap();
        assert_eq!(condition.timeout, Duration::from_secs(30));

        let condition: WaitCondition =
            serde_json::from_value(json!({"jsonpath": ".status.phase", "timeout": "2m"})).unwrap();
        assert_eq!(condition.timeout, Duration::from_secs(120));
        assert!(condition.value.is_none());
    }

    #[test]
    fn test_to_wire_excludes_local_fields() {
        let mut object = ManagedObject::new(
            ObjectMetadata::new("w").in_namespace("default"),
            json!({"size": 3}),
        );
        object.field_manager = Some("me".into());
        object.force_conflicts = Some(true);
        object.wait_for = vec![WaitCondition::new(".status.ready", None)];

        let wire = object.to_wire(&widget()).to_json().unwrap();
        assert_eq!(
            wire,
            json!({
                "apiVersion": "example.com/v1",
                "kind": "Widget",
                "metadata": {"name": "w", "namespace": "default"},
                "spec": {"size": 3}
            })
        );
    }

    #[test]
    fn test_merge_from_raw_keeps_local_fields() {
        let descriptor = widget();
        let mut object = ManagedObject::new(ObjectMetadata::new("w"), json!({"size": 1}));
        object.id = Some("default/w".into());
        object.field_manager = Some("me".into());

        let raw = json!({
            "apiVersion": "example.com/v1",
            "kind": "Widget",
            "metadata": {"name": "w", "namespace": "default", "labels": {"injected": "yes"}},
            "spec": {"size": 2, "serverOnly": true},
            "status": {"ready": true}
        });
        object.merge_from_raw(&raw, &descriptor.schema).unwrap();

        assert_eq!(object.id.as_deref(), Some("default/w"));
        assert_eq!(object.field_manager.as_deref(), Some("me"));
        assert_eq!(object.spec, json!({"size": 2}));
        assert_eq!(object.metadata.labels["injected"], "yes");
    }

    #[test]
    fn test_managed_object_state_shape() {
        let object: ManagedObject = serde_json::from_value(json!({
            "metadata": {"name": "w", "namespace": "default"},
            "spec": {"size": 1},
            "force_conflicts": true,
            "wait_for": [{"jsonpath": ".status.ready", "value": "true"}]
        }))
        .unwrap();
        assert_eq!(object.force_conflicts, Some(true));
        assert_eq!(object.wait_for.len(), 1);
        assert!(object.id.is_none());
    }

    #[test]
    fn test_spec_for_validation() {
        let schema = widget().schema;
        assert_eq!(spec_for_validation(&JsonValue::Null, &schema), json!({}));
        assert_eq!(spec_for_validation(&JsonValue::Null, &Attribute::any()), JsonValue::Null);
    }

    #[test]
    fn test_data_source_merge() {
        let descriptor = widget();
        let mut object = DataSourceObject::lookup(ObjectMetadata::new("w").in_namespace("default"));
        object
            .merge_from_raw(
                &json!({"metadata": {"name": "w", "namespace": "default"}, "spec": {"size": 9}}),
                &descriptor,
            )
            .unwrap();
        assert_eq!(object.api_version, "example.com/v1");
        assert_eq!(object.kind, "Widget");
        assert_eq!(object.spec, json!({"size": 9}));
    }
}
