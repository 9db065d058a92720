//! Provider surface
//!
//! Every registered descriptor yields three types: a managed resource and a
//! data source named after the descriptor's type name, and a manifest-only
//! resource named `<type_name>_manifest`. Lifecycle entry points exchange
//! state as JSON.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::info;

use crdform_core::{
    AttrType, Attribute, DataSourceObject, ManagedObject, ManifestAdapter, ManifestObject,
    ResourceDescriptor,
};

use crate::adapter::ResourceAdapter;
use crate::config::ProviderConfig;
use crate::connection::ProviderConnection;
use crate::data_source::DataSourceAdapter;
use crate::error::{KubeError, Result};
use crate::registry::Registry;

/// Suffix of manifest-only type names
pub const MANIFEST_SUFFIX: &str = "_manifest";

/// Exported schemas of every type the provider serves
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSchema {
    pub provider: Attribute,
    pub resources: IndexMap<String, Attribute>,
    pub data_sources: IndexMap<String, Attribute>,
}

#[derive(Debug)]
pub struct Provider {
    registry: Registry,
    resources: IndexMap<String, ResourceAdapter>,
    data_sources: IndexMap<String, DataSourceAdapter>,
    manifests: IndexMap<String, ManifestAdapter>,
    connection: Option<Arc<ProviderConnection>>,
}

impl Provider {
    pub fn new(registry: Registry) -> Result<Self> {
        let mut resources = IndexMap::new();
        let mut data_sources = IndexMap::new();
        let mut manifests = IndexMap::new();

        for descriptor in registry.iter() {
            let name = descriptor.type_name.clone();
            resources.insert(name.clone(), ResourceAdapter::new(Arc::clone(descriptor))?);
            data_sources.insert(name.clone(), DataSourceAdapter::new(Arc::clone(descriptor)));
            manifests.insert(
                format!("{name}{MANIFEST_SUFFIX}"),
                ManifestAdapter::new(Arc::clone(descriptor))?,
            );
        }

        Ok(Self {
            registry,
            resources,
            data_sources,
            manifests,
            connection: None,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Connect according to `config`; offline configs never touch a cluster
    pub async fn configure(&mut self, config: &ProviderConfig) -> Result<()> {
        let connection = ProviderConnection::connect(config).await?;
        self.configure_with(Arc::new(connection));
        Ok(())
    }

    /// Bind an existing connection to every adapter
    pub fn configure_with(&mut self, connection: Arc<ProviderConnection>) {
        info!(
            types = self.registry.len(),
            offline = connection.is_offline(),
            field_manager = %connection.field_manager(),
            "provider configured"
        );
        for adapter in self.resources.values_mut() {
            adapter.configure(&connection);
        }
        for adapter in self.data_sources.values_mut() {
            adapter.configure(&connection);
        }
        self.connection = Some(connection);
    }

    pub fn connection(&self) -> Option<&Arc<ProviderConnection>> {
        self.connection.as_ref()
    }

    pub fn resource(&self, type_name: &str) -> Result<&ResourceAdapter> {
        self.resources
            .get(type_name)
            .ok_or_else(|| unknown_type("resource", type_name))
    }

    pub fn data_source(&self, type_name: &str) -> Result<&DataSourceAdapter> {
        self.data_sources
            .get(type_name)
            .ok_or_else(|| unknown_type("data source", type_name))
    }

    pub fn manifest(&self, type_name: &str) -> Result<&ManifestAdapter> {
        self.manifests
            .get(type_name)
            .ok_or_else(|| unknown_type("manifest", type_name))
    }

    pub async fn create(&self, type_name: &str, desired: JsonValue) -> Result<JsonValue> {
        let adapter = self.resource(type_name)?;
        let desired: ManagedObject = serde_json::from_value(desired)?;
        let created = adapter.create(desired).await?;
        Ok(serde_json::to_value(created)?)
    }

    /// `None` means the object is gone and should leave state
    pub async fn read(&self, type_name: &str, state: JsonValue) -> Result<Option<JsonValue>> {
        let adapter = self.resource(type_name)?;
        let tracked: ManagedObject = serde_json::from_value(state)?;
        match adapter.read(tracked).await? {
            Some(current) => Ok(Some(serde_json::to_value(current)?)),
            None => Ok(None),
        }
    }

    pub async fn update(
        &self,
        type_name: &str,
        prior: JsonValue,
        desired: JsonValue,
    ) -> Result<JsonValue> {
        let adapter = self.resource(type_name)?;
        let prior: ManagedObject = serde_json::from_value(prior)?;
        let desired: ManagedObject = serde_json::from_value(desired)?;
        let updated = adapter.update(&prior, desired).await?;
        Ok(serde_json::to_value(updated)?)
    }

    pub async fn delete(&self, type_name: &str, state: JsonValue) -> Result<()> {
        let adapter = self.resource(type_name)?;
        let tracked: ManagedObject = serde_json::from_value(state)?;
        adapter.delete(&tracked).await
    }

    pub fn import_state(&self, type_name: &str, raw_id: &str) -> Result<JsonValue> {
        let imported = self.resource(type_name)?.import_state(raw_id)?;
        Ok(serde_json::to_value(imported)?)
    }

    pub async fn read_data_source(&self, type_name: &str, query: JsonValue) -> Result<JsonValue> {
        let adapter = self.data_source(type_name)?;
        let query: DataSourceObject = serde_json::from_value(query)?;
        let object = adapter.read(query).await?;
        Ok(serde_json::to_value(object)?)
    }

    /// Render a manifest type; works with or without a configured connection
    pub fn render_manifest(&self, type_name: &str, input: JsonValue) -> Result<JsonValue> {
        let adapter = self.manifest(type_name)?;
        let input: ManifestObject = serde_json::from_value(input)?;
        let rendered = adapter.render(input)?;
        Ok(serde_json::to_value(rendered)?)
    }

    pub fn schema(&self) -> ProviderSchema {
        let mut resources = IndexMap::new();
        let mut data_sources = IndexMap::new();

        for descriptor in self.registry.iter() {
            let name = &descriptor.type_name;
            resources.insert(name.clone(), resource_schema(descriptor));
            resources.insert(format!("{name}{MANIFEST_SUFFIX}"), manifest_schema(descriptor));
            data_sources.insert(name.clone(), data_source_schema(descriptor));
        }

        ProviderSchema {
            provider: provider_schema(),
            resources,
            data_sources,
        }
    }
}

fn unknown_type(what: &str, type_name: &str) -> KubeError {
    KubeError::Configuration(format!("unknown {what} type '{type_name}'"))
}

fn attr(name: &str, attribute: Attribute) -> (String, Attribute) {
    (name.to_string(), attribute)
}

fn string_map() -> Attribute {
    Attribute::new(AttrType::Map).with_items(Attribute::new(AttrType::String))
}

fn described(mut attribute: Attribute, description: &str) -> Attribute {
    attribute.description = Some(description.to_string());
    attribute
}

fn metadata_schema(descriptor: &ResourceDescriptor, input: bool) -> Attribute {
    let mut attributes = vec![attr(
        "name",
        described(Attribute::new(AttrType::String).required(), "Object name"),
    )];
    if descriptor.is_namespaced() {
        attributes.push(attr(
            "namespace",
            described(Attribute::new(AttrType::String).required(), "Object namespace"),
        ));
    }

    let labels = string_map();
    let annotations = string_map();
    if input {
        attributes.push(attr("labels", labels.optional().computed()));
        attributes.push(attr("annotations", annotations.optional().computed()));
    } else {
        attributes.push(attr("labels", labels.computed()));
        attributes.push(attr("annotations", annotations.computed()));
    }

    Attribute::object(attributes).required()
}

fn spec_schema(descriptor: &ResourceDescriptor) -> Attribute {
    let mut spec = descriptor.schema.clone();
    if spec.description.is_none() {
        spec.description = descriptor.description.clone();
    }
    spec.required = false;
    spec.optional()
}

fn wait_for_schema() -> Attribute {
    let condition = Attribute::object([
        attr(
            "jsonpath",
            described(
                Attribute::new(AttrType::String).required(),
                "JSONPath into the live object, e.g. .status.phase",
            ),
        ),
        attr(
            "value",
            described(
                Attribute::new(AttrType::String).optional(),
                "Expected value; any non-null value matches when unset",
            ),
        ),
        attr(
            "timeout",
            Attribute::new(AttrType::String)
                .optional()
                .with_default(JsonValue::String("30s".to_string())),
        ),
    ]);
    described(
        Attribute::new(AttrType::Array).optional().with_items(condition),
        "Conditions to wait for after every apply",
    )
}

/// Schema of the managed resource type
pub fn resource_schema(descriptor: &ResourceDescriptor) -> Attribute {
    let mut schema = Attribute::object([
        attr("id", Attribute::new(AttrType::String).computed()),
        attr("api_version", Attribute::new(AttrType::String).computed()),
        attr("kind", Attribute::new(AttrType::String).computed()),
        attr("metadata", metadata_schema(descriptor, true)),
        attr("spec", spec_schema(descriptor)),
        attr(
            "field_manager",
            described(
                Attribute::new(AttrType::String).optional(),
                "Field manager for server-side apply, overrides the provider default",
            ),
        ),
        attr(
            "force_conflicts",
            described(
                Attribute::new(AttrType::Boolean).optional(),
                "Take ownership of fields managed by others, overrides the provider default",
            ),
        ),
        attr("wait_for", wait_for_schema()),
    ]);
    schema.description = descriptor.description.clone();
    schema
}

/// Schema of the data source type; everything but the lookup key is computed
pub fn data_source_schema(descriptor: &ResourceDescriptor) -> Attribute {
    let mut spec = descriptor.schema.clone();
    spec.required = false;
    spec.optional = false;
    spec.computed = true;

    Attribute::object([
        attr("id", Attribute::new(AttrType::String).computed()),
        attr("api_version", Attribute::new(AttrType::String).computed()),
        attr("kind", Attribute::new(AttrType::String).computed()),
        attr("metadata", metadata_schema(descriptor, false)),
        attr("spec", spec),
    ])
}

/// Schema of the `<type_name>_manifest` type
pub fn manifest_schema(descriptor: &ResourceDescriptor) -> Attribute {
    Attribute::object([
        attr("metadata", metadata_schema(descriptor, true)),
        attr("spec", spec_schema(descriptor)),
        attr(
            "yaml",
            described(Attribute::new(AttrType::String).computed(), "Rendered manifest"),
        ),
    ])
}

/// Schema of the provider block
pub fn provider_schema() -> Attribute {
    Attribute::object([
        attr("kubeconfig", Attribute::new(AttrType::String).optional()),
        attr("context", Attribute::new(AttrType::String).optional()),
        attr(
            "field_manager",
            Attribute::new(AttrType::String)
                .optional()
                .with_default(JsonValue::String(crate::config::DEFAULT_FIELD_MANAGER.to_string())),
        ),
        attr(
            "force_conflicts",
            Attribute::new(AttrType::Boolean)
                .optional()
                .with_default(JsonValue::Bool(false)),
        ),
        attr(
            "offline",
            Attribute::new(AttrType::Boolean)
                .optional()
                .with_default(JsonValue::Bool(false)),
        ),
    ])
}
