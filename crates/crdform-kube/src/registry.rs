//! Registered resource types

use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crdform_core::{DescriptorCatalog, Gvr, ResourceDescriptor};

use crate::error::{KubeError, Result};
use crate::provider::MANIFEST_SUFFIX;

/// Descriptors by type name, in registration order
#[derive(Debug, Default)]
pub struct Registry {
    by_name: IndexMap<String, Arc<ResourceDescriptor>>,
    by_gvr: HashMap<(Gvr, String), String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_catalog(catalog: DescriptorCatalog) -> Result<Self> {
        let mut registry = Self::new();
        for descriptor in catalog.descriptors {
            registry.insert(descriptor)?;
        }
        Ok(registry)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let catalog = DescriptorCatalog::from_file(path).map_err(|e| {
            KubeError::Configuration(format!("failed to load catalog {}: {e}", path.display()))
        })?;
        Self::from_catalog(catalog)
    }

    /// Register a descriptor; type names and GVR+kind must be unique
    ///
    /// Names ending in `_manifest` are reserved for the generated manifest
    /// types.
    pub fn insert(&mut self, descriptor: ResourceDescriptor) -> Result<Arc<ResourceDescriptor>> {
        descriptor.validate()?;

        if self.by_name.contains_key(&descriptor.type_name) {
            return Err(KubeError::Configuration(format!(
                "duplicate resource type '{}'",
                descriptor.type_name
            )));
        }
        if descriptor.type_name.ends_with(MANIFEST_SUFFIX) {
            return Err(KubeError::Configuration(format!(
                "resource type '{}' ends in the reserved suffix '{MANIFEST_SUFFIX}'",
                descriptor.type_name
            )));
        }

        let gvr_key = (descriptor.gvr(), descriptor.kind.clone());
        if let Some(existing) = self.by_gvr.get(&gvr_key) {
            return Err(KubeError::Configuration(format!(
                "{} {} is already registered as '{}'",
                descriptor.kind, gvr_key.0, existing
            )));
        }

        let descriptor = Arc::new(descriptor);
        self.by_gvr.insert(gvr_key, descriptor.type_name.clone());
        self.by_name
            .insert(descriptor.type_name.clone(), Arc::clone(&descriptor));
        Ok(descriptor)
    }

    pub fn get(&self, type_name: &str) -> Option<&Arc<ResourceDescriptor>> {
        self.by_name.get(type_name)
    }

    pub fn by_gvr(&self, gvr: &Gvr, kind: &str) -> Option<&Arc<ResourceDescriptor>> {
        self.by_gvr
            .get(&(gvr.clone(), kind.to_string()))
            .and_then(|name| self.by_name.get(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ResourceDescriptor>> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crdform_core::Attribute;
    use tempfile::TempDir;

    fn widget(type_name: &str, version: &str) -> ResourceDescriptor {
        ResourceDescriptor::new(type_name, "example.com", version, "Widget", "widgets", Attribute::any())
            .unwrap()
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut registry = Registry::new();
        registry.insert(widget("example_com_widget_v1", "v1")).unwrap();
        registry.insert(widget("example_com_widget_v2", "v2")).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("example_com_widget_v2").unwrap().version, "v2");
        assert_eq!(
            registry
                .by_gvr(&Gvr::new("example.com", "v1", "widgets"), "Widget")
                .unwrap()
                .type_name,
            "example_com_widget_v1"
        );
        assert!(registry.get("missing").is_none());

        let names: Vec<_> = registry.iter().map(|d| d.type_name.as_str()).collect();
        assert_eq!(names, ["example_com_widget_v1", "example_com_widget_v2"]);
    }

    #[test]
    fn test_duplicate_type_name_rejected() {
        let mut registry = Registry::new();
        registry.insert(widget("example_com_widget_v1", "v1")).unwrap();
        let err = registry.insert(widget("example_com_widget_v1", "v2")).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_duplicate_gvr_rejected() {
        let mut registry = Registry::new();
        registry.insert(widget("example_com_widget_v1", "v1")).unwrap();
        let err = registry.insert(widget("widget_alias", "v1")).unwrap_err();
        assert!(err.to_string().contains("example_com_widget_v1"));
    }

    #[test]
    fn test_manifest_suffix_reserved() {
        let mut registry = Registry::new();
        registry.insert(widget("widget", "v1")).unwrap();

        let err = registry.insert(widget("widget_manifest", "v2")).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("reserved suffix"));
        assert_eq!(registry.len(), 1);

        // Rejected on its own too, so registration order cannot matter
        let err = Registry::new().insert(widget("widget_manifest", "v1")).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.yaml");
        std::fs::write(
            &path,
            "descriptors:\n  - typeName: example_com_widget_v1\n    group: example.com\n    version: v1\n    kind: Widget\n    plural: widgets\n",
        )
        .unwrap();

        let registry = Registry::from_file(&path).unwrap();
        assert_eq!(registry.len(), 1);

        let err = Registry::from_file(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(err.is_configuration());
    }
}
