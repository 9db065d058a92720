//! Resource descriptors and descriptor catalogs
//!
//! A [`ResourceDescriptor`] carries everything needed to manage one CRD
//! kind/version: where it lives in the API (group, version, plural), how it
//! is scoped, and the attribute tree of its `spec`. Descriptors are plain
//! data, loaded from a YAML catalog:
//!
//! ```yaml
//! descriptors:
//!   - typeName: example_com_widget_v1
//!     group: example.com
//!     version: v1
//!     kind: Widget
//!     plural: widgets
//!     schema:
//!       type: object
//!       attributes:
//!         size:
//!           type: integer
//!           optional: true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::schema::Attribute;

/// Group, version and plural resource name of an API type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Gvr {
    /// API group, empty for the core group
    pub group: String,
    pub version: String,
    /// Plural resource name used in URLs
    pub resource: String,
}

impl Gvr {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
        }
    }

    /// `group/version`, or just `version` for the core group
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl std::fmt::Display for Gvr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}/{}", self.version, self.resource)
        } else {
            write!(f, "{}/{}/{}", self.group, self.version, self.resource)
        }
    }
}

/// Whether objects of a kind live in a namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Scope {
    #[default]
    Namespaced,
    Cluster,
}

/// Static description of one CRD kind and version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    /// Terraform type name, e.g. `example_com_widget_v1`
    pub type_name: String,

    #[serde(default)]
    pub group: String,

    pub version: String,

    pub kind: String,

    pub plural: String,

    #[serde(default)]
    pub scope: Scope,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Schema of the object's `spec`
    #[serde(default)]
    pub schema: Attribute,
}

impl ResourceDescriptor {
    /// Build and validate a descriptor
    pub fn new(
        type_name: impl Into<String>,
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
        plural: impl Into<String>,
        schema: Attribute,
    ) -> Result<Self> {
        let descriptor = Self {
            type_name: type_name.into(),
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
            plural: plural.into(),
            scope: Scope::Namespaced,
            description: None,
            schema,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Mark the kind as cluster-scoped
    pub fn cluster_scoped(mut self) -> Self {
        self.scope = Scope::Cluster;
        self
    }

    pub fn gvr(&self) -> Gvr {
        Gvr::new(&self.group, &self.version, &self.plural)
    }

    pub fn api_version(&self) -> String {
        self.gvr().api_version()
    }

    pub fn is_namespaced(&self) -> bool {
        self.scope == Scope::Namespaced
    }

    /// Check the descriptor's invariants
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| CoreError::InvalidDescriptor {
            type_name: self.type_name.clone(),
            message: message.to_string(),
        };

        if self.type_name.is_empty()
            || !self
                .type_name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(invalid("typeName must be non-empty and match [a-z0-9_]+"));
        }
        if self.version.is_empty() {
            return Err(invalid("version is required"));
        }
        if self.kind.is_empty() {
            return Err(invalid("kind is required"));
        }
        if self.plural.is_empty() {
            return Err(invalid("plural is required"));
        }

        self.schema
            .check()
            .map_err(|e| invalid(&e.to_string()))
    }
}

/// A set of descriptors loaded from one file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DescriptorCatalog {
    #[serde(default)]
    pub descriptors: Vec<ResourceDescriptor>,
}

impl DescriptorCatalog {
    /// Load a catalog from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a catalog
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let catalog: Self = serde_yaml::from_str(yaml)?;
        for descriptor in &catalog.descriptors {
            descriptor.validate()?;
        }
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AttrType;

    const CATALOG: &str = r#"
descriptors:
  - typeName: example_com_widget_v1
    group: example.com
    version: v1
    kind: Widget
    plural: widgets
    schema:
      type: object
      attributes:
        size:
          type: integer
          optional: true
  - typeName: example_com_cluster_policy_v1alpha1
    group: example.com
    version: v1alpha1
    kind: ClusterPolicy
    plural: clusterpolicies
    scope: Cluster
"#;

    #[test]
    fn test_gvr_api_version() {
        assert_eq!(Gvr::new("apps", "v1", "deployments").api_version(), "apps/v1");
        assert_eq!(Gvr::new("", "v1", "configmaps").api_version(), "v1");
    }

    #[test]
    fn test_gvr_display() {
        assert_eq!(
            Gvr::new("example.com", "v1", "widgets").to_string(),
            "example.com/v1/widgets"
        );
        assert_eq!(Gvr::new("", "v1", "pods").to_string(), "v1/pods");
    }

    #[test]
    fn test_catalog_parse() {
        let catalog = DescriptorCatalog::from_yaml(CATALOG).unwrap();
        assert_eq!(catalog.descriptors.len(), 2);

        let widget = &catalog.descriptors[0];
        assert_eq!(widget.kind, "Widget");
        assert_eq!(widget.api_version(), "example.com/v1");
        assert!(widget.is_namespaced());
        assert_eq!(widget.schema.attributes["size"].attr_type, AttrType::Integer);

        let policy = &catalog.descriptors[1];
        assert_eq!(policy.scope, Scope::Cluster);
        assert_eq!(policy.schema.attr_type, AttrType::Any);
    }

    #[test]
    fn test_catalog_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.yaml");
        std::fs::write(&path, CATALOG).unwrap();

        let catalog = DescriptorCatalog::from_file(&path).unwrap();
        assert_eq!(catalog.descriptors.len(), 2);
    }

    #[test]
    fn test_descriptor_validation() {
        assert!(
            ResourceDescriptor::new("Bad-Name", "g", "v1", "K", "ks", Attribute::any()).is_err()
        );
        assert!(ResourceDescriptor::new("ok_name", "g", "", "K", "ks", Attribute::any()).is_err());
        assert!(ResourceDescriptor::new("ok_name", "g", "v1", "", "ks", Attribute::any()).is_err());
        assert!(ResourceDescriptor::new("ok_name", "", "v1", "K", "ks", Attribute::any()).is_ok());
    }

    #[test]
    fn test_catalog_rejects_invalid_schema() {
        let yaml = r#"
descriptors:
  - typeName: broken_v1
    version: v1
    kind: Broken
    plural: brokens
    schema:
      type: string
      attributes:
        nested:
          type: string
"#;
        assert!(DescriptorCatalog::from_yaml(yaml).is_err());
    }
}
