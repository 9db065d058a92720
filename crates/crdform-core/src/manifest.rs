//! Manifest-only rendering
//!
//! A manifest type turns user input into a YAML document without ever
//! talking to a cluster. It can only fail on schema validation or
//! serialization.

use std::sync::Arc;

use crate::descriptor::ResourceDescriptor;
use crate::error::{CoreError, Result};
use crate::object::{ManifestObject, WireObject, spec_for_validation};
use crate::schema::SchemaValidator;

/// Renders objects of one kind to YAML
#[derive(Debug)]
pub struct ManifestAdapter {
    descriptor: Arc<ResourceDescriptor>,
    validator: SchemaValidator,
}

impl ManifestAdapter {
    pub fn new(descriptor: Arc<ResourceDescriptor>) -> Result<Self> {
        let validator = SchemaValidator::new(descriptor.schema.clone())?;
        Ok(Self {
            descriptor,
            validator,
        })
    }

    pub fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    /// Validate the input and fill in its `yaml` attribute
    ///
    /// Declared defaults are filled in first, as they are for applied
    /// objects, so the rendered `spec` matches what would be applied.
    pub fn render(&self, mut object: ManifestObject) -> Result<ManifestObject> {
        let result = self
            .validator
            .validate(&spec_for_validation(&object.spec, &self.descriptor.schema));
        if !result.is_valid {
            return Err(CoreError::Validation {
                type_name: self.descriptor.type_name.clone(),
                errors: result.errors,
            });
        }

        self.descriptor.schema.apply_defaults(&mut object.spec);
        object.yaml = Some(render_yaml(&self.descriptor, &object)?);
        Ok(object)
    }
}

/// Serialize `{apiVersion, kind, metadata, spec}` in that key order
pub fn render_yaml(descriptor: &ResourceDescriptor, object: &ManifestObject) -> Result<String> {
    let wire = WireObject::new(descriptor, object.metadata.clone(), object.spec.clone());
    Ok(serde_yaml::to_string(&wire)?)
}
