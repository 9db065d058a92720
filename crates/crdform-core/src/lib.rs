//! crdform Core - cluster-independent building blocks
//!
//! This crate provides the data-driven description of custom resources:
//! - `ResourceDescriptor`: GVR, scope and spec schema of one CRD kind/version
//! - `Attribute`: schema trees with declarative validators
//! - `id`: the `namespace/name` composite ID codec
//! - `ManagedObject` / `DataSourceObject` / `ManifestObject`: tracked state
//! - `ManifestAdapter`: local YAML rendering with no cluster contact

pub mod descriptor;
pub mod error;
pub mod id;
pub mod manifest;
pub mod object;
pub mod schema;

pub use descriptor::{DescriptorCatalog, Gvr, ResourceDescriptor, Scope};
pub use error::{CoreError, Result, ValidationErrorInfo};
pub use id::ObjectKey;
pub use manifest::ManifestAdapter;
pub use object::{
    DataSourceObject, ManagedObject, ManifestObject, ObjectMetadata, WaitCondition, WireObject,
};
pub use schema::{AttrType, Attribute, SchemaValidator, ValidationResult, Validator};
