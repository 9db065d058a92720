//! Composite resource IDs
//!
//! Tracked objects are identified by `namespace/name`. The same ordering is used
//! for managed resources and data sources. Cluster-scoped kinds have no
//! namespace, so their ID is the bare name.
//!
//! Older data-source state used `name/namespace`; [`migrate_name_first`]
//! rewrites such IDs into the canonical form.

use crate::descriptor::Scope;
use crate::error::{CoreError, Result};

/// Separator between namespace and name
pub const SEPARATOR: char = '/';

const NAMESPACED_SHAPE: &str = "'namespace/name' with exactly one '/' and two non-empty parts";
const CLUSTER_SHAPE: &str = "'name' (non-empty, without '/')";

/// A decoded object key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    /// Namespace, `None` for cluster-scoped objects
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectKey {
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    pub fn cluster(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    /// Encode back into a composite ID
    pub fn to_id(&self) -> String {
        match &self.namespace {
            Some(ns) => encode(ns, &self.name),
            None => self.name.clone(),
        }
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_id())
    }
}

/// Build the composite ID for a namespaced object
pub fn encode(namespace: &str, name: &str) -> String {
    format!("{}{}{}", namespace, SEPARATOR, name)
}

/// Split a composite ID into `(namespace, name)`
pub fn decode(id: &str) -> Result<(String, String)> {
    let invalid = || CoreError::InvalidId {
        id: id.to_string(),
        expected: NAMESPACED_SHAPE,
    };

    let mut parts = id.split(SEPARATOR);
    let (Some(namespace), Some(name), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid());
    };

    if namespace.is_empty() || name.is_empty() {
        return Err(invalid());
    }

    Ok((namespace.to_string(), name.to_string()))
}

/// Decode an ID according to the scope of its kind
pub fn decode_for_scope(id: &str, scope: Scope) -> Result<ObjectKey> {
    match scope {
        Scope::Namespaced => {
            let (namespace, name) = decode(id)?;
            Ok(ObjectKey::namespaced(namespace, name))
        }
        Scope::Cluster => {
            if id.is_empty() || id.contains(SEPARATOR) {
                return Err(CoreError::InvalidId {
                    id: id.to_string(),
                    expected: CLUSTER_SHAPE,
                });
            }
            Ok(ObjectKey::cluster(id))
        }
    }
}

/// Rewrite a legacy `name/namespace` ID into `namespace/name`
pub fn migrate_name_first(id: &str) -> Result<String> {
    let (name, namespace) = decode(id)?;
    Ok(encode(&namespace, &name))
}
