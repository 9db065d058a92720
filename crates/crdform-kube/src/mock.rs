//! In-memory dynamic client for testing
//!
//! Objects are stored per [`ObjectRef`] together with a field ownership map,
//! which is enough to reproduce the Server-Side Apply behaviors the adapters
//! depend on: conflicts between field managers, forced ownership transfer,
//! pruning of fields a manager stopped applying, and server-injected
//! defaults.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::client::{ApplyParams, DynamicClient, ObjectRef};
use crate::error::{KubeError, Result};

/// Path of a leaf field, e.g. `["spec", "size"]`
type FieldPath = Vec<String>;

#[derive(Debug, Clone, Default)]
struct StoredObject {
    object: JsonValue,
    owners: BTreeMap<FieldPath, String>,
    generation: u64,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub gets: usize,
    pub applies: usize,
    pub deletes: usize,
}

impl OperationCounts {
    pub fn total(&self) -> usize {
        self.gets + self.applies + self.deletes
    }
}

/// In-memory [`DynamicClient`]
#[derive(Clone, Default)]
pub struct MockDynamicClient {
    store: Arc<RwLock<HashMap<ObjectRef, StoredObject>>>,
    operations: Arc<RwLock<OperationCounts>>,
    injected_labels: Arc<RwLock<BTreeMap<String, String>>>,
    unreachable: Arc<AtomicBool>,
}

impl MockDynamicClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object as if `manager` had applied it
    pub fn seed(&self, target: &ObjectRef, object: JsonValue, manager: &str) {
        let mut stored = StoredObject {
            object,
            ..Default::default()
        };
        for path in managed_leaves(&stored.object) {
            stored.owners.insert(path, manager.to_string());
        }
        self.store.write().unwrap().insert(target.clone(), stored);
    }

    /// Current stored object
    pub fn object(&self, target: &ObjectRef) -> Option<JsonValue> {
        self.store
            .read()
            .unwrap()
            .get(target)
            .map(|s| s.object.clone())
    }

    /// Replace the `status` of a stored object, as a controller would
    pub fn set_status(&self, target: &ObjectRef, status: JsonValue) {
        if let Some(stored) = self.store.write().unwrap().get_mut(target) {
            if let JsonValue::Object(map) = &mut stored.object {
                map.insert("status".to_string(), status);
            }
        }
    }

    /// Label added to every applied object, as a mutating webhook would
    pub fn inject_label(&self, key: &str, value: &str) {
        self.injected_labels
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    /// Make every call fail with a transport error
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Manager owning a field, if any
    pub fn owner_of(&self, target: &ObjectRef, path: &[&str]) -> Option<String> {
        let path: FieldPath = path.iter().map(|s| s.to_string()).collect();
        self.store
            .read()
            .unwrap()
            .get(target)
            .and_then(|s| s.owners.get(&path).cloned())
    }

    pub fn operation_counts(&self) -> OperationCounts {
        self.operations.read().unwrap().clone()
    }

    pub fn reset_counts(&self) {
        *self.operations.write().unwrap() = OperationCounts::default();
    }

    pub fn object_count(&self) -> usize {
        self.store.read().unwrap().len()
    }

    fn check_reachable(&self) -> Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(KubeError::Transport(kube::Error::Api(
                kube::error::ErrorResponse {
                    status: "Failure".to_string(),
                    message: "dial tcp 10.0.0.1:6443: connect: connection refused".to_string(),
                    reason: "ServiceUnavailable".to_string(),
                    code: 503,
                },
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DynamicClient for MockDynamicClient {
    async fn get(&self, target: &ObjectRef) -> Result<JsonValue> {
        self.operations.write().unwrap().gets += 1;
        self.check_reachable()?;

        self.object(target).ok_or_else(|| KubeError::NotFound {
            resource: target.kind.clone(),
            key: target.key.to_id(),
        })
    }

    async fn apply(
        &self,
        target: &ObjectRef,
        object: &JsonValue,
        params: &ApplyParams,
    ) -> Result<JsonValue> {
        self.operations.write().unwrap().applies += 1;
        self.check_reachable()?;

        let mut store = self.store.write().unwrap();
        let mut stored = store.get(target).cloned().unwrap_or_else(|| StoredObject {
            object: JsonValue::Object(serde_json::Map::new()),
            ..Default::default()
        });

        let applied = managed_leaves(object);

        // Fields owned by someone else whose value would change
        let mut conflicts: Vec<(String, FieldPath)> = Vec::new();
        for path in &applied {
            if let Some(owner) = stored.owners.get(path) {
                if owner != &params.field_manager
                    && lookup(&stored.object, path) != lookup(object, path)
                {
                    conflicts.push((owner.clone(), path.clone()));
                }
            }
        }

        if !conflicts.is_empty() && !params.force {
            let mut managers: Vec<String> = conflicts.iter().map(|(m, _)| m.clone()).collect();
            managers.sort();
            managers.dedup();
            let fields = conflicts
                .iter()
                .map(|(m, p)| format!("conflict with \"{}\": .{}", m, p.join(".")))
                .collect::<Vec<_>>()
                .join("\n");
            return Err(KubeError::Conflict {
                resource: target.kind.clone(),
                key: target.key.to_id(),
                managers,
                message: format!(
                    "Apply failed with {} conflict(s):\n{}",
                    conflicts.len(),
                    fields
                ),
            });
        }

        // Prune fields this manager stopped applying
        let dropped: Vec<FieldPath> = stored
            .owners
            .iter()
            .filter(|(path, owner)| *owner == &params.field_manager && !applied.contains(*path))
            .map(|(path, _)| path.clone())
            .collect();
        for path in dropped {
            remove(&mut stored.object, &path);
            stored.owners.remove(&path);
        }

        deep_merge(&mut stored.object, object);
        for path in applied {
            stored.owners.insert(path, params.field_manager.clone());
        }

        let injected = self.injected_labels.read().unwrap().clone();
        for (key, value) in injected {
            set(
                &mut stored.object,
                &["metadata".to_string(), "labels".to_string(), key],
                JsonValue::String(value),
            );
        }

        stored.generation += 1;
        set(
            &mut stored.object,
            &["metadata".to_string(), "generation".to_string()],
            JsonValue::from(stored.generation),
        );

        let result = stored.object.clone();
        store.insert(target.clone(), stored);
        Ok(result)
    }

    async fn delete(&self, target: &ObjectRef) -> Result<()> {
        self.operations.write().unwrap().deletes += 1;
        self.check_reachable()?;

        self.store
            .write()
            .unwrap()
            .remove(target)
            .map(|_| ())
            .ok_or_else(|| KubeError::NotFound {
                resource: target.kind.clone(),
                key: target.key.to_id(),
            })
    }
}

/// Leaf paths that take part in field ownership
///
/// Identity fields (apiVersion, kind, name, namespace) are shared by every
/// manager and never conflict. Arrays are atomic.
fn managed_leaves(object: &JsonValue) -> Vec<FieldPath> {
    let mut out = Vec::new();
    let Some(map) = object.as_object() else {
        return out;
    };

    for (key, value) in map {
        match key.as_str() {
            "apiVersion" | "kind" | "status" => {}
            "metadata" => {
                for section in ["labels", "annotations"] {
                    if let Some(v) = value.get(section) {
                        collect_leaves(v, vec!["metadata".to_string(), section.to_string()], &mut out);
                    }
                }
            }
            _ => collect_leaves(value, vec![key.clone()], &mut out),
        }
    }
    out
}

fn collect_leaves(value: &JsonValue, prefix: FieldPath, out: &mut Vec<FieldPath>) {
    match value {
        JsonValue::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let mut path = prefix.clone();
                path.push(key.clone());
                collect_leaves(child, path, out);
            }
        }
        _ => out.push(prefix),
    }
}

fn lookup<'a>(value: &'a JsonValue, path: &[String]) -> Option<&'a JsonValue> {
    path.iter().try_fold(value, |current, key| current.get(key))
}

fn set(value: &mut JsonValue, path: &[String], new_value: JsonValue) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = value;
    for key in parents {
        let JsonValue::Object(map) = current else { return };
        current = map
            .entry(key.clone())
            .or_insert_with(|| JsonValue::Object(serde_json::Map::new()));
    }
    if let JsonValue::Object(map) = current {
        map.insert(last.clone(), new_value);
    }
}

fn remove(value: &mut JsonValue, path: &[String]) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = value;
    for key in parents {
        match current.get_mut(key) {
            Some(next) => current = next,
            None => return,
        }
    }
    if let JsonValue::Object(map) = current {
        map.remove(last);
    }
}

fn deep_merge(base: &mut JsonValue, overlay: &JsonValue) {
    match (base, overlay) {
        (JsonValue::Object(base_map), JsonValue::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crdform_core::{Gvr, ObjectKey};
    use serde_json::json;

    fn target() -> ObjectRef {
        ObjectRef {
            gvr: Gvr::new("example.com", "v1", "widgets"),
            kind: "Widget".into(),
            key: ObjectKey::namespaced("default", "w"),
        }
    }

    fn widget(size: i64) -> JsonValue {
        json!({
            "apiVersion": "example.com/v1",
            "kind": "Widget",
            "metadata": {"name": "w", "namespace": "default"},
            "spec": {"size": size}
        })
    }

    fn params(manager: &str, force: bool) -> ApplyParams {
        ApplyParams {
            field_manager: manager.to_string(),
            force,
        }
    }

    #[tokio::test]
    async fn test_apply_then_get() {
        let client = MockDynamicClient::new();
        let applied = client.apply(&target(), &widget(1), &params("a", false)).await.unwrap();
        let fetched = client.get(&target()).await.unwrap();

        assert_eq!(applied, fetched);
        assert_eq!(fetched["spec"]["size"], 1);
        assert_eq!(client.owner_of(&target(), &["spec", "size"]).as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let client = MockDynamicClient::new();
        assert!(client.get(&target()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_conflict_without_force() {
        let client = MockDynamicClient::new();
        client.seed(&target(), widget(1), "other-manager");

        let err = client
            .apply(&target(), &widget(2), &params("crdform", false))
            .await
            .unwrap_err();
        match err {
            KubeError::Conflict { managers, message, .. } => {
                assert_eq!(managers, vec!["other-manager"]);
                assert!(message.contains(".spec.size"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(client.object(&target()).unwrap()["spec"]["size"], 1);
    }

    #[tokio::test]
    async fn test_force_takes_ownership() {
        let client = MockDynamicClient::new();
        client.seed(&target(), widget(1), "other-manager");

        let applied = client
            .apply(&target(), &widget(2), &params("crdform", true))
            .await
            .unwrap();
        assert_eq!(applied["spec"]["size"], 2);
        assert_eq!(
            client.owner_of(&target(), &["spec", "size"]).as_deref(),
            Some("crdform")
        );
    }

    #[tokio::test]
    async fn test_same_value_is_not_a_conflict() {
        let client = MockDynamicClient::new();
        client.seed(&target(), widget(1), "other-manager");
        assert!(client.apply(&target(), &widget(1), &params("crdform", false)).await.is_ok());
    }

    #[tokio::test]
    async fn test_dropped_fields_are_pruned() {
        let client = MockDynamicClient::new();
        let mut first = widget(1);
        first["spec"]["color"] = json!("red");
        client.apply(&target(), &first, &params("a", false)).await.unwrap();

        let stored = client.apply(&target(), &widget(1), &params("a", false)).await.unwrap();
        assert!(stored["spec"].get("color").is_none());
    }

    #[tokio::test]
    async fn test_injected_label_and_generation() {
        let client = MockDynamicClient::new();
        client.inject_label("injected-by", "webhook");
        let stored = client.apply(&target(), &widget(1), &params("a", false)).await.unwrap();
        assert_eq!(stored["metadata"]["labels"]["injected-by"], "webhook");
        assert_eq!(stored["metadata"]["generation"], 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let client = MockDynamicClient::new();
        client.seed(&target(), widget(1), "a");
        client.delete(&target()).await.unwrap();
        assert_eq!(client.object_count(), 0);
        assert!(client.delete(&target()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_unreachable() {
        let client = MockDynamicClient::new();
        client.set_unreachable(true);
        let err = client.get(&target()).await.unwrap_err();
        assert!(matches!(err, KubeError::Transport(_)));
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_operation_counts() {
        let client = MockDynamicClient::new();
        client.apply(&target(), &widget(1), &params("a", false)).await.unwrap();
        client.get(&target()).await.unwrap();
        client.delete(&target()).await.unwrap();

        let counts = client.operation_counts();
        assert_eq!(counts, OperationCounts { gets: 1, applies: 1, deletes: 1 });
        client.reset_counts();
        assert_eq!(client.operation_counts().total(), 0);
    }
}
