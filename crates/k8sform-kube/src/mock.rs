//! Mock dynamic client for testing
//!
//! Objects are kept in memory, so resources can run their full lifecycle in unit tests
//! without requiring a Kubernetes cluster.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use crate::client::{
    ApplyParams, ClientError, DeletionPropagation, DynamicClient, GroupVersionResource,
};

/// Hook run on every applied object, mimicking API server defaulting
pub type Defaulter = Arc<dyn Fn(&mut JsonValue) + Send + Sync>;

type ObjectKey = (String, String, String);

/// In-memory dynamic client for testing
#[derive(Clone)]
pub struct MockDynamicClient {
    /// Storage: (resource, namespace, name) -> object
    store: Arc<RwLock<HashMap<ObjectKey, JsonValue>>>,
    /// Track operation counts for assertions
    operations: Arc<RwLock<OperationCounts>>,
    /// Errors returned by the next calls, per verb
    failures: Arc<RwLock<HashMap<MockVerb, VecDeque<ClientError>>>>,
    /// Status patches applied after a number of GETs
    scheduled_status: Arc<RwLock<Vec<ScheduledStatus>>>,
    last_apply: Arc<RwLock<Option<ApplyParams>>>,
    last_propagation: Arc<RwLock<Option<DeletionPropagation>>>,
    defaulter: Option<Defaulter>,
    generation: Arc<RwLock<u64>>,
}

/// Verbs that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockVerb {
    Apply,
    Get,
    Delete,
}

struct ScheduledStatus {
    namespace: String,
    name: String,
    remaining_gets: usize,
    status: JsonValue,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub applies: usize,
    pub gets: usize,
    pub deletes: usize,
}

impl OperationCounts {
    pub fn total(&self) -> usize {
        self.applies + self.gets + self.deletes
    }
}

impl MockDynamicClient {
    /// Create a new empty mock client
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
            operations: Arc::new(RwLock::new(OperationCounts::default())),
            failures: Arc::new(RwLock::new(HashMap::new())),
            scheduled_status: Arc::new(RwLock::new(Vec::new())),
            last_apply: Arc::new(RwLock::new(None)),
            last_propagation: Arc::new(RwLock::new(None)),
            defaulter: None,
            generation: Arc::new(RwLock::new(0)),
        }
    }

    /// Run `defaulter` on every applied object before it is stored
    pub fn with_defaulter(mut self, defaulter: impl Fn(&mut JsonValue) + Send + Sync + 'static) -> Self {
        self.defaulter = Some(Arc::new(defaulter));
        self
    }

    /// Store an object as if it already existed on the server
    pub fn insert(&self, gvr: &GroupVersionResource, object: JsonValue) {
        let namespace = string_at(&object, "namespace");
        let name = string_at(&object, "name");
        self.store
            .write()
            .unwrap()
            .insert(key(gvr, &namespace, &name), object);
    }

    /// Current stored object, if any
    pub fn object(&self, gvr: &GroupVersionResource, namespace: &str, name: &str) -> Option<JsonValue> {
        self.store
            .read()
            .unwrap()
            .get(&key(gvr, namespace, name))
            .cloned()
    }

    /// Fail the next call of `verb` with `error`
    pub fn fail_next(&self, verb: MockVerb, error: ClientError) {
        self.failures
            .write()
            .unwrap()
            .entry(verb)
            .or_default()
            .push_back(error);
    }

    /// Set `.status` on an object once it has been fetched `after_gets` more times
    pub fn status_after_gets(&self, namespace: &str, name: &str, after_gets: usize, status: JsonValue) {
        self.scheduled_status.write().unwrap().push(ScheduledStatus {
            namespace: namespace.to_string(),
            name: name.to_string(),
            remaining_gets: after_gets,
            status,
        });
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.operations.read().unwrap().clone()
    }

    /// Reset operation counts
    pub fn reset_counts(&self) {
        let mut ops = self.operations.write().unwrap();
        *ops = OperationCounts::default();
    }

    /// Parameters of the most recent apply
    pub fn last_apply_params(&self) -> Option<ApplyParams> {
        self.last_apply.read().unwrap().clone()
    }

    /// Propagation policy of the most recent delete
    pub fn last_propagation(&self) -> Option<DeletionPropagation> {
        *self.last_propagation.read().unwrap()
    }

    /// Count stored objects
    pub fn object_count(&self) -> usize {
        self.store.read().unwrap().len()
    }

    fn take_failure(&self, verb: MockVerb) -> Option<ClientError> {
        self.failures
            .write()
            .unwrap()
            .get_mut(&verb)
            .and_then(VecDeque::pop_front)
    }

    fn next_resource_version(&self) -> String {
        let mut generation = self.generation.write().unwrap();
        *generation += 1;
        generation.to_string()
    }

    fn apply_scheduled_status(&self, gvr: &GroupVersionResource, namespace: &str, name: &str) {
        let mut scheduled = self.scheduled_status.write().unwrap();
        let mut store = self.store.write().unwrap();
        scheduled.retain_mut(|entry| {
            if entry.namespace != namespace || entry.name != name {
                return true;
            }
            if entry.remaining_gets > 0 {
                entry.remaining_gets -= 1;
                return true;
            }
            if let Some(JsonValue::Object(obj)) = store.get_mut(&key(gvr, namespace, name)) {
                obj.insert("status".to_string(), entry.status.clone());
            }
            false
        });
    }
}

impl Default for MockDynamicClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DynamicClient for MockDynamicClient {
    async fn apply(
        &self,
        gvr: &GroupVersionResource,
        namespace: &str,
        name: &str,
        object: &JsonValue,
        params: &ApplyParams,
    ) -> Result<JsonValue, ClientError> {
        {
            let mut ops = self.operations.write().unwrap();
            ops.applies += 1;
        }
        *self.last_apply.write().unwrap() = Some(params.clone());

        if let Some(err) = self.take_failure(MockVerb::Apply) {
            return Err(err);
        }

        let resource_version = self.next_resource_version();
        let mut store = self.store.write().unwrap();
        let stored = store
            .entry(key(gvr, namespace, name))
            .or_insert_with(|| JsonValue::Object(serde_json::Map::new()));

        merge(stored, object);
        if let Some(defaulter) = &self.defaulter {
            defaulter(stored);
        }
        if let Some(JsonValue::Object(metadata)) = stored.get_mut("metadata") {
            metadata
                .entry("uid")
                .or_insert_with(|| JsonValue::String(format!("uid-{}-{}", namespace, name)));
            metadata.insert(
                "resourceVersion".to_string(),
                JsonValue::String(resource_version),
            );
        }

        Ok(stored.clone())
    }

    async fn get(
        &self,
        gvr: &GroupVersionResource,
        namespace: &str,
        name: &str,
    ) -> Result<JsonValue, ClientError> {
        {
            let mut ops = self.operations.write().unwrap();
            ops.gets += 1;
        }

        if let Some(err) = self.take_failure(MockVerb::Get) {
            return Err(err);
        }

        self.apply_scheduled_status(gvr, namespace, name);
        self.object(gvr, namespace, name)
            .ok_or_else(|| ClientError::not_found(name))
    }

    async fn delete(
        &self,
        gvr: &GroupVersionResource,
        namespace: &str,
        name: &str,
        propagation: Option<DeletionPropagation>,
    ) -> Result<(), ClientError> {
        {
            let mut ops = self.operations.write().unwrap();
            ops.deletes += 1;
        }
        *self.last_propagation.write().unwrap() = propagation;

        if let Some(err) = self.take_failure(MockVerb::Delete) {
            return Err(err);
        }

        self.store
            .write()
            .unwrap()
            .remove(&key(gvr, namespace, name))
            .map(|_| ())
            .ok_or_else(|| ClientError::not_found(name))
    }
}

fn key(gvr: &GroupVersionResource, namespace: &str, name: &str) -> ObjectKey {
    (gvr.to_string(), namespace.to_string(), name.to_string())
}

fn string_at(object: &JsonValue, field: &str) -> String {
    object
        .get("metadata")
        .and_then(|m| m.get(field))
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Deep-merge `patch` into `target`; objects merge key by key, everything else is replaced
fn merge(target: &mut JsonValue, patch: &JsonValue) {
    match (target, patch) {
        (JsonValue::Object(target), JsonValue::Object(patch)) => {
            for (k, v) in patch {
                merge(target.entry(k.clone()).or_insert(JsonValue::Null), v);
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gvr() -> GroupVersionResource {
        GroupVersionResource::new("hive.openshift.io", "v1", "dnszones", "DNSZone")
    }

    fn params() -> ApplyParams {
        ApplyParams {
            field_manager: "k8sform".into(),
            force: false,
        }
    }

    #[tokio::test]
    async fn test_apply_then_get() {
        let client = MockDynamicClient::new();
        let object = json!({
            "apiVersion": "hive.openshift.io/v1",
            "kind": "DNSZone",
            "metadata": { "name": "zone-1", "namespace": "hive" },
            "spec": { "zone": "example.com" }
        });

        let applied = client
            .apply(&gvr(), "hive", "zone-1", &object, &params())
            .await
            .unwrap();
        assert_eq!(applied["metadata"]["resourceVersion"], "1");
        assert_eq!(applied["metadata"]["uid"], "uid-hive-zone-1");

        let fetched = client.get(&gvr(), "hive", "zone-1").await.unwrap();
        assert_eq!(fetched, applied);
        assert_eq!(
            client.operation_counts(),
            OperationCounts {
                applies: 1,
                gets: 1,
                deletes: 0
            }
        );
    }

    #[tokio::test]
    async fn test_apply_merges_and_defaults() {
        let client = MockDynamicClient::new().with_defaulter(|obj| {
            obj["spec"]["preserveOnDelete"] = json!(false);
        });
        let first = json!({ "metadata": { "name": "z", "namespace": "ns", "labels": { "a": "1" } }, "spec": { "zone": "a.com" } });
        let second = json!({ "metadata": { "name": "z", "namespace": "ns" }, "spec": { "zone": "b.com" } });

        client.apply(&gvr(), "ns", "z", &first, &params()).await.unwrap();
        let stored = client.apply(&gvr(), "ns", "z", &second, &params()).await.unwrap();

        assert_eq!(stored["spec"]["zone"], "b.com");
        assert_eq!(stored["spec"]["preserveOnDelete"], false);
        assert_eq!(stored["metadata"]["labels"]["a"], "1");
        assert_eq!(stored["metadata"]["resourceVersion"], "2");
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let client = MockDynamicClient::new();
        let err = client.get(&gvr(), "ns", "missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_fail_next_is_consumed_once() {
        let client = MockDynamicClient::new();
        client.fail_next(MockVerb::Apply, ClientError::Transport("boom".into()));

        let object = json!({ "metadata": { "name": "z", "namespace": "ns" } });
        assert!(client.apply(&gvr(), "ns", "z", &object, &params()).await.is_err());
        assert!(client.apply(&gvr(), "ns", "z", &object, &params()).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_records_propagation() {
        let client = MockDynamicClient::new();
        client.insert(&gvr(), json!({ "metadata": { "name": "z", "namespace": "ns" } }));
        assert_eq!(client.object_count(), 1);

        client
            .delete(&gvr(), "ns", "z", Some(DeletionPropagation::Foreground))
            .await
            .unwrap();
        assert_eq!(client.object_count(), 0);
        assert_eq!(client.last_propagation(), Some(DeletionPropagation::Foreground));

        let err = client.delete(&gvr(), "ns", "z", None).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_status_after_gets() {
        let client = MockDynamicClient::new();
        client.insert(&gvr(), json!({ "metadata": { "name": "z", "namespace": "ns" } }));
        client.status_after_gets("ns", "z", 1, json!({ "phase": "Ready" }));

        let first = client.get(&gvr(), "ns", "z").await.unwrap();
        assert!(first.get("status").is_none());
        let second = client.get(&gvr(), "ns", "z").await.unwrap();
        assert_eq!(second["status"]["phase"], "Ready");
    }
}
