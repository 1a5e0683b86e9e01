//! In-memory cluster for tests (no I/O)

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use kube::core::ErrorResponse;

use super::{ClusterApi, ClusterError, ConfigRecordRef, LabelSelector, NodePatch, NodeRef};

/// Build a Kubernetes API error with the given status code
pub fn api_error(code: u16, message: &str) -> ClusterError {
    ClusterError::Kube(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: message.to_string(),
        reason: "InternalError".to_string(),
        code,
    }))
}

#[derive(Default)]
struct MockState {
    config: Option<BTreeMap<String, String>>,
    nodes: HashMap<String, Vec<String>>,
    fail_get: bool,
    fail_upsert: bool,
    failing_groups: HashSet<String>,
    failing_nodes: HashSet<String>,
    upserts: Vec<(ConfigRecordRef, BTreeMap<String, String>, String)>,
    lookups: Vec<LabelSelector>,
    patches: Vec<(String, Option<bool>)>,
}

/// Scripted cluster that records every call
#[derive(Default)]
pub struct MockCluster {
    state: Mutex<MockState>,
}

impl MockCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a configmap containing a single field
    pub fn with_config(self, key: &str, value: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .config
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Register nodes under a node-group label value
    pub fn with_nodes(self, group: &str, nodes: &[&str]) -> Self {
        self.state.lock().unwrap().nodes.insert(
            group.to_string(),
            nodes.iter().map(|n| n.to_string()).collect(),
        );
        self
    }

    pub fn failing_get(self) -> Self {
        self.state.lock().unwrap().fail_get = true;
        self
    }

    pub fn failing_upsert(self) -> Self {
        self.state.lock().unwrap().fail_upsert = true;
        self
    }

    pub fn failing_group(self, group: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_groups
            .insert(group.to_string());
        self
    }

    pub fn failing_node(self, node: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_nodes
            .insert(node.to_string());
        self
    }

    pub fn upserts(&self) -> Vec<(ConfigRecordRef, BTreeMap<String, String>, String)> {
        self.state.lock().unwrap().upserts.clone()
    }

    /// Node-group values looked up, in call order
    pub fn lookups(&self) -> Vec<String> {
        self.selectors().into_iter().map(|s| s.value).collect()
    }

    pub fn selectors(&self) -> Vec<LabelSelector> {
        self.state.lock().unwrap().lookups.clone()
    }

    /// Patched node names with the unschedulable value sent
    pub fn patches(&self) -> Vec<(String, Option<bool>)> {
        self.state.lock().unwrap().patches.clone()
    }

    /// Field value of the last upsert
    pub fn last_written(&self, key: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .upserts
            .last()
            .and_then(|(_, fields, _)| fields.get(key).cloned())
    }
}

#[async_trait]
impl ClusterApi for MockCluster {
    async fn get_config_record(
        &self,
        _record: &ConfigRecordRef,
    ) -> Result<Option<BTreeMap<String, String>>, ClusterError> {
        let state = self.state.lock().unwrap();
        if state.fail_get {
            return Err(api_error(500, "etcdserver: request timed out"));
        }
        Ok(state.config.clone())
    }

    async fn upsert_config_record(
        &self,
        record: &ConfigRecordRef,
        fields: BTreeMap<String, String>,
        field_manager: &str,
    ) -> Result<(), ClusterError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_upsert {
            return Err(api_error(409, "conflict"));
        }
        state
            .upserts
            .push((record.clone(), fields, field_manager.to_string()));
        Ok(())
    }

    async fn list_nodes_by_label(
        &self,
        selector: &LabelSelector,
    ) -> Result<Vec<NodeRef>, ClusterError> {
        let mut state = self.state.lock().unwrap();
        state.lookups.push(selector.clone());
        if state.failing_groups.contains(&selector.value) {
            return Err(api_error(503, "service unavailable"));
        }
        Ok(state
            .nodes
            .get(&selector.value)
            .map(|nodes| nodes.iter().map(NodeRef::new).collect())
            .unwrap_or_default())
    }

    async fn patch_node(&self, node: &str, patch: &NodePatch) -> Result<(), ClusterError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_nodes.contains(node) {
            return Err(api_error(404, "node not found"));
        }
        state
            .patches
            .push((node.to_string(), patch.unschedulable_value()));
        Ok(())
    }
}
