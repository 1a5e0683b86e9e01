//! Resource types exchanged with the cluster API

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default name of the priority expander configmap
pub const PRIORITY_CONFIG_MAP_NAME: &str = "cluster-autoscaler-priority-expander";

/// Key used in the configmap to hold the priorities
pub const CONFIG_MAP_KEY: &str = "priorities";

/// Default namespace of the priority expander configmap
pub const DEFAULT_CONFIG_MAP_NAMESPACE: &str = "kube-system";

/// Default node label holding the node-group name
pub const DEFAULT_NODEPOOL_LABEL: &str = "cloud.google.com/gke-nodepool";

/// Field manager used for server-side apply
pub const FIELD_MANAGER: &str = "k8s-nodepool-cordon";

/// Location of the persisted priorities: configmap name, namespace and data key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRecordRef {
    pub name: String,
    pub namespace: String,
    pub key: String,
}

impl ConfigRecordRef {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            key: CONFIG_MAP_KEY.to_string(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }
}

impl Default for ConfigRecordRef {
    fn default() -> Self {
        Self::new(PRIORITY_CONFIG_MAP_NAME, DEFAULT_CONFIG_MAP_NAMESPACE)
    }
}

impl fmt::Display for ConfigRecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Equality selector on a single node label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSelector {
    pub key: String,
    pub value: String,
}

impl LabelSelector {
    /// Create a selector that matches a specific label
    pub fn matching(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Check if a label set matches this selector
    pub fn matches<'a>(&self, mut labels: impl Iterator<Item = (&'a str, &'a str)>) -> bool {
        labels.any(|(k, v)| k == self.key && v == self.value)
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// A node returned by a label lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRef {
    pub name: String,
}

impl NodeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One JSON patch operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: String,
    pub path: String,
    pub value: bool,
}

/// JSON patch setting `/spec/unschedulable`, encoded once and sent to every node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePatch {
    operations: Vec<PatchOperation>,
    body: Vec<u8>,
}

impl NodePatch {
    pub const UNSCHEDULABLE_PATH: &'static str = "/spec/unschedulable";

    /// Build the cordon (`true`) or uncordon (`false`) patch
    pub fn unschedulable(value: bool) -> Result<Self, serde_json::Error> {
        let operations = vec![PatchOperation {
            op: "replace".to_string(),
            path: Self::UNSCHEDULABLE_PATH.to_string(),
            value,
        }];
        let body = serde_json::to_vec(&operations)?;
        Ok(Self { operations, body })
    }

    pub fn operations(&self) -> &[PatchOperation] {
        &self.operations
    }

    /// Value written to `/spec/unschedulable`
    pub fn unschedulable_value(&self) -> Option<bool> {
        self.operations
            .iter()
            .find(|op| op.path == Self::UNSCHEDULABLE_PATH)
            .map(|op| op.value)
    }

    /// Encoded `application/json-patch+json` body
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl fmt::Display for NodePatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_record() {
        let record = ConfigRecordRef::default();
        assert_eq!(record.name, PRIORITY_CONFIG_MAP_NAME);
        assert_eq!(record.namespace, "kube-system");
        assert_eq!(record.key, "priorities");
        assert_eq!(
            record.to_string(),
            "kube-system/cluster-autoscaler-priority-expander"
        );
    }

    #[test]
    fn test_label_selector() {
        let selector = LabelSelector::matching("cloud.google.com/gke-nodepool", "pool-a");
        assert_eq!(selector.to_string(), "cloud.google.com/gke-nodepool=pool-a");

        let labels = [("cloud.google.com/gke-nodepool", "pool-a"), ("zone", "b")];
        assert!(selector.matches(labels.iter().copied()));

        let other = [("cloud.google.com/gke-nodepool", "pool-b")];
        assert!(!selector.matches(other.iter().copied()));
    }

    #[test]
    fn test_cordon_patch_body() {
        let patch = NodePatch::unschedulable(true).unwrap();
        assert_eq!(
            patch.to_string(),
            r#"[{"op":"replace","path":"/spec/unschedulable","value":true}]"#
        );
        assert_eq!(patch.unschedulable_value(), Some(true));
    }

    #[test]
    fn test_uncordon_patch() {
        let patch = NodePatch::unschedulable(false).unwrap();
        let ops: Vec<PatchOperation> = serde_json::from_slice(patch.body()).unwrap();
        assert_eq!(ops, patch.operations());
        assert_eq!(patch.unschedulable_value(), Some(false));
    }
}
