//! # Cluster control API
//!
//! The reconciler talks to the cluster through [`ClusterApi`], which covers the
//! four calls a pass needs:
//!
//! 1. Read the priority expander configmap
//! 2. Write it back with a forced server-side apply
//! 3. List nodes carrying a node-group label
//! 4. JSON-patch a node's `/spec/unschedulable`
//!
//! [`KubeCluster`] implements it on top of a `kube` client. [`DryRunCluster`]
//! wraps any implementation, forwarding reads and only logging writes.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

pub mod client;
pub mod dry_run;
pub mod resources;

#[cfg(test)]
pub mod mock;

pub use client::KubeCluster;
pub use dry_run::DryRunCluster;
pub use resources::*;

/// Errors returned by the cluster API
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("Unable to get a proper configuration to query a kube api server: {0}")]
    Connect(String),

    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Invalid request: {0}")]
    Request(#[from] http::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Calls made against the cluster during a reconciliation pass
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Fetch the data fields of a configmap. `Ok(None)` when it does not exist.
    async fn get_config_record(
        &self,
        record: &ConfigRecordRef,
    ) -> Result<Option<BTreeMap<String, String>>, ClusterError>;

    /// Create or replace the configmap's data, forcing ownership of the fields.
    async fn upsert_config_record(
        &self,
        record: &ConfigRecordRef,
        fields: BTreeMap<String, String>,
        field_manager: &str,
    ) -> Result<(), ClusterError>;

    /// List the nodes matching a label selector
    async fn list_nodes_by_label(
        &self,
        selector: &LabelSelector,
    ) -> Result<Vec<NodeRef>, ClusterError>;

    /// Apply a JSON patch to a node
    async fn patch_node(&self, node: &str, patch: &NodePatch) -> Result<(), ClusterError>;
}
