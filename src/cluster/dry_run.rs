use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::info;

use super::{ClusterApi, ClusterError, ConfigRecordRef, LabelSelector, NodePatch, NodeRef};

/// Forwards reads to the wrapped cluster and logs writes instead of sending them
pub struct DryRunCluster<C> {
    inner: C,
}

impl<C: ClusterApi> DryRunCluster<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> C {
        self.inner
    }
}

#[async_trait]
impl<C: ClusterApi> ClusterApi for DryRunCluster<C> {
    async fn get_config_record(
        &self,
        record: &ConfigRecordRef,
    ) -> Result<Option<BTreeMap<String, String>>, ClusterError> {
        self.inner.get_config_record(record).await
    }

    async fn upsert_config_record(
        &self,
        record: &ConfigRecordRef,
        fields: BTreeMap<String, String>,
        field_manager: &str,
    ) -> Result<(), ClusterError> {
        info!(
            record = %record,
            field_manager = %field_manager,
            keys = ?fields.keys().collect::<Vec<_>>(),
            "[dry-run] Skipping configmap apply"
        );
        Ok(())
    }

    async fn list_nodes_by_label(
        &self,
        selector: &LabelSelector,
    ) -> Result<Vec<NodeRef>, ClusterError> {
        self.inner.list_nodes_by_label(selector).await
    }

    async fn patch_node(&self, node: &str, patch: &NodePatch) -> Result<(), ClusterError> {
        info!(node = %node, patch = %patch, "[dry-run] Skipping node patch");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::mock::MockCluster;

    #[tokio::test]
    async fn test_dry_run_forwards_reads_and_skips_writes() {
        let mock = MockCluster::new()
            .with_config("priorities", "100:\n- .*a.*\n")
            .with_nodes("pool-a", &["node-1"]);
        let cluster = DryRunCluster::new(mock);

        let record = ConfigRecordRef::default();
        let fields = cluster.get_config_record(&record).await.unwrap().unwrap();
        assert_eq!(fields["priorities"], "100:\n- .*a.*\n");

        let selector = LabelSelector::matching(crate::cluster::DEFAULT_NODEPOOL_LABEL, "pool-a");
        let nodes = cluster.list_nodes_by_label(&selector).await.unwrap();
        assert_eq!(nodes, vec![NodeRef::new("node-1")]);

        cluster
            .upsert_config_record(&record, BTreeMap::new(), "test")
            .await
            .unwrap();
        let patch = NodePatch::unschedulable(true).unwrap();
        cluster.patch_node("node-1", &patch).await.unwrap();

        let mock = cluster.into_inner();
        assert!(mock.upserts().is_empty());
        assert!(mock.patches().is_empty());
    }
}
