//! `kube`-backed implementation of the cluster API

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Node};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config, ResourceExt};
use tracing::debug;

use super::{ClusterApi, ClusterError, ConfigRecordRef, LabelSelector, NodePatch, NodeRef};

const JSON_PATCH_CONTENT_TYPE: &str = "application/json-patch+json";

/// Real Kubernetes client implementation
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    /// Wrap an existing kube client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using an explicit kubeconfig file, or infer the configuration
    /// (`KUBECONFIG`, `~/.kube/config`, then in-cluster service account).
    pub async fn connect(kubeconfig: Option<&str>) -> Result<Self, ClusterError> {
        let config = match kubeconfig {
            Some(path) => {
                let path = shellexpand::tilde(path).into_owned();
                let kubeconfig = Kubeconfig::read_from(&path).map_err(|e| {
                    ClusterError::Connect(format!("Error with config file `{}`, {}", path, e))
                })?;
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .map_err(|e| {
                        ClusterError::Connect(format!("Bad config file `{}`, {}", path, e))
                    })?
            }
            None => Config::infer()
                .await
                .map_err(|e| ClusterError::Connect(e.to_string()))?,
        };

        debug!(cluster_url = %config.cluster_url, "Cluster configuration loaded");

        let client = Client::try_from(config)
            .map_err(|e| ClusterError::Connect(format!("Bad client configuration `{}`", e)))?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn get_config_record(
        &self,
        record: &ConfigRecordRef,
    ) -> Result<Option<BTreeMap<String, String>>, ClusterError> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), &record.namespace);
        let config_map = api.get_opt(&record.name).await?;
        Ok(config_map.map(|cm| cm.data.unwrap_or_default()))
    }

    async fn upsert_config_record(
        &self,
        record: &ConfigRecordRef,
        fields: BTreeMap<String, String>,
        field_manager: &str,
    ) -> Result<(), ClusterError> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), &record.namespace);

        let config_map = ConfigMap {
            metadata: ObjectMeta {
                name: Some(record.name.clone()),
                namespace: Some(record.namespace.clone()),
                ..Default::default()
            },
            data: Some(fields),
            ..Default::default()
        };

        api.patch(
            &record.name,
            &PatchParams::apply(field_manager).force(),
            &Patch::Apply(&config_map),
        )
        .await?;

        Ok(())
    }

    async fn list_nodes_by_label(
        &self,
        selector: &LabelSelector,
    ) -> Result<Vec<NodeRef>, ClusterError> {
        let api: Api<Node> = Api::all(self.client.clone());
        let nodes = api
            .list(&ListParams::default().labels(&selector.to_string()))
            .await?;

        Ok(nodes
            .items
            .iter()
            .map(|node| NodeRef::new(node.name_any()))
            .collect())
    }

    async fn patch_node(&self, node: &str, patch: &NodePatch) -> Result<(), ClusterError> {
        // Body is an already encoded JSON patch document
        let request = http::Request::patch(format!("/api/v1/nodes/{}", node))
            .header(http::header::CONTENT_TYPE, JSON_PATCH_CONTENT_TYPE)
            .body(patch.body().to_vec())?;

        self.client.request_text(request).await?;
        Ok(())
    }
}
