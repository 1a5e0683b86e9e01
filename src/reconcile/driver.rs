use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, error, info, warn};

use super::{
    clean_node_groups, FetchErrorPolicy, GroupOutcome, Mode, ReconcileConfig, ReconcileError,
    RunReport,
};
use crate::cluster::{ClusterApi, LabelSelector, NodePatch};
use crate::codec;
use crate::priority::{PriorityIndex, PriorityLevel};

/// Steps of a reconciliation pass, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    LoadingConfig,
    Mutating,
    PersistingConfig,
    ListingNodes,
    PatchingNodes,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::LoadingConfig => "loading-config",
            Phase::Mutating => "mutating",
            Phase::PersistingConfig => "persisting-config",
            Phase::ListingNodes => "listing-nodes",
            Phase::PatchingNodes => "patching-nodes",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Move node groups between priority rules. Pure, no I/O.
///
/// Apply removes the cordoned groups from `level` and then adds the
/// prioritized ones. Undo only removes the prioritized groups.
pub fn mutate_index(
    index: &mut PriorityIndex,
    mode: Mode,
    level: PriorityLevel,
    prioritize: &[String],
    cordon: &[String],
) {
    match mode {
        Mode::Undo => {
            info!(groups = ?prioritize, level = %level, "Removing node groups from priorities");
            index.remove_names_if_present(prioritize, level);
        }
        Mode::Apply => {
            debug!(groups = ?cordon, level = %level, "Removing cordon node groups");
            index.remove_names_if_present(cordon, level);
            debug!(groups = ?prioritize, level = %level, "Adding prioritize node groups");
            index.add_names_if_absent(prioritize, level);
        }
    }
}

/// Runs reconciliation passes against a cluster
pub struct Reconciler<C> {
    cluster: C,
    config: ReconcileConfig,
}

impl<C: ClusterApi> Reconciler<C> {
    pub fn new(cluster: C, config: ReconcileConfig) -> Self {
        Self { cluster, config }
    }

    pub fn cluster(&self) -> &C {
        &self.cluster
    }

    pub fn into_cluster(self) -> C {
        self.cluster
    }

    /// Run one full pass: load, mutate, persist, then patch nodes.
    ///
    /// Returns an error only when the configuration could not be persisted
    /// (or read, with [`FetchErrorPolicy::Fail`]). Node-group and node
    /// failures are collected in the report.
    pub async fn run(&self) -> Result<RunReport, ReconcileError> {
        let config = &self.config;

        enter(Phase::LoadingConfig);
        let mut index = self.load_priorities().await?;
        info!(
            "Initial `{}` configmap `{}` key state: {}",
            config.record.name, config.record.key, index
        );

        enter(Phase::Mutating);
        debug!(input = %config.prioritize, "Before cleaning prioritize node groups");
        debug!(input = %config.cordon, "Before cleaning cordon node groups");
        let prioritize = clean_node_groups(&config.prioritize);
        let cordon = clean_node_groups(&config.cordon);
        debug!(prioritize = ?prioritize, cordon = ?cordon, "Cleaned node group inputs");

        mutate_index(&mut index, config.mode, config.priority, &prioritize, &cordon);

        enter(Phase::PersistingConfig);
        let encoded = self.persist_priorities(&index).await?;

        let patch = NodePatch::unschedulable(config.mode.unschedulable())?;
        debug!(patch = %patch, "Patch submitted for concerned nodes");
        if config.mode.unschedulable() {
            info!(label = %config.nodepool_label, groups = ?cordon, "Marking nodes unschedulable");
        } else {
            info!(label = %config.nodepool_label, groups = ?cordon, "Marking nodes schedulable");
        }

        let mut groups = Vec::with_capacity(cordon.len());
        for group in &cordon {
            let mut outcome = self.patch_node_group(group, &patch).await;
            outcome.still_prioritized = config.mode == Mode::Apply
                && index
                    .level(config.priority)
                    .is_some_and(|rules| rules.matches(group));
            if outcome.still_prioritized {
                warn!(
                    group = %group,
                    level = %config.priority,
                    "Cordoned node group is still matched by a priority rule"
                );
            }
            groups.push(outcome);
        }

        enter(Phase::Done);
        let report = RunReport {
            mode: config.mode,
            priority: config.priority,
            priorities: index.to_serializable(),
            encoded,
            groups,
        };
        report.log_summary();
        Ok(report)
    }

    /// Read the stored priorities, falling back to an empty index when the
    /// configmap, its key or a valid value is missing.
    async fn load_priorities(&self) -> Result<PriorityIndex, ReconcileError> {
        let record = &self.config.record;
        debug!(record = %record, "Retrieving priorities configmap");

        let fields = match self.cluster.get_config_record(record).await {
            Ok(Some(fields)) => fields,
            Ok(None) => {
                info!(
                    "Unable to get `{}` configmap, we will create a new one",
                    record.name
                );
                return Ok(PriorityIndex::new());
            }
            Err(e) => match self.config.fetch_errors {
                FetchErrorPolicy::Fallback => {
                    warn!(
                        record = %record,
                        error = %e,
                        "Unable to get configmap, we will create a new one"
                    );
                    return Ok(PriorityIndex::new());
                }
                FetchErrorPolicy::Fail => {
                    return Err(ReconcileError::Fetch {
                        record: record.clone(),
                        source: e,
                    });
                }
            },
        };

        let Some(text) = fields.get(&record.key) else {
            info!(
                "No `{}` key in existing `{}` configmap, we will build a new one",
                record.key, record.name
            );
            return Ok(PriorityIndex::new());
        };

        match codec::decode(text) {
            Ok(index) => {
                debug!("Successfully loaded priorities configuration from configmap");
                Ok(index)
            }
            Err(e) if e.is_empty() => {
                info!(
                    "Priorities at key `{}` in `{}` configmap are empty, we will build a new one",
                    record.key, record.name
                );
                Ok(PriorityIndex::new())
            }
            Err(codec::CodecError::Rule(e)) => {
                // May be valid RE2 that only `regex` rejects
                error!(
                    level = %e.level,
                    rule = %e.rule,
                    error = %e.source,
                    "Rejected stored rule at key `{}` in existing `{}` configmap, we will build a new one",
                    record.key, record.name
                );
                Ok(PriorityIndex::new())
            }
            Err(e) => {
                warn!(
                    error = %e,
                    "Unable to parse priorities string value at key `{}` in existing `{}` configmap, we will build a new one",
                    record.key, record.name
                );
                Ok(PriorityIndex::new())
            }
        }
    }

    /// Encode and apply the priorities. Any failure here is fatal.
    async fn persist_priorities(&self, index: &PriorityIndex) -> Result<String, ReconcileError> {
        let record = &self.config.record;

        let encoded = codec::encode(index).map_err(|source| ReconcileError::Encode {
            record: record.clone(),
            source,
        })?;
        info!("New serialized computed priorities value:\n{}", encoded);

        let mut fields = BTreeMap::new();
        fields.insert(record.key.clone(), encoded.clone());

        self.cluster
            .upsert_config_record(record, fields, &self.config.field_manager)
            .await
            .map_err(|source| ReconcileError::Persist {
                record: record.clone(),
                source,
            })?;

        info!(record = %record, "Applied priorities configmap");
        Ok(encoded)
    }

    async fn patch_node_group(&self, group: &str, patch: &NodePatch) -> GroupOutcome {
        let mut outcome = GroupOutcome::new(group);

        enter(Phase::ListingNodes);
        let selector = LabelSelector::matching(&self.config.nodepool_label, group);
        let nodes = match self.cluster.list_nodes_by_label(&selector).await {
            Ok(nodes) => nodes,
            Err(e) => {
                warn!(
                    group = %group,
                    error = %e,
                    "Skipping node group, we received an error trying to retrieve matching nodes"
                );
                outcome.lookup_error = Some(e.to_string());
                return outcome;
            }
        };

        if nodes.is_empty() {
            info!(group = %group, "No nodes matching node group");
            return outcome;
        }

        enter(Phase::PatchingNodes);
        for node in nodes {
            info!(node = %node, group = %group, "Patching node");
            match self.cluster.patch_node(&node.name, patch).await {
                Ok(()) => outcome.patched.push(node.name),
                Err(e) => {
                    warn!(node = %node, group = %group, error = %e, "Error patching node");
                    outcome.failed.push(node.name);
                }
            }
        }

        outcome
    }
}

fn enter(phase: Phase) {
    debug!(phase = %phase, "Entering phase");
}
