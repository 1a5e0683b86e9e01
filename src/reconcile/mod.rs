//! Reconciliation pass
//!
//! One pass loads the priority expander configmap, moves node groups in or out
//! of the configured priority level, persists the result and then cordons (or
//! uncordons) the nodes of the affected node groups.
//!
//! Only two failures stop a pass: writing the configmap and, when requested,
//! reading it. Everything that touches a single node group or node is logged
//! and skipped.

use std::fmt;

use thiserror::Error;

use crate::cluster::{ClusterError, ConfigRecordRef, FIELD_MANAGER};
use crate::codec::CodecError;
use crate::priority::PriorityLevel;

mod driver;
mod report;

pub use driver::{mutate_index, Phase, Reconciler};
pub use report::{GroupOutcome, RunReport};

/// Fatal errors of a reconciliation pass
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Unable to get `{record}` configmap: {source}")]
    Fetch {
        record: ConfigRecordRef,
        #[source]
        source: ClusterError,
    },

    #[error("Unable to serialize priorities for `{record}`: {source}")]
    Encode {
        record: ConfigRecordRef,
        #[source]
        source: CodecError,
    },

    #[error("Unable to apply `{record}` configmap: {source}")]
    Persist {
        record: ConfigRecordRef,
        #[source]
        source: ClusterError,
    },

    #[error("Unable to build node patch: {0}")]
    Patch(#[from] serde_json::Error),
}

/// Direction of a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Prioritize node groups and cordon the others
    #[default]
    Apply,
    /// Drop the prioritized node groups and uncordon the others
    Undo,
}

impl Mode {
    pub fn from_undo(undo: bool) -> Self {
        if undo {
            Mode::Undo
        } else {
            Mode::Apply
        }
    }

    /// Value written to `/spec/unschedulable` on cordoned node groups
    pub fn unschedulable(self) -> bool {
        self == Mode::Apply
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Apply => f.write_str("apply"),
            Mode::Undo => f.write_str("undo"),
        }
    }
}

/// What to do when reading the configmap fails for a reason other than absence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchErrorPolicy {
    /// Start from an empty configuration
    #[default]
    Fallback,
    /// Abort the pass before writing anything
    Fail,
}

/// Everything a pass needs, passed explicitly to the [`Reconciler`]
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Comma separated node groups to prioritize
    pub prioritize: String,
    /// Comma separated node groups to cordon
    pub cordon: String,
    pub priority: PriorityLevel,
    /// Node label holding the node-group name
    pub nodepool_label: String,
    pub record: ConfigRecordRef,
    pub field_manager: String,
    pub mode: Mode,
    pub fetch_errors: FetchErrorPolicy,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            prioritize: String::new(),
            cordon: String::new(),
            priority: PriorityLevel(100),
            nodepool_label: crate::cluster::DEFAULT_NODEPOOL_LABEL.to_string(),
            record: ConfigRecordRef::default(),
            field_manager: FIELD_MANAGER.to_string(),
            mode: Mode::Apply,
            fetch_errors: FetchErrorPolicy::Fallback,
        }
    }
}

/// Split a comma separated node-group list, dropping blank entries.
/// Order is preserved and duplicates are kept.
pub fn clean_node_groups(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_drops_empty_tokens() {
        assert_eq!(clean_node_groups("x,,y,"), vec!["x", "y"]);
    }

    #[test]
    fn test_clean_matches_plain_split_without_whitespace() {
        for input in ["test-p2,test-p3", ",a,,b,", "a,a,b", "pool.x,pool+y", ","] {
            let split: Vec<&str> = input.split(',').filter(|s| !s.is_empty()).collect();
            assert_eq!(clean_node_groups(input), split, "input {input:?}");
        }
    }

    #[test]
    fn test_clean_trims_and_keeps_order() {
        assert_eq!(clean_node_groups(" b , a,b"), vec!["b", "a", "b"]);
        assert!(clean_node_groups("").is_empty());
        assert!(clean_node_groups(", ,").is_empty());
    }

    #[test]
    fn test_mode() {
        assert_eq!(Mode::from_undo(true), Mode::Undo);
        assert_eq!(Mode::from_undo(false), Mode::Apply);
        assert!(Mode::Apply.unschedulable());
        assert!(!Mode::Undo.unschedulable());
    }
}
