use tracing::{info, warn};

use super::Mode;
use crate::priority::{PriorityLevel, SerializablePriorities};

/// Result of cordoning (or uncordoning) one node group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOutcome {
    pub group: String,
    /// Set when the node lookup failed and the group was skipped
    pub lookup_error: Option<String>,
    pub patched: Vec<String>,
    pub failed: Vec<String>,
    /// A rule at the reconciled level still matches this cordoned group
    pub still_prioritized: bool,
}

impl GroupOutcome {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            lookup_error: None,
            patched: Vec::new(),
            failed: Vec::new(),
            still_prioritized: false,
        }
    }

    pub fn nodes_found(&self) -> usize {
        self.patched.len() + self.failed.len()
    }
}

/// What a completed pass did
#[derive(Debug, Clone)]
pub struct RunReport {
    pub mode: Mode,
    pub priority: PriorityLevel,
    /// Priorities as persisted
    pub priorities: SerializablePriorities,
    /// Text written to the configmap
    pub encoded: String,
    pub groups: Vec<GroupOutcome>,
}

impl RunReport {
    pub fn nodes_found(&self) -> usize {
        self.groups.iter().map(GroupOutcome::nodes_found).sum()
    }

    pub fn nodes_patched(&self) -> usize {
        self.groups.iter().map(|g| g.patched.len()).sum()
    }

    pub fn nodes_failed(&self) -> usize {
        self.groups.iter().map(|g| g.failed.len()).sum()
    }

    pub fn groups_failed(&self) -> usize {
        self.groups
            .iter()
            .filter(|g| g.lookup_error.is_some())
            .count()
    }

    /// No node-group lookup or node patch failed
    pub fn is_clean(&self) -> bool {
        self.nodes_failed() == 0 && self.groups_failed() == 0
    }

    pub fn log_summary(&self) {
        if self.is_clean() {
            info!(
                mode = %self.mode,
                nodes = self.nodes_patched(),
                groups = self.groups.len(),
                "Task achieved!"
            );
            return;
        }

        warn!(
            mode = %self.mode,
            "Task achieved with errors: {} of {} nodes failed, {} of {} node groups could not be listed",
            self.nodes_failed(),
            self.nodes_found(),
            self.groups_failed(),
            self.groups.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(groups: Vec<GroupOutcome>) -> RunReport {
        RunReport {
            mode: Mode::Apply,
            priority: PriorityLevel(100),
            priorities: SerializablePriorities::new(),
            encoded: String::new(),
            groups,
        }
    }

    #[test]
    fn test_counters() {
        let mut a = GroupOutcome::new("a");
        a.patched = vec!["n1".to_string(), "n2".to_string()];
        a.failed = vec!["n3".to_string()];
        let mut b = GroupOutcome::new("b");
        b.lookup_error = Some("timeout".to_string());

        let report = report(vec![a, b, GroupOutcome::new("c")]);
        assert_eq!(report.nodes_found(), 3);
        assert_eq!(report.nodes_patched(), 2);
        assert_eq!(report.nodes_failed(), 1);
        assert_eq!(report.groups_failed(), 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_empty_report_is_clean() {
        assert!(report(Vec::new()).is_clean());
    }
}
