//! Display formatting for CLI output
//!
//! Pure functions that format data for display

use crate::reconcile::{GroupOutcome, ReconcileConfig, RunReport};

fn group_status(group: &GroupOutcome) -> String {
    if let Some(ref error) = group.lookup_error {
        return format!("lookup failed: {}", error);
    }
    if group.nodes_found() == 0 {
        return "no nodes".to_string();
    }
    if !group.failed.is_empty() {
        return format!("{} failed", group.failed.len());
    }
    if group.still_prioritized {
        return "ok (still matched by a rule)".to_string();
    }
    "ok".to_string()
}

/// Format one line per node group: name, node count, status.
///
/// The name column is padded to the longest group, counts are right-aligned
/// under `NODES`, and the status is left unpadded.
pub fn format_groups(report: &RunReport) -> String {
    if report.groups.is_empty() {
        return "No node groups to cordon.\n".to_string();
    }

    let name_width = report
        .groups
        .iter()
        .map(|g| g.group.len())
        .max()
        .unwrap_or(0)
        .max("GROUP".len());

    let mut output = format!("{:<name_width$}   NODES   STATUS\n", "GROUP");
    for group in &report.groups {
        output.push_str(&format!(
            "{:<name_width$}   {:>5}   {}\n",
            group.group,
            group.nodes_found(),
            group_status(group)
        ));
    }
    output
}

/// Format the dry-run output: computed priorities and affected nodes
pub fn format_dry_run(report: &RunReport, config: &ReconcileConfig) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "nodepool-cordon v{} - Dry Run Mode\n\n",
        env!("CARGO_PKG_VERSION")
    ));
    output.push_str(&format!("Mode: {}\n", report.mode));
    output.push_str(&format!("Priority level: {}\n", report.priority));
    output.push_str(&format!(
        "Configmap: {} (key `{}`)\n\n",
        config.record, config.record.key
    ));

    output.push_str("Computed priorities:\n");
    for line in report.encoded.lines() {
        output.push_str(&format!("  {}\n", line));
    }
    output.push('\n');

    let verb = if report.mode.unschedulable() {
        "cordon"
    } else {
        "uncordon"
    };
    output.push_str(&format!(
        "Nodes to {} (label `{}`):\n",
        verb, config.nodepool_label
    ));
    output.push_str(&format_groups(report));

    for group in report.groups.iter().filter(|g| !g.patched.is_empty()) {
        output.push_str(&format!("  {}: {}\n", group.group, group.patched.join(", ")));
    }

    output.push_str("\nNo changes were sent to the cluster. Remove --dry-run to apply.\n");
    output
}
