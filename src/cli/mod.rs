//! Command line for nodepool-cordon
//!
//! Every flag can also be set through an environment variable, which makes the
//! tool easy to run as a Kubernetes CronJob.

use clap::{ArgAction, Parser};
use std::path::PathBuf;

mod display;

pub use display::*;

use crate::cluster::{
    ConfigRecordRef, CONFIG_MAP_KEY, DEFAULT_CONFIG_MAP_NAMESPACE, DEFAULT_NODEPOOL_LABEL,
    FIELD_MANAGER, PRIORITY_CONFIG_MAP_NAME,
};
use crate::priority::PriorityLevel;
use crate::reconcile::{FetchErrorPolicy, Mode, ReconcileConfig};

#[derive(Parser, Debug)]
#[command(name = "nodepool-cordon")]
#[command(about = "Prioritize node pools in the cluster-autoscaler priority expander and cordon the rest")]
#[command(version)]
pub struct Args {
    /// Kubeconfig file path (default: inferred, falling back to in-cluster config)
    #[arg(long, env = "KUBECONFIG_PATH", value_name = "FILE")]
    pub kubeconfig: Option<String>,

    /// Node pools to prioritize, comma separated for several ones
    #[arg(long, env = "PRIORITIZE_NP", default_value = "test-p2,test-p3")]
    pub prioritize_np: String,

    /// Node pools to cordon (mark unschedulable in spec), comma separated for several ones
    #[arg(long, env = "CORDON_NP", default_value = "test-p1")]
    pub cordon_np: String,

    /// Node pool selector label key
    #[arg(long, env = "NODEPOOL_LABEL", default_value = DEFAULT_NODEPOOL_LABEL)]
    pub nodepool_label: String,

    /// Priority level set for the rules of prioritized node pools
    #[arg(long, env = "PRIORITY_VALUE", default_value_t = 100, allow_negative_numbers = true)]
    pub priority_value: i64,

    /// Namespace of the priority expander configmap
    #[arg(long, env = "PRIORITY_CM_NS", default_value = DEFAULT_CONFIG_MAP_NAMESPACE)]
    pub priority_cm_ns: String,

    /// Name of the priority expander configmap
    #[arg(long, env = "PRIORITY_CM_NAME", default_value = PRIORITY_CONFIG_MAP_NAME)]
    pub priority_cm_name: String,

    /// Remove the prioritized node pools and uncordon the cordon node pools
    #[arg(long, env = "UNDO")]
    pub undo: bool,

    /// Abort when the configmap can't be read for a reason other than not found
    #[arg(long)]
    pub fail_on_fetch_error: bool,

    /// Compute the new priorities and affected nodes without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Path to a .env file loaded before reading flag environment variables
    #[arg(long, value_name = "FILE")]
    pub env_file: Option<PathBuf>,

    /// Enable verbose logging output (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Build the explicit configuration handed to the reconciler
    pub fn reconcile_config(&self) -> ReconcileConfig {
        ReconcileConfig {
            prioritize: self.prioritize_np.clone(),
            cordon: self.cordon_np.clone(),
            priority: PriorityLevel(self.priority_value),
            nodepool_label: self.nodepool_label.clone(),
            record: ConfigRecordRef::new(&self.priority_cm_name, &self.priority_cm_ns)
                .with_key(CONFIG_MAP_KEY),
            field_manager: FIELD_MANAGER.to_string(),
            mode: Mode::from_undo(self.undo),
            fetch_errors: if self.fail_on_fetch_error {
                FetchErrorPolicy::Fail
            } else {
                FetchErrorPolicy::Fallback
            },
        }
    }

    /// Log filter derived from `-v` when `RUST_LOG` is unset
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Load a .env file into the process environment
pub fn load_env_file(path: &std::path::Path) -> Result<(), dotenvy::Error> {
    dotenvy::from_path(path)
}
