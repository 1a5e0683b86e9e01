//! Prioritize node pools in the cluster-autoscaler priority expander and
//! cordon the node pools being drained.

pub mod cli;
pub mod cluster;
pub mod codec;
pub mod priority;
pub mod reconcile;
