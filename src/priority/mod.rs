//! Priority expander rules
//!
//! The cluster autoscaler's priority expander maps integer priority levels to
//! lists of regular expressions matched against node-group names. This module
//! holds the in-memory model of that mapping:
//!
//! - [`Pattern`]: one compiled rule, compared by source text
//! - [`PatternSet`]: the deduplicated rules of a single level
//! - [`PriorityIndex`]: every level and its rules

pub mod index;
pub mod pattern;

pub use index::{PriorityIndex, PriorityLevel, RuleError, SerializablePriorities};
pub use pattern::{quote_meta, Pattern, PatternError, PatternSet};
