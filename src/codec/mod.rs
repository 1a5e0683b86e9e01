//! Text format of the priority expander configmap
//!
//! The `priorities` field holds YAML of the form:
//!
//! ```yaml
//! 10:
//! - .*on-demand.*
//! 100:
//! - .*test-p2.*
//! - .*test-p3.*
//! ```

use thiserror::Error;

use crate::priority::{PriorityIndex, RuleError, SerializablePriorities};

/// Errors raised while reading or writing the priorities text
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("priority configuration is empty")]
    Empty,

    #[error("Can't parse YAML with priorities: {0}")]
    Parse(#[source] serde_yaml::Error),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error("Can't serialize priorities to YAML: {0}")]
    Encode(#[source] serde_yaml::Error),
}

impl CodecError {
    /// True when the stored value was blank rather than malformed
    pub fn is_empty(&self) -> bool {
        matches!(self, CodecError::Empty)
    }
}

// ============================================================================
// Pure parsing functions (no I/O)
// ============================================================================

/// Parse the stored priorities text, compiling every rule.
pub fn decode(text: &str) -> Result<PriorityIndex, CodecError> {
    if text.trim().is_empty() {
        return Err(CodecError::Empty);
    }
    let serialized: SerializablePriorities =
        serde_yaml::from_str(text).map_err(CodecError::Parse)?;
    let index = PriorityIndex::from_serializable(serialized)?;
    Ok(index)
}

/// Render an index as priorities text, levels ascending, rules in set order.
pub fn encode(index: &PriorityIndex) -> Result<String, CodecError> {
    serde_yaml::to_string(&index.to_serializable()).map_err(CodecError::Encode)
}
