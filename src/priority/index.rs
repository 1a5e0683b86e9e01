use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::pattern::{Pattern, PatternError, PatternSet};

/// Priority level used by the autoscaler's priority expander.
/// Higher levels are preferred when scaling up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriorityLevel(pub i64);

impl fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for PriorityLevel {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Plain representation stored in the configmap: level -> rule sources
pub type SerializablePriorities = BTreeMap<PriorityLevel, Vec<String>>;

/// A stored rule that failed to compile
#[derive(Error, Debug)]
#[error("Can't compile regexp rule for priority {level} and rule {rule}: {source}")]
pub struct RuleError {
    pub level: PriorityLevel,
    pub rule: String,
    #[source]
    pub source: PatternError,
}

/// Priority levels and the node-group rules attached to each of them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorityIndex {
    levels: BTreeMap<PriorityLevel, PatternSet>,
}

impl PriorityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty rule set for `level` if there is none.
    /// Returns whether the level was created.
    pub fn ensure_level(&mut self, level: PriorityLevel) -> bool {
        if self.levels.contains_key(&level) {
            return false;
        }
        self.levels.insert(level, PatternSet::new());
        true
    }

    /// Add the literal rule of each name to `level`, skipping rules already present.
    pub fn add_names_if_absent(&mut self, names: &[String], level: PriorityLevel) {
        let set = self.levels.entry(level).or_default();
        for name in names {
            match Pattern::literal(name) {
                Ok(pattern) => {
                    set.add(pattern);
                }
                Err(e) => tracing::warn!(name = %name, error = %e, "Skipping node group"),
            }
        }
    }

    /// Remove the literal rule of each name from `level`.
    ///
    /// Rules not derived from any of `names` are kept in order. The level is
    /// created if missing so the configured priority is always persisted.
    pub fn remove_names_if_present(&mut self, names: &[String], level: PriorityLevel) {
        let set = self.levels.entry(level).or_default();
        for name in names {
            match Pattern::literal(name) {
                Ok(pattern) => {
                    set.remove_matching(&pattern);
                }
                Err(e) => tracing::warn!(name = %name, error = %e, "Skipping node group"),
            }
        }
    }

    pub fn level(&self, level: PriorityLevel) -> Option<&PatternSet> {
        self.levels.get(&level)
    }

    pub fn levels(&self) -> impl Iterator<Item = (PriorityLevel, &PatternSet)> {
        self.levels.iter().map(|(level, set)| (*level, set))
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn to_serializable(&self) -> SerializablePriorities {
        self.levels
            .iter()
            .map(|(level, set)| (*level, set.sources()))
            .collect()
    }

    /// Compile every stored rule as a raw regular expression.
    /// Fails on the first rule that does not compile.
    pub fn from_serializable(serialized: SerializablePriorities) -> Result<Self, RuleError> {
        let mut index = PriorityIndex::new();
        for (level, rules) in serialized {
            index.ensure_level(level);
            for rule in rules {
                let pattern = Pattern::parse(&rule).map_err(|source| RuleError {
                    level,
                    rule: rule.clone(),
                    source,
                })?;
                if let Some(set) = index.levels.get_mut(&level) {
                    set.add(pattern);
                }
            }
        }
        Ok(index)
    }
}

impl fmt::Display for PriorityIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (level, set)) in self.levels().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {:?}", level, set.sources())?;
        }
        f.write_str("}")
    }
}
