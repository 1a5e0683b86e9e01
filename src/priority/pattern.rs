use std::fmt;
use std::hash::{Hash, Hasher};

use regex::Regex;
use thiserror::Error;

/// Errors raised while building a pattern
#[derive(Error, Debug)]
pub enum PatternError {
    #[error("Can't compile pattern `{pattern}`: {source}")]
    Invalid {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Characters escaped by RE2's `QuoteMeta`.
///
/// The cluster autoscaler reads these rules with Go's regexp package, and
/// existing configmaps were written with this escape set, so literal patterns
/// must produce the exact same source text.
const META_CHARACTERS: &str = r"\.+*?()|[]{}^$";

/// Escape a node-group name so it matches only itself.
pub fn quote_meta(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len() * 2);
    for c in literal.chars() {
        if META_CHARACTERS.contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// A compiled priority rule.
///
/// Two patterns are equal when their source text is identical, regardless of
/// how they were built.
#[derive(Clone)]
pub struct Pattern {
    regex: Regex,
}

impl Pattern {
    /// Build the "match anywhere" rule for a node-group name: `.*<escaped>.*`
    pub fn literal(name: &str) -> Result<Self, PatternError> {
        Self::parse(&format!(".*{}.*", quote_meta(name)))
    }

    /// Compile a stored rule verbatim. Stored rules may be hand-authored
    /// regular expressions.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let regex = Regex::new(raw).map_err(|source| PatternError::Invalid {
            pattern: raw.to_string(),
            source,
        })?;
        Ok(Self { regex })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Pattern {}

impl Hash for Pattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.as_str()).finish()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The rules attached to one priority level, unique by source text, in
/// insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, pattern: &Pattern) -> bool {
        self.patterns.iter().any(|p| p == pattern)
    }

    /// Append `pattern` unless an identical rule is already present.
    /// Returns whether the set changed.
    pub fn add(&mut self, pattern: Pattern) -> bool {
        if self.contains(&pattern) {
            return false;
        }
        self.patterns.push(pattern);
        true
    }

    /// Drop every rule with the same source text as `pattern`.
    /// Returns whether anything was removed.
    pub fn remove_matching(&mut self, pattern: &Pattern) -> bool {
        let before = self.patterns.len();
        self.patterns.retain(|p| p != pattern);
        self.patterns.len() != before
    }

    /// Whether any rule in the set selects the given node-group name
    pub fn matches(&self, node_group: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(node_group))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    /// Source text of every rule, in set order
    pub fn sources(&self) -> Vec<String> {
        self.iter().map(|p| p.as_str().to_string()).collect()
    }
}

impl FromIterator<Pattern> for PatternSet {
    fn from_iter<I: IntoIterator<Item = Pattern>>(iter: I) -> Self {
        let mut set = PatternSet::new();
        for pattern in iter {
            set.add(pattern);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_wraps_and_escapes() {
        let p = Pattern::literal("pool.a").unwrap();
        assert_eq!(p.as_str(), r".*pool\.a.*");
    }

    #[test]
    fn test_quote_meta_leaves_dashes() {
        assert_eq!(quote_meta("test-p1"), "test-p1");
        assert_eq!(quote_meta("a+b(c)"), r"a\+b\(c\)");
        assert_eq!(quote_meta(r"x\y"), r"x\\y");
    }

    #[test]
    fn test_literal_matches_substring() {
        let p = Pattern::literal("p2").unwrap();
        assert!(p.is_match("test-p2"));
        assert!(p.is_match("p2-large"));
        assert!(!p.is_match("p3"));
    }

    #[test]
    fn test_parse_rejects_invalid_regex() {
        let err = Pattern::parse("(unclosed").unwrap_err();
        assert!(matches!(err, PatternError::Invalid { ref pattern, .. } if pattern == "(unclosed"));
    }

    #[test]
    fn test_equality_is_by_source_text() {
        let literal = Pattern::literal("abc").unwrap();
        let raw = Pattern::parse(".*abc.*").unwrap();
        assert_eq!(literal, raw);
        assert_ne!(raw, Pattern::parse("abc").unwrap());
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut set = PatternSet::new();
        assert!(set.add(Pattern::literal("a").unwrap()));
        assert!(!set.add(Pattern::literal("a").unwrap()));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_remove_matching_preserves_order() {
        let mut set: PatternSet = ["a", "b", "c"]
            .iter()
            .map(|n| Pattern::literal(n).unwrap())
            .collect();

        assert!(set.remove_matching(&Pattern::literal("b").unwrap()));
        assert_eq!(set.sources(), vec![".*a.*", ".*c.*"]);
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut set: PatternSet = std::iter::once(Pattern::literal("a").unwrap()).collect();
        assert!(!set.remove_matching(&Pattern::literal("zzz").unwrap()));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_set_matches_node_group() {
        let set: PatternSet = std::iter::once(Pattern::parse("^gpu-.*").unwrap()).collect();
        assert!(set.matches("gpu-a100"));
        assert!(!set.matches("cpu-pool"));
    }
}
