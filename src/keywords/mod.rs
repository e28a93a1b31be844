//! Attention word-group definitions and matching
//!
//! A word group is one attention topic defined by three term sets:
//! required (all must match), optional (synonyms, any one matches) and
//! excluded (presence vetoes a match). Groups are parsed once from the
//! attention-word file and held in an immutable [`KeywordIndex`] snapshot;
//! a reload produces a new snapshot swapped atomically so in-flight queries
//! keep the version they started with.
//!
//! # File format
//!
//! Groups are separated by blank lines. Within a group, each non-empty line
//! holds one term: a bare term is optional, `+term` is required and `!term`
//! is excluded. The group is named after its first optional term (or first
//! required term when no optional terms exist). Lines starting with `#` are
//! comments.
//!
//! ```text
//! ai
//! artificial intelligence
//! +model
//! !fashion model
//!
//! electric cars
//! ev
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};

/// One attention topic defined by required/optional/excluded terms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordGroup {
    pub name: String,
    pub required: Vec<String>,
    pub optional: Vec<String>,
    pub excluded: Vec<String>,
}

impl WordGroup {
    /// Check whether a title matches this group
    ///
    /// A term matches when the lower-cased title contains the lower-cased
    /// term as a substring; this keeps multi-word and non-segmented-script
    /// terms working without a language-specific tokenizer.
    pub fn matches(&self, title: &str) -> bool {
        let haystack = title.to_lowercase();

        if self.excluded.iter().any(|t| haystack.contains(t.as_str())) {
            return false;
        }
        if !self.required.is_empty() && !self.required.iter().all(|t| haystack.contains(t.as_str()))
        {
            return false;
        }
        if !self.optional.is_empty() && !self.optional.iter().any(|t| haystack.contains(t.as_str()))
        {
            return false;
        }
        // A group with no required and no optional terms is rejected at load,
        // so reaching here means at least one positive condition held.
        true
    }
}

/// Immutable snapshot of all configured word groups
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeywordIndex {
    groups: Vec<WordGroup>,
}

impl KeywordIndex {
    /// Parse the attention-word file content
    ///
    /// A group with empty required and empty optional sets would match
    /// nothing and is treated as a configuration error, not a wildcard.
    pub fn parse(content: &str) -> Result<Self> {
        let mut groups = Vec::new();

        for (block_no, block) in content.split("\n\n").enumerate() {
            let mut required = Vec::new();
            let mut optional = Vec::new();
            let mut excluded = Vec::new();

            for line in block.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some(term) = line.strip_prefix('+') {
                    required.push(term.trim().to_lowercase());
                } else if let Some(term) = line.strip_prefix('!') {
                    excluded.push(term.trim().to_lowercase());
                } else {
                    optional.push(line.to_lowercase());
                }
            }

            if required.is_empty() && optional.is_empty() {
                if excluded.is_empty() {
                    // Whitespace-only block between groups
                    continue;
                }
                return Err(Error::config(format!(
                    "word group #{} has only excluded terms and would match nothing",
                    block_no + 1
                )));
            }

            let name = optional
                .first()
                .or_else(|| required.first())
                .cloned()
                .unwrap_or_default();

            groups.push(WordGroup {
                name,
                required,
                optional,
                excluded,
            });
        }

        if groups.is_empty() {
            return Err(Error::config("word-group file defines no groups"));
        }

        Ok(Self { groups })
    }

    /// Load and parse the attention-word file
    ///
    /// Failures here are fatal at startup: every analytical query depends on
    /// the group definitions.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "failed to read word-group file {}: {e}",
                path.display()
            ))
        })?;
        let index = Self::parse(&content)?;
        tracing::info!(
            path = %path.display(),
            groups = index.groups.len(),
            "Loaded word groups"
        );
        Ok(index)
    }

    /// Build an index from already-constructed groups (used by tests)
    pub fn from_groups(groups: Vec<WordGroup>) -> Self {
        Self { groups }
    }

    pub fn groups(&self) -> &[WordGroup] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Look up a group by name, case-insensitive
    pub fn get(&self, name: &str) -> Option<&WordGroup> {
        let needle = name.to_lowercase();
        self.groups.iter().find(|g| g.name == needle)
    }

    /// Groups matching a title
    pub fn matching_groups(&self, title: &str) -> Vec<&WordGroup> {
        self.groups.iter().filter(|g| g.matches(title)).collect()
    }

    /// Resolve a query topic to a group: a configured group by name, or an
    /// ad-hoc single-optional-term group when none matches
    pub fn resolve_topic(&self, topic: &str) -> WordGroup {
        if let Some(group) = self.get(topic) {
            return group.clone();
        }
        WordGroup {
            name: topic.to_lowercase(),
            required: Vec::new(),
            optional: vec![topic.to_lowercase()],
            excluded: Vec::new(),
        }
    }
}

/// Shared handle holding the current index snapshot
///
/// Queries clone the inner `Arc` once at entry; `reload` swaps the pointer
/// without touching snapshots already in use.
#[derive(Debug, Clone)]
pub struct KeywordIndexHandle {
    inner: Arc<RwLock<Arc<KeywordIndex>>>,
}

impl KeywordIndexHandle {
    pub fn new(index: KeywordIndex) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(index))),
        }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<KeywordIndex> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the snapshot atomically
    pub fn reload(&self, index: KeywordIndex) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
ai
artificial intelligence
+model
!fashion model

electric cars
ev
";

    #[test]
    fn test_parse_groups() {
        let index = KeywordIndex::parse(SAMPLE).unwrap();
        assert_eq!(index.len(), 2);

        let ai = index.get("ai").unwrap();
        assert_eq!(ai.required, vec!["model"]);
        assert_eq!(ai.optional, vec!["ai", "artificial intelligence"]);
        assert_eq!(ai.excluded, vec!["fashion model"]);

        let ev = index.get("electric cars").unwrap();
        assert!(ev.required.is_empty());
        assert_eq!(ev.optional.len(), 2);
    }

    #[test]
    fn test_match_rules() {
        let index = KeywordIndex::parse(SAMPLE).unwrap();
        let ai = index.get("ai").unwrap();

        // optional + required both present
        assert!(ai.matches("New AI model released today"));
        // required missing
        assert!(!ai.matches("AI conference announced"));
        // excluded vetoes
        assert!(!ai.matches("AI model used to rate fashion model photos"));
        // neither optional present
        assert!(!ai.matches("New language model released"));
    }

    #[test]
    fn test_only_excluded_is_config_error() {
        let err = KeywordIndex::parse("!spam\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_empty_file_is_config_error() {
        assert!(KeywordIndex::parse("\n\n").is_err());
    }

    #[test]
    fn test_comments_ignored() {
        let index = KeywordIndex::parse("# attention topics\nrust\n").unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.get("rust").is_some());
    }

    #[test]
    fn test_resolve_topic_ad_hoc() {
        let index = KeywordIndex::parse(SAMPLE).unwrap();
        let group = index.resolve_topic("Quantum Computing");
        assert_eq!(group.name, "quantum computing");
        assert!(group.matches("Breakthrough in quantum computing announced"));
    }

    #[test]
    fn test_snapshot_isolated_from_reload() {
        let handle = KeywordIndexHandle::new(KeywordIndex::parse("rust\n").unwrap());
        let before = handle.snapshot();
        handle.reload(KeywordIndex::parse("go\n").unwrap());
        assert!(before.get("rust").is_some());
        assert!(handle.snapshot().get("go").is_some());
        assert!(handle.snapshot().get("rust").is_none());
    }
}
