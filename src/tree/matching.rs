//! Joining a source index with a derived index.

use super::{CorrespondenceKey, IndexEntry, TreeIndex};

/// A source file and its derivative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedPair {
    /// Shared key.
    pub key: CorrespondenceKey,
    /// Source-tree file.
    pub source: IndexEntry,
    /// Derived-tree file.
    pub derived: IndexEntry,
}

/// A source file with no derivative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingCounterpart {
    /// Source key.
    pub key: CorrespondenceKey,
    /// Source-tree file.
    pub source: IndexEntry,
}

/// Outcome of joining one source key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correspondence {
    /// Both sides exist.
    Matched(MatchedPair),
    /// The derived side is absent.
    Missing(MissingCounterpart),
}

impl Correspondence {
    /// Key of this entry.
    #[must_use]
    pub fn key(&self) -> &CorrespondenceKey {
        match self {
            Self::Matched(pair) => &pair.key,
            Self::Missing(missing) => &missing.key,
        }
    }

    /// Source-tree file of this entry.
    #[must_use]
    pub fn source(&self) -> &IndexEntry {
        match self {
            Self::Matched(pair) => &pair.source,
            Self::Missing(missing) => &missing.source,
        }
    }
}

/// Every source key, joined, in ascending key order.
#[derive(Debug, Clone, Default)]
pub struct MatchSet {
    /// Joined entries, ascending by key.
    pub entries: Vec<Correspondence>,
    /// Derived keys with no source. Counted, never reported as rows.
    pub orphans: Vec<CorrespondenceKey>,
}

impl MatchSet {
    /// Matched pairs in key order.
    pub fn matched(&self) -> impl Iterator<Item = &MatchedPair> {
        self.entries.iter().filter_map(|c| match c {
            Correspondence::Matched(pair) => Some(pair),
            Correspondence::Missing(_) => None,
        })
    }

    /// Unmatched source entries in key order.
    pub fn missing(&self) -> impl Iterator<Item = &MissingCounterpart> {
        self.entries.iter().filter_map(|c| match c {
            Correspondence::Missing(missing) => Some(missing),
            Correspondence::Matched(_) => None,
        })
    }

    /// Number of matched pairs.
    #[must_use]
    pub fn matched_count(&self) -> usize {
        self.matched().count()
    }

    /// Whether the source side had nothing to compare.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Join `source` with `derived` on correspondence key.
///
/// Ordering follows the key, not the walk. Derived keys without a source are
/// collected as orphans only.
#[must_use]
pub fn match_trees(source: &TreeIndex, derived: &TreeIndex) -> MatchSet {
    let entries = source
        .entries
        .iter()
        .map(|(key, entry)| match derived.get(key) {
            Some(counterpart) => Correspondence::Matched(MatchedPair {
                key: key.clone(),
                source: entry.clone(),
                derived: counterpart.clone(),
            }),
            None => Correspondence::Missing(MissingCounterpart {
                key: key.clone(),
                source: entry.clone(),
            }),
        })
        .collect();

    let orphans: Vec<CorrespondenceKey> = derived
        .entries
        .keys()
        .filter(|key| source.get(key).is_none())
        .cloned()
        .collect();

    if !orphans.is_empty() {
        tracing::debug!(count = orphans.len(), "derived files without a source");
    }

    MatchSet { entries, orphans }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::tree::Modality;

    fn index_of(keys: &[&str]) -> TreeIndex {
        let mut index = TreeIndex::new("/root", Modality::Video);
        for key in keys {
            index.insert(
                CorrespondenceKey::from(*key),
                IndexEntry {
                    relative_path: PathBuf::from(format!("{key}.mp4")),
                    absolute_path: PathBuf::from(format!("/root/{key}.mp4")),
                },
            );
        }
        index
    }

    #[test]
    fn test_sorted_by_key() {
        let source = index_of(&["b/x", "a/y", "a/z"]);
        let derived = index_of(&["b/x", "a/y", "a/z"]);

        let set = match_trees(&source, &derived);
        let keys: Vec<&str> = set.entries.iter().map(|c| c.key().as_str()).collect();
        assert_eq!(keys, ["a/y", "a/z", "b/x"]);
        assert_eq!(set.matched_count(), 3);
    }

    #[test]
    fn test_missing_and_orphans() {
        let source = index_of(&["clip", "intro"]);
        let derived = index_of(&["intro", "extra"]);

        let set = match_trees(&source, &derived);
        assert_eq!(set.matched_count(), 1);

        let missing: Vec<&str> = set.missing().map(|m| m.key.as_str()).collect();
        assert_eq!(missing, ["clip"]);
        assert_eq!(set.orphans, vec![CorrespondenceKey::from("extra")]);

        // Missing entries stay interleaved in key order.
        assert!(matches!(set.entries[0], Correspondence::Missing(_)));
        assert!(matches!(set.entries[1], Correspondence::Matched(_)));
    }

    #[test]
    fn test_empty_source() {
        let set = match_trees(&index_of(&[]), &index_of(&["a"]));
        assert!(set.is_empty());
        assert_eq!(set.orphans.len(), 1);
    }
}
