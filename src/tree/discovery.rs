//! Recursive tree walking.

use std::path::Path;

use walkdir::WalkDir;

use super::{IndexEntry, IndexRule, TreeIndex};

/// Index every file under `root` accepted by `rule`.
///
/// Entries are visited in file-name order within each directory, so the
/// winner of a key collision is deterministic. Unreadable entries are skipped
/// silently; a missing root yields an empty index.
pub(super) fn index_tree(root: &Path, rule: &IndexRule) -> TreeIndex {
    let mut index = TreeIndex::new(root, rule.modality);

    if !root.is_dir() {
        tracing::debug!(root = %root.display(), "root is not a directory, index is empty");
        return index;
    }

    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative_path) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative_dir = relative_path.parent().unwrap_or_else(|| Path::new(""));
        let file_name = entry.file_name().to_string_lossy();

        match rule.key_for(relative_dir, &file_name) {
            Some(key) => index.insert(
                key,
                IndexEntry {
                    relative_path: relative_path.to_path_buf(),
                    absolute_path: entry.path().to_path_buf(),
                },
            ),
            None => {
                tracing::debug!(file = %relative_path.display(), "skipped");
                index.skipped += 1;
            }
        }
    }

    tracing::debug!(
        root = %root.display(),
        indexed = index.len(),
        skipped = index.skipped,
        "tree indexed"
    );

    index
}
