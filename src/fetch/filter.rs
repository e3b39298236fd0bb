// src/fetch/filter.rs
// =============================================================================
// Picks the files to download out of a full tree listing.
//
// An entry is kept when it is a blob and its path starts with the subfolder.
// The check is a plain string prefix, not a path-segment match: "src" also
// selects "src-old/file".
// =============================================================================

use crate::github::{EntryKind, TreeEntry};

pub fn select_files(entries: Vec<TreeEntry>, subfolder: &str) -> Vec<String> {
    entries
        .into_iter()
        .filter(|entry| entry.kind == EntryKind::Blob && entry.path.starts_with(subfolder))
        .map(|entry| entry.path)
        .collect()
}
