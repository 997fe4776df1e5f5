//! The persisted index of filenames discovered on a device.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Filenames never offered for transfer or deletion, even when indexed.
/// `config.json` holds the device's own settings.
pub const RESERVED_FILES: &[&str] = &["config.json"];

/// Deduplicated, sorted set of filenames known to exist on a device.
///
/// Serializes as `{ "files": ["a.log", "b.log"] }` so the document stays
/// hand-editable.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIndex {
    files: BTreeSet<String>,
}

impl FileIndex {
    /// An empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a filename. Returns `true` when it was not already present.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.files.insert(name.into())
    }

    /// Forget a filename. Returns `true` when it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        self.files.remove(name)
    }

    /// Whether `name` is indexed.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.files.contains(name)
    }

    /// Number of indexed filenames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate the filenames in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }

    /// Filenames eligible for download or deletion: everything except
    /// [`RESERVED_FILES`] and the caller-supplied reserved names (typically
    /// the log file still being written today).
    #[must_use]
    pub fn transfer_candidates(&self, reserved: &[String]) -> Vec<String> {
        self.files
            .iter()
            .filter(|name| !RESERVED_FILES.contains(&name.as_str()))
            .filter(|name| !reserved.iter().any(|r| r == *name))
            .cloned()
            .collect()
    }
}
