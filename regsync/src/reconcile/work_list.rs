//! The persisted list of artifacts pending migration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::ArtifactIdentifier;
use crate::errors::{RegsyncError, Result};
use crate::utils::write_atomic;

/// Sorted, deduplicated identifiers awaiting a copy.
///
/// The on-disk form is one canonical identifier per line, UTF-8,
/// newline-terminated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MigrationWorkList {
    items: Vec<ArtifactIdentifier>,
}

impl MigrationWorkList {
    /// Creates a work list, sorting and deduplicating `items`.
    #[must_use]
    pub fn new(items: impl IntoIterator<Item = ArtifactIdentifier>) -> Self {
        let mut items: Vec<_> = items.into_iter().collect();
        items.sort();
        items.dedup();
        Self { items }
    }

    /// The identifiers, in canonical order.
    #[must_use]
    pub fn items(&self) -> &[ArtifactIdentifier] {
        &self.items
    }

    /// Number of identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there is nothing to migrate.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over the identifiers.
    pub fn iter(&self) -> std::slice::Iter<'_, ArtifactIdentifier> {
        self.items.iter()
    }

    /// Renders the on-disk form.
    #[must_use]
    pub fn to_lines(&self) -> String {
        self.items.iter().fold(String::new(), |mut out, id| {
            out.push_str(id.as_str());
            out.push('\n');
            out
        })
    }

    /// Atomically replaces the file at `path` with this list.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        write_atomic(path, self.to_lines().as_bytes())
    }

    /// Reads a work list, skipping blank lines.
    ///
    /// A missing or unreadable file is a persistence error; a line that is
    /// not a canonical identifier is a malformed entry.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| RegsyncError::persistence(path, e))?;

        let mut items = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let entry = line.trim();
            if entry.is_empty() {
                continue;
            }
            let id: ArtifactIdentifier = entry.parse().map_err(|_| RegsyncError::MalformedEntry {
                path: path.to_path_buf(),
                line: index + 1,
                entry: entry.to_string(),
            })?;
            items.push(id);
        }
        Ok(Self::new(items))
    }
}

impl<'a> IntoIterator for &'a MigrationWorkList {
    type Item = &'a ArtifactIdentifier;
    type IntoIter = std::slice::Iter<'a, ArtifactIdentifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<ArtifactIdentifier> for MigrationWorkList {
    fn from_iter<I: IntoIterator<Item = ArtifactIdentifier>>(iter: I) -> Self {
        Self::new(iter)
    }
}
