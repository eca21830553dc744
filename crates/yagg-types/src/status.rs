//! Working-tree status types.
//!
//! The three groups are disjoint and are always recomputed in full by the
//! engine; nothing patches them incrementally.

use serde::{Deserialize, Serialize};

/// A single working-tree entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatus {
    /// Path relative to the working directory root.
    pub path: String,
    pub status: FileStatusType,
    pub is_staged: bool,
}

impl FileStatus {
    pub fn new(path: impl Into<String>, status: FileStatusType, is_staged: bool) -> Self {
        Self {
            path: path.into(),
            status,
            is_staged,
        }
    }
}

/// The kind of change recorded for a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatusType {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    Untracked,
    Conflicted,
}

/// Staged, unstaged and untracked entries of the working tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatuses {
    pub staged: Vec<FileStatus>,
    pub unstaged: Vec<FileStatus>,
    pub untracked: Vec<FileStatus>,
}

impl FileStatuses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if there are no changes of any kind.
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty() && self.unstaged.is_empty() && self.untracked.is_empty()
    }

    pub fn has_staged_changes(&self) -> bool {
        !self.staged.is_empty()
    }

    pub fn has_conflicts(&self) -> bool {
        self.staged
            .iter()
            .chain(&self.unstaged)
            .any(|f| f.status == FileStatusType::Conflicted)
    }

    /// Total number of entries across all groups.
    pub fn total_entries(&self) -> usize {
        self.staged.len() + self.unstaged.len() + self.untracked.len()
    }

    /// Looks up `path` in the staged or unstaged/untracked groups.
    pub fn find(&self, path: &str, staged: bool) -> Option<&FileStatus> {
        if staged {
            self.staged.iter().find(|f| f.path == path)
        } else {
            self.unstaged
                .iter()
                .chain(&self.untracked)
                .find(|f| f.path == path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_statuses_are_clean() {
        let statuses = FileStatuses::new();
        assert!(statuses.is_clean());
        assert!(!statuses.has_staged_changes());
        assert!(!statuses.has_conflicts());
        assert_eq!(statuses.total_entries(), 0);
    }

    #[test]
    fn staged_entry_is_not_clean() {
        let mut statuses = FileStatuses::new();
        statuses
            .staged
            .push(FileStatus::new("a.txt", FileStatusType::Added, true));
        assert!(!statuses.is_clean());
        assert!(statuses.has_staged_changes());
        assert_eq!(statuses.total_entries(), 1);
    }

    #[test]
    fn conflicts_detected_in_unstaged() {
        let mut statuses = FileStatuses::new();
        statuses
            .unstaged
            .push(FileStatus::new("c.txt", FileStatusType::Conflicted, false));
        assert!(statuses.has_conflicts());
    }

    #[test]
    fn find_searches_the_requested_side() {
        let mut statuses = FileStatuses::new();
        statuses
            .staged
            .push(FileStatus::new("a.txt", FileStatusType::Modified, true));
        statuses
            .untracked
            .push(FileStatus::new("new.txt", FileStatusType::Untracked, false));

        assert!(statuses.find("a.txt", true).is_some());
        assert!(statuses.find("a.txt", false).is_none());
        assert!(statuses.find("new.txt", false).is_some());
    }

    #[test]
    fn status_type_serializes_lowercase() {
        let json = serde_json::to_string(&FileStatusType::Untracked).unwrap();
        assert_eq!(json, "\"untracked\"");
    }
}
