use serde::{Deserialize, Serialize};

/// The currently opened repository.
///
/// At most one is live per session. It is replaced wholesale whenever HEAD
/// may have moved, never patched field by field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    /// Absolute path of the working directory (or git dir for bare repos).
    pub path: String,
    /// Short name of the checked-out branch, `None` when detached or unborn.
    pub current_branch: Option<String>,
    pub is_detached: bool,
    pub remotes: Vec<String>,
    /// Full id of the HEAD commit, `None` for an unborn branch.
    pub head_hash: Option<String>,
}

impl RepositoryInfo {
    /// Human-readable HEAD label: the branch name, or the short hash when detached.
    pub fn head_label(&self) -> String {
        match (&self.current_branch, &self.head_hash) {
            (Some(branch), _) => branch.clone(),
            (None, Some(hash)) => hash.chars().take(7).collect(),
            (None, None) => "(no commits)".to_string(),
        }
    }
}
