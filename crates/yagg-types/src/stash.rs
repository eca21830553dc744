use serde::{Deserialize, Serialize};

use crate::commit::CommitFileChange;

/// One entry of the stash list. `index` 0 is the most recent stash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StashInfo {
    pub index: usize,
    pub message: String,
    pub commit_hash: String,
    pub timestamp: i64,
    /// Branch the stash was created on.
    pub branch_name: String,
}

/// A stash with the files it changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StashDetails {
    pub index: usize,
    pub message: String,
    pub commit_hash: String,
    pub timestamp: i64,
    pub branch_name: String,
    pub files_changed: Vec<CommitFileChange>,
}

impl StashDetails {
    /// The list entry this detail view was built from.
    pub fn info(&self) -> StashInfo {
        StashInfo {
            index: self.index,
            message: self.message.clone(),
            commit_hash: self.commit_hash.clone(),
            timestamp: self.timestamp,
            branch_name: self.branch_name.clone(),
        }
    }
}
