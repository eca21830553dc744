use serde::{Deserialize, Serialize};

/// A local or remote-tracking branch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchInfo {
    /// Short name (`main`, `origin/main`).
    pub name: String,
    pub is_remote: bool,
    /// True for the checked-out local branch.
    pub is_head: bool,
    pub target_hash: String,
}

/// A lightweight or annotated tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    pub name: String,
    /// Commit the tag resolves to.
    pub target_hash: String,
    pub is_annotated: bool,
    pub message: Option<String>,
}
