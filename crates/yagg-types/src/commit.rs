//! Commit history records.
//!
//! A [`GraphCommit`] is one row of the history view: the commit itself plus
//! the lane geometry the engine pre-computed for it. Rows are immutable once
//! fetched.

use serde::{Deserialize, Serialize};

use crate::status::FileStatusType;

/// Core commit metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub hash: String,
    pub short_hash: String,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    pub parent_hashes: Vec<String>,
}

impl CommitInfo {
    /// First line of the message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Returns `true` for merge commits.
    pub fn is_merge(&self) -> bool {
        self.parent_hashes.len() > 1
    }
}

/// One history row with graph geometry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphCommit {
    #[serde(flatten)]
    pub commit: CommitInfo,
    /// Lane index the commit node is drawn in.
    pub column: usize,
    /// Segments connecting this row to neighbouring lanes.
    pub lines: Vec<GraphLine>,
    /// Branches and tags pointing at this commit.
    pub refs: Vec<RefInfo>,
    /// True if this is the tip of its branch (first commit in its column).
    pub is_tip: bool,
}

impl GraphCommit {
    pub fn hash(&self) -> &str {
        &self.commit.hash
    }
}

/// A line segment in the commit graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphLine {
    pub from_column: usize,
    pub to_column: usize,
    pub is_merge: bool,
    pub line_type: GraphLineType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphLineType {
    /// From this commit down to its parent.
    ToParent,
    /// From the previous row into this node.
    FromAbove,
    /// Lane is active but carries no commit in this row.
    PassThrough,
}

/// A ref decorating a commit row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefInfo {
    pub name: String,
    pub ref_type: RefType,
    pub is_head: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefType {
    Branch,
    RemoteBranch,
    Tag,
}

/// A file touched by a commit or stash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitFileChange {
    pub path: String,
    pub status: FileStatusType,
    /// Source path for renames and copies.
    pub old_path: Option<String>,
}

/// Full metadata for the selected commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDetails {
    pub hash: String,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub committer_name: String,
    pub committer_email: String,
    pub timestamp: i64,
    pub parent_hashes: Vec<String>,
    pub files_changed: Vec<CommitFileChange>,
}

impl CommitDetails {
    /// Returns `true` if `path` is among the changed files.
    pub fn touches(&self, path: &str) -> bool {
        self.files_changed.iter().any(|f| f.path == path)
    }
}
