//! Store errors and the operations they name.

use std::fmt;

use thiserror::Error;
use yagg_engine::EngineError;

/// A repository operation, as named in logs and error messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    CurrentDir,
    LoadRepositoryInfo,
    LoadCommits,
    LoadFileStatuses,
    LoadDiff,
    LoadRefs,
    LoadCommitDetails,
    LoadCommitFileDiff,
    LoadStashDetails,
    LoadStashFileDiff,
    FetchHunk,
    StageFile,
    UnstageFile,
    StageHunk,
    UnstageHunk,
    StageLines,
    DiscardHunk,
    DiscardLines,
    CreateCommit,
    CheckoutCommit,
    CheckoutBranch,
    DeleteBranch,
    DeleteTag,
    ApplyStash,
    DropStash,
    RevertCommit,
    RevertCommitFile,
    RevertCommitFileLines,
    DeleteFile,
    RevertFile,
}

impl Operation {
    /// Short verb phrase, e.g. "stage file".
    pub fn describe(self) -> &'static str {
        match self {
            Self::CurrentDir => "read working directory",
            Self::LoadRepositoryInfo => "load repository info",
            Self::LoadCommits => "load commits",
            Self::LoadFileStatuses => "load file statuses",
            Self::LoadDiff => "load diff",
            Self::LoadRefs => "load branches and tags",
            Self::LoadCommitDetails => "load commit details",
            Self::LoadCommitFileDiff => "load commit file diff",
            Self::LoadStashDetails => "load stash details",
            Self::LoadStashFileDiff => "load stash file diff",
            Self::FetchHunk => "load hunk",
            Self::StageFile => "stage file",
            Self::UnstageFile => "unstage file",
            Self::StageHunk => "stage hunk",
            Self::UnstageHunk => "unstage hunk",
            Self::StageLines => "stage lines",
            Self::DiscardHunk => "discard hunk",
            Self::DiscardLines => "discard lines",
            Self::CreateCommit => "create commit",
            Self::CheckoutCommit => "checkout commit",
            Self::CheckoutBranch => "checkout branch",
            Self::DeleteBranch => "delete branch",
            Self::DeleteTag => "delete tag",
            Self::ApplyStash => "apply stash",
            Self::DropStash => "drop stash",
            Self::RevertCommit => "revert commit",
            Self::RevertCommitFile => "revert file changes",
            Self::RevertCommitFileLines => "revert line changes",
            Self::DeleteFile => "delete file",
            Self::RevertFile => "revert file",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// A request the store refused before reaching the engine.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No repository open")]
    NoRepository,

    #[error("Commit message cannot be empty")]
    EmptyCommitMessage,

    #[error("Hunk {index} does not exist in the diff of {path} ({count} hunks)")]
    HunkOutOfRange {
        path: String,
        index: usize,
        count: usize,
    },

    #[error("The diff of {path} changed since it was displayed; reload it and try again")]
    StaleHunk { path: String, index: usize },

    #[error("Hunk {index} of {path} is {}", side_label(.staged))]
    WrongSide {
        path: String,
        index: usize,
        staged: bool,
    },

    #[error("No lines selected")]
    EmptySelection,

    #[error("Line {index} is outside the hunk ({len} lines)")]
    LineOutOfRange { index: usize, len: usize },

    #[error("The selection contains no added or removed lines")]
    NoChangedLines,
}

/// Every failure a store operation can report.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: EngineError,
    },

    #[error("failed to {op}: {source}")]
    Operation {
        op: Operation,
        #[source]
        source: EngineError,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl StoreError {
    pub(crate) fn operation(op: Operation, source: EngineError) -> Self {
        Self::Operation { op, source }
    }

    /// Message shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Open { source, .. } => clean_engine_message(&source.to_string()),
            Self::Operation { op, source } => {
                format!("Failed to {op}: {}", clean_engine_message(&source.to_string()))
            }
            Self::Validation(err) => err.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

fn side_label(staged: &bool) -> &'static str {
    if *staged {
        "staged"
    } else {
        "not staged"
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors loading a [`StoreConfig`](crate::StoreConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

const ENVELOPE_PREFIXES: [&str; 3] = ["Error:", "Git error:", "IO error:"];
const NOT_A_REPOSITORY: &str = "could not find repository at '";
const INVALID_PATH: &str = "Invalid path: ";

/// Strips engine envelope noise from a raw error string.
///
/// Removes `Error:`, `Git error:` and `IO error:` prefixes and the
/// `; class=…; code=…` tail, and turns the two path errors into short
/// user-facing sentences.
pub fn clean_engine_message(raw: &str) -> String {
    let mut msg = raw.trim();
    for prefix in ENVELOPE_PREFIXES {
        if let Some(rest) = msg.strip_prefix(prefix) {
            msg = rest.trim_start();
        }
    }
    if let Some(at) = msg.find("; class=") {
        msg = &msg[..at];
    }
    let msg = msg.trim();

    if let Some(at) = msg.find(NOT_A_REPOSITORY) {
        let rest = &msg[at + NOT_A_REPOSITORY.len()..];
        let path = rest.split('\'').next().unwrap_or(rest);
        return format!("Not a git repository: {path}");
    }
    if let Some(path) = msg.strip_prefix(INVALID_PATH) {
        return format!("Path not found: {path}");
    }
    if msg.is_empty() {
        return "Unknown error".to_string();
    }
    msg.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_git_envelope() {
        let raw = "Git error: reference 'refs/tags/v1' not found; class=Reference (4); code=NotFound (-3)";
        assert_eq!(clean_engine_message(raw), "reference 'refs/tags/v1' not found");
    }

    #[test]
    fn rewrites_missing_repository() {
        let err = EngineError::Git(
            "could not find repository at '/tmp/x'; class=Repository (6); code=NotFound (-3)".into(),
        );
        assert_eq!(
            clean_engine_message(&err.to_string()),
            "Not a git repository: /tmp/x"
        );
    }

    #[test]
    fn rewrites_invalid_path() {
        let err = EngineError::InvalidPath("/nope".into());
        assert_eq!(clean_engine_message(&err.to_string()), "Path not found: /nope");
    }

    #[test]
    fn strips_nested_prefixes() {
        assert_eq!(clean_engine_message("Error: IO error: disk full"), "disk full");
        assert_eq!(clean_engine_message("   "), "Unknown error");
    }

    #[test]
    fn user_messages_per_category() {
        let open = StoreError::Open {
            path: "/tmp/x".into(),
            source: EngineError::Git("could not find repository at '/tmp/x'".into()),
        };
        assert_eq!(open.user_message(), "Not a git repository: /tmp/x");

        let op = StoreError::operation(
            Operation::DeleteBranch,
            EngineError::Git("Cannot delete the currently checked out branch".into()),
        );
        assert_eq!(
            op.user_message(),
            "Failed to delete branch: Cannot delete the currently checked out branch"
        );

        let validation = StoreError::from(ValidationError::WrongSide {
            path: "f.rs".into(),
            index: 0,
            staged: true,
        });
        assert!(validation.is_validation());
        assert_eq!(validation.user_message(), "Hunk 0 of f.rs is staged");
    }
}
