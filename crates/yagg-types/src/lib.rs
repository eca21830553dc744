//! Entity model for yagg.
//!
//! These are the records exchanged between the repository engine and the
//! client-side state store. Every type serializes to the engine's wire shape
//! (snake_case fields, lowercase enum tags) so the same definitions back both
//! sides of the request/response surface.
//!
//! # Key Types
//!
//! - [`RepositoryInfo`] -- the currently opened repository and its HEAD
//! - [`GraphCommit`] -- one row of the commit graph, with lane geometry
//! - [`FileStatuses`] -- staged / unstaged / untracked working-tree entries
//! - [`FileDiff`] / [`DiffHunk`] / [`DiffLine`] -- hunk and line level diffs
//! - [`HunkFingerprint`] -- content digest used to detect stale hunk addresses
//! - [`CommitDetails`], [`StashDetails`] -- detail views with changed files
//! - [`BranchInfo`], [`TagInfo`], [`StashInfo`] -- flat ref listings

pub mod commit;
pub mod diff;
pub mod error;
pub mod refs;
pub mod repository;
pub mod stash;
pub mod status;

pub use commit::{
    CommitDetails, CommitFileChange, CommitInfo, GraphCommit, GraphLine, GraphLineType, RefInfo,
    RefType,
};
pub use diff::{DiffHunk, DiffLine, FileDiff, HunkFingerprint, LineType};
pub use error::TypeError;
pub use refs::{BranchInfo, TagInfo};
pub use repository::RepositoryInfo;
pub use stash::{StashDetails, StashInfo};
pub use status::{FileStatus, FileStatusType, FileStatuses};
