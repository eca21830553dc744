//! The [`Engine`] trait: the request/response surface of the repository engine.

use async_trait::async_trait;
use yagg_types::{
    BranchInfo, CommitDetails, DiffHunk, FileDiff, FileStatuses, GraphCommit, RepositoryInfo,
    StashDetails, StashInfo, TagInfo,
};

use crate::error::EngineResult;

/// Repository engine.
///
/// Implementations hold the open repository; callers hold no handle beyond
/// the [`RepositoryInfo`] returned by [`Engine::open_repository`]. Every
/// method is a single round trip and may fail independently. Hunk and line
/// indices are positions within the diff most recently returned for the same
/// path and side; the engine does not remember which diff a caller saw.
#[async_trait]
pub trait Engine: Send + Sync {
    // ---- Repository ----

    /// Directory the engine process was launched from.
    async fn current_dir(&self) -> EngineResult<String>;

    async fn open_repository(&self, path: &str) -> EngineResult<RepositoryInfo>;

    async fn get_repository_info(&self) -> EngineResult<RepositoryInfo>;

    // ---- History ----

    /// Commits in display order, skipping `skip` rows and returning at most `limit`.
    async fn get_commit_graph(&self, skip: usize, limit: usize) -> EngineResult<Vec<GraphCommit>>;

    async fn get_commit_details(&self, hash: &str) -> EngineResult<CommitDetails>;

    async fn get_commit_file_diff(&self, hash: &str, path: &str) -> EngineResult<FileDiff>;

    // ---- Refs ----

    async fn list_branches(&self) -> EngineResult<Vec<BranchInfo>>;

    async fn list_tags(&self) -> EngineResult<Vec<TagInfo>>;

    async fn list_stashes(&self) -> EngineResult<Vec<StashInfo>>;

    async fn checkout_commit(&self, hash: &str) -> EngineResult<()>;

    async fn checkout_branch(&self, name: &str) -> EngineResult<()>;

    async fn delete_branch(&self, name: &str, is_remote: bool) -> EngineResult<()>;

    async fn delete_tag(&self, name: &str) -> EngineResult<()>;

    // ---- Working tree ----

    async fn get_file_statuses(&self) -> EngineResult<FileStatuses>;

    /// Diff of one file: HEAD→index when `staged`, index→worktree otherwise.
    /// `untracked` diffs the whole file content against nothing.
    async fn get_file_diff(&self, path: &str, staged: bool, untracked: bool)
        -> EngineResult<FileDiff>;

    async fn get_diff_hunk(
        &self,
        path: &str,
        staged: bool,
        hunk_index: usize,
        untracked: bool,
    ) -> EngineResult<DiffHunk>;

    async fn stage_file(&self, path: &str) -> EngineResult<()>;

    async fn unstage_file(&self, path: &str) -> EngineResult<()>;

    async fn stage_hunk(&self, path: &str, hunk_index: usize) -> EngineResult<()>;

    async fn unstage_hunk(&self, path: &str, hunk_index: usize) -> EngineResult<()>;

    async fn stage_lines(
        &self,
        path: &str,
        hunk_index: usize,
        line_indices: &[usize],
    ) -> EngineResult<()>;

    /// Discards the whole hunk, or only `line_indices` of it, from the worktree.
    async fn discard_hunk(
        &self,
        path: &str,
        hunk_index: usize,
        line_indices: Option<&[usize]>,
    ) -> EngineResult<()>;

    /// Commits the index and returns the new commit id.
    async fn create_commit(&self, message: &str) -> EngineResult<String>;

    async fn delete_file(&self, path: &str) -> EngineResult<()>;

    /// Restores `path` in index and worktree from HEAD.
    async fn revert_file(&self, path: &str) -> EngineResult<()>;

    /// Applies the inverse of a commit to the working tree without committing.
    async fn revert_commit(&self, hash: &str) -> EngineResult<()>;

    async fn revert_commit_file(&self, hash: &str, path: &str) -> EngineResult<()>;

    async fn revert_commit_file_lines(
        &self,
        hash: &str,
        path: &str,
        hunk_index: usize,
        line_indices: &[usize],
    ) -> EngineResult<()>;

    // ---- Stashes ----

    async fn get_stash_details(&self, index: usize) -> EngineResult<StashDetails>;

    async fn get_stash_file_diff(&self, index: usize, path: &str) -> EngineResult<FileDiff>;

    async fn apply_stash(&self, index: usize) -> EngineResult<()>;

    async fn drop_stash(&self, index: usize) -> EngineResult<()>;
}
