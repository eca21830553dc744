//! In-memory engine for tests and demos.
//!
//! [`InMemoryEngine`] serves any number of [`MemoryRepo`]s keyed by path. It
//! records every call it receives, can be told to fail the next call to an
//! operation, and can hold an operation at a gate until released, so callers
//! can observe what happens while a request is in flight.

mod repo;
mod text;

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::debug;
use yagg_types::{
    BranchInfo, CommitDetails, DiffHunk, FileDiff, FileStatuses, GraphCommit, RepositoryInfo,
    StashDetails, StashInfo, TagInfo,
};

pub use repo::MemoryRepo;

use crate::error::{EngineError, EngineResult};
use crate::traits::Engine;

/// One recorded engine call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineCall {
    pub op: &'static str,
    pub args: String,
}

#[derive(Debug, Default)]
struct Inner {
    repos: HashMap<String, MemoryRepo>,
    current: Option<String>,
}

/// An [`Engine`] backed by in-memory repositories.
#[derive(Debug)]
pub struct InMemoryEngine {
    cwd: String,
    inner: RwLock<Inner>,
    calls: RwLock<Vec<EngineCall>>,
    failures: RwLock<HashMap<&'static str, VecDeque<EngineError>>>,
    holds: RwLock<HashMap<&'static str, Arc<Semaphore>>>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::with_cwd("/")
    }

    /// An engine reporting `cwd` from [`Engine::current_dir`].
    pub fn with_cwd(cwd: impl Into<String>) -> Self {
        Self {
            cwd: cwd.into(),
            inner: RwLock::new(Inner::default()),
            calls: RwLock::new(Vec::new()),
            failures: RwLock::new(HashMap::new()),
            holds: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a repository under its path. Replaces any previous one.
    pub fn add_repo(&self, repo: MemoryRepo) {
        if let Ok(mut inner) = self.inner.write() {
            inner.repos.insert(repo.path().to_string(), repo);
        }
    }

    /// Mutates the open repository outside of any engine call, as another
    /// process editing the working tree would.
    pub fn with_open_repo<R>(&self, f: impl FnOnce(&mut MemoryRepo) -> R) -> Option<R> {
        let mut inner = self.inner.write().ok()?;
        let path = inner.current.clone()?;
        inner.repos.get_mut(&path).map(f)
    }

    /// Makes the next call to `op` fail with `err`. Queues if called repeatedly.
    pub fn fail_next(&self, op: &'static str, err: EngineError) {
        if let Ok(mut failures) = self.failures.write() {
            failures.entry(op).or_default().push_back(err);
        }
    }

    /// Holds every subsequent call to `op` until [`release`](Self::release)d.
    pub fn hold(&self, op: &'static str) {
        if let Ok(mut holds) = self.holds.write() {
            holds.entry(op).or_insert_with(|| Arc::new(Semaphore::new(0)));
        }
    }

    /// Lets one held call to `op` proceed.
    pub fn release(&self, op: &'static str) {
        if let Some(gate) = self.gate(op) {
            gate.add_permits(1);
        }
    }

    /// Stops holding `op` and lets every waiting call through.
    pub fn unhold(&self, op: &'static str) {
        let gate = self.holds.write().ok().and_then(|mut holds| holds.remove(op));
        if let Some(gate) = gate {
            gate.close();
        }
    }

    /// All calls received so far, in arrival order.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.read().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn calls_to(&self, op: &str) -> Vec<EngineCall> {
        self.calls().into_iter().filter(|c| c.op == op).collect()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.calls_to(op).len()
    }

    pub fn clear_calls(&self) {
        if let Ok(mut calls) = self.calls.write() {
            calls.clear();
        }
    }

    fn gate(&self, op: &str) -> Option<Arc<Semaphore>> {
        self.holds.read().ok().and_then(|holds| holds.get(op).cloned())
    }

    /// Records the call, waits at its gate and returns any injected failure.
    async fn enter(&self, op: &'static str, args: String) -> EngineResult<()> {
        debug!(op, %args, "engine call");
        self.calls
            .write()
            .map_err(poisoned)?
            .push(EngineCall { op, args });

        if let Some(gate) = self.gate(op) {
            // A closed gate means the hold was lifted.
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let injected = self
            .failures
            .write()
            .map_err(poisoned)?
            .get_mut(op)
            .and_then(VecDeque::pop_front);
        match injected {
            Some(err) => {
                debug!(op, error = %err, "injected failure");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&MemoryRepo) -> EngineResult<T>) -> EngineResult<T> {
        let inner = self.inner.read().map_err(poisoned)?;
        let repo = inner
            .current
            .as_ref()
            .and_then(|path| inner.repos.get(path))
            .ok_or(EngineError::NoRepository)?;
        f(repo)
    }

    fn write<T>(&self, f: impl FnOnce(&mut MemoryRepo) -> EngineResult<T>) -> EngineResult<T> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        let path = inner.current.clone().ok_or(EngineError::NoRepository)?;
        let repo = inner
            .repos
            .get_mut(&path)
            .ok_or(EngineError::NoRepository)?;
        f(repo)
    }
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(e: PoisonError<T>) -> EngineError {
    EngineError::Transport(format!("lock poisoned: {e}"))
}

#[async_trait]
impl Engine for InMemoryEngine {
    async fn current_dir(&self) -> EngineResult<String> {
        self.enter("current_dir", String::new()).await?;
        Ok(self.cwd.clone())
    }

    async fn open_repository(&self, path: &str) -> EngineResult<RepositoryInfo> {
        self.enter("open_repository", path.to_string()).await?;
        let mut inner = self.inner.write().map_err(poisoned)?;
        let info = inner.repos.get(path).map(MemoryRepo::info).ok_or_else(|| {
            EngineError::Git(format!(
                "could not find repository at '{path}'; class=Repository (6); code=NotFound (-3)"
            ))
        })?;
        inner.current = Some(path.to_string());
        Ok(info)
    }

    async fn get_repository_info(&self) -> EngineResult<RepositoryInfo> {
        self.enter("get_repository_info", String::new()).await?;
        self.read(|repo| Ok(repo.info()))
    }

    async fn get_commit_graph(&self, skip: usize, limit: usize) -> EngineResult<Vec<GraphCommit>> {
        self.enter("get_commit_graph", format!("{skip},{limit}")).await?;
        self.read(|repo| Ok(repo.commit_page(skip, limit)))
    }

    async fn get_commit_details(&self, hash: &str) -> EngineResult<CommitDetails> {
        self.enter("get_commit_details", hash.to_string()).await?;
        self.read(|repo| repo.commit_details(hash))
    }

    async fn get_commit_file_diff(&self, hash: &str, path: &str) -> EngineResult<FileDiff> {
        self.enter("get_commit_file_diff", format!("{hash},{path}")).await?;
        self.read(|repo| repo.commit_file_diff(hash, path))
    }

    async fn list_branches(&self) -> EngineResult<Vec<BranchInfo>> {
        self.enter("list_branches", String::new()).await?;
        self.read(|repo| Ok(repo.branches()))
    }

    async fn list_tags(&self) -> EngineResult<Vec<TagInfo>> {
        self.enter("list_tags", String::new()).await?;
        self.read(|repo| Ok(repo.tags()))
    }

    async fn list_stashes(&self) -> EngineResult<Vec<StashInfo>> {
        self.enter("list_stashes", String::new()).await?;
        self.read(|repo| Ok(repo.stashes()))
    }

    async fn checkout_commit(&self, hash: &str) -> EngineResult<()> {
        self.enter("checkout_commit", hash.to_string()).await?;
        self.write(|repo| repo.checkout_commit(hash))
    }

    async fn checkout_branch(&self, name: &str) -> EngineResult<()> {
        self.enter("checkout_branch", name.to_string()).await?;
        self.write(|repo| repo.checkout_branch(name))
    }

    async fn delete_branch(&self, name: &str, is_remote: bool) -> EngineResult<()> {
        self.enter("delete_branch", format!("{name},{is_remote}")).await?;
        self.write(|repo| repo.delete_branch(name, is_remote))
    }

    async fn delete_tag(&self, name: &str) -> EngineResult<()> {
        self.enter("delete_tag", name.to_string()).await?;
        self.write(|repo| repo.delete_tag(name))
    }

    async fn get_file_statuses(&self) -> EngineResult<FileStatuses> {
        self.enter("get_file_statuses", String::new()).await?;
        self.read(|repo| Ok(repo.statuses()))
    }

    async fn get_file_diff(
        &self,
        path: &str,
        staged: bool,
        untracked: bool,
    ) -> EngineResult<FileDiff> {
        self.enter("get_file_diff", format!("{path},{staged},{untracked}"))
            .await?;
        self.read(|repo| Ok(repo.file_diff(path, staged, untracked)))
    }

    async fn get_diff_hunk(
        &self,
        path: &str,
        staged: bool,
        hunk_index: usize,
        untracked: bool,
    ) -> EngineResult<DiffHunk> {
        self.enter(
            "get_diff_hunk",
            format!("{path},{staged},{hunk_index},{untracked}"),
        )
        .await?;
        self.read(|repo| repo.diff_hunk(path, staged, hunk_index, untracked))
    }

    async fn stage_file(&self, path: &str) -> EngineResult<()> {
        self.enter("stage_file", path.to_string()).await?;
        self.write(|repo| repo.stage_file(path))
    }

    async fn unstage_file(&self, path: &str) -> EngineResult<()> {
        self.enter("unstage_file", path.to_string()).await?;
        self.write(|repo| repo.unstage_file(path))
    }

    async fn stage_hunk(&self, path: &str, hunk_index: usize) -> EngineResult<()> {
        self.enter("stage_hunk", format!("{path},{hunk_index}")).await?;
        self.write(|repo| repo.stage_hunk(path, hunk_index, None))
    }

    async fn unstage_hunk(&self, path: &str, hunk_index: usize) -> EngineResult<()> {
        self.enter("unstage_hunk", format!("{path},{hunk_index}")).await?;
        self.write(|repo| repo.unstage_hunk(path, hunk_index))
    }

    async fn stage_lines(
        &self,
        path: &str,
        hunk_index: usize,
        line_indices: &[usize],
    ) -> EngineResult<()> {
        self.enter("stage_lines", format!("{path},{hunk_index},{line_indices:?}"))
            .await?;
        self.write(|repo| repo.stage_hunk(path, hunk_index, Some(line_indices)))
    }

    async fn discard_hunk(
        &self,
        path: &str,
        hunk_index: usize,
        line_indices: Option<&[usize]>,
    ) -> EngineResult<()> {
        self.enter("discard_hunk", format!("{path},{hunk_index},{line_indices:?}"))
            .await?;
        self.write(|repo| repo.discard_hunk(path, hunk_index, line_indices))
    }

    async fn create_commit(&self, message: &str) -> EngineResult<String> {
        self.enter("create_commit", message.to_string()).await?;
        self.write(|repo| repo.create_commit(message))
    }

    async fn delete_file(&self, path: &str) -> EngineResult<()> {
        self.enter("delete_file", path.to_string()).await?;
        self.write(|repo| repo.delete_file(path))
    }

    async fn revert_file(&self, path: &str) -> EngineResult<()> {
        self.enter("revert_file", path.to_string()).await?;
        self.write(|repo| repo.revert_file(path))
    }

    async fn revert_commit(&self, hash: &str) -> EngineResult<()> {
        self.enter("revert_commit", hash.to_string()).await?;
        self.read(|repo| repo.revert_commit(hash))
    }

    async fn revert_commit_file(&self, hash: &str, path: &str) -> EngineResult<()> {
        self.enter("revert_commit_file", format!("{hash},{path}")).await?;
        self.read(|repo| repo.revert_commit_file(hash, path))
    }

    async fn revert_commit_file_lines(
        &self,
        hash: &str,
        path: &str,
        hunk_index: usize,
        line_indices: &[usize],
    ) -> EngineResult<()> {
        self.enter(
            "revert_commit_file_lines",
            format!("{hash},{path},{hunk_index},{line_indices:?}"),
        )
        .await?;
        self.read(|repo| repo.revert_commit_file_lines(hash, path, hunk_index, line_indices))
    }

    async fn get_stash_details(&self, index: usize) -> EngineResult<StashDetails> {
        self.enter("get_stash_details", index.to_string()).await?;
        self.read(|repo| repo.stash_details(index))
    }

    async fn get_stash_file_diff(&self, index: usize, path: &str) -> EngineResult<FileDiff> {
        self.enter("get_stash_file_diff", format!("{index},{path}")).await?;
        self.read(|repo| repo.stash_file_diff(index, path))
    }

    async fn apply_stash(&self, index: usize) -> EngineResult<()> {
        self.enter("apply_stash", index.to_string()).await?;
        self.write(|repo| repo.apply_stash(index))
    }

    async fn drop_stash(&self, index: usize) -> EngineResult<()> {
        self.enter("drop_stash", index.to_string()).await?;
        self.write(|repo| repo.drop_stash(index))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn engine() -> InMemoryEngine {
        let engine = InMemoryEngine::with_cwd("/work");
        engine.add_repo(MemoryRepo::new("/repo").with_commits(5));
        engine
    }

    #[tokio::test]
    async fn calls_before_open_report_no_repository() {
        let engine = engine();
        let err = engine.get_file_statuses().await.unwrap_err();
        assert_eq!(err, EngineError::NoRepository);
    }

    #[tokio::test]
    async fn open_unknown_path_uses_git_envelope() {
        let engine = engine();
        let err = engine.open_repository("/nowhere").await.unwrap_err();
        assert!(err.to_string().contains("could not find repository at '/nowhere'"));
    }

    #[tokio::test]
    async fn graph_pages_respect_skip_and_limit() {
        let engine = engine();
        engine.open_repository("/repo").await.unwrap();
        let page = engine.get_commit_graph(3, 10).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(engine.calls_to("get_commit_graph")[0].args, "3,10");
    }

    #[tokio::test]
    async fn injected_failures_are_consumed_once() {
        let engine = engine();
        engine.open_repository("/repo").await.unwrap();
        engine.fail_next("list_tags", EngineError::Io("disk".into()));
        assert!(engine.list_tags().await.is_err());
        assert!(engine.list_tags().await.is_ok());
        assert_eq!(engine.call_count("list_tags"), 2);
    }

    #[tokio::test]
    async fn held_calls_wait_for_release() {
        let engine = engine();
        engine.open_repository("/repo").await.unwrap();
        engine.hold("list_branches");

        let waiting = tokio::time::timeout(Duration::from_millis(20), engine.list_branches()).await;
        assert!(waiting.is_err());

        engine.release("list_branches");
        assert!(engine.list_branches().await.is_ok());

        engine.unhold("list_branches");
        assert!(engine.list_branches().await.is_ok());
    }

    #[tokio::test]
    async fn current_dir_reports_launch_directory() {
        assert_eq!(engine().current_dir().await.unwrap(), "/work");
    }
}
