//! The repository store: session lifecycle and view loaders.
//!
//! Loaders are no-ops without an open repository. Each one captures a ticket
//! before its engine call and applies the response only if that ticket is
//! still current, so switching repositories or views never lets a late
//! response overwrite newer state.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, warn};
use yagg_engine::{Engine, EngineError};
use yagg_surface::{ActivityLog, Confirmer, Notifier};
use yagg_types::{DiffHunk, FileStatuses, GraphCommit, RepositoryInfo};

use crate::config::StoreConfig;
use crate::error::{Operation, StoreError, StoreResult, ValidationError};
use crate::outcome::Outcome;
use crate::protocol::HunkAddress;
use crate::state::{
    CommitView, DetailView, DiffView, LoadingFlags, StashView, StoreSnapshot, StoreState, Ticket,
    View,
};

/// Single source of truth for repository-derived state.
///
/// Share it as `Arc<RepoStore>`; every method takes `&self`.
pub struct RepoStore {
    pub(crate) engine: Arc<dyn Engine>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) confirmer: Arc<dyn Confirmer>,
    pub(crate) activity: Arc<dyn ActivityLog>,
    config: StoreConfig,
    state: RwLock<StoreState>,
}

/// Result of toggling a file in a commit or stash detail view.
enum Toggle<K> {
    Collapsed,
    Expanded,
    Fetch(K, Ticket),
}

fn toggle_step<D, K>(view: &mut DetailView<D>, path: &str, key: K, ticket: Ticket) -> Toggle<K> {
    if view.expanded.remove(path) {
        Toggle::Collapsed
    } else if view.file_diffs.contains_key(path) {
        view.expanded.insert(path.to_string());
        Toggle::Expanded
    } else {
        Toggle::Fetch(key, ticket)
    }
}

fn settled<T>(applied: bool, value: T) -> Outcome<T> {
    if applied {
        Outcome::Done(value)
    } else {
        Outcome::Skipped
    }
}

/// An engine failure that still belongs to the current request, or nothing.
fn failed_if<T>(current: bool, op: Operation, source: EngineError) -> StoreResult<Option<T>> {
    if current {
        Err(StoreError::operation(op, source))
    } else {
        Ok(None)
    }
}

impl RepoStore {
    pub fn new(
        engine: Arc<dyn Engine>,
        notifier: Arc<dyn Notifier>,
        confirmer: Arc<dyn Confirmer>,
        config: StoreConfig,
    ) -> Self {
        Self {
            engine,
            notifier,
            confirmer,
            activity: config.activity_log(),
            state: RwLock::new(StoreState::new(config.page_size)),
            config,
        }
    }

    /// Replaces the activity log built from the config.
    pub fn with_activity_log(mut self, activity: Arc<dyn ActivityLog>) -> Self {
        self.activity = activity;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ---- Readers ----

    pub fn snapshot(&self) -> StoreSnapshot {
        self.read(StoreState::snapshot)
    }

    pub fn repository(&self) -> Option<RepositoryInfo> {
        self.read(|s| s.repository.clone())
    }

    pub fn loading(&self) -> LoadingFlags {
        self.read(StoreState::flags)
    }

    pub fn commits(&self) -> Arc<Vec<GraphCommit>> {
        self.read(|s| s.pager.commits())
    }

    pub fn has_more_commits(&self) -> bool {
        self.read(|s| s.pager.has_more())
    }

    pub fn file_statuses(&self) -> FileStatuses {
        self.read(|s| s.statuses.clone())
    }

    pub fn diff(&self) -> Option<DiffView> {
        self.read(|s| s.diff.clone())
    }

    pub fn commit_details(&self) -> Option<CommitView> {
        self.read(|s| s.commit.clone())
    }

    pub fn stash_details(&self) -> Option<StashView> {
        self.read(|s| s.stash.clone())
    }

    /// Row the history view should scroll to, if one was requested since the
    /// last call.
    pub fn take_scroll_request(&self) -> Option<usize> {
        self.update(|s| s.pending_scroll.take())
    }

    // Writers only replace whole fields, so a poisoned lock still holds
    // consistent state.
    pub(crate) fn read<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    /// Shows `err` to the user. Every failure passes through here once.
    pub(crate) fn report(&self, err: &StoreError) {
        warn!(error = %err, "store operation failed");
        self.notifier.show_error(&err.user_message());
    }

    /// Reports `err` once and wraps it.
    pub(crate) fn fail<T>(&self, err: StoreError) -> Outcome<T> {
        self.report(&err);
        Outcome::Failed(err)
    }

    pub(crate) fn engine_failed<T>(&self, op: Operation, source: EngineError) -> Outcome<T> {
        self.fail(StoreError::operation(op, source))
    }

    /// Turns an internal fetch into an outcome, reporting a failure.
    fn settle<T>(&self, fetched: StoreResult<Option<T>>) -> Outcome<T> {
        match fetched {
            Ok(Some(value)) => Outcome::Done(value),
            Ok(None) => Outcome::Skipped,
            Err(err) => self.fail(err),
        }
    }

    // ---- Session ----

    /// Opens `path`, replacing the current repository on success.
    ///
    /// On failure the previous repository and everything loaded for it stay
    /// as they were. If the first page or the statuses cannot be loaded the
    /// repository stays open and a single error is shown.
    pub async fn open(&self, path: &str) -> Outcome<RepositoryInfo> {
        let ticket = self.update(|s| s.begin(View::Open));
        info!(path, "opening repository");
        let result = self.engine.open_repository(path).await;

        let current = self.update(|s| {
            if !s.finish(View::Open, ticket) {
                return false;
            }
            if let Ok(repository) = &result {
                s.start_session(Some(repository.clone()));
            }
            true
        });
        if !current {
            debug!(path, "open superseded by a newer request");
            return Outcome::Skipped;
        }

        match result {
            Ok(repository) => {
                info!(path, head = ?repository.head_hash, "repository opened");
                let (page, statuses) = tokio::join!(self.fetch_page(), self.fetch_statuses());
                if let Err(err) = page.and(statuses).map(drop) {
                    self.report(&err);
                }
                Outcome::Done(repository)
            }
            Err(source) => self.fail(StoreError::Open {
                path: path.to_string(),
                source,
            }),
        }
    }

    /// Opens the directory the engine was launched from.
    pub async fn open_current_dir(&self) -> Outcome<RepositoryInfo> {
        match self.engine.current_dir().await {
            Ok(dir) => self.open(&dir).await,
            Err(source) => self.engine_failed(Operation::CurrentDir, source),
        }
    }

    /// Forgets the open repository. Outstanding responses are discarded.
    pub fn close(&self) {
        self.update(|s| s.start_session(None));
        info!("repository closed");
    }

    /// Reloads HEAD, the first history page, file statuses and the open diff.
    ///
    /// The loaded history stays visible until the new first page replaces
    /// it. Any failing part fails the whole refresh with one error.
    pub async fn refresh(&self) -> Outcome<()> {
        let reopen = self.update(|s| {
            s.repository.as_ref()?;
            s.pager.restart();
            Some(
                s.diff
                    .as_ref()
                    .map(|d| (d.path.clone(), d.staged, d.untracked)),
            )
        });
        let Some(reopen) = reopen else {
            return Outcome::Skipped;
        };
        debug!("refreshing repository state");

        let diff = async {
            match &reopen {
                Some((path, staged, untracked)) => {
                    self.fetch_diff(path, *staged, *untracked).await.map(drop)
                }
                None => Ok(()),
            }
        };
        let (info, page, statuses, diff) = tokio::join!(
            self.fetch_repository_info(),
            self.fetch_page(),
            self.fetch_statuses(),
            diff
        );
        match info.map(drop).and(page.map(drop)).and(statuses.map(drop)).and(diff) {
            Ok(()) => Outcome::Done(()),
            Err(err) => self.fail(err),
        }
    }

    async fn fetch_repository_info(&self) -> StoreResult<Option<()>> {
        let Some(session) = self.read(|s| s.repository.as_ref().map(|_| s.session)) else {
            return Ok(None);
        };
        match self.engine.get_repository_info().await {
            Ok(repository) => Ok(self
                .update(|s| {
                    if s.session != session {
                        return false;
                    }
                    s.repository = Some(repository);
                    true
                })
                .then_some(())),
            Err(source) => failed_if(
                self.read(|s| s.session == session),
                Operation::LoadRepositoryInfo,
                source,
            ),
        }
    }

    /// Restarts the history from offset 0 and reloads HEAD.
    pub(crate) async fn reload_history(&self) -> StoreResult<()> {
        let open = self.update(|s| {
            if s.repository.is_none() {
                return false;
            }
            s.pager.restart();
            true
        });
        if !open {
            return Ok(());
        }
        let (info, page) = tokio::join!(self.fetch_repository_info(), self.fetch_page());
        info.map(drop).and(page.map(drop))
    }

    // ---- History ----

    /// Fetches the next history page. Returns the number of commits appended.
    pub async fn load_more(&self) -> Outcome<usize> {
        let fetched = self.fetch_page().await;
        self.settle(fetched)
    }

    async fn fetch_page(&self) -> StoreResult<Option<usize>> {
        let claim = self.update(|s| {
            s.repository.as_ref()?;
            s.pager.begin_load().map(|request| (s.session, request))
        });
        let Some((session, request)) = claim else {
            return Ok(None);
        };
        debug!(skip = request.skip, limit = request.limit, "loading commit page");

        match self.engine.get_commit_graph(request.skip, request.limit).await {
            Ok(page) => {
                let count = page.len();
                Ok(self
                    .update(|s| s.session == session && s.pager.complete(request, page))
                    .then_some(count))
            }
            Err(source) => failed_if(
                self.update(|s| s.session == session && s.pager.fail(request)),
                Operation::LoadCommits,
                source,
            ),
        }
    }

    /// Asks the history view to scroll to `hash` and loads its details.
    ///
    /// Commits outside the loaded window are not fetched; the call is skipped.
    pub async fn scroll_to_commit(&self, hash: &str) -> Outcome<usize> {
        let row = self.update(|s| {
            let row = s.pager.position(hash)?;
            s.pending_scroll = Some(row);
            Some(row)
        });
        let Some(row) = row else {
            debug!(hash, "commit not in the loaded window");
            return Outcome::Skipped;
        };
        match self.load_commit_details(hash).await {
            Outcome::Failed(err) => Outcome::Failed(err),
            _ => Outcome::Done(row),
        }
    }

    // ---- Working tree ----

    pub async fn load_file_statuses(&self) -> Outcome<()> {
        let fetched = self.fetch_statuses().await;
        self.settle(fetched)
    }

    pub(crate) async fn fetch_statuses(&self) -> StoreResult<Option<()>> {
        let Some(session) = self.update(|s| s.repository.is_some().then(|| s.begin_statuses()))
        else {
            return Ok(None);
        };
        match self.engine.get_file_statuses().await {
            Ok(statuses) => Ok(self
                .update(|s| s.finish_statuses(session, Some(statuses)))
                .then_some(())),
            Err(source) => failed_if(
                self.update(|s| s.finish_statuses(session, None)),
                Operation::LoadFileStatuses,
                source,
            ),
        }
    }

    /// Shows the diff of `path`, HEAD→index when `staged`, index→worktree
    /// otherwise. Clears the commit and stash detail views.
    pub async fn load_file_diff(&self, path: &str, staged: bool) -> Outcome<()> {
        let fetched = self.fetch_diff(path, staged, false).await;
        self.settle(fetched)
    }

    /// Shows the full content of an untracked file as additions.
    pub async fn load_untracked_diff(&self, path: &str) -> Outcome<()> {
        let fetched = self.fetch_diff(path, false, true).await;
        self.settle(fetched)
    }

    pub(crate) async fn fetch_diff(
        &self,
        path: &str,
        staged: bool,
        untracked: bool,
    ) -> StoreResult<Option<()>> {
        let Some(ticket) = self.update(|s| s.repository.is_some().then(|| s.begin(View::Diff)))
        else {
            return Ok(None);
        };
        debug!(path, staged, untracked, "loading diff");

        match self.engine.get_file_diff(path, staged, untracked).await {
            Ok(diff) => Ok(self
                .update(|s| {
                    if !s.finish(View::Diff, ticket) {
                        return false;
                    }
                    s.clear_commit();
                    s.clear_stash();
                    s.diff = Some(DiffView {
                        path: path.to_string(),
                        staged,
                        untracked,
                        diff,
                    });
                    true
                })
                .then_some(())),
            Err(source) => failed_if(
                self.update(|s| s.finish(View::Diff, ticket)),
                Operation::LoadDiff,
                source,
            ),
        }
    }

    pub fn clear_diff(&self) {
        self.update(StoreState::clear_diff);
    }

    /// Re-reads one hunk without replacing the displayed diff.
    ///
    /// Fails validation if `address` carries a fingerprint that no longer
    /// matches the hunk at that position.
    pub async fn fetch_hunk(&self, address: &HunkAddress) -> Outcome<DiffHunk> {
        let untracked = self.read(|s| {
            s.repository.as_ref()?;
            Some(
                s.diff
                    .as_ref()
                    .is_some_and(|d| d.shows(&address.path) && d.untracked),
            )
        });
        let Some(untracked) = untracked else {
            return Outcome::Skipped;
        };

        let result = self
            .engine
            .get_diff_hunk(&address.path, address.staged, address.hunk_index, untracked)
            .await;
        match result {
            Ok(hunk) => match address.fingerprint {
                Some(expected) if expected != hunk.fingerprint() => {
                    self.fail(StoreError::from(ValidationError::StaleHunk {
                        path: address.path.clone(),
                        index: address.hunk_index,
                    }))
                }
                _ => Outcome::Done(hunk),
            },
            Err(source) => self.engine_failed(Operation::FetchHunk, source),
        }
    }

    // ---- Refs ----

    /// Reloads branches, tags and stashes as one unit.
    pub async fn load_branches_and_tags(&self) -> Outcome<()> {
        let fetched = self.fetch_refs().await;
        self.settle(fetched)
    }

    pub(crate) async fn fetch_refs(&self) -> StoreResult<Option<()>> {
        let Some(session) = self.update(|s| s.repository.is_some().then(|| s.begin_refs())) else {
            return Ok(None);
        };
        let (branches, tags, stashes) = tokio::join!(
            self.engine.list_branches(),
            self.engine.list_tags(),
            self.engine.list_stashes()
        );
        match (branches, tags, stashes) {
            (Ok(branches), Ok(tags), Ok(stashes)) => Ok(self
                .update(|s| s.finish_refs(session, Some((branches, tags, stashes))))
                .then_some(())),
            (Err(source), _, _) | (_, Err(source), _) | (_, _, Err(source)) => failed_if(
                self.update(|s| s.finish_refs(session, None)),
                Operation::LoadRefs,
                source,
            ),
        }
    }

    // ---- Commit details ----

    /// Selects `hash`, replacing any previous commit and its expanded files.
    /// Clears the diff and stash detail views.
    pub async fn load_commit_details(&self, hash: &str) -> Outcome<()> {
        let Some(ticket) = self.update(|s| s.repository.is_some().then(|| s.begin(View::Commit)))
        else {
            return Outcome::Skipped;
        };
        debug!(hash, "loading commit details");

        match self.engine.get_commit_details(hash).await {
            Ok(details) => settled(
                self.update(|s| {
                    if !s.finish(View::Commit, ticket) {
                        return false;
                    }
                    s.clear_diff();
                    s.clear_stash();
                    s.commit = Some(DetailView::new(details));
                    true
                }),
                (),
            ),
            Err(source) => {
                if self.update(|s| s.finish(View::Commit, ticket)) {
                    self.engine_failed(Operation::LoadCommitDetails, source)
                } else {
                    Outcome::Skipped
                }
            }
        }
    }

    /// Expands or collapses `path` in the selected commit. Returns whether it
    /// is now expanded. The file's diff is fetched once and cached.
    pub async fn toggle_commit_file(&self, path: &str) -> Outcome<bool> {
        let step = self.update(|s| {
            let ticket = s.ticket(View::Commit);
            let view = s.commit.as_mut()?;
            let hash = view.details.hash.clone();
            Some(toggle_step(view, path, hash, ticket))
        });
        let (hash, ticket) = match step {
            None => return Outcome::Skipped,
            Some(Toggle::Collapsed) => return Outcome::Done(false),
            Some(Toggle::Expanded) => return Outcome::Done(true),
            Some(Toggle::Fetch(hash, ticket)) => (hash, ticket),
        };

        let current = |s: &StoreState| {
            s.is_current(View::Commit, ticket)
                && s.commit.as_ref().is_some_and(|v| v.details.hash == hash)
        };
        match self.engine.get_commit_file_diff(&hash, path).await {
            Ok(diff) => settled(
                self.update(|s| {
                    if !current(&*s) {
                        return false;
                    }
                    if let Some(view) = s.commit.as_mut() {
                        view.file_diffs.insert(path.to_string(), diff);
                        view.expanded.insert(path.to_string());
                    }
                    true
                }),
                true,
            ),
            Err(source) if self.read(&current) => {
                self.engine_failed(Operation::LoadCommitFileDiff, source)
            }
            Err(_) => Outcome::Skipped,
        }
    }

    pub fn clear_commit_details(&self) {
        self.update(StoreState::clear_commit);
    }

    // ---- Stash details ----

    /// Selects `stash@{index}`, replacing any previous stash and its expanded
    /// files. Clears the diff and commit detail views.
    pub async fn load_stash_details(&self, index: usize) -> Outcome<()> {
        let Some(ticket) = self.update(|s| s.repository.is_some().then(|| s.begin(View::Stash)))
        else {
            return Outcome::Skipped;
        };
        debug!(index, "loading stash details");

        match self.engine.get_stash_details(index).await {
            Ok(details) => settled(
                self.update(|s| {
                    if !s.finish(View::Stash, ticket) {
                        return false;
                    }
                    s.clear_diff();
                    s.clear_commit();
                    s.stash = Some(DetailView::new(details));
                    true
                }),
                (),
            ),
            Err(source) => {
                if self.update(|s| s.finish(View::Stash, ticket)) {
                    self.engine_failed(Operation::LoadStashDetails, source)
                } else {
                    Outcome::Skipped
                }
            }
        }
    }

    /// Expands or collapses `path` in the selected stash.
    pub async fn toggle_stash_file(&self, path: &str) -> Outcome<bool> {
        let step = self.update(|s| {
            let ticket = s.ticket(View::Stash);
            let view = s.stash.as_mut()?;
            let index = view.details.index;
            Some(toggle_step(view, path, index, ticket))
        });
        let (index, ticket) = match step {
            None => return Outcome::Skipped,
            Some(Toggle::Collapsed) => return Outcome::Done(false),
            Some(Toggle::Expanded) => return Outcome::Done(true),
            Some(Toggle::Fetch(index, ticket)) => (index, ticket),
        };

        let current = |s: &StoreState| {
            s.is_current(View::Stash, ticket)
                && s.stash.as_ref().is_some_and(|v| v.details.index == index)
        };
        match self.engine.get_stash_file_diff(index, path).await {
            Ok(diff) => settled(
                self.update(|s| {
                    if !current(&*s) {
                        return false;
                    }
                    if let Some(view) = s.stash.as_mut() {
                        view.file_diffs.insert(path.to_string(), diff);
                        view.expanded.insert(path.to_string());
                    }
                    true
                }),
                true,
            ),
            Err(source) if self.read(&current) => {
                self.engine_failed(Operation::LoadStashFileDiff, source)
            }
            Err(_) => Outcome::Skipped,
        }
    }

    pub fn clear_stash_details(&self) {
        self.update(StoreState::clear_stash);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use yagg_engine::MemoryRepo;

    use super::*;
    use crate::testing::{working_repo, Harness, REPO};

    #[tokio::test]
    async fn open_loads_first_page_and_statuses() {
        let h = Harness::new(MemoryRepo::new(REPO).with_commits(150));
        let info = h.store.open(REPO).await.done().unwrap();
        assert_eq!(info.path, REPO);

        let snap = h.store.snapshot();
        assert_eq!(snap.commits.len(), 100);
        assert!(snap.has_more_commits);
        assert!(!snap.loading.any());
        assert_eq!(h.engine.calls_to("get_commit_graph")[0].args, "0,100");
        assert_eq!(h.engine.call_count("get_file_statuses"), 1);
        assert!(h.errors().is_empty());
    }

    #[tokio::test]
    async fn exactly_one_full_page_still_has_more() {
        let h = Harness::new(MemoryRepo::new("/repo/a").with_commits(100));
        assert!(h.store.open("/repo/a").await.is_done());
        assert!(h.store.has_more_commits());

        assert_eq!(h.store.load_more().await, Outcome::Done(0));
        assert!(!h.store.has_more_commits());
        assert_eq!(h.store.commits().len(), 100);
    }

    #[tokio::test]
    async fn failed_open_without_repository() {
        let h = Harness::new(MemoryRepo::new(REPO));
        let outcome = h.store.open("/repo/b").await;
        assert!(matches!(outcome, Outcome::Failed(StoreError::Open { .. })));
        assert!(h.store.repository().is_none());
        assert!(!h.store.loading().is_loading);
        assert_eq!(h.errors(), vec!["Not a git repository: /repo/b".to_string()]);
    }

    #[tokio::test]
    async fn failed_open_keeps_previous_repository() {
        let h = Harness::opened(MemoryRepo::new(REPO).with_commits(5)).await;
        let before = h.store.commits();

        assert!(h.store.open("/elsewhere").await.is_failed());
        assert_eq!(h.store.repository().unwrap().path, REPO);
        assert_eq!(h.store.commits(), before);
        assert_eq!(h.errors().len(), 1);
        assert!(!h.store.loading().any());
    }

    #[tokio::test]
    async fn open_current_dir_uses_engine_directory() {
        let h = Harness::new(MemoryRepo::new(REPO).with_commits(1));
        assert!(h.store.open_current_dir().await.is_done());
        assert_eq!(h.engine.calls_to("open_repository")[0].args, REPO);
    }

    #[tokio::test]
    async fn load_more_is_single_flight() {
        let h = Harness::opened(MemoryRepo::new(REPO).with_commits(250)).await;
        h.engine.hold("get_commit_graph");

        let (first, second, _) = tokio::join!(h.store.load_more(), h.store.load_more(), async {
            assert!(h.store.loading().commits_loading);
            h.engine.release("get_commit_graph");
        });

        assert_eq!(first, Outcome::Done(100));
        assert_eq!(second, Outcome::Skipped);
        assert_eq!(h.engine.call_count("get_commit_graph"), 1);
        assert_eq!(h.store.commits().len(), 200);
        assert!(!h.store.loading().commits_loading);
    }

    #[tokio::test]
    async fn pages_accumulate_in_fetch_order() {
        let h = Harness::opened(MemoryRepo::new(REPO).with_commits(250)).await;
        assert_eq!(h.store.load_more().await, Outcome::Done(100));
        assert_eq!(h.store.load_more().await, Outcome::Done(50));
        assert!(!h.store.has_more_commits());

        let commits = h.store.commits();
        assert_eq!(commits.len(), 250);
        let unique: HashSet<&str> = commits.iter().map(|c| c.hash()).collect();
        assert_eq!(unique.len(), 250);
        assert!(commits.windows(2).all(|w| w[0].commit.timestamp > w[1].commit.timestamp));

        assert_eq!(h.store.load_more().await, Outcome::Skipped);
        assert_eq!(h.engine.call_count("get_commit_graph"), 2);
    }

    #[tokio::test]
    async fn short_first_page_ends_history() {
        let h = Harness::opened(MemoryRepo::new(REPO).with_commits(30)).await;
        assert!(!h.store.has_more_commits());
        assert_eq!(h.store.load_more().await, Outcome::Skipped);
        assert_eq!(h.engine.call_count("get_commit_graph"), 0);
    }

    #[tokio::test]
    async fn load_more_without_repository_is_skipped() {
        let h = Harness::new(MemoryRepo::new(REPO).with_commits(3));
        assert_eq!(h.store.load_more().await, Outcome::Skipped);
        assert!(h.engine.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_page_reports_once_and_keeps_commits() {
        let h = Harness::opened(MemoryRepo::new(REPO).with_commits(150)).await;
        h.engine
            .fail_next("get_commit_graph", EngineError::Io("connection reset".into()));

        assert!(h.store.load_more().await.is_failed());
        assert_eq!(h.store.commits().len(), 100);
        assert!(!h.store.loading().commits_loading);
        assert_eq!(
            h.errors(),
            vec!["Failed to load commits: connection reset".to_string()]
        );

        assert_eq!(h.store.load_more().await, Outcome::Done(50));
    }

    #[tokio::test]
    async fn close_discards_page_in_flight() {
        let h = Harness::opened(MemoryRepo::new(REPO).with_commits(250)).await;
        h.engine.hold("get_commit_graph");

        let (outcome, _) = tokio::join!(h.store.load_more(), async {
            h.store.close();
            h.engine.release("get_commit_graph");
        });

        assert_eq!(outcome, Outcome::Skipped);
        assert!(h.store.repository().is_none());
        assert!(h.store.commits().is_empty());
        assert!(!h.store.loading().any());
    }

    #[tokio::test]
    async fn refresh_without_repository_is_skipped() {
        let h = Harness::new(MemoryRepo::new(REPO));
        assert_eq!(h.store.refresh().await, Outcome::Skipped);
        assert!(h.engine.calls().is_empty());
    }

    #[tokio::test]
    async fn refresh_restarts_history_and_keeps_diff_focus() {
        let h = Harness::opened(working_repo()).await;
        assert!(h.store.load_file_diff("a.txt", false).await.is_done());
        h.engine.clear_calls();

        assert!(h.store.refresh().await.is_done());
        assert_eq!(h.engine.call_count("get_repository_info"), 1);
        assert_eq!(h.engine.calls_to("get_commit_graph")[0].args, "0,100");
        assert_eq!(h.engine.call_count("get_file_statuses"), 1);
        assert_eq!(h.engine.calls_to("get_file_diff")[0].args, "a.txt,false,false");
        assert_eq!(h.store.diff().unwrap().path, "a.txt");
        assert_eq!(h.store.commits().len(), 3);
    }

    #[tokio::test]
    async fn file_diff_clears_stash_details() {
        let h = Harness::opened(working_repo()).await;
        assert!(h.store.load_stash_details(0).await.is_done());
        assert_eq!(h.store.toggle_stash_file("b.txt").await, Outcome::Done(true));
        assert!(h.store.stash_details().unwrap().is_expanded("b.txt"));

        assert!(h.store.load_file_diff("a.txt", false).await.is_done());
        let snap = h.store.snapshot();
        assert!(snap.stash_details.is_none());
        assert!(snap.commit_details.is_none());
        assert_eq!(snap.diff.unwrap().diff.additions(), 1);
    }

    #[tokio::test]
    async fn selecting_another_commit_drops_side_state() {
        let repo = working_repo();
        let first = repo.commit_hash(0).unwrap().to_string();
        let second = repo.commit_hash(1).unwrap().to_string();
        let repo = repo.with_commit_file(&first, "f.ts", Default::default());
        let h = Harness::opened(repo).await;

        assert!(h.store.load_commit_details(&first).await.is_done());
        assert_eq!(h.store.toggle_commit_file("f.ts").await, Outcome::Done(true));

        assert!(h.store.load_commit_details(&second).await.is_done());
        let view = h.store.commit_details().unwrap();
        assert_eq!(view.details.hash, second);
        assert!(view.expanded.is_empty());
        assert!(view.file_diffs.is_empty());
    }

    #[tokio::test]
    async fn commit_file_diff_is_fetched_once() {
        let repo = working_repo();
        let hash = repo.commit_hash(0).unwrap().to_string();
        let h = Harness::opened(repo.with_commit_file(&hash, "f.ts", Default::default())).await;
        assert!(h.store.load_commit_details(&hash).await.is_done());

        assert_eq!(h.store.toggle_commit_file("f.ts").await, Outcome::Done(true));
        assert_eq!(h.store.toggle_commit_file("f.ts").await, Outcome::Done(false));
        assert_eq!(h.store.toggle_commit_file("f.ts").await, Outcome::Done(true));
        assert_eq!(h.engine.call_count("get_commit_file_diff"), 1);
    }

    #[tokio::test]
    async fn toggle_without_selection_is_skipped() {
        let h = Harness::opened(working_repo()).await;
        assert_eq!(h.store.toggle_commit_file("f.ts").await, Outcome::Skipped);
        assert_eq!(h.store.toggle_stash_file("f.ts").await, Outcome::Skipped);
    }

    #[tokio::test]
    async fn cleared_diff_ignores_late_response() {
        let h = Harness::opened(working_repo()).await;
        h.engine.hold("get_file_diff");

        let (outcome, _) = tokio::join!(h.store.load_file_diff("a.txt", false), async {
            assert!(h.store.loading().diff_loading);
            h.store.clear_diff();
            h.engine.release("get_file_diff");
        });

        assert_eq!(outcome, Outcome::Skipped);
        assert!(h.store.diff().is_none());
        assert!(!h.store.loading().diff_loading);
    }

    #[tokio::test]
    async fn failed_diff_keeps_previous_view() {
        let h = Harness::opened(working_repo()).await;
        assert!(h.store.load_file_diff("a.txt", false).await.is_done());
        h.engine
            .fail_next("get_file_diff", EngineError::Git("bad object".into()));

        assert!(h.store.load_file_diff("b.txt", false).await.is_failed());
        assert_eq!(h.store.diff().unwrap().path, "a.txt");
        assert!(!h.store.loading().diff_loading);
        assert_eq!(h.errors(), vec!["Failed to load diff: bad object".to_string()]);
    }

    #[tokio::test]
    async fn untracked_diff_shows_whole_file() {
        let h = Harness::opened(working_repo()).await;
        assert!(h.store.load_untracked_diff("new.txt").await.is_done());
        let view = h.store.diff().unwrap();
        assert!(view.untracked);
        assert_eq!(view.diff.additions(), 1);
    }

    #[tokio::test]
    async fn scroll_to_loaded_commit() {
        let repo = working_repo();
        let hash = repo.commit_hash(2).unwrap().to_string();
        let h = Harness::opened(repo).await;

        assert_eq!(h.store.scroll_to_commit(&hash).await, Outcome::Done(2));
        assert_eq!(h.store.take_scroll_request(), Some(2));
        assert_eq!(h.store.take_scroll_request(), None);
        assert_eq!(h.store.commit_details().unwrap().details.hash, hash);
    }

    #[tokio::test]
    async fn scroll_to_unloaded_commit_is_skipped() {
        let h = Harness::opened(working_repo()).await;
        assert_eq!(h.store.scroll_to_commit("f00d").await, Outcome::Skipped);
        assert!(h.engine.calls().is_empty());
        assert_eq!(h.store.take_scroll_request(), None);
    }

    #[tokio::test]
    async fn refs_load_as_one_unit() {
        let h = Harness::opened(working_repo()).await;
        assert!(h.store.load_branches_and_tags().await.is_done());
        let snap = h.store.snapshot();
        assert_eq!(snap.branches.len(), 2);
        assert!(snap.branches.iter().any(|b| b.name == "main" && b.is_head));
        assert_eq!(snap.tags[0].name, "v1");
        assert_eq!(snap.stashes.len(), 2);
    }

    #[tokio::test]
    async fn failed_refs_load_changes_nothing() {
        let h = Harness::opened(working_repo()).await;
        h.engine.fail_next("list_tags", EngineError::Io("timeout".into()));

        assert!(h.store.load_branches_and_tags().await.is_failed());
        let snap = h.store.snapshot();
        assert!(snap.branches.is_empty());
        assert!(snap.stashes.is_empty());
        assert!(!snap.loading.refs_loading);
        assert_eq!(h.errors().len(), 1);
    }

    #[tokio::test]
    async fn failed_refresh_reports_once_and_keeps_history() {
        let h = Harness::opened(working_repo()).await;
        assert!(h.store.load_file_diff("a.txt", false).await.is_done());
        let before = h.store.snapshot();
        for op in [
            "get_repository_info",
            "get_commit_graph",
            "get_file_statuses",
            "get_file_diff",
        ] {
            h.engine.fail_next(op, EngineError::Io("repository vanished".into()));
        }

        assert!(h.store.refresh().await.is_failed());
        assert_eq!(
            h.errors(),
            vec!["Failed to load repository info: repository vanished".to_string()]
        );
        let snap = h.store.snapshot();
        assert_eq!(snap.commits.len(), 3);
        assert_eq!(snap.repository, before.repository);
        assert_eq!(snap.file_statuses, before.file_statuses);
        assert_eq!(snap.diff, before.diff);
        assert!(!snap.loading.any());
    }

    #[tokio::test]
    async fn refresh_after_failed_restart_reloads_from_the_start() {
        let h = Harness::opened(working_repo()).await;
        h.engine
            .fail_next("get_commit_graph", EngineError::Io("timeout".into()));
        assert!(h.store.refresh().await.is_failed());
        assert_eq!(h.store.commits().len(), 3);
        h.engine.clear_calls();

        assert_eq!(h.store.load_more().await, Outcome::Done(3));
        assert_eq!(h.engine.calls_to("get_commit_graph")[0].args, "0,100");
        assert_eq!(h.store.commits().len(), 3);
        assert!(!h.store.has_more_commits());
    }

    #[tokio::test]
    async fn failed_follow_up_loads_after_open_report_once() {
        let h = Harness::new(working_repo());
        h.engine
            .fail_next("get_commit_graph", EngineError::Io("timeout".into()));
        h.engine
            .fail_next("get_file_statuses", EngineError::Io("timeout".into()));

        let info = h.store.open(REPO).await.done().unwrap();
        assert_eq!(h.store.repository(), Some(info));
        assert_eq!(h.errors(), vec!["Failed to load commits: timeout".to_string()]);
        let snap = h.store.snapshot();
        assert!(snap.commits.is_empty());
        assert_eq!(snap.file_statuses, FileStatuses::default());
        assert!(!snap.loading.any());
    }

    #[tokio::test]
    async fn fetch_hunk_checks_fingerprint() {
        let h = Harness::opened(working_repo()).await;
        assert!(h.store.load_file_diff("f.ts", false).await.is_done());
        let diff = h.store.diff().unwrap().diff;

        let addr = HunkAddress::pinned(&diff, false, 1);
        let hunk: DiffHunk = h.store.fetch_hunk(&addr).await.done().unwrap();
        assert_eq!(&hunk, diff.hunk(1).unwrap());

        let stale = HunkAddress::new("f.ts", false, 0).with_fingerprint(hunk.fingerprint());
        let outcome = h.store.fetch_hunk(&stale).await;
        assert!(outcome.error().is_some_and(StoreError::is_validation));
        assert_eq!(h.errors().len(), 1);
        assert!(h.store.diff().is_some());
    }
}
