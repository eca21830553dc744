//! State held by the store and the snapshots handed to readers.
//!
//! Every request captures a [`Ticket`] when it starts. Opening or closing a
//! repository bumps the session; reselecting a diff, commit or stash bumps
//! that view's epoch. A response whose ticket no longer matches is dropped
//! without touching state or loading flags.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use yagg_types::{
    BranchInfo, CommitDetails, FileDiff, FileStatuses, GraphCommit, RepositoryInfo, StashDetails,
    StashInfo, TagInfo,
};

use crate::pager::CommitPager;

/// Pending-work indicators. Set while a request of that kind is in flight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadingFlags {
    pub is_loading: bool,
    pub commits_loading: bool,
    pub file_statuses_loading: bool,
    pub diff_loading: bool,
    pub commit_details_loading: bool,
    pub stash_details_loading: bool,
    pub refs_loading: bool,
}

impl LoadingFlags {
    pub fn any(&self) -> bool {
        self.is_loading
            || self.commits_loading
            || self.file_statuses_loading
            || self.diff_loading
            || self.commit_details_loading
            || self.stash_details_loading
            || self.refs_loading
    }
}

/// The working-tree diff on display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffView {
    pub path: String,
    pub staged: bool,
    pub untracked: bool,
    pub diff: FileDiff,
}

impl DiffView {
    pub fn shows(&self, path: &str) -> bool {
        self.path == path
    }
}

/// A selected commit or stash, with the files the user expanded and the
/// per-file diffs fetched for them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetailView<D> {
    pub details: D,
    pub expanded: BTreeSet<String>,
    pub file_diffs: BTreeMap<String, FileDiff>,
}

impl<D> DetailView<D> {
    pub(crate) fn new(details: D) -> Self {
        Self {
            details,
            expanded: BTreeSet::new(),
            file_diffs: BTreeMap::new(),
        }
    }

    pub fn is_expanded(&self, path: &str) -> bool {
        self.expanded.contains(path)
    }
}

pub type CommitView = DetailView<CommitDetails>;
pub type StashView = DetailView<StashDetails>;

/// A consistent copy of everything the store holds.
#[derive(Clone, Debug)]
pub struct StoreSnapshot {
    pub repository: Option<RepositoryInfo>,
    pub commits: Arc<Vec<GraphCommit>>,
    pub has_more_commits: bool,
    pub file_statuses: FileStatuses,
    pub branches: Vec<BranchInfo>,
    pub tags: Vec<TagInfo>,
    pub stashes: Vec<StashInfo>,
    pub diff: Option<DiffView>,
    pub commit_details: Option<CommitView>,
    pub stash_details: Option<StashView>,
    pub loading: LoadingFlags,
    pub pending_scroll: Option<usize>,
}

/// Views whose requests are superseded by reselection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum View {
    Open,
    Diff,
    Commit,
    Stash,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Ticket {
    session: u64,
    epoch: u64,
}

#[derive(Debug)]
pub(crate) struct StoreState {
    pub(crate) session: u64,
    pub(crate) repository: Option<RepositoryInfo>,
    pub(crate) pager: CommitPager,
    pub(crate) statuses: FileStatuses,
    pub(crate) branches: Vec<BranchInfo>,
    pub(crate) tags: Vec<TagInfo>,
    pub(crate) stashes: Vec<StashInfo>,
    pub(crate) diff: Option<DiffView>,
    pub(crate) commit: Option<CommitView>,
    pub(crate) stash: Option<StashView>,
    pub(crate) pending_scroll: Option<usize>,
    statuses_pending: u32,
    refs_pending: u32,
    is_loading: bool,
    diff_loading: bool,
    commit_loading: bool,
    stash_loading: bool,
    open_epoch: u64,
    diff_epoch: u64,
    commit_epoch: u64,
    stash_epoch: u64,
}

impl StoreState {
    pub(crate) fn new(page_size: usize) -> Self {
        Self {
            session: 0,
            repository: None,
            pager: CommitPager::new(page_size),
            statuses: FileStatuses::default(),
            branches: Vec::new(),
            tags: Vec::new(),
            stashes: Vec::new(),
            diff: None,
            commit: None,
            stash: None,
            pending_scroll: None,
            statuses_pending: 0,
            refs_pending: 0,
            is_loading: false,
            diff_loading: false,
            commit_loading: false,
            stash_loading: false,
            open_epoch: 0,
            diff_epoch: 0,
            commit_epoch: 0,
            stash_epoch: 0,
        }
    }

    pub(crate) fn flags(&self) -> LoadingFlags {
        LoadingFlags {
            is_loading: self.is_loading,
            commits_loading: self.pager.is_loading(),
            file_statuses_loading: self.statuses_pending > 0,
            diff_loading: self.diff_loading,
            commit_details_loading: self.commit_loading,
            stash_details_loading: self.stash_loading,
            refs_loading: self.refs_pending > 0,
        }
    }

    pub(crate) fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            repository: self.repository.clone(),
            commits: self.pager.commits(),
            has_more_commits: self.pager.has_more(),
            file_statuses: self.statuses.clone(),
            branches: self.branches.clone(),
            tags: self.tags.clone(),
            stashes: self.stashes.clone(),
            diff: self.diff.clone(),
            commit_details: self.commit.clone(),
            stash_details: self.stash.clone(),
            loading: self.flags(),
            pending_scroll: self.pending_scroll,
        }
    }

    /// Replaces everything with a fresh session for `repository`.
    ///
    /// Epochs restart at zero; the new session number alone invalidates
    /// every outstanding ticket.
    pub(crate) fn start_session(&mut self, repository: Option<RepositoryInfo>) {
        let session = self.session + 1;
        *self = Self::new(self.pager.page_size());
        self.session = session;
        self.repository = repository;
    }

    // ---- Tickets ----

    /// Starts a request for `view`, superseding any earlier one.
    pub(crate) fn begin(&mut self, view: View) -> Ticket {
        let (epoch, flag) = self.slot(view);
        *epoch += 1;
        *flag = true;
        let epoch = *epoch;
        Ticket {
            session: self.session,
            epoch,
        }
    }

    /// Ticket of the current selection of `view`, without starting a request.
    pub(crate) fn ticket(&self, view: View) -> Ticket {
        Ticket {
            session: self.session,
            epoch: self.epoch(view),
        }
    }

    pub(crate) fn is_current(&self, view: View, ticket: Ticket) -> bool {
        ticket.session == self.session && self.epoch(view) == ticket.epoch
    }

    /// Settles a request started by [`begin`](Self::begin). Returns `false`
    /// if it was superseded, in which case nothing is touched.
    pub(crate) fn finish(&mut self, view: View, ticket: Ticket) -> bool {
        if !self.is_current(view, ticket) {
            return false;
        }
        *self.slot(view).1 = false;
        true
    }

    /// Invalidates any request for `view` and clears its flag.
    pub(crate) fn cancel(&mut self, view: View) {
        let (epoch, flag) = self.slot(view);
        *epoch += 1;
        *flag = false;
    }

    fn epoch(&self, view: View) -> u64 {
        match view {
            View::Open => self.open_epoch,
            View::Diff => self.diff_epoch,
            View::Commit => self.commit_epoch,
            View::Stash => self.stash_epoch,
        }
    }

    fn slot(&mut self, view: View) -> (&mut u64, &mut bool) {
        match view {
            View::Open => (&mut self.open_epoch, &mut self.is_loading),
            View::Diff => (&mut self.diff_epoch, &mut self.diff_loading),
            View::Commit => (&mut self.commit_epoch, &mut self.commit_loading),
            View::Stash => (&mut self.stash_epoch, &mut self.stash_loading),
        }
    }

    // ---- Session-scoped loads ----

    pub(crate) fn begin_statuses(&mut self) -> u64 {
        self.statuses_pending += 1;
        self.session
    }

    pub(crate) fn finish_statuses(&mut self, session: u64, statuses: Option<FileStatuses>) -> bool {
        if session != self.session {
            return false;
        }
        self.statuses_pending = self.statuses_pending.saturating_sub(1);
        if let Some(statuses) = statuses {
            self.statuses = statuses;
        }
        true
    }

    pub(crate) fn begin_refs(&mut self) -> u64 {
        self.refs_pending += 1;
        self.session
    }

    pub(crate) fn finish_refs(
        &mut self,
        session: u64,
        refs: Option<(Vec<BranchInfo>, Vec<TagInfo>, Vec<StashInfo>)>,
    ) -> bool {
        if session != self.session {
            return false;
        }
        self.refs_pending = self.refs_pending.saturating_sub(1);
        if let Some((branches, tags, stashes)) = refs {
            self.branches = branches;
            self.tags = tags;
            self.stashes = stashes;
        }
        true
    }

    // ---- Selection ----

    pub(crate) fn clear_diff(&mut self) {
        self.cancel(View::Diff);
        self.diff = None;
    }

    pub(crate) fn clear_commit(&mut self) {
        self.cancel(View::Commit);
        self.commit = None;
    }

    pub(crate) fn clear_stash(&mut self) {
        self.cancel(View::Stash);
        self.stash = None;
    }

    /// Keeps the selected stash pointing at the same entry after
    /// `stash@{dropped}` was removed.
    pub(crate) fn stash_dropped(&mut self, dropped: usize) {
        let Some(selected) = self.stash.as_ref().map(|s| s.details.index) else {
            return;
        };
        if selected == dropped {
            self.clear_stash();
        } else if dropped < selected {
            if let Some(view) = self.stash.as_mut() {
                view.details.index -= 1;
            }
        }
    }
}
