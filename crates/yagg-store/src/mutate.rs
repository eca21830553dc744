//! Repository mutations.
//!
//! Every mutation follows the same shape: optional confirmation, exactly one
//! engine call, then the smallest set of reloads that can observe the
//! change. Nothing is patched optimistically; reloads re-read the engine.
//! On failure the error is reported once and no state changes.

use std::future::Future;

use tracing::{debug, info, warn};
use yagg_engine::EngineResult;
use yagg_surface::{ActivityEntry, ConfirmRequest};

use crate::error::{Operation, StoreError, StoreResult, ValidationError};
use crate::outcome::Outcome;
use crate::protocol::{check_side, validate, validate_lines, HunkAddress, LineSelection};
use crate::state::StoreState;
use crate::store::RepoStore;

/// What happens to the open diff after a mutation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum DiffEffect {
    #[default]
    Keep,
    /// Reload whatever diff is open.
    ReloadOpen,
    /// Reload the open diff if it shows this path, on the same side.
    ReloadPath(String),
    /// Reload the open diff if it shows this path, switching to `staged`.
    ReloadPathAs(String, bool),
    Clear,
    ClearPath(String),
}

impl DiffEffect {
    /// Applies clears and returns the diff to reload, if any.
    fn resolve(&self, s: &mut StoreState) -> Option<(String, bool, bool)> {
        let open = s.diff.as_ref();
        match self {
            Self::Keep => None,
            Self::ReloadOpen => open.map(|d| (d.path.clone(), d.staged, d.untracked)),
            Self::ReloadPath(path) => open
                .filter(|d| d.shows(path))
                .map(|d| (d.path.clone(), d.staged, d.untracked)),
            Self::ReloadPathAs(path, staged) => open
                .filter(|d| d.shows(path))
                .map(|d| (d.path.clone(), *staged, false)),
            Self::Clear => {
                s.clear_diff();
                None
            }
            Self::ClearPath(path) => {
                if open.is_some_and(|d| d.shows(path)) {
                    s.clear_diff();
                }
                None
            }
        }
    }
}

/// Views to reload after a successful mutation.
#[derive(Clone, Debug, Default)]
struct Effects {
    statuses: bool,
    /// HEAD info and the history from offset 0.
    history: bool,
    /// Branches, tags and stashes.
    refs: bool,
    diff: DiffEffect,
    dropped_stash: Option<usize>,
}

impl Effects {
    fn statuses(diff: DiffEffect) -> Self {
        Self {
            statuses: true,
            diff,
            ..Self::default()
        }
    }

    fn head_moved() -> Self {
        Self {
            statuses: true,
            history: true,
            refs: true,
            ..Self::default()
        }
    }

    fn refs() -> Self {
        Self {
            refs: true,
            ..Self::default()
        }
    }
}

struct Mutation {
    op: Operation,
    confirm: Option<ConfirmRequest>,
    effects: Effects,
    success: Option<&'static str>,
    /// Recorded in the activity log on success.
    audit: Option<String>,
}

impl Mutation {
    fn new(op: Operation, effects: Effects) -> Self {
        Self {
            op,
            confirm: None,
            effects,
            success: None,
            audit: None,
        }
    }

    fn confirm(mut self, request: ConfirmRequest) -> Self {
        self.confirm = Some(request);
        self
    }

    fn success(mut self, message: &'static str) -> Self {
        self.success = Some(message);
        self
    }

    fn audit(mut self, target: impl Into<String>) -> Self {
        self.audit = Some(target.into());
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HunkAction {
    Stage,
    Unstage,
    Discard,
}

impl HunkAction {
    fn operation(self, selection: &LineSelection) -> Operation {
        match (self, selection) {
            (Self::Stage, LineSelection::WholeHunk) => Operation::StageHunk,
            (Self::Stage, LineSelection::Lines(_)) => Operation::StageLines,
            (Self::Unstage, _) => Operation::UnstageHunk,
            (Self::Discard, LineSelection::WholeHunk) => Operation::DiscardHunk,
            (Self::Discard, LineSelection::Lines(_)) => Operation::DiscardLines,
        }
    }
}

impl RepoStore {
    async fn mutate<T, F, Fut>(&self, mutation: Mutation, call: F) -> Outcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = EngineResult<T>>,
    {
        let Mutation {
            op,
            confirm,
            effects,
            success,
            audit,
        } = mutation;
        let Some(session) = self.read(|s| s.repository.as_ref().map(|_| s.session)) else {
            return self.fail(ValidationError::NoRepository.into());
        };
        if let Some(request) = confirm {
            if !self.confirmer.show_confirm(request).await {
                debug!(%op, "declined");
                return Outcome::Declined;
            }
        }

        debug!(%op, "running");
        let value = match call().await {
            Ok(value) => value,
            Err(source) => return self.engine_failed(op, source),
        };
        if let Some(target) = audit {
            self.record_activity(op, &target);
        }
        if let Some(message) = success {
            self.notifier.show_success(message);
        }
        if self.read(|s| s.session) == session {
            if let Err(err) = self.apply(effects).await {
                self.report(&err);
            }
        }
        Outcome::Done(value)
    }

    /// Runs the reloads for `effects` together. Nothing is reported here; the
    /// first failing reload is returned.
    async fn apply(&self, effects: Effects) -> StoreResult<()> {
        let reload = self.update(|s| {
            if let Some(index) = effects.dropped_stash {
                s.stash_dropped(index);
            }
            effects.diff.resolve(s)
        });

        let statuses = async {
            if effects.statuses {
                self.fetch_statuses().await.map(drop)
            } else {
                Ok(())
            }
        };
        let history = async {
            if effects.history {
                self.reload_history().await
            } else {
                Ok(())
            }
        };
        let refs = async {
            if effects.refs {
                self.fetch_refs().await.map(drop)
            } else {
                Ok(())
            }
        };
        let diff = async {
            match &reload {
                Some((path, staged, untracked)) => {
                    self.fetch_diff(path, *staged, *untracked).await.map(drop)
                }
                None => Ok(()),
            }
        };
        let (statuses, history, refs, diff) = tokio::join!(statuses, history, refs, diff);
        statuses.and(history).and(refs).and(diff)
    }

    fn record_activity(&self, op: Operation, target: &str) {
        let repository = self
            .read(|s| s.repository.as_ref().map(|r| r.path.clone()))
            .unwrap_or_default();
        let entry = ActivityEntry::now(op.describe(), repository, target);
        if let Err(err) = self.activity.record(&entry) {
            warn!(error = %err, %op, "failed to record activity");
        }
    }

    // ---- Files ----

    pub async fn stage_file(&self, path: &str) -> Outcome<()> {
        let m = Mutation::new(
            Operation::StageFile,
            Effects::statuses(DiffEffect::ReloadPathAs(path.to_string(), true)),
        );
        self.mutate(m, || self.engine.stage_file(path)).await
    }

    pub async fn unstage_file(&self, path: &str) -> Outcome<()> {
        let m = Mutation::new(
            Operation::UnstageFile,
            Effects::statuses(DiffEffect::ReloadPathAs(path.to_string(), false)),
        );
        self.mutate(m, || self.engine.unstage_file(path)).await
    }

    /// Stages each path in turn and reloads statuses once at the end.
    /// Returns how many paths were staged.
    pub async fn stage_files(&self, paths: &[String]) -> Outcome<usize> {
        self.batch(true, paths).await
    }

    pub async fn unstage_files(&self, paths: &[String]) -> Outcome<usize> {
        self.batch(false, paths).await
    }

    /// Stops at the first failure. Statuses are reloaded only if at least one
    /// path went through.
    async fn batch(&self, stage: bool, paths: &[String]) -> Outcome<usize> {
        let op = if stage {
            Operation::StageFile
        } else {
            Operation::UnstageFile
        };
        if paths.is_empty() {
            return Outcome::Skipped;
        }
        let Some(session) = self.read(|s| s.repository.as_ref().map(|_| s.session)) else {
            return self.fail(ValidationError::NoRepository.into());
        };

        let mut done = 0;
        let mut failure = None;
        for path in paths {
            let result = if stage {
                self.engine.stage_file(path).await
            } else {
                self.engine.unstage_file(path).await
            };
            if let Err(source) = result {
                failure = Some(source);
                break;
            }
            done += 1;
        }
        debug!(%op, done, total = paths.len(), "batch finished");

        let mut reloaded = Ok(());
        if done > 0 && self.read(|s| s.session) == session {
            let succeeded = &paths[..done];
            let shown = self.read(|s| {
                s.diff
                    .as_ref()
                    .filter(|d| succeeded.iter().any(|p| d.shows(p)))
                    .map(|d| d.path.clone())
            });
            let diff = shown.map_or(DiffEffect::Keep, |path| DiffEffect::ReloadPathAs(path, stage));
            reloaded = self.apply(Effects::statuses(diff)).await;
        }
        // The batch failure wins over a reload failure; only one is shown.
        match (failure, reloaded) {
            (Some(source), _) => self.engine_failed(op, source),
            (None, Err(err)) => {
                self.report(&err);
                Outcome::Done(done)
            }
            (None, Ok(())) => Outcome::Done(done),
        }
    }

    /// Deletes `path` from the working tree after confirmation.
    pub async fn delete_file(&self, path: &str) -> Outcome<()> {
        let m = Mutation::new(
            Operation::DeleteFile,
            Effects::statuses(DiffEffect::ClearPath(path.to_string())),
        )
        .confirm(ConfirmRequest::new(
            "Delete File",
            format!("Are you sure you want to delete \"{path}\"? This cannot be undone."),
            "Delete",
        ))
        .audit(path);
        self.mutate(m, || self.engine.delete_file(path)).await
    }

    /// Restores `path` in index and worktree from HEAD after confirmation.
    pub async fn revert_file(&self, path: &str) -> Outcome<()> {
        let m = Mutation::new(
            Operation::RevertFile,
            Effects::statuses(DiffEffect::ReloadPath(path.to_string())),
        )
        .confirm(ConfirmRequest::new(
            "Revert File",
            format!("Discard all changes to \"{path}\"? This cannot be undone."),
            "Revert",
        ))
        .success("File reverted")
        .audit(path);
        self.mutate(m, || self.engine.revert_file(path)).await
    }

    // ---- Hunks and lines ----

    pub async fn stage_hunk(&self, address: &HunkAddress) -> Outcome<()> {
        self.hunk_op(HunkAction::Stage, address, LineSelection::WholeHunk)
            .await
    }

    pub async fn unstage_hunk(&self, address: &HunkAddress) -> Outcome<()> {
        self.hunk_op(HunkAction::Unstage, address, LineSelection::WholeHunk)
            .await
    }

    pub async fn stage_lines(&self, address: &HunkAddress, lines: &[usize]) -> Outcome<()> {
        self.hunk_op(HunkAction::Stage, address, LineSelection::Lines(lines.to_vec()))
            .await
    }

    /// Discards a whole unstaged hunk. Not confirmed here; the caller owns
    /// that decision.
    pub async fn discard_hunk(&self, address: &HunkAddress) -> Outcome<()> {
        self.hunk_op(HunkAction::Discard, address, LineSelection::WholeHunk)
            .await
    }

    pub async fn discard_lines(&self, address: &HunkAddress, lines: &[usize]) -> Outcome<()> {
        self.hunk_op(HunkAction::Discard, address, LineSelection::Lines(lines.to_vec()))
            .await
    }

    async fn hunk_op(
        &self,
        action: HunkAction,
        address: &HunkAddress,
        selection: LineSelection,
    ) -> Outcome<()> {
        let op = action.operation(&selection);
        let checked = self.read(|s| -> Result<(), ValidationError> {
            check_side(address, action == HunkAction::Unstage)?;
            let displayed = s
                .diff
                .as_ref()
                .filter(|d| d.shows(&address.path) && d.staged == address.staged)
                .map(|d| &d.diff);
            validate(displayed, address, &selection)
        });
        if let Err(err) = checked {
            return self.fail(err.into());
        }

        let path = address.path.as_str();
        let index = address.hunk_index;
        let mut m = Mutation::new(op, Effects::statuses(DiffEffect::ReloadPath(path.to_string())));
        if action == HunkAction::Discard {
            m = m.audit(format!("{path} hunk {index}"));
        }
        let engine = &self.engine;
        self.mutate(m, || async move {
            match (action, selection.lines()) {
                (HunkAction::Stage, None) => engine.stage_hunk(path, index).await,
                (HunkAction::Stage, Some(lines)) => engine.stage_lines(path, index, lines).await,
                (HunkAction::Unstage, _) => engine.unstage_hunk(path, index).await,
                (HunkAction::Discard, lines) => engine.discard_hunk(path, index, lines).await,
            }
        })
        .await
    }

    // ---- History ----

    /// Commits the index. Returns the new commit id.
    pub async fn create_commit(&self, message: &str) -> Outcome<String> {
        if message.trim().is_empty() {
            return self.fail(ValidationError::EmptyCommitMessage.into());
        }
        let effects = Effects {
            statuses: true,
            history: true,
            diff: DiffEffect::Clear,
            ..Effects::default()
        };
        let outcome = self
            .mutate(Mutation::new(Operation::CreateCommit, effects), || {
                self.engine.create_commit(message)
            })
            .await;
        if let Outcome::Done(hash) = &outcome {
            info!(%hash, "commit created");
        }
        outcome
    }

    pub async fn checkout_commit(&self, hash: &str) -> Outcome<()> {
        let m = Mutation::new(Operation::CheckoutCommit, Effects::head_moved());
        self.mutate(m, || self.engine.checkout_commit(hash)).await
    }

    pub async fn checkout_branch(&self, name: &str) -> Outcome<()> {
        let m = Mutation::new(Operation::CheckoutBranch, Effects::head_moved());
        self.mutate(m, || self.engine.checkout_branch(name)).await
    }

    /// Applies the inverse of `hash` to the working tree after confirmation.
    pub async fn revert_commit(&self, hash: &str) -> Outcome<()> {
        let m = Mutation::new(Operation::RevertCommit, Effects::statuses(DiffEffect::ReloadOpen))
            .confirm(ConfirmRequest::new(
                "Revert Commit",
                format!(
                    "Revert the changes introduced by commit {}? The inverse changes will be applied to your working tree.",
                    short(hash)
                ),
                "Revert",
            ))
            .success("Commit reverted")
            .audit(hash);
        self.mutate(m, || self.engine.revert_commit(hash)).await
    }

    pub async fn revert_commit_file(&self, hash: &str, path: &str) -> Outcome<()> {
        let m = Mutation::new(
            Operation::RevertCommitFile,
            Effects::statuses(DiffEffect::ReloadPath(path.to_string())),
        )
        .confirm(ConfirmRequest::new(
            "Revert File Changes",
            format!(
                "Revert the changes to \"{path}\" from commit {}?",
                short(hash)
            ),
            "Revert",
        ))
        .success("File changes reverted")
        .audit(format!("{path}@{hash}"));
        self.mutate(m, || self.engine.revert_commit_file(hash, path))
            .await
    }

    /// Reverts selected lines of one hunk of a commit's file diff.
    ///
    /// If that diff is cached in the selected commit view the indices are
    /// checked against it first.
    pub async fn revert_commit_file_lines(
        &self,
        hash: &str,
        path: &str,
        hunk_index: usize,
        lines: &[usize],
    ) -> Outcome<()> {
        let checked = self.read(|s| -> Result<(), ValidationError> {
            let cached = s
                .commit
                .as_ref()
                .filter(|v| v.details.hash == hash)
                .and_then(|v| v.file_diffs.get(path));
            match cached {
                Some(diff) => {
                    let hunk =
                        diff.hunk(hunk_index)
                            .ok_or_else(|| ValidationError::HunkOutOfRange {
                                path: path.to_string(),
                                index: hunk_index,
                                count: diff.hunks.len(),
                            })?;
                    validate_lines(hunk, lines)
                }
                None if lines.is_empty() => Err(ValidationError::EmptySelection),
                None => Ok(()),
            }
        });
        if let Err(err) = checked {
            return self.fail(StoreError::from(err));
        }

        let m = Mutation::new(
            Operation::RevertCommitFileLines,
            Effects::statuses(DiffEffect::ReloadPath(path.to_string())),
        )
        .confirm(ConfirmRequest::new(
            "Revert Line Changes",
            format!(
                "Revert {} selected line(s) in \"{path}\" from commit {}?",
                lines.len(),
                short(hash)
            ),
            "Revert",
        ))
        .success("Line changes reverted")
        .audit(format!("{path}@{hash} hunk {hunk_index}"));
        self.mutate(m, || {
            self.engine
                .revert_commit_file_lines(hash, path, hunk_index, lines)
        })
        .await
    }

    // ---- Refs ----

    pub async fn delete_branch(&self, name: &str, is_remote: bool) -> Outcome<()> {
        let kind = if is_remote { "remote branch" } else { "branch" };
        let m = Mutation::new(Operation::DeleteBranch, Effects::refs())
            .confirm(ConfirmRequest::new(
                "Delete Branch",
                format!("Are you sure you want to delete the {kind} \"{name}\"?"),
                "Delete",
            ))
            .audit(name);
        self.mutate(m, || self.engine.delete_branch(name, is_remote))
            .await
    }

    pub async fn delete_tag(&self, name: &str) -> Outcome<()> {
        let m = Mutation::new(Operation::DeleteTag, Effects::refs())
            .confirm(ConfirmRequest::new(
                "Delete Tag",
                format!("Are you sure you want to delete the tag \"{name}\"?"),
                "Delete",
            ))
            .audit(name);
        self.mutate(m, || self.engine.delete_tag(name)).await
    }

    pub async fn apply_stash(&self, index: usize) -> Outcome<()> {
        let m = Mutation::new(Operation::ApplyStash, Effects::head_moved());
        self.mutate(m, || self.engine.apply_stash(index)).await
    }

    /// Drops `stash@{index}` after confirmation. A selected stash at that
    /// index is deselected; one above it is renumbered.
    pub async fn drop_stash(&self, index: usize) -> Outcome<()> {
        let effects = Effects {
            dropped_stash: Some(index),
            ..Effects::refs()
        };
        let m = Mutation::new(Operation::DropStash, effects)
            .confirm(ConfirmRequest::new(
                "Drop Stash",
                format!("Are you sure you want to drop stash@{{{index}}}? This cannot be undone."),
                "Drop",
            ))
            .audit(format!("stash@{{{index}}}"));
        self.mutate(m, || self.engine.drop_stash(index)).await
    }
}

fn short(hash: &str) -> &str {
    hash.get(..7).unwrap_or(hash)
}
