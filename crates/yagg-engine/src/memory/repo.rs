//! Repository model behind [`InMemoryEngine`](super::InMemoryEngine).
//!
//! Each tracked path has a HEAD, index and worktree version; statuses and
//! diffs are derived from those three on every read, the way a real engine
//! derives them from the object database.

use std::collections::{BTreeMap, HashMap};

use yagg_types::{
    BranchInfo, CommitDetails, CommitFileChange, CommitInfo, DiffHunk, FileDiff, FileStatus,
    FileStatusType, FileStatuses, GraphCommit, GraphLine, GraphLineType, RefInfo, RefType,
    RepositoryInfo, StashDetails, StashInfo, TagInfo,
};

use super::text::{apply_hunk, diff_text, Direction};
use crate::error::{EngineError, EngineResult};

const AUTHOR_NAME: &str = "Test User";
const AUTHOR_EMAIL: &str = "test@example.com";
const BASE_TIMESTAMP: i64 = 1_700_000_000;

/// The three versions of one path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct WorkFile {
    head: Option<String>,
    index: Option<String>,
    worktree: Option<String>,
    conflicted: bool,
}

#[derive(Clone, Debug)]
struct StoredStash {
    details: StashDetails,
    /// Worktree content the stash restores, per path.
    contents: BTreeMap<String, String>,
    diffs: HashMap<String, FileDiff>,
}

/// An in-memory repository.
///
/// Built with the `with_*` methods and handed to
/// [`InMemoryEngine::add_repo`](super::InMemoryEngine::add_repo).
#[derive(Clone, Debug)]
pub struct MemoryRepo {
    path: String,
    branch: Option<String>,
    head: Option<String>,
    remotes: Vec<String>,
    files: BTreeMap<String, WorkFile>,
    /// Newest first.
    commits: Vec<GraphCommit>,
    details: HashMap<String, CommitDetails>,
    commit_diffs: HashMap<(String, String), FileDiff>,
    branches: Vec<BranchInfo>,
    tags: Vec<TagInfo>,
    stashes: Vec<StoredStash>,
    next_seq: u64,
}

impl MemoryRepo {
    /// An empty repository on branch `main` with no commits.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            branch: Some("main".into()),
            head: None,
            remotes: Vec::new(),
            files: BTreeMap::new(),
            commits: Vec::new(),
            details: HashMap::new(),
            commit_diffs: HashMap::new(),
            branches: Vec::new(),
            tags: Vec::new(),
            stashes: Vec::new(),
            next_seq: 1,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Appends `count` linear commits on the current branch.
    pub fn with_commits(mut self, count: usize) -> Self {
        for _ in 0..count {
            let seq = self.next_seq;
            self.push_commit(format!("commit {seq}"), Vec::new());
        }
        self
    }

    pub fn with_remote(mut self, name: impl Into<String>) -> Self {
        self.remotes.push(name.into());
        self
    }

    /// Adds a path with explicit HEAD / index / worktree contents.
    pub fn with_file(
        mut self,
        path: impl Into<String>,
        head: Option<&str>,
        index: Option<&str>,
        worktree: Option<&str>,
    ) -> Self {
        self.files.insert(
            path.into(),
            WorkFile {
                head: head.map(String::from),
                index: index.map(String::from),
                worktree: worktree.map(String::from),
                conflicted: false,
            },
        );
        self
    }

    /// Marks an existing path as conflicted.
    pub fn with_conflict(mut self, path: &str) -> Self {
        if let Some(file) = self.files.get_mut(path) {
            file.conflicted = true;
        }
        self
    }

    /// Adds a branch pointing at HEAD.
    pub fn with_branch(mut self, name: impl Into<String>, is_remote: bool) -> Self {
        let target_hash = self.head.clone().unwrap_or_default();
        self.branches.push(BranchInfo {
            name: name.into(),
            is_remote,
            is_head: false,
            target_hash,
        });
        self
    }

    /// Adds a lightweight tag on HEAD.
    pub fn with_tag(mut self, name: impl Into<String>) -> Self {
        self.tags.push(TagInfo {
            name: name.into(),
            target_hash: self.head.clone().unwrap_or_default(),
            is_annotated: false,
            message: None,
        });
        self.tags.sort_by(|a, b| a.name.cmp(&b.name));
        self
    }

    /// Pushes a stash that restores `files` (path, worktree content) when applied.
    pub fn with_stash(mut self, message: impl Into<String>, files: &[(&str, &str)]) -> Self {
        let seq = self.next_seq;
        self.next_seq += 1;
        let mut contents = BTreeMap::new();
        let mut diffs = HashMap::new();
        let mut files_changed = Vec::new();
        for (path, content) in files {
            let base = self.files.get(*path).and_then(|f| f.head.clone());
            let status = if base.is_some() {
                FileStatusType::Modified
            } else {
                FileStatusType::Added
            };
            diffs.insert(path.to_string(), diff_text(path, base.as_deref(), Some(*content)));
            contents.insert(path.to_string(), content.to_string());
            files_changed.push(CommitFileChange {
                path: path.to_string(),
                status,
                old_path: None,
            });
        }
        let details = StashDetails {
            index: 0,
            message: message.into(),
            commit_hash: synthetic_hash(seq),
            timestamp: BASE_TIMESTAMP + seq as i64,
            branch_name: self.branch.clone().unwrap_or_default(),
            files_changed,
        };
        self.stashes.insert(
            0,
            StoredStash {
                details,
                contents,
                diffs,
            },
        );
        self.reindex_stashes();
        self
    }

    /// Records the diff a commit introduced for `path`.
    pub fn with_commit_file(mut self, hash: &str, path: &str, diff: FileDiff) -> Self {
        if let Some(details) = self.details.get_mut(hash) {
            if !details.touches(path) {
                details.files_changed.push(CommitFileChange {
                    path: path.to_string(),
                    status: FileStatusType::Modified,
                    old_path: None,
                });
            }
        }
        self.commit_diffs
            .insert((hash.to_string(), path.to_string()), diff);
        self
    }

    /// Overwrites the worktree version of `path`; `None` deletes it.
    pub fn set_worktree(&mut self, path: &str, content: Option<&str>) {
        self.files.entry(path.to_string()).or_default().worktree = content.map(String::from);
        self.prune(path);
    }

    /// Hash of the commit at `row` in display order.
    pub fn commit_hash(&self, row: usize) -> Option<&str> {
        self.commits.get(row).map(|c| c.hash())
    }

    // ---- Reads ----

    pub(crate) fn info(&self) -> RepositoryInfo {
        RepositoryInfo {
            path: self.path.clone(),
            current_branch: self.branch.clone(),
            is_detached: self.branch.is_none() && self.head.is_some(),
            remotes: self.remotes.clone(),
            head_hash: self.head.clone(),
        }
    }

    pub(crate) fn commit_page(&self, skip: usize, limit: usize) -> Vec<GraphCommit> {
        self.commits.iter().skip(skip).take(limit).cloned().collect()
    }

    pub(crate) fn commit_details(&self, hash: &str) -> EngineResult<CommitDetails> {
        self.details.get(hash).cloned().ok_or_else(|| not_found_commit(hash))
    }

    pub(crate) fn commit_file_diff(&self, hash: &str, path: &str) -> EngineResult<FileDiff> {
        self.commit_details(hash)?;
        Ok(self
            .commit_diffs
            .get(&(hash.to_string(), path.to_string()))
            .cloned()
            .unwrap_or_else(|| FileDiff::empty(path)))
    }

    pub(crate) fn branches(&self) -> Vec<BranchInfo> {
        self.branches
            .iter()
            .map(|b| BranchInfo {
                is_head: !b.is_remote && self.branch.as_deref() == Some(b.name.as_str()),
                ..b.clone()
            })
            .collect()
    }

    pub(crate) fn tags(&self) -> Vec<TagInfo> {
        self.tags.clone()
    }

    pub(crate) fn stashes(&self) -> Vec<StashInfo> {
        self.stashes.iter().map(|s| s.details.info()).collect()
    }

    pub(crate) fn stash_details(&self, index: usize) -> EngineResult<StashDetails> {
        Ok(self.stash(index)?.details.clone())
    }

    pub(crate) fn stash_file_diff(&self, index: usize, path: &str) -> EngineResult<FileDiff> {
        Ok(self
            .stash(index)?
            .diffs
            .get(path)
            .cloned()
            .unwrap_or_else(|| FileDiff::empty(path)))
    }

    pub(crate) fn statuses(&self) -> FileStatuses {
        let mut statuses = FileStatuses::new();
        for (path, file) in &self.files {
            if file.conflicted {
                statuses
                    .unstaged
                    .push(FileStatus::new(path, FileStatusType::Conflicted, false));
                continue;
            }
            let staged = match (&file.head, &file.index) {
                (None, Some(_)) => Some(FileStatusType::Added),
                (Some(_), None) => Some(FileStatusType::Deleted),
                (Some(h), Some(i)) if h != i => Some(FileStatusType::Modified),
                _ => None,
            };
            if let Some(status) = staged {
                statuses.staged.push(FileStatus::new(path, status, true));
            }
            match (&file.index, &file.worktree) {
                (Some(_), None) => statuses
                    .unstaged
                    .push(FileStatus::new(path, FileStatusType::Deleted, false)),
                (Some(i), Some(w)) if i != w => statuses
                    .unstaged
                    .push(FileStatus::new(path, FileStatusType::Modified, false)),
                (None, Some(_)) => statuses
                    .untracked
                    .push(FileStatus::new(path, FileStatusType::Untracked, false)),
                _ => {}
            }
        }
        statuses
    }

    pub(crate) fn file_diff(&self, path: &str, staged: bool, untracked: bool) -> FileDiff {
        let Some(file) = self.files.get(path) else {
            return FileDiff::empty(path);
        };
        if untracked {
            diff_text(path, None, file.worktree.as_deref())
        } else if staged {
            diff_text(path, file.head.as_deref(), file.index.as_deref())
        } else {
            diff_text(path, file.index.as_deref(), file.worktree.as_deref())
        }
    }

    pub(crate) fn diff_hunk(
        &self,
        path: &str,
        staged: bool,
        hunk_index: usize,
        untracked: bool,
    ) -> EngineResult<DiffHunk> {
        self.file_diff(path, staged, untracked)
            .hunks
            .get(hunk_index)
            .cloned()
            .ok_or_else(|| hunk_out_of_range(path, hunk_index))
    }

    // ---- Working-tree mutations ----

    pub(crate) fn stage_file(&mut self, path: &str) -> EngineResult<()> {
        let file = self.file_mut(path)?;
        file.index = file.worktree.clone();
        file.conflicted = false;
        self.prune(path);
        Ok(())
    }

    pub(crate) fn unstage_file(&mut self, path: &str) -> EngineResult<()> {
        let file = self.file_mut(path)?;
        file.index = file.head.clone();
        self.prune(path);
        Ok(())
    }

    pub(crate) fn stage_hunk(
        &mut self,
        path: &str,
        hunk_index: usize,
        lines: Option<&[usize]>,
    ) -> EngineResult<()> {
        let hunk = self.diff_hunk(path, false, hunk_index, false)?;
        let file = self.file_mut(path)?;
        let base = file.index.clone().unwrap_or_default();
        file.index = Some(apply_hunk(&base, &hunk, Direction::Forward, lines));
        Ok(())
    }

    pub(crate) fn unstage_hunk(&mut self, path: &str, hunk_index: usize) -> EngineResult<()> {
        let hunk = self.diff_hunk(path, true, hunk_index, false)?;
        let file = self.file_mut(path)?;
        let base = file.index.clone().unwrap_or_default();
        let restored = apply_hunk(&base, &hunk, Direction::Reverse, None);
        file.index = if file.head.is_none() && restored.is_empty() {
            None
        } else {
            Some(restored)
        };
        self.prune(path);
        Ok(())
    }

    pub(crate) fn discard_hunk(
        &mut self,
        path: &str,
        hunk_index: usize,
        lines: Option<&[usize]>,
    ) -> EngineResult<()> {
        let hunk = self.diff_hunk(path, false, hunk_index, false)?;
        let file = self.file_mut(path)?;
        let base = file.worktree.clone().unwrap_or_default();
        file.worktree = Some(apply_hunk(&base, &hunk, Direction::Reverse, lines));
        Ok(())
    }

    pub(crate) fn delete_file(&mut self, path: &str) -> EngineResult<()> {
        let file = self
            .files
            .get_mut(path)
            .filter(|f| f.worktree.is_some())
            .ok_or_else(|| EngineError::Io("No such file or directory (os error 2)".into()))?;
        file.worktree = None;
        self.prune(path);
        Ok(())
    }

    pub(crate) fn revert_file(&mut self, path: &str) -> EngineResult<()> {
        let file = self.file_mut(path)?;
        file.index = file.head.clone();
        file.worktree = file.head.clone();
        file.conflicted = false;
        self.prune(path);
        Ok(())
    }

    pub(crate) fn revert_commit(&self, hash: &str) -> EngineResult<()> {
        self.commit_details(hash).map(|_| ())
    }

    pub(crate) fn revert_commit_file(&self, hash: &str, path: &str) -> EngineResult<()> {
        let details = self.commit_details(hash)?;
        if !details.touches(path) {
            return Err(EngineError::Git(format!(
                "path '{path}' is not changed by commit {hash}"
            )));
        }
        Ok(())
    }

    pub(crate) fn revert_commit_file_lines(
        &self,
        hash: &str,
        path: &str,
        hunk_index: usize,
        line_indices: &[usize],
    ) -> EngineResult<()> {
        self.revert_commit_file(hash, path)?;
        let diff = self.commit_file_diff(hash, path)?;
        let hunk = diff
            .hunks
            .get(hunk_index)
            .ok_or_else(|| hunk_out_of_range(path, hunk_index))?;
        if line_indices.iter().any(|&i| i >= hunk.lines.len()) {
            return Err(EngineError::Git("line index out of range".into()));
        }
        Ok(())
    }

    // ---- History and ref mutations ----

    pub(crate) fn create_commit(&mut self, message: &str) -> EngineResult<String> {
        let staged = self.statuses().staged;
        if staged.is_empty() {
            return Err(EngineError::Git("nothing to commit, working tree clean".into()));
        }
        let files_changed = staged
            .iter()
            .map(|s| CommitFileChange {
                path: s.path.clone(),
                status: s.status,
                old_path: None,
            })
            .collect::<Vec<_>>();
        let mut diffs = Vec::new();
        for (path, file) in self.files.iter_mut() {
            if file.head != file.index {
                diffs.push(diff_text(path, file.head.as_deref(), file.index.as_deref()));
                file.head = file.index.clone();
            }
        }
        let paths: Vec<String> = self.files.keys().cloned().collect();
        for path in paths {
            self.prune(&path);
        }
        let hash = self.push_commit(message.to_string(), files_changed);
        for diff in diffs {
            self.commit_diffs.insert((hash.clone(), diff.path.clone()), diff);
        }
        Ok(hash)
    }

    pub(crate) fn checkout_commit(&mut self, hash: &str) -> EngineResult<()> {
        self.commit_details(hash)?;
        self.branch = None;
        self.head = Some(hash.to_string());
        Ok(())
    }

    pub(crate) fn checkout_branch(&mut self, name: &str) -> EngineResult<()> {
        let branch = self
            .branches
            .iter()
            .find(|b| !b.is_remote && b.name == name)
            .ok_or_else(|| {
                EngineError::Git(format!(
                    "cannot locate local branch '{name}'; class=Reference (4); code=NotFound (-3)"
                ))
            })?;
        let target = branch.target_hash.clone();
        self.branch = Some(name.to_string());
        self.head = (!target.is_empty()).then_some(target);
        Ok(())
    }

    pub(crate) fn delete_branch(&mut self, name: &str, is_remote: bool) -> EngineResult<()> {
        if !is_remote && self.branch.as_deref() == Some(name) {
            return Err(EngineError::Git(
                "Cannot delete the currently checked out branch".into(),
            ));
        }
        let before = self.branches.len();
        self.branches
            .retain(|b| !(b.name == name && b.is_remote == is_remote));
        if self.branches.len() == before {
            let kind = if is_remote { "remote" } else { "local" };
            return Err(EngineError::Git(format!(
                "cannot locate {kind} branch '{name}'; class=Reference (4); code=NotFound (-3)"
            )));
        }
        Ok(())
    }

    pub(crate) fn delete_tag(&mut self, name: &str) -> EngineResult<()> {
        let before = self.tags.len();
        self.tags.retain(|t| t.name != name);
        if self.tags.len() == before {
            return Err(EngineError::Git(format!(
                "reference 'refs/tags/{name}' not found; class=Reference (4); code=NotFound (-3)"
            )));
        }
        Ok(())
    }

    pub(crate) fn apply_stash(&mut self, index: usize) -> EngineResult<()> {
        let contents = self.stash(index)?.contents.clone();
        for (path, content) in contents {
            self.files.entry(path).or_default().worktree = Some(content);
        }
        Ok(())
    }

    pub(crate) fn drop_stash(&mut self, index: usize) -> EngineResult<()> {
        self.stash(index)?;
        self.stashes.remove(index);
        self.reindex_stashes();
        Ok(())
    }

    // ---- Internals ----

    fn push_commit(&mut self, message: String, files_changed: Vec<CommitFileChange>) -> String {
        let seq = self.next_seq;
        self.next_seq += 1;
        let hash = synthetic_hash(seq);
        let parent_hashes: Vec<String> = self.head.iter().cloned().collect();
        let timestamp = BASE_TIMESTAMP + seq as i64;

        let branch_refs: Vec<RefInfo> = self
            .branch
            .iter()
            .map(|name| RefInfo {
                name: name.clone(),
                ref_type: RefType::Branch,
                is_head: true,
            })
            .collect();
        if let Some(previous) = self.commits.first_mut() {
            previous.refs.retain(|r| r.ref_type != RefType::Branch || !r.is_head);
            previous.is_tip = false;
        }

        let lines = if parent_hashes.is_empty() {
            Vec::new()
        } else {
            vec![GraphLine {
                from_column: 0,
                to_column: 0,
                is_merge: false,
                line_type: GraphLineType::ToParent,
            }]
        };
        let info = CommitInfo {
            hash: hash.clone(),
            short_hash: hash[..7].to_string(),
            message: message.clone(),
            author_name: AUTHOR_NAME.into(),
            author_email: AUTHOR_EMAIL.into(),
            timestamp,
            parent_hashes: parent_hashes.clone(),
        };
        self.commits.insert(
            0,
            GraphCommit {
                commit: info,
                column: 0,
                lines,
                refs: branch_refs,
                is_tip: true,
            },
        );
        self.details.insert(
            hash.clone(),
            CommitDetails {
                hash: hash.clone(),
                message,
                author_name: AUTHOR_NAME.into(),
                author_email: AUTHOR_EMAIL.into(),
                committer_name: AUTHOR_NAME.into(),
                committer_email: AUTHOR_EMAIL.into(),
                timestamp,
                parent_hashes,
                files_changed,
            },
        );
        if let Some(name) = &self.branch {
            for branch in self.branches.iter_mut().filter(|b| !b.is_remote && &b.name == name) {
                branch.target_hash = hash.clone();
            }
        }
        self.head = Some(hash.clone());
        hash
    }

    fn file_mut(&mut self, path: &str) -> EngineResult<&mut WorkFile> {
        self.files.get_mut(path).ok_or_else(|| {
            EngineError::Git(format!(
                "pathspec '{path}' did not match any files; class=Index (10); code=NotFound (-3)"
            ))
        })
    }

    /// Forgets paths that no longer exist in any of the three versions.
    fn prune(&mut self, path: &str) {
        let gone = self
            .files
            .get(path)
            .is_some_and(|f| f.head.is_none() && f.index.is_none() && f.worktree.is_none());
        if gone {
            self.files.remove(path);
        }
    }

    fn stash(&self, index: usize) -> EngineResult<&StoredStash> {
        self.stashes.get(index).ok_or_else(|| {
            EngineError::Git(format!(
                "no stashed state at position {index}; class=Stash (27); code=NotFound (-3)"
            ))
        })
    }

    fn reindex_stashes(&mut self) {
        for (i, stash) in self.stashes.iter_mut().enumerate() {
            stash.details.index = i;
        }
    }
}

fn synthetic_hash(seq: u64) -> String {
    format!("{seq:040x}")
}

fn not_found_commit(hash: &str) -> EngineError {
    EngineError::Git(format!(
        "revspec '{hash}' not found; class=Reference (4); code=NotFound (-3)"
    ))
}

fn hunk_out_of_range(path: &str, hunk_index: usize) -> EngineError {
    EngineError::Git(format!("Hunk index {hunk_index} out of range for {path}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo_with_change() -> MemoryRepo {
        MemoryRepo::new("/repo")
            .with_commits(1)
            .with_file("a.txt", Some("one\n"), Some("one\n"), Some("one\ntwo\n"))
            .with_file("new.txt", None, None, Some("fresh\n"))
    }

    #[test]
    fn statuses_derive_from_versions() {
        let repo = repo_with_change();
        let statuses = repo.statuses();
        assert!(statuses.staged.is_empty());
        assert_eq!(statuses.unstaged.len(), 1);
        assert_eq!(statuses.unstaged[0].status, FileStatusType::Modified);
        assert_eq!(statuses.untracked[0].path, "new.txt");
    }

    #[test]
    fn stage_file_moves_entry_to_staged() {
        let mut repo = repo_with_change();
        repo.stage_file("a.txt").unwrap();
        let statuses = repo.statuses();
        assert_eq!(statuses.staged.len(), 1);
        assert!(statuses.unstaged.is_empty());

        repo.stage_file("new.txt").unwrap();
        let statuses = repo.statuses();
        assert_eq!(statuses.staged[1].status, FileStatusType::Added);
        assert!(statuses.untracked.is_empty());
    }

    #[test]
    fn unstage_file_restores_head_version() {
        let mut repo = repo_with_change();
        repo.stage_file("a.txt").unwrap();
        repo.unstage_file("a.txt").unwrap();
        assert!(repo.statuses().staged.is_empty());
    }

    #[test]
    fn create_commit_requires_staged_changes() {
        let mut repo = repo_with_change();
        assert!(repo.create_commit("nothing").is_err());

        repo.stage_file("a.txt").unwrap();
        let hash = repo.create_commit("add two").unwrap();
        assert_eq!(repo.info().head_hash.as_deref(), Some(hash.as_str()));
        assert_eq!(repo.commit_page(0, 1)[0].commit.message, "add two");
        assert!(repo.commit_details(&hash).unwrap().touches("a.txt"));
        assert!(repo.statuses().staged.is_empty());
    }

    #[test]
    fn stage_hunk_updates_index_only() {
        let mut repo = repo_with_change();
        repo.stage_hunk("a.txt", 0, None).unwrap();
        let statuses = repo.statuses();
        assert_eq!(statuses.staged.len(), 1);
        assert!(statuses.unstaged.is_empty());
        assert!(repo.stage_hunk("a.txt", 0, None).is_err());
    }

    #[test]
    fn discard_hunk_restores_worktree() {
        let mut repo = repo_with_change();
        repo.discard_hunk("a.txt", 0, None).unwrap();
        assert!(repo.statuses().unstaged.is_empty());
    }

    #[test]
    fn deleting_current_branch_is_rejected() {
        let mut repo = MemoryRepo::new("/repo").with_commits(1).with_branch("main", false);
        let err = repo.delete_branch("main", false).unwrap_err();
        assert!(err.to_string().contains("currently checked out"));
    }

    #[test]
    fn checkout_commit_detaches_head() {
        let mut repo = MemoryRepo::new("/repo").with_commits(3);
        let target = repo.commit_hash(2).unwrap().to_string();
        repo.checkout_commit(&target).unwrap();
        let info = repo.info();
        assert!(info.is_detached);
        assert_eq!(info.head_hash, Some(target));
    }

    #[test]
    fn drop_stash_reindexes() {
        let mut repo = MemoryRepo::new("/repo")
            .with_commits(1)
            .with_stash("first", &[("a.txt", "a\n")])
            .with_stash("second", &[("b.txt", "b\n")]);
        assert_eq!(repo.stashes()[0].message, "second");
        repo.drop_stash(0).unwrap();
        let stashes = repo.stashes();
        assert_eq!(stashes.len(), 1);
        assert_eq!(stashes[0].index, 0);
        assert_eq!(stashes[0].message, "first");
    }
}
