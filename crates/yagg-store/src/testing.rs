//! Store wired to the in-memory engine and recording surfaces.

use std::sync::Arc;

use yagg_engine::{Engine, InMemoryEngine, MemoryRepo};
use yagg_surface::{ActivityLog, Confirmer, MemoryActivityLog, Notifier, StaticConfirmer, ToastCenter};

use crate::config::StoreConfig;
use crate::store::RepoStore;

pub(crate) const REPO: &str = "/repo";

pub(crate) struct Harness {
    pub engine: Arc<InMemoryEngine>,
    pub toasts: Arc<ToastCenter>,
    pub confirmer: Arc<StaticConfirmer>,
    pub activity: Arc<MemoryActivityLog>,
    pub store: RepoStore,
}

impl Harness {
    pub fn new(repo: MemoryRepo) -> Self {
        Self::with(repo, true, 100)
    }

    pub fn with(repo: MemoryRepo, confirm: bool, page_size: usize) -> Self {
        let engine = Arc::new(InMemoryEngine::with_cwd(repo.path().to_string()));
        engine.add_repo(repo);
        let config = StoreConfig {
            page_size,
            ..StoreConfig::default()
        };
        let toasts = Arc::new(config.toast_center());
        let confirmer = Arc::new(StaticConfirmer::new(confirm));
        let activity = Arc::new(MemoryActivityLog::new());
        let store = RepoStore::new(
            Arc::clone(&engine) as Arc<dyn Engine>,
            Arc::clone(&toasts) as Arc<dyn Notifier>,
            Arc::clone(&confirmer) as Arc<dyn Confirmer>,
            config,
        )
        .with_activity_log(Arc::clone(&activity) as Arc<dyn ActivityLog>);
        Self {
            engine,
            toasts,
            confirmer,
            activity,
            store,
        }
    }

    /// Opens [`REPO`] and forgets the calls that took.
    pub async fn opened(repo: MemoryRepo) -> Self {
        let h = Self::new(repo);
        assert!(h.store.open(REPO).await.is_done());
        h.engine.clear_calls();
        h
    }

    pub fn errors(&self) -> Vec<String> {
        self.toasts.errors()
    }
}

/// `n` numbered lines.
pub(crate) fn lines(n: usize) -> String {
    (1..=n).map(|i| format!("line{i}\n")).collect()
}

/// `text` with each 1-based line in `edits` replaced.
pub(crate) fn edit(text: &str, edits: &[(usize, &str)]) -> String {
    text.lines()
        .enumerate()
        .map(|(i, l)| match edits.iter().find(|(n, _)| *n == i + 1) {
            Some((_, with)) => format!("{with}\n"),
            None => format!("{l}\n"),
        })
        .collect()
}

/// A repo whose `f.ts` has three unstaged hunks and whose `a.txt` has one.
pub(crate) fn working_repo() -> MemoryRepo {
    let base = lines(40);
    let changed = edit(&base, &[(2, "A"), (20, "B"), (38, "C")]);
    MemoryRepo::new(REPO)
        .with_commits(3)
        .with_branch("main", false)
        .with_branch("feature", false)
        .with_tag("v1")
        .with_file("f.ts", Some(&base), Some(&base), Some(&changed))
        .with_file("a.txt", Some("one\n"), Some("one\n"), Some("one\ntwo\n"))
        .with_file("b.txt", Some("b\n"), Some("b\n"), Some("bb\n"))
        .with_file("new.txt", None, None, Some("fresh\n"))
        .with_stash("first", &[("a.txt", "stashed\n")])
        .with_stash("second", &[("b.txt", "stashed b\n")])
}
