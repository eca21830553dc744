//! Audit trail of destructive operations.
//!
//! Recording is best-effort: callers log failures and move on, so an
//! unwritable log never blocks a repository operation.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::{SurfaceError, SurfaceResult};

/// One destructive operation, as it was performed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub at: DateTime<Local>,
    /// Operation name, e.g. `delete_branch`.
    pub action: String,
    /// Repository the operation ran against.
    pub repository: String,
    /// What was affected: a path, ref name or commit id.
    pub target: String,
}

impl ActivityEntry {
    pub fn now(
        action: impl Into<String>,
        repository: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            at: Local::now(),
            action: action.into(),
            repository: repository.into(),
            target: target.into(),
        }
    }

    /// Single-line rendering used by [`FileActivityLog`].
    pub fn to_line(&self) -> String {
        format!(
            "{} {} {} {}",
            self.at.format("%Y-%m-%d %H:%M:%S%.3f %z"),
            self.action,
            self.repository,
            self.target
        )
    }
}

pub trait ActivityLog: Send + Sync {
    fn record(&self, entry: &ActivityEntry) -> SurfaceResult<()>;
}

/// Discards every entry.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpActivityLog;

impl ActivityLog for NoOpActivityLog {
    fn record(&self, _entry: &ActivityEntry) -> SurfaceResult<()> {
        Ok(())
    }
}

/// Keeps entries in memory.
#[derive(Debug, Default)]
pub struct MemoryActivityLog {
    entries: RwLock<Vec<ActivityEntry>>,
}

impl MemoryActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.entries.read().map(|e| e.clone()).unwrap_or_default()
    }
}

impl ActivityLog for MemoryActivityLog {
    fn record(&self, entry: &ActivityEntry) -> SurfaceResult<()> {
        self.entries
            .write()
            .map_err(|e| SurfaceError::Poisoned(e.to_string()))?
            .push(entry.clone());
        Ok(())
    }
}

/// Appends one line per entry to a file, creating parent directories.
#[derive(Clone, Debug)]
pub struct FileActivityLog {
    path: PathBuf,
}

impl FileActivityLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ActivityLog for FileActivityLog {
    fn record(&self, entry: &ActivityEntry) -> SurfaceResult<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", entry.to_line())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_log_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileActivityLog::new(dir.path().join("logs").join("activity.log"));

        log.record(&ActivityEntry::now("delete_tag", "/repo", "v1"))
            .unwrap();
        log.record(&ActivityEntry::now("drop_stash", "/repo", "stash@{0}"))
            .unwrap();

        let contents = fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("delete_tag /repo v1"));
        assert!(lines[1].contains("drop_stash"));
    }

    #[test]
    fn file_log_reports_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let log = FileActivityLog::new(blocker.join("activity.log"));
        assert!(log.record(&ActivityEntry::now("revert_file", "/repo", "a.txt")).is_err());
    }

    #[test]
    fn memory_log_keeps_entries() {
        let log = MemoryActivityLog::new();
        log.record(&ActivityEntry::now("delete_file", "/repo", "a.txt"))
            .unwrap();
        assert_eq!(log.entries()[0].target, "a.txt");
    }
}
