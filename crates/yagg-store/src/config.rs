//! Store configuration, loaded from TOML.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use yagg_surface::{ActivityLog, FileActivityLog, NoOpActivityLog, ToastCenter};

use crate::error::ConfigError;

/// Tunables of a [`RepoStore`](crate::RepoStore).
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// page_size = 200
/// error_toast_ms = 8000
/// activity_log = "/var/log/yagg/activity.log"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Commits requested per history page. A shorter page ends the history.
    pub page_size: usize,
    pub error_toast_ms: u64,
    pub success_toast_ms: u64,
    /// Where destructive operations are recorded. `None` disables the log.
    pub activity_log: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            error_toast_ms: 5_000,
            success_toast_ms: 3_000,
            activity_log: None,
        }
    }
}

impl StoreConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be at least 1".into()));
        }
        if self.success_toast_ms > self.error_toast_ms {
            return Err(ConfigError::Invalid(
                "success_toast_ms must not exceed error_toast_ms".into(),
            ));
        }
        Ok(())
    }

    pub fn error_toast(&self) -> Duration {
        Duration::from_millis(self.error_toast_ms)
    }

    pub fn success_toast(&self) -> Duration {
        Duration::from_millis(self.success_toast_ms)
    }

    /// A toast center using the configured lifetimes.
    pub fn toast_center(&self) -> ToastCenter {
        ToastCenter::new(self.error_toast(), self.success_toast())
    }

    /// The configured activity log, or one that discards everything.
    pub fn activity_log(&self) -> Arc<dyn ActivityLog> {
        match &self.activity_log {
            Some(path) => Arc::new(FileActivityLog::new(path)),
            None => Arc::new(NoOpActivityLog),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = StoreConfig::default();
        assert_eq!(c.page_size, 100);
        assert_eq!(c.error_toast(), Duration::from_secs(5));
        assert_eq!(c.success_toast(), Duration::from_secs(3));
        assert!(c.activity_log.is_none());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = StoreConfig::from_toml_str("page_size = 25\n").unwrap();
        assert_eq!(c.page_size, 25);
        assert_eq!(c.error_toast_ms, 5_000);
    }

    #[test]
    fn rejects_zero_page_size() {
        let err = StoreConfig::from_toml_str("page_size = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_success_outliving_error() {
        let err = StoreConfig::from_toml_str("success_toast_ms = 9000\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.toml");
        let log = dir.path().join("activity.log");
        std::fs::write(
            &path,
            format!("page_size = 50\nactivity_log = {:?}\n", log.display().to_string()),
        )
        .unwrap();

        let c = StoreConfig::load(&path).unwrap();
        assert_eq!(c.page_size, 50);
        assert_eq!(c.activity_log.as_deref(), Some(log.as_path()));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = StoreConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
