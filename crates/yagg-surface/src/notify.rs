//! Toast notifications.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Default lifetime of an error toast.
pub const DEFAULT_ERROR_TTL: Duration = Duration::from_secs(5);
/// Default lifetime of a success toast.
pub const DEFAULT_SUCCESS_TTL: Duration = Duration::from_secs(3);
/// How many past toasts [`ToastCenter::history`] keeps.
pub const HISTORY_LIMIT: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ToastId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Error,
    Success,
}

/// Sink for transient user notifications. Never blocks.
pub trait Notifier: Send + Sync {
    fn show_error(&self, message: &str) -> ToastId;
    fn show_success(&self, message: &str) -> ToastId;
    fn dismiss(&self, id: ToastId);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    pub id: ToastId,
    pub kind: ToastKind,
    pub message: String,
    pub expires_at: Instant,
}

/// In-process toast queue.
///
/// Keeps the currently visible toasts, which expire on their own, and the
/// last [`HISTORY_LIMIT`] toasts shown.
#[derive(Debug)]
pub struct ToastCenter {
    error_ttl: Duration,
    success_ttl: Duration,
    next_id: AtomicU64,
    visible: RwLock<Vec<Toast>>,
    history: RwLock<VecDeque<Toast>>,
}

impl ToastCenter {
    pub fn new(error_ttl: Duration, success_ttl: Duration) -> Self {
        Self {
            error_ttl,
            success_ttl,
            next_id: AtomicU64::new(1),
            visible: RwLock::new(Vec::new()),
            history: RwLock::new(VecDeque::new()),
        }
    }

    /// Toasts still visible at `now`. Expired ones are dropped.
    pub fn active(&self, now: Instant) -> Vec<Toast> {
        match self.visible.write() {
            Ok(mut visible) => {
                visible.retain(|t| t.expires_at > now);
                visible.clone()
            }
            Err(_) => Vec::new(),
        }
    }

    /// Recently shown toasts, oldest first.
    pub fn history(&self) -> Vec<Toast> {
        self.history
            .read()
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages(ToastKind::Error)
    }

    pub fn successes(&self) -> Vec<String> {
        self.messages(ToastKind::Success)
    }

    fn messages(&self, kind: ToastKind) -> Vec<String> {
        self.history()
            .into_iter()
            .filter(|t| t.kind == kind)
            .map(|t| t.message)
            .collect()
    }

    fn push(&self, kind: ToastKind, message: &str) -> ToastId {
        let id = ToastId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let ttl = match kind {
            ToastKind::Error => self.error_ttl,
            ToastKind::Success => self.success_ttl,
        };
        let now = Instant::now();
        let toast = Toast {
            id,
            kind,
            message: message.to_string(),
            expires_at: now + ttl,
        };
        if let Ok(mut history) = self.history.write() {
            if history.len() == HISTORY_LIMIT {
                history.pop_front();
            }
            history.push_back(toast.clone());
        }
        if let Ok(mut visible) = self.visible.write() {
            visible.retain(|t| t.expires_at > now);
            visible.push(toast);
        }
        id
    }
}

impl Default for ToastCenter {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_TTL, DEFAULT_SUCCESS_TTL)
    }
}

impl Notifier for ToastCenter {
    fn show_error(&self, message: &str) -> ToastId {
        tracing::debug!(message, "error toast");
        self.push(ToastKind::Error, message)
    }

    fn show_success(&self, message: &str) -> ToastId {
        tracing::debug!(message, "success toast");
        self.push(ToastKind::Success, message)
    }

    fn dismiss(&self, id: ToastId) {
        if let Ok(mut visible) = self.visible.write() {
            visible.retain(|t| t.id != id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_outlive_successes() {
        let center = ToastCenter::default();
        center.show_error("boom");
        center.show_success("done");

        let later = Instant::now() + Duration::from_secs(4);
        let active = center.active(later);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].kind, ToastKind::Error);

        let much_later = Instant::now() + Duration::from_secs(6);
        assert!(center.active(much_later).is_empty());
    }

    #[test]
    fn dismiss_hides_but_keeps_history() {
        let center = ToastCenter::default();
        let id = center.show_error("boom");
        center.dismiss(id);
        assert!(center.active(Instant::now()).is_empty());
        assert_eq!(center.errors(), vec!["boom".to_string()]);
    }

    #[test]
    fn ids_are_unique() {
        let center = ToastCenter::default();
        let a = center.show_success("a");
        let b = center.show_success("b");
        assert_ne!(a, b);
        assert_eq!(center.successes().len(), 2);
    }

    #[test]
    fn history_drops_the_oldest_toasts() {
        let center = ToastCenter::default();
        for n in 0..HISTORY_LIMIT + 5 {
            center.show_error(&format!("error {n}"));
        }
        let errors = center.errors();
        assert_eq!(errors.len(), HISTORY_LIMIT);
        assert_eq!(errors[0], "error 5");
        assert_eq!(errors[HISTORY_LIMIT - 1], format!("error {}", HISTORY_LIMIT + 4));
    }
}
