//! Confirmation dialogs.

use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A yes/no question shown before a destructive operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmRequest {
    pub title: String,
    pub message: String,
    pub confirm_label: String,
    pub cancel_label: String,
}

impl ConfirmRequest {
    /// A request with the usual "Cancel" button.
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        confirm_label: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            confirm_label: confirm_label.into(),
            cancel_label: "Cancel".into(),
        }
    }
}

#[async_trait]
pub trait Confirmer: Send + Sync {
    /// Resolves to `true` if the user confirmed.
    async fn show_confirm(&self, request: ConfirmRequest) -> bool;
}

/// Answers every request the same way and remembers what was asked.
#[derive(Debug)]
pub struct StaticConfirmer {
    answer: bool,
    asked: RwLock<Vec<ConfirmRequest>>,
}

impl StaticConfirmer {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: RwLock::new(Vec::new()),
        }
    }

    pub fn accepting() -> Self {
        Self::new(true)
    }

    pub fn declining() -> Self {
        Self::new(false)
    }

    pub fn asked(&self) -> Vec<ConfirmRequest> {
        self.asked.read().map(|a| a.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Confirmer for StaticConfirmer {
    async fn show_confirm(&self, request: ConfirmRequest) -> bool {
        if let Ok(mut asked) = self.asked.write() {
            asked.push(request);
        }
        self.answer
    }
}
