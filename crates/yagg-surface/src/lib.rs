//! User-facing side channels of the yagg store.
//!
//! The store never talks to the rendering layer directly. It reports
//! outcomes through three narrow interfaces defined here:
//!
//! - [`notify`] -- transient toasts ([`Notifier`], [`ToastCenter`])
//! - [`confirm`] -- yes/no dialogs before destructive operations ([`Confirmer`])
//! - [`activity`] -- a best-effort audit trail of destructive operations ([`ActivityLog`])

pub mod activity;
pub mod confirm;
pub mod error;
pub mod notify;

pub use activity::{ActivityEntry, ActivityLog, FileActivityLog, MemoryActivityLog, NoOpActivityLog};
pub use confirm::{ConfirmRequest, Confirmer, StaticConfirmer};
pub use error::{SurfaceError, SurfaceResult};
pub use notify::{Notifier, Toast, ToastCenter, ToastId, ToastKind, HISTORY_LIMIT};
